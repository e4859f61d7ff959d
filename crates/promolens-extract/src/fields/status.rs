//! Activity status: explicit keywords first, then dates relative to today.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::keyword_regex;
use promolens_core::ActivityStatus;

/// Checked in this order; the first state with a hit wins.
static STATUS_KEYWORDS: Lazy<Vec<(ActivityStatus, Regex)>> = Lazy::new(|| {
    [
        (
            ActivityStatus::Active,
            &[
                "进行中", "生效中", "已生效", "正在进行", "已上线", "投放中", "active",
                "ongoing", "running", "live", "in progress",
            ][..],
        ),
        (
            ActivityStatus::Upcoming,
            &[
                "未开始", "即将开始", "待开始", "待生效", "预热中", "未生效", "upcoming",
                "scheduled", "not started", "pending",
            ][..],
        ),
        (
            ActivityStatus::Ended,
            &[
                "已结束", "已过期", "已失效", "已下线", "已终止", "已停止", "ended", "expired",
                "finished", "closed",
            ][..],
        ),
    ]
    .into_iter()
    .filter_map(|(status, terms)| keyword_regex(terms).map(|re| (status, re)))
    .collect()
});

pub fn match_status_keyword(text: &str) -> Option<ActivityStatus> {
    STATUS_KEYWORDS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(status, _)| *status)
}

/// Status implied by the activity window. Without any date the status
/// cannot be determined.
pub fn infer_status(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> ActivityStatus {
    if start.is_none() && end.is_none() {
        return ActivityStatus::Undetermined;
    }
    if start.is_some_and(|s| today < s) {
        return ActivityStatus::Upcoming;
    }
    if end.is_some_and(|e| today > e) {
        return ActivityStatus::Ended;
    }
    ActivityStatus::Active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_keyword_priority() {
        assert_eq!(match_status_keyword("状态：进行中"), Some(ActivityStatus::Active));
        assert_eq!(match_status_keyword("状态：未开始"), Some(ActivityStatus::Upcoming));
        assert_eq!(match_status_keyword("Status: Expired"), Some(ActivityStatus::Ended));
        // Tab strips list every state; active is checked first.
        assert_eq!(
            match_status_keyword("全部 已结束 未开始 进行中"),
            Some(ActivityStatus::Active)
        );
        assert_eq!(match_status_keyword("inactive listing"), None);
    }

    #[test]
    fn test_infer_from_dates() {
        let start = Some(ymd(2024, 6, 1));
        let end = Some(ymd(2024, 6, 10));
        assert_eq!(infer_status(start, end, ymd(2024, 5, 31)), ActivityStatus::Upcoming);
        assert_eq!(infer_status(start, end, ymd(2024, 6, 1)), ActivityStatus::Active);
        assert_eq!(infer_status(start, end, ymd(2024, 6, 10)), ActivityStatus::Active);
        assert_eq!(infer_status(start, end, ymd(2024, 6, 11)), ActivityStatus::Ended);
        assert_eq!(infer_status(None, end, ymd(2024, 7, 1)), ActivityStatus::Ended);
        assert_eq!(infer_status(None, None, ymd(2024, 7, 1)), ActivityStatus::Undetermined);
    }
}
