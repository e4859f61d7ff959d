//! Discount and commission figures.
//!
//! Percentages are rendered as `"<n>%"` (percent off for discounts) and
//! threshold reductions as `"满X减Y"`.

use once_cell::sync::Lazy;
use regex::Regex;

static DISCOUNT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:折扣力度|优惠力度|折扣|优惠|discount)\s*[:：]\s*([^\n]+)").unwrap()
});

static PERCENT_OFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*%\s*off|(?:save|省|立减|直减|减)\s*(\d+(?:\.\d+)?)\s*%",
    )
    .unwrap()
});

static ZHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*折").unwrap());

static MAN_JIAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"满\s*(\d+(?:\.\d+)?)\s*元?\s*[减-]\s*(\d+(?:\.\d+)?)\s*元?").unwrap()
});

static SPEND_GET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)spend\s*[$¥￥]?\s*(\d+(?:\.\d+)?)\s*,?\s*(?:and\s+)?(?:get|save)\s*[$¥￥]?\s*(\d+(?:\.\d+)?)\s*off",
    )
    .unwrap()
});

static BARE_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());

static BARE_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(0?\.\d+)\b").unwrap());

static COMMISSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:佣金比例|佣金率|返佣比例|返佣|佣金|commission\s*rate|commission)\s*[:：]?\s*(\d+(?:\.\d+)?)\s*(%)?",
    )
    .unwrap()
});

/// Ordered cascade: labelled value, percent off, 折 notation, then
/// threshold reductions.
pub fn extract_discount(text: &str) -> Option<String> {
    DISCOUNT_LABEL
        .captures_iter(text)
        .find_map(|caps| parse_labeled_discount(&caps[1]))
        .or_else(|| percent_off(text))
        .or_else(|| zhe_discount(text))
        .or_else(|| threshold_reduction(text))
}

fn parse_labeled_discount(value: &str) -> Option<String> {
    percent_off(value)
        .or_else(|| zhe_discount(value))
        .or_else(|| threshold_reduction(value))
        .or_else(|| {
            let caps = BARE_PERCENT.captures(value)?;
            percent_value(caps[1].parse().ok()?)
        })
        .or_else(|| {
            // A decimal fraction after a discount label is the share paid.
            let caps = BARE_FRACTION.captures(value)?;
            let ratio: f64 = caps[1].parse().ok()?;
            if ratio > 0.0 && ratio < 1.0 {
                percent_value((1.0 - ratio) * 100.0)
            } else {
                None
            }
        })
}

fn percent_off(text: &str) -> Option<String> {
    PERCENT_OFF.captures_iter(text).find_map(|caps| {
        let raw = caps.get(1).or_else(|| caps.get(2))?;
        percent_value(raw.as_str().parse().ok()?)
    })
}

/// `8.5折` and `85折` both mean paying 85%, i.e. 15% off.
fn zhe_discount(text: &str) -> Option<String> {
    ZHE.captures_iter(text).find_map(|caps| {
        let n: f64 = caps[1].parse().ok()?;
        let off = if n > 0.0 && n <= 10.0 {
            100.0 - n * 10.0
        } else if n > 10.0 && n < 100.0 {
            100.0 - n
        } else {
            return None;
        };
        percent_value(off)
    })
}

fn threshold_reduction(text: &str) -> Option<String> {
    MAN_JIAN
        .captures(text)
        .or_else(|| SPEND_GET.captures(text))
        .map(|caps| format!("满{}减{}", &caps[1], &caps[2]))
}

pub fn extract_commission(text: &str) -> Option<String> {
    COMMISSION.captures_iter(text).find_map(|caps| {
        let value: f64 = caps[1].parse().ok()?;
        if caps.get(2).is_some() {
            percent_value(value)
        } else if value > 0.0 && value < 1.0 {
            percent_value(value * 100.0)
        } else {
            percent_value(value)
        }
    })
}

fn percent_value(value: f64) -> Option<String> {
    if value > 0.0 && value <= 100.0 {
        Some(format_percent(value))
    } else {
        None
    }
}

/// Two decimals at most, trailing zeros dropped: `15%`, `12.5%`.
pub fn format_percent(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{}%", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(15.0), "15%");
        assert_eq!(format_percent(12.5), "12.5%");
        assert_eq!(format_percent(15.000000000000002), "15%");
        assert_eq!(format_percent(33.333), "33.33%");
    }

    #[test]
    fn test_labeled_discount() {
        assert_eq!(extract_discount("折扣：8.5折").as_deref(), Some("15%"));
        assert_eq!(extract_discount("优惠：满300减50").as_deref(), Some("满300减50"));
        assert_eq!(extract_discount("Discount: 20%").as_deref(), Some("20%"));
        assert_eq!(extract_discount("折扣：0.85").as_deref(), Some("15%"));
    }

    #[test]
    fn test_unlabeled_cascade() {
        assert_eq!(extract_discount("Early bird 25% OFF").as_deref(), Some("25%"));
        assert_eq!(extract_discount("全场85折").as_deref(), Some("15%"));
        assert_eq!(extract_discount("连住立减10%").as_deref(), Some("10%"));
        assert_eq!(extract_discount("满 200 元减 30 元").as_deref(), Some("满200减30"));
        assert_eq!(extract_discount("Spend $300, get $50 off").as_deref(), Some("满300减50"));
        assert_eq!(extract_discount("房型：大床房"), None);
    }

    #[test]
    fn test_priority_over_position() {
        // The threshold reduction comes first in the text but percent off
        // ranks higher in the cascade.
        assert_eq!(extract_discount("满300减50，另享9折").as_deref(), Some("10%"));
        assert_eq!(extract_discount("满300减50，另享10% off").as_deref(), Some("10%"));
    }

    #[test]
    fn test_commission() {
        assert_eq!(extract_commission("佣金比例：12%").as_deref(), Some("12%"));
        assert_eq!(extract_commission("返佣 0.08").as_deref(), Some("8%"));
        assert_eq!(extract_commission("Commission rate: 15").as_deref(), Some("15%"));
        assert_eq!(extract_commission("佣金：150%"), None);
        assert_eq!(extract_commission("无佣金信息"), None);
    }
}
