//! Date recognition: hyphen, dot, slash and 年月日 notations.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// One date in any supported notation, optionally followed by a time of day.
const DATE: &str = r"\d{4}\s*[-./年]\s*\d{1,2}\s*[-./月]\s*\d{1,2}\s*日?(?:\s*\d{1,2}:\d{2}(?::\d{2})?)?";

static DATE_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\s*[-./年]\s*(\d{1,2})\s*[-./月]\s*(\d{1,2})").unwrap()
});

static ANY_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(DATE).unwrap());

static START_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:开始时间|开始日期|起始时间|起始日期|生效时间|活动开始|start\s*(?:date|time)|\bstarts?\b|\bfrom\b)\s*[:：]?\s*({})",
        DATE
    ))
    .unwrap()
});

static END_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:结束时间|结束日期|截止时间|截止日期|失效时间|活动结束|end\s*(?:date|time)|\bends?\b|\buntil\b)\s*[:：]?\s*({})",
        DATE
    ))
    .unwrap()
});

static RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)({})\s*(?:至|到|~|～|—|–|-|\bto\b|\buntil\b)\s*({})",
        DATE, DATE
    ))
    .unwrap()
});

/// Start and end dates found in a text. Either side may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateSpan {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateSpan {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Parse one date fragment. Fragments that do not name a real calendar
/// day (e.g. 2024-02-30) yield `None`.
pub fn normalize_date(fragment: &str) -> Option<NaiveDate> {
    let caps = DATE_PARTS.captures(fragment)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Canonical `YYYY-MM-DD` rendering.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Labels win over range expressions, which win over bare positional dates.
pub fn extract_dates(text: &str) -> DateSpan {
    let labeled_start = first_labeled(&START_LABEL, text);
    let labeled_end = first_labeled(&END_LABEL, text);

    let range = RANGE.captures(text).map(|caps| DateSpan {
        start: normalize_date(&caps[1]),
        end: normalize_date(&caps[2]),
    });

    let span = DateSpan {
        start: labeled_start.or(range.and_then(|r| r.start)),
        end: labeled_end.or(range.and_then(|r| r.end)),
    };
    if !span.is_empty() || range.is_some() {
        return span;
    }

    let mut positional = ANY_DATE.find_iter(text).map(|m| normalize_date(m.as_str()));
    DateSpan {
        start: positional.next().flatten(),
        end: positional.next().flatten(),
    }
}

fn first_labeled(re: &Regex, text: &str) -> Option<NaiveDate> {
    re.captures_iter(text)
        .find_map(|caps| normalize_date(&caps[1]))
}

/// True when the line carries a date in any notation.
pub fn contains_date(line: &str) -> bool {
    ANY_DATE.is_match(line)
}
