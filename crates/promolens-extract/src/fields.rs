//! Heuristic field extraction over recognized text.
//!
//! Every field runs its own ordered cascade, from labelled patterns down
//! to generic line heuristics. The first candidate in cascade order wins,
//! regardless of where it sits in the text.

mod amounts;
mod dates;
mod status;
mod tags;

pub use amounts::{extract_commission, extract_discount, format_percent};
pub use dates::{extract_dates, format_date, normalize_date, DateSpan};
pub use status::{infer_status, match_status_keyword};
pub use tags::classify_tag;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use promolens_core::ExtractedFields;

const MAX_NAME_CHARS: usize = 60;
const MIN_NAME_CHARS: usize = 4;
const MIN_DESCRIPTION_CHARS: usize = 20;

static NAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:活动名称|活动标题|促销名称|活动主题|activity\s*name|promotion\s*name|campaign(?:\s*name)?)\s*[:：]\s*([^\n]+)",
    )
    .unwrap()
});

static NAME_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)活动|促销|特惠|优惠|特价|秒杀|\bsale\b|\bpromotion\b|\bdeal\b|\boffer\b")
        .unwrap()
});

static DESCRIPTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:活动描述|活动说明|活动内容|活动规则|活动详情|description|details|rules)\s*[:：]\s*([^\n]+)",
    )
    .unwrap()
});

static PLATFORM_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:所属平台|平台|渠道|\bplatform\b|\bchannel\b)\s*[:：]\s*([^\n]+)").unwrap()
});

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://|www\.|\.com\b").unwrap());

/// Lines that are only digits, punctuation and whitespace.
static NUMERIC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s.,:：/%¥￥$+\-~～()（）]*$").unwrap());

/// Build one case-insensitive alternation over literal terms. Terms that
/// start or end with a word character get word boundaries on that side, so
/// "deal" does not fire inside "dealership"; CJK terms are adjacent to other
/// Han characters and match as plain substrings.
pub(crate) fn keyword_regex(terms: &[&str]) -> Option<Regex> {
    let alternatives = terms
        .iter()
        .map(|term| {
            let ascii_word = |c: char| c.is_ascii_alphanumeric();
            let lead = if term.starts_with(ascii_word) { r"\b" } else { "" };
            let trail = if term.ends_with(ascii_word) { r"\b" } else { "" };
            format!("{}{}{}", lead, regex::escape(term), trail)
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{})", alternatives)).ok()
}

/// Stateless field extractor. Status inference needs a reference day;
/// `extract` uses the local calendar date, `extract_at` takes it explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        self.extract_at(text, chrono::Local::now().date_naive())
    }

    pub fn extract_at(&self, text: &str, today: NaiveDate) -> ExtractedFields {
        let activity_name = extract_name(text);
        let description = extract_description(text, activity_name.as_deref());
        let span = extract_dates(text);

        let status = match match_status_keyword(text) {
            Some(status) => status,
            None => {
                let inferred = infer_status(span.start, span.end, today);
                debug!("No status keyword, inferred {} from dates", inferred);
                inferred
            }
        };

        let fields = ExtractedFields {
            activity_name,
            description,
            start_date: span.start,
            end_date: span.end,
            discount: extract_discount(text),
            commission_rate: extract_commission(text),
            status: Some(status),
            tag: Some(classify_tag(text)),
            platform: extract_platform(text),
        };

        if fields.activity_name.is_none() {
            debug!("No activity name found");
        }
        if span.is_empty() {
            debug!("No activity dates found");
        }
        fields
    }
}

/// Labelled name, then a line mentioning a promotion keyword, then the
/// first plausible title line.
pub fn extract_name(text: &str) -> Option<String> {
    if let Some(name) = NAME_LABEL
        .captures_iter(text)
        .find_map(|caps| clean_value(&caps[1]))
    {
        return Some(truncate_chars(&name, MAX_NAME_CHARS));
    }

    let candidates: Vec<&str> = text.lines().map(str::trim).collect();

    if let Some(line) = candidates.iter().find(|line| {
        NAME_KEYWORD.is_match(line)
            && !has_colon(line)
            && (MIN_NAME_CHARS..=40).contains(&line.chars().count())
            && !URL.is_match(line)
            && !dates::contains_date(line)
    }) {
        return Some(line.to_string());
    }

    candidates
        .iter()
        .find(|line| is_title_like(line))
        .map(|line| truncate_chars(line, MAX_NAME_CHARS))
}

pub fn extract_description(text: &str, name: Option<&str>) -> Option<String> {
    if let Some(desc) = DESCRIPTION_LABEL
        .captures_iter(text)
        .find_map(|caps| clean_value(&caps[1]))
    {
        return Some(desc);
    }

    text.lines()
        .map(str::trim)
        .find(|line| {
            line.chars().count() >= MIN_DESCRIPTION_CHARS
                && !has_colon(line)
                && name.map_or(true, |n| !line.contains(n))
                && !URL.is_match(line)
                && !dates::contains_date(line)
        })
        .map(str::to_string)
}

pub fn extract_platform(text: &str) -> Option<String> {
    PLATFORM_LABEL
        .captures_iter(text)
        .find_map(|caps| clean_value(&caps[1]))
        .map(|v| truncate_chars(&v, 40))
}

fn is_title_like(line: &str) -> bool {
    let len = line.chars().count();
    len >= MIN_NAME_CHARS
        && !has_colon(line)
        && !NUMERIC_LINE.is_match(line)
        && line.chars().filter(|c| c.is_alphabetic()).count() >= 2
        && !URL.is_match(line)
        && !dates::contains_date(line)
}

fn has_colon(line: &str) -> bool {
    line.contains(':') || line.contains('：')
}

/// Trim a labelled value and cut it at the first wide gap, which in
/// screenshots usually separates neighbouring UI columns.
fn clean_value(raw: &str) -> Option<String> {
    let value = raw.split("  ").next().unwrap_or(raw).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
