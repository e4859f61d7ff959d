//! Weighted multi-signal platform classification.
//!
//! Each signature is scored independently and normalised by its own
//! theoretical maximum, so catalogs with very different evidence counts
//! still rank on the same 0..=100 scale.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::catalog::{PlatformCatalog, PlatformSignature};
use promolens_core::{clamp_confidence, ClassifierConfig, Error, PlatformMatch, Result};

struct CompiledKeyword {
    lower: String,
    whole_word: Option<Regex>,
}

struct CompiledSignature {
    keywords: Vec<CompiledKeyword>,
    domains: Vec<String>,
    ui_elements: Vec<String>,
    url: Option<Regex>,
}

/// Scores text against a platform catalog.
pub struct PlatformClassifier {
    catalog: Arc<PlatformCatalog>,
    weights: ClassifierConfig,
    compiled: Vec<CompiledSignature>,
}

impl PlatformClassifier {
    pub fn new(catalog: Arc<PlatformCatalog>, weights: ClassifierConfig) -> Result<Self> {
        let compiled = catalog
            .iter()
            .map(compile_signature)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            catalog,
            weights,
            compiled,
        })
    }

    pub fn catalog(&self) -> &Arc<PlatformCatalog> {
        &self.catalog
    }

    /// Best platform for `text`, or the unknown sentinel when no signature
    /// reaches the minimum confidence.
    pub fn classify(&self, text: &str) -> PlatformMatch {
        match self.rank(text).into_iter().next() {
            Some(best) if best.confidence >= self.weights.min_confidence && best.confidence > 0.0 => {
                debug!("Classified as {} ({:.1}%)", best.code, best.confidence);
                best
            }
            Some(best) => {
                debug!(
                    "Best candidate {} at {:.1}% is below threshold, reporting unknown",
                    best.code, best.confidence
                );
                PlatformMatch::unknown()
            }
            None => PlatformMatch::unknown(),
        }
    }

    /// Every signature's confidence, highest first. Ties keep catalog order.
    pub fn rank(&self, text: &str) -> Vec<PlatformMatch> {
        let lower = text.to_lowercase();
        let mut matches: Vec<PlatformMatch> = self
            .catalog
            .iter()
            .zip(&self.compiled)
            .map(|(sig, compiled)| PlatformMatch {
                name: sig.name.clone(),
                code: sig.code.clone(),
                confidence: self.confidence(sig, compiled, text, &lower),
            })
            .collect();
        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        matches
    }

    fn confidence(
        &self,
        sig: &PlatformSignature,
        compiled: &CompiledSignature,
        text: &str,
        lower: &str,
    ) -> f64 {
        let w = &self.weights;
        let max = w.whole_word_weight * sig.keywords.len() as f64
            + w.domain_weight * sig.domains.len() as f64
            + w.ui_element_weight * sig.ui_elements.len() as f64;
        if max <= 0.0 {
            return 0.0;
        }

        let mut score = 0.0;
        for kw in &compiled.keywords {
            if kw.lower.is_empty() {
                continue;
            }
            if kw.whole_word.as_ref().is_some_and(|re| re.is_match(text)) {
                score += w.whole_word_weight;
            } else if lower.contains(&kw.lower) {
                score += w.substring_weight;
            }
        }
        for domain in &compiled.domains {
            if !domain.is_empty() && lower.contains(domain.as_str()) {
                score += w.domain_weight;
            }
        }
        for ui in &compiled.ui_elements {
            if !ui.is_empty() && lower.contains(ui.as_str()) {
                score += w.ui_element_weight;
            }
        }
        if compiled.url.as_ref().is_some_and(|re| re.is_match(text)) {
            score += w.url_bonus;
        }

        clamp_confidence(score / max * 100.0)
    }
}

fn compile_signature(sig: &PlatformSignature) -> Result<CompiledSignature> {
    let keywords = sig
        .keywords
        .iter()
        .map(|kw| {
            Ok(CompiledKeyword {
                lower: kw.trim().to_lowercase(),
                whole_word: whole_word_pattern(kw.trim())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let domains: Vec<String> = sig
        .domains
        .iter()
        .map(|d| d.trim().to_lowercase())
        .collect();

    let url = if domains.iter().any(|d| !d.is_empty()) {
        let alternatives = domains
            .iter()
            .filter(|d| !d.is_empty())
            .map(|d| regex::escape(d))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)(?:https?://|www\.|://)[a-z0-9.-]*(?:{})", alternatives);
        Some(compile(&pattern)?)
    } else {
        None
    };

    Ok(CompiledSignature {
        keywords,
        domains,
        ui_elements: sig
            .ui_elements
            .iter()
            .map(|u| u.trim().to_lowercase())
            .collect(),
        url,
    })
}

/// Word boundaries are only asserted on sides where the keyword itself
/// starts or ends with a word character.
fn whole_word_pattern(keyword: &str) -> Result<Option<Regex>> {
    let (Some(first), Some(last)) = (keyword.chars().next(), keyword.chars().last()) else {
        return Ok(None);
    };
    let lead = if first.is_alphanumeric() { r"\b" } else { "" };
    let trail = if last.is_alphanumeric() { r"\b" } else { "" };
    let pattern = format!("(?i){}{}{}", lead, regex::escape(keyword), trail);
    compile(&pattern).map(Some)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("invalid catalog pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PlatformClassifier {
        PlatformClassifier::new(
            Arc::new(PlatformCatalog::builtin()),
            ClassifierConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_no_evidence_is_unknown() {
        let result = classifier().classify("今日天气晴朗，适合出行\nroom 302 cleaned");
        assert_eq!(result, PlatformMatch::unknown());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_url_bonus_strictly_higher() {
        let c = classifier();
        let plain = c.classify("携程 ctrip.com 房型管理");
        let with_url = c.classify("携程 https://ctrip.com 房型管理");
        assert_eq!(plain.code, "ctrip");
        assert_eq!(with_url.code, "ctrip");
        assert!(with_url.confidence > plain.confidence);
    }

    #[test]
    fn test_www_fragment_counts_as_url() {
        let c = classifier();
        let plain = c.classify("美团 meituan.com");
        let www = c.classify("美团 www.meituan.com");
        assert!(www.confidence > plain.confidence);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let text = "携程 eBooking ctrip\nhttps://ebooking.ctrip.com/promotion\n携程商家 房型促销 携程专享";
        let result = classifier().classify(text);
        assert_eq!(result.code, "ctrip");
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_whole_word_beats_substring() {
        let c = classifier();
        // "携程" standing alone scores 2 out of 16.5, glued to other Han
        // characters it only scores 1.
        let whole = c.classify("携程 商家后台");
        assert_eq!(whole.code, "ctrip");
        assert!((whole.confidence - 2.0 / 16.5 * 100.0).abs() < 1e-9);

        let ranked = c.rank("携程酒店后台");
        let ctrip = ranked.iter().find(|m| m.code == "ctrip").unwrap();
        assert!((ctrip.confidence - 1.0 / 16.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_below_threshold_is_unknown() {
        let catalog = PlatformCatalog::from_json_str(
            r#"{"platforms": [{"name": "Big", "code": "big",
                "keywords": ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"],
                "domains": ["big.example.com", "portal.big.example.com"]}]}"#,
        )
        .unwrap();
        let c = PlatformClassifier::new(Arc::new(catalog), ClassifierConfig::default()).unwrap();
        // 1 substring hit out of 18 -> 5.6%
        let result = c.classify("alphabet soup");
        assert!(!result.is_known());
    }

    #[test]
    fn test_case_insensitive_english() {
        let result = classifier().classify("BOOKING.COM Extranet - Promotions");
        assert_eq!(result.code, "booking");
    }

    #[test]
    fn test_configurable_threshold() {
        let weights = ClassifierConfig {
            min_confidence: 50.0,
            ..Default::default()
        };
        let c = PlatformClassifier::new(Arc::new(PlatformCatalog::builtin()), weights).unwrap();
        assert!(!c.classify("携程 商家后台").is_known());
    }

    #[test]
    fn test_rank_orders_by_confidence() {
        let ranked = classifier().rank("飞猪 fliggy 千牛 美团");
        assert_eq!(ranked[0].code, "fliggy");
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
