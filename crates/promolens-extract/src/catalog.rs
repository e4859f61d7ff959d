//! Platform signature catalog.
//!
//! A catalog is immutable once built. Updating it means building a new
//! catalog and swapping it in wherever it is shared.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use promolens_core::{Error, Result, UNKNOWN_PLATFORM};

/// Textual evidence that distinguishes one merchant portal from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSignature {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub ui_elements: Vec<String>,
}

impl PlatformSignature {
    fn new(name: &str, code: &str, keywords: &[&str], domains: &[&str], ui: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            domains: domains.iter().map(|s| s.to_string()).collect(),
            ui_elements: ui.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn evidence_count(&self) -> usize {
        self.keywords.len() + self.domains.len() + self.ui_elements.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformCatalog {
    pub platforms: Vec<PlatformSignature>,
}

impl PlatformCatalog {
    /// Build a catalog, rejecting empty, duplicate or evidence-free entries.
    pub fn new(platforms: Vec<PlatformSignature>) -> Result<Self> {
        let catalog = Self { platforms };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Hotel and travel merchant portals supported out of the box.
    pub fn builtin() -> Self {
        Self {
            platforms: vec![
                PlatformSignature::new(
                    "携程",
                    "ctrip",
                    &["携程", "ctrip", "ebooking"],
                    &["ebooking.ctrip.com", "ctrip.com"],
                    &["携程商家", "房型促销", "携程专享"],
                ),
                PlatformSignature::new(
                    "美团",
                    "meituan",
                    &["美团", "meituan", "美团酒店"],
                    &["eb.meituan.com", "meituan.com"],
                    &["美团商家", "商家中心", "门店管理"],
                ),
                PlatformSignature::new(
                    "飞猪",
                    "fliggy",
                    &["飞猪", "fliggy", "阿里旅行"],
                    &["hotel.fliggy.com", "fliggy.com"],
                    &["飞猪商家", "千牛", "商家工作台"],
                ),
                PlatformSignature::new(
                    "去哪儿",
                    "qunar",
                    &["去哪儿", "qunar", "去哪儿网"],
                    &["hota.qunar.com", "qunar.com"],
                    &["去哪儿商家", "酒店后台"],
                ),
                PlatformSignature::new(
                    "同程艺龙",
                    "tongcheng",
                    &["同程", "艺龙", "elong", "tongcheng"],
                    &["ebk.elong.com", "elong.com"],
                    &["同程商家", "艺龙商家"],
                ),
                PlatformSignature::new(
                    "抖音",
                    "douyin",
                    &["抖音", "douyin", "抖音来客"],
                    &["life.douyin.com", "douyin.com"],
                    &["团购套餐", "达人带货", "来客"],
                ),
                PlatformSignature::new(
                    "Booking.com",
                    "booking",
                    &["booking", "extranet"],
                    &["admin.booking.com", "booking.com"],
                    &["Genius", "Rates & Availability", "Promotions"],
                ),
                PlatformSignature::new(
                    "Expedia",
                    "expedia",
                    &["expedia", "partner central"],
                    &["expediapartnercentral.com", "expedia.com"],
                    &["Expedia Partner", "Member Only Deal", "Accelerator"],
                ),
            ],
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let catalog: PlatformCatalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)
            .map_err(|e| Error::Config(format!("catalog {}: {}", path.display(), e)))?;
        info!(
            "Loaded platform catalog from {} ({} platforms)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        let mut codes = HashSet::new();
        for sig in &self.platforms {
            if sig.name.trim().is_empty() || sig.code.trim().is_empty() {
                return Err(Error::Config("platform name and code must be non-empty".into()));
            }
            if sig.code == UNKNOWN_PLATFORM {
                return Err(Error::Config(format!(
                    "platform code '{}' is reserved",
                    UNKNOWN_PLATFORM
                )));
            }
            if !codes.insert(sig.code.as_str()) {
                return Err(Error::Config(format!("duplicate platform code '{}'", sig.code)));
            }
            if sig.evidence_count() == 0 {
                return Err(Error::Config(format!(
                    "platform '{}' has no keywords, domains or UI elements",
                    sig.code
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&PlatformSignature> {
        self.platforms.iter().find(|p| p.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformSignature> {
        self.platforms.iter()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
