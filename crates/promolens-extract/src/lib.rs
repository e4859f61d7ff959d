//! PromoLens Extract: platform classification and field extraction.
//!
//! Both stages are pure functions of recognized text, so they run inside
//! per-image tasks without sharing mutable state.

pub mod catalog;
pub mod classifier;
pub mod fields;

pub use catalog::{PlatformCatalog, PlatformSignature};
pub use classifier::PlatformClassifier;
pub use fields::{normalize_date, FieldExtractor};
