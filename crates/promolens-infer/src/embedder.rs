//! Embedding backend trait and the code-point bucket fallback.

use ndarray::Array1;

use promolens_core::Result;

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Embed one text. Implementations return L2-normalised vectors of
    /// exactly `dimension()` components.
    fn embed(&self, text: &str) -> Result<Array1<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Array1<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Deterministic fallback: every character adds 1.0 to bucket
/// `codepoint % dimension`, then the vector is L2-normalised.
///
/// Carries no semantics beyond character overlap, but never fails and
/// always matches the index dimension.
pub struct BucketEmbedder {
    dim: usize,
}

impl BucketEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn vectorize(&self, text: &str) -> Array1<f32> {
        let mut v = Array1::<f32>::zeros(self.dim);
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            v[c as usize % self.dim] += 1.0;
        }
        l2_normalize(v)
    }
}

impl EmbedderBackend for BucketEmbedder {
    fn embed(&self, text: &str) -> Result<Array1<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "bucket"
    }
}

/// Scale to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_dimension_and_norm() {
        let e = BucketEmbedder::new(256);
        let v = e.vectorize("携程暑期特惠 summer deal");
        assert_eq!(v.len(), 256);
        assert!((v.dot(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bucket_is_deterministic() {
        let e = BucketEmbedder::new(384);
        assert_eq!(e.vectorize("满300减50"), e.vectorize("满300减50"));
        assert_ne!(e.vectorize("满300减50"), e.vectorize("8.5折"));
    }

    #[test]
    fn test_bucket_modulo() {
        let e = BucketEmbedder::new(4);
        // 'a' = 97 -> bucket 1, 'e' = 101 -> bucket 1
        let v = e.vectorize("ae");
        assert_eq!(v[1], 1.0);
        assert_eq!(v.sum(), 1.0);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = BucketEmbedder::new(8).vectorize("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
