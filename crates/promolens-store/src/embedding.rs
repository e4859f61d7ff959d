//! Vector blob encoding and cosine similarity.

use ndarray::{Array1, ArrayView1};

use promolens_core::{Error, Result};

/// Little-endian f32 components, 4 bytes each.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::Database(format!(
            "vector blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine of the angle between `a` and `b`.
///
/// Defined as 0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a < 1e-12 || norm_b < 1e-12 {
        return 0.0;
    }
    (a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Unit-length copy, or the zero vector unchanged.
pub(crate) fn normalized(v: ArrayView1<'_, f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm < 1e-12 {
        v.to_owned()
    } else {
        &v / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0e-7, 0.0];
        let blob = encode_vector(&v);
        assert_eq!(blob.len(), 16);
        assert_eq!(decode_vector(&blob).unwrap(), v);
    }

    #[test]
    fn test_truncated_blob_rejected() {
        assert!(decode_vector(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_cosine_self_is_one() {
        let v = array![0.3f32, -2.0, 5.5, 1.0];
        assert!((cosine_similarity(v.view(), v.view()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let v = array![1.0f32, 2.0, 3.0];
        let zero = Array1::<f32>::zeros(3);
        assert_eq!(cosine_similarity(v.view(), zero.view()), 0.0);
        assert_eq!(cosine_similarity(zero.view(), zero.view()), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        let a = array![1.0f32, 0.0];
        let b = array![1.0f32, 0.0, 0.0];
        assert_eq!(cosine_similarity(a.view(), b.view()), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        let a = array![1.0f32, 0.0];
        let b = array![0.0f32, 4.0];
        assert_eq!(cosine_similarity(a.view(), b.view()), 0.0);
        let c = array![-2.0f32, 0.0];
        assert!((cosine_similarity(a.view(), c.view()) + 1.0).abs() < 1e-6);
    }
}
