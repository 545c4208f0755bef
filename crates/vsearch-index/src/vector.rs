//! Embedding vector helpers.

/// Scale `v` to unit L2 norm in place.
///
/// Zero vectors are left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Normalize every vector of a batch.
pub fn normalize_all(vectors: &mut [Vec<f32>]) {
    for v in vectors.iter_mut() {
        l2_normalize(v);
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
