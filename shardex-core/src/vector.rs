//! Vector math: dot product, norms, normalization, cosine similarity, distance.
//!
//! Accumulation happens in `f64` so that results for small integer-valued
//! inputs are exact (`cosine_similarity([1,1],[1,1]) == 1.0`) and so that the
//! pairwise operations are exactly symmetric.

/// Errors from vector operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VectorError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("zero vector has no direction")]
    ZeroVector,

    #[error("vector component {index} is not finite")]
    NonFinite { index: usize },

    #[error("vector is empty")]
    Empty,
}

/// Reject vectors containing NaN or infinite components.
pub fn validate_vector(v: &[f32]) -> Result<(), VectorError> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(VectorError::NonFinite { index }),
        None => Ok(()),
    }
}

fn check_pair(a: &[f32], b: &[f32]) -> Result<(), VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    validate_vector(a)?;
    validate_vector(b)
}

fn dot_f64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn norm_sq_f64(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum()
}

/// Dot product of two equal-length vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    check_pair(a, b)?;
    Ok(dot_f64(a, b) as f32)
}

/// Euclidean (L2) norm.
pub fn vector_norm(v: &[f32]) -> Result<f32, VectorError> {
    validate_vector(v)?;
    Ok(norm_sq_f64(v).sqrt() as f32)
}

/// Scale `v` to unit length.
pub fn normalize_vector(v: &[f32]) -> Result<Vec<f32>, VectorError> {
    if v.is_empty() {
        return Err(VectorError::Empty);
    }
    validate_vector(v)?;
    let norm = norm_sq_f64(v).sqrt();
    if norm == 0.0 {
        return Err(VectorError::ZeroVector);
    }
    Ok(v.iter().map(|x| (f64::from(*x) / norm) as f32).collect())
}

/// Cosine similarity in `[-1, 1]`.
///
/// Both operands must be non-empty, equal length and have non-zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    check_pair(a, b)?;
    if a.is_empty() {
        return Err(VectorError::Empty);
    }
    let na = norm_sq_f64(a);
    let nb = norm_sq_f64(b);
    if na == 0.0 || nb == 0.0 {
        return Err(VectorError::ZeroVector);
    }
    let similarity = dot_f64(a, b) / (na * nb).sqrt();
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Euclidean distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    check_pair(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum();
    Ok(sum.sqrt() as f32)
}
