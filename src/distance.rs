//! Distance Functions for Vector Similarity
//!
//! Cosine similarity over dense TF-IDF vectors, used to rank cached prompts
//! against a query prompt.
//!
//! Unlike a general-purpose vector index, the cache never treats degenerate
//! input as an error: empty vectors, mismatched lengths, and zero magnitudes
//! all resolve to a similarity of `0.0` ("no signal"), so a freshly opened
//! cache with an empty vocabulary simply never matches.
//!
//! # Example
//!
//! ```
//! use semcache::distance::cosine_similarity;
//!
//! let a = vec![1.0, 0.0, 0.0];
//! let b = vec![0.0, 1.0, 0.0];
//!
//! // Orthogonal vectors have cosine similarity of 0.0
//! assert!(cosine_similarity(&a, &b).abs() < 1e-6);
//! ```

/// Compute the dot product of two equal-length vectors
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute the L2 magnitude of a vector
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two vectors
///
/// Returns a value in `[0.0, 1.0]` for non-negative TF-IDF vectors.
/// Empty vectors, vectors of different lengths, and vectors with zero
/// magnitude all yield `0.0` rather than an error.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot = dot_product(a, b);
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
