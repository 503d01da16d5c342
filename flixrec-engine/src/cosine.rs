// ---------------------------------------------------------------------------
// Cosine similarity primitive
// ---------------------------------------------------------------------------
//
// Pairwise cosine similarity over rows of numeric features. A zero-norm row
// is divided by a norm of 1 instead, so it scores 0.0 against everything,
// itself included.
// ---------------------------------------------------------------------------

use crate::matrix::Matrix;

/// Compute cosine similarity between two vectors.
/// Returns 0.0 for zero-magnitude vectors or dimension mismatches.
/// Result clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
	if a.len() != b.len() {
		return 0.0;
	}
	cosine_similarity_with_magnitude(a, b, compute_magnitude(a), compute_magnitude(b))
}

/// Compute the magnitude (L2 norm) of a vector.
pub fn compute_magnitude(v: &[f64]) -> f64 {
	v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Compute cosine similarity using pre-computed magnitudes.
/// A zero magnitude is replaced by 1.
pub fn cosine_similarity_with_magnitude(a: &[f64], b: &[f64], mag_a: f64, mag_b: f64) -> f64 {
	if a.len() != b.len() {
		return 0.0;
	}

	let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let denom = norm_or_one(mag_a) * norm_or_one(mag_b);

	let result = dot / denom;
	if !result.is_finite() {
		return 0.0;
	}
	result.clamp(-1.0, 1.0)
}

fn norm_or_one(mag: f64) -> f64 {
	if mag == 0.0 { 1.0 } else { mag }
}

/// Pairwise cosine similarity between the rows of `x` and the rows of `y`.
///
/// The result has `x.len()` rows and `y.len()` columns. When `y` is `None`
/// every row of `x` is compared against every row of `x`; that matrix is
/// exactly symmetric, with 1.0 on the diagonal for non-zero rows and 0.0 for
/// all-zero rows.
pub fn cosine_similarity_matrix<R: AsRef<[f64]>>(x: &[R], y: Option<&[R]>) -> Matrix {
	let x_mags: Vec<f64> = x.iter().map(|r| compute_magnitude(r.as_ref())).collect();

	let Some(y) = y else {
		let n = x.len();
		let mut out = Matrix::zeros(n, n);
		for i in 0..n {
			out.set(i, i, if x_mags[i] == 0.0 { 0.0 } else { 1.0 });
			for j in (i + 1)..n {
				let sim = cosine_similarity_with_magnitude(
					x[i].as_ref(),
					x[j].as_ref(),
					x_mags[i],
					x_mags[j],
				);
				out.set(i, j, sim);
				out.set(j, i, sim);
			}
		}
		return out;
	};

	let y_mags: Vec<f64> = y.iter().map(|r| compute_magnitude(r.as_ref())).collect();
	let mut out = Matrix::zeros(x.len(), y.len());
	for (i, a) in x.iter().enumerate() {
		for (j, b) in y.iter().enumerate() {
			out.set(
				i,
				j,
				cosine_similarity_with_magnitude(a.as_ref(), b.as_ref(), x_mags[i], y_mags[j]),
			);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_vectors() {
		let v = vec![1.0, 2.0, 3.0];
		let sim = cosine_similarity(&v, &v);
		assert!((sim - 1.0).abs() < 1e-10);
	}

	#[test]
	fn orthogonal_vectors() {
		let a = vec![1.0, 0.0];
		let b = vec![0.0, 1.0];
		assert!(cosine_similarity(&a, &b).abs() < 1e-10);
	}

	#[test]
	fn opposite_vectors() {
		let a = vec![1.0, 0.0];
		let b = vec![-1.0, 0.0];
		assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-10);
	}

	#[test]
	fn empty_vectors() {
		assert_eq!(cosine_similarity(&[], &[]), 0.0);
	}

	#[test]
	fn mismatched_lengths() {
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
	}

	#[test]
	fn zero_magnitude() {
		let a = vec![0.0, 0.0];
		let b = vec![1.0, 2.0];
		assert_eq!(cosine_similarity(&a, &b), 0.0);
		assert_eq!(cosine_similarity(&a, &a), 0.0);
	}

	#[test]
	fn magnitude_basic() {
		assert!((compute_magnitude(&[3.0, 4.0]) - 5.0).abs() < 1e-10);
	}

	#[test]
	fn self_similarity_is_symmetric_with_unit_diagonal() {
		let rows = vec![
			vec![0.9, 0.8, 0.7, 0.5, 0.2],
			vec![0.2, 0.9, 0.6, 0.4, 0.7],
			vec![0.4, 0.3, 0.9, 0.8, 0.1],
			vec![-0.5, 0.1, 0.0, 0.3, 0.9],
		];
		let m = cosine_similarity_matrix(&rows, None);
		assert_eq!(m.rows(), 4);
		assert_eq!(m.cols(), 4);
		for i in 0..4 {
			assert_eq!(m[(i, i)], 1.0);
			for j in 0..4 {
				assert_eq!(m[(i, j)], m[(j, i)]);
				assert!((-1.0..=1.0).contains(&m[(i, j)]));
			}
		}
	}

	#[test]
	fn zero_row_scores_zero_everywhere() {
		let rows = vec![vec![1.0, 2.0], vec![0.0, 0.0], vec![2.0, 1.0]];
		let m = cosine_similarity_matrix(&rows, None);
		for j in 0..3 {
			assert_eq!(m[(1, j)], 0.0);
			assert_eq!(m[(j, 1)], 0.0);
			assert!(!m[(1, j)].is_nan());
		}
		assert_eq!(m[(0, 0)], 1.0);
	}

	#[test]
	fn cross_similarity_shape() {
		let x = vec![vec![1.0, 0.0]];
		let y = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
		let m = cosine_similarity_matrix(&x, Some(y.as_slice()));
		assert_eq!((m.rows(), m.cols()), (1, 3));
		assert!((m[(0, 0)] - 1.0).abs() < 1e-10);
		assert!(m[(0, 1)].abs() < 1e-10);
		assert!((m[(0, 2)] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-10);
	}
}
