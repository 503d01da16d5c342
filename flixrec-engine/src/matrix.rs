// ---------------------------------------------------------------------------
// Dense matrices — interaction matrix and item similarity matrix
// ---------------------------------------------------------------------------
//
// The interaction matrix is sized by the largest user id and item id, not by
// catalog cardinality: cell (u, i) belongs to user id u + 1 and item id
// i + 1. The item similarity matrix is positional: row/column k is the k-th
// item of the catalog slice it was built from.
// ---------------------------------------------------------------------------

use std::ops::Index;

use crate::cosine::cosine_similarity_matrix;
use crate::error::RecommendError;
use crate::types::{Interaction, Item, User};

/// Row-major dense `f64` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
	rows: usize,
	cols: usize,
	data: Vec<f64>,
}

impl Matrix {
	pub fn zeros(rows: usize, cols: usize) -> Self {
		Self {
			rows,
			cols,
			data: vec![0.0; rows * cols],
		}
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn cols(&self) -> usize {
		self.cols
	}

	pub fn get(&self, row: usize, col: usize) -> Option<f64> {
		if row < self.rows && col < self.cols {
			Some(self.data[row * self.cols + col])
		} else {
			None
		}
	}

	/// Panics when out of bounds, like slice indexing.
	pub fn set(&mut self, row: usize, col: usize, value: f64) {
		assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
		self.data[row * self.cols + col] = value;
	}

	pub fn row(&self, row: usize) -> &[f64] {
		&self.data[row * self.cols..(row + 1) * self.cols]
	}

	pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
		(0..self.rows).map(move |r| self.row(r))
	}

	/// Number of non-zero cells.
	pub fn count_nonzero(&self) -> usize {
		self.data.iter().filter(|v| **v != 0.0).count()
	}
}

impl Index<(usize, usize)> for Matrix {
	type Output = f64;

	fn index(&self, (row, col): (usize, usize)) -> &f64 {
		assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
		&self.data[row * self.cols + col]
	}
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the dense user x item matrix of interaction strengths.
///
/// Dimensions are (max user id, max item id). Events are applied in input
/// order, so the last event for a duplicated (user, item) pair wins. Events
/// that fall outside the matrix are skipped.
pub fn build_interaction_matrix(
	items: &[Item],
	users: &[User],
	interactions: &[Interaction],
) -> Matrix {
	let max_user = users.iter().map(|u| u.id).max().unwrap_or(0) as usize;
	let max_item = items.iter().map(|i| i.id).max().unwrap_or(0) as usize;
	let mut matrix = Matrix::zeros(max_user, max_item);

	for event in interactions {
		let (u, i) = (event.user_id as usize, event.item_id as usize);
		if u == 0 || i == 0 || u > max_user || i > max_item {
			tracing::warn!(
				user_id = event.user_id,
				item_id = event.item_id,
				"Interaction outside matrix bounds, skipping"
			);
			continue;
		}
		matrix.set(u - 1, i - 1, event.strength);
	}

	tracing::debug!(
		users = max_user,
		items = max_item,
		events = interactions.len(),
		"Built interaction matrix"
	);
	matrix
}

/// Build the item x item cosine similarity matrix from feature vectors.
///
/// Every item must carry a feature vector of the same length as the first
/// item's; the catalog must not be empty.
pub fn build_item_similarity_matrix(items: &[Item]) -> Result<Matrix, RecommendError> {
	let first = items.first().ok_or(RecommendError::EmptyCatalog)?;
	let expected = first.features.len();

	if let Some(bad) = items.iter().find(|i| i.features.len() != expected) {
		return Err(RecommendError::FeatureLengthMismatch {
			item_id: bad.id,
			expected,
			found: bad.features.len(),
		});
	}

	let features: Vec<&[f64]> = items.iter().map(|i| i.features.as_slice()).collect();
	let matrix = cosine_similarity_matrix(&features, None);

	tracing::debug!(items = items.len(), dims = expected, "Built item similarity matrix");
	Ok(matrix)
}
