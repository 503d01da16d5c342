// ---------------------------------------------------------------------------
// Recommendation Engine — content-based, collaborative and hybrid ranking
// ---------------------------------------------------------------------------
//
// Owns the catalogs plus the two matrices built from them at construction.
// Every recommendation call is a read-only pass over that state; a data
// change means building a new engine.
//
// Lookups that miss during a recommendation call (unknown user, liked item
// not in the catalog, matrix column without a catalog item) are skipped and
// never surface as errors. Ties in every ranking keep encounter order.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::cosine::cosine_similarity_matrix;
use crate::error::RecommendError;
use crate::matrix::{build_interaction_matrix, build_item_similarity_matrix, Matrix};
use crate::types::{Interaction, Item, User};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Number of nearest users consulted by collaborative filtering.
pub const DEFAULT_NEIGHBOR_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
	pub neighbor_count: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			neighbor_count: DEFAULT_NEIGHBOR_COUNT,
		}
	}
}

// ---------------------------------------------------------------------------
// Ranking helpers
// ---------------------------------------------------------------------------

/// Stable sort by score, highest first.
fn rank_descending<K>(scored: &mut [(K, f64)]) {
	scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
}

/// Linear rank decay: position 0 of `n` scores 1, position n-1 scores 1/n.
fn position_score(position: usize, n: usize) -> f64 {
	(n - position) as f64 / n as f64
}

// ---------------------------------------------------------------------------
// RecommendationEngine
// ---------------------------------------------------------------------------

pub struct RecommendationEngine {
	items: Vec<Item>,
	users: Vec<User>,
	item_index: HashMap<u32, usize>,
	user_index: HashMap<u32, usize>,
	interactions: Matrix,
	item_similarity: Matrix,
	interaction_count: usize,
	config: EngineConfig,
}

impl RecommendationEngine {
	/// Build an engine with the default configuration.
	pub fn new(
		items: Vec<Item>,
		users: Vec<User>,
		interactions: &[Interaction],
	) -> Result<Self, RecommendError> {
		Self::with_config(items, users, interactions, EngineConfig::default())
	}

	/// Build an engine, computing both matrices up front.
	///
	/// Fails on an empty item catalog, inconsistent feature vector lengths,
	/// a zero identifier, or an identifier used twice in one catalog.
	pub fn with_config(
		items: Vec<Item>,
		users: Vec<User>,
		interactions: &[Interaction],
		config: EngineConfig,
	) -> Result<Self, RecommendError> {
		if items.is_empty() {
			return Err(RecommendError::EmptyCatalog);
		}
		let item_index = index_by_id(items.iter().map(|i| i.id), "item")?;
		let user_index = index_by_id(users.iter().map(|u| u.id), "user")?;

		let item_similarity = build_item_similarity_matrix(&items)?;
		let interaction_matrix = build_interaction_matrix(&items, &users, interactions);

		Ok(Self {
			items,
			users,
			item_index,
			user_index,
			interactions: interaction_matrix,
			item_similarity,
			interaction_count: interactions.len(),
			config,
		})
	}

	// -- Accessors -----------------------------------------------------------

	pub fn item(&self, id: u32) -> Option<&Item> {
		self.item_index.get(&id).map(|&i| &self.items[i])
	}

	pub fn user(&self, id: u32) -> Option<&User> {
		self.user_index.get(&id).map(|&i| &self.users[i])
	}

	pub fn items(&self) -> &[Item] {
		&self.items
	}

	pub fn users(&self) -> &[User] {
		&self.users
	}

	pub fn interaction_matrix(&self) -> &Matrix {
		&self.interactions
	}

	pub fn item_similarity_matrix(&self) -> &Matrix {
		&self.item_similarity
	}

	/// Number of events the engine was built from, duplicates included.
	pub fn interaction_count(&self) -> usize {
		self.interaction_count
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	fn items_at(&self, ranked: impl IntoIterator<Item = usize>) -> Vec<Item> {
		ranked.into_iter().map(|i| self.items[i].clone()).collect()
	}

	// -- Content-based -------------------------------------------------------

	/// Rank unseen items matching the user's preferences by their summed
	/// similarity to the user's liked items.
	///
	/// Candidates must be unviewed, meet the user's minimum quality and share
	/// a category with the user's preferences. With no liked items in the
	/// catalog every candidate scores 0 and catalog order is kept.
	pub fn content_based(&self, user_id: u32, n: usize) -> Vec<Item> {
		if n == 0 {
			return Vec::new();
		}
		let Some(user) = self.user(user_id) else {
			return Vec::new();
		};
		let prefs = &user.preferences;

		let candidates: Vec<usize> = self
			.items
			.iter()
			.enumerate()
			.filter(|(_, item)| {
				!user.has_viewed(item.id)
					&& item.quality >= prefs.min_quality
					&& item.shares_category(&prefs.categories)
			})
			.map(|(idx, _)| idx)
			.collect();

		if candidates.is_empty() {
			return Vec::new();
		}

		let liked: Vec<usize> = user
			.liked
			.iter()
			.filter_map(|id| self.item_index.get(id).copied())
			.collect();

		let mut scored: Vec<(usize, f64)> = candidates
			.into_iter()
			.map(|c| {
				let score = liked.iter().map(|&l| self.item_similarity[(l, c)]).sum();
				(c, score)
			})
			.collect();

		rank_descending(&mut scored);
		self.items_at(scored.into_iter().take(n).map(|(idx, _)| idx))
	}

	// -- Collaborative -------------------------------------------------------

	/// Rank unseen items by the similarity-weighted average strength given to
	/// them by the user's nearest neighbours in the interaction matrix.
	///
	/// Items no neighbour interacted with are left out rather than scored 0.
	pub fn collaborative(&self, user_id: u32, n: usize) -> Vec<Item> {
		if n == 0 {
			return Vec::new();
		}
		let Some(user) = self.user(user_id) else {
			return Vec::new();
		};
		let neighbours = self.nearest_neighbours(user_id as usize - 1);
		let viewed: HashSet<u32> = user.viewed.iter().copied().collect();

		let mut predicted: Vec<(usize, f64)> = Vec::new();
		for col in 0..self.interactions.cols() {
			let item_id = col as u32 + 1;
			if viewed.contains(&item_id) {
				continue;
			}
			let Some(&item_idx) = self.item_index.get(&item_id) else {
				continue;
			};

			let mut weighted = 0.0;
			let mut weight_sum = 0.0;
			let mut covered = false;
			for &(neighbour, similarity) in &neighbours {
				let strength = self.interactions[(neighbour, col)];
				if strength != 0.0 {
					weighted += strength * similarity;
					weight_sum += similarity;
					covered = true;
				}
			}

			// A zero weight sum has no defined average.
			if covered && weight_sum != 0.0 {
				predicted.push((item_idx, weighted / weight_sum));
			}
		}

		rank_descending(&mut predicted);
		self.items_at(predicted.into_iter().take(n).map(|(idx, _)| idx))
	}

	/// Up to `neighbor_count` other matrix rows, most similar first. Rows of
	/// users absent from the catalog are all-zero and still eligible.
	fn nearest_neighbours(&self, target: usize) -> Vec<(usize, f64)> {
		let rows: Vec<&[f64]> = self.interactions.iter_rows().collect();
		let Some(target_row) = rows.get(target).copied() else {
			return Vec::new();
		};
		let similarity =
			cosine_similarity_matrix(std::slice::from_ref(&target_row), Some(rows.as_slice()));

		let mut neighbours: Vec<(usize, f64)> = (0..rows.len())
			.filter(|&u| u != target)
			.map(|u| (u, similarity[(0, u)]))
			.collect();
		rank_descending(&mut neighbours);
		neighbours.truncate(self.config.neighbor_count);

		tracing::trace!(target, neighbours = neighbours.len(), "Selected neighbours");
		neighbours
	}

	// -- Hybrid --------------------------------------------------------------

	/// Blend the content-based and collaborative top-n lists by rank position.
	///
	/// An item at position i of either list earns `weight * (n - i) / n` from
	/// that list, with `content_weight` for the content list and
	/// `1 - content_weight` for the collaborative one. Raw scores of the two
	/// methods are not used. `content_weight` is expected in [0, 1].
	pub fn hybrid(&self, user_id: u32, n: usize, content_weight: f64) -> Vec<Item> {
		if n == 0 {
			return Vec::new();
		}
		let content = self.content_based(user_id, n);
		let collaborative = self.collaborative(user_id, n);

		let mut combined: Vec<(u32, f64)> = Vec::new();
		let mut slots: HashMap<u32, usize> = HashMap::new();
		let mut blend = |list: &[Item], weight: f64| {
			for (position, item) in list.iter().enumerate() {
				let contribution = weight * position_score(position, n);
				// Zero-weight lists must not inject items at score 0.
				if contribution <= 0.0 {
					continue;
				}
				match slots.get(&item.id) {
					Some(&slot) => combined[slot].1 += contribution,
					None => {
						slots.insert(item.id, combined.len());
						combined.push((item.id, contribution));
					}
				}
			}
		};
		blend(&content, content_weight);
		blend(&collaborative, 1.0 - content_weight);

		rank_descending(&mut combined);
		combined
			.into_iter()
			.take(n)
			.filter_map(|(id, _)| self.item(id).cloned())
			.collect()
	}

	// -- Similar items -------------------------------------------------------

	/// Items sharing a category with `item_id`, most similar first.
	pub fn similar_items(&self, item_id: u32, n: usize) -> Vec<Item> {
		if n == 0 {
			return Vec::new();
		}
		let Some(&source) = self.item_index.get(&item_id) else {
			return Vec::new();
		};
		let categories = &self.items[source].categories;

		let mut scored: Vec<(usize, f64)> = self
			.items
			.iter()
			.enumerate()
			.filter(|&(idx, item)| idx != source && item.shares_category(categories))
			.map(|(idx, _)| (idx, self.item_similarity[(source, idx)]))
			.collect();

		rank_descending(&mut scored);
		self.items_at(scored.into_iter().take(n).map(|(idx, _)| idx))
	}
}

fn index_by_id(
	ids: impl Iterator<Item = u32>,
	kind: &str,
) -> Result<HashMap<u32, usize>, RecommendError> {
	let mut index = HashMap::new();
	for (pos, id) in ids.enumerate() {
		if id == 0 {
			return Err(RecommendError::InvalidIdentifier(format!("{kind} id 0")));
		}
		if index.insert(id, pos).is_some() {
			return Err(RecommendError::InvalidIdentifier(format!(
				"duplicate {kind} id {id}"
			)));
		}
	}
	Ok(index)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
