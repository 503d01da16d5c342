// ---------------------------------------------------------------------------
// Catalog — mutable source data and the published engine snapshot
// ---------------------------------------------------------------------------
//
// `Catalog` is the single writer: it owns items, users and interactions and
// applies rating/view/like events to them. Engines are never patched; after
// a mutation a complete new engine is built from the catalog and published
// through `EngineHandle`, which readers clone an `Arc` out of per call.
// ---------------------------------------------------------------------------

use std::sync::{Arc, RwLock};

use crate::dataset::Dataset;
use crate::error::RecommendError;
use crate::recommendation::{EngineConfig, RecommendationEngine};
use crate::types::{Interaction, Item, User};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
	/// A rating at or above this marks the item as liked.
	pub like_threshold: f64,
	pub min_rating: f64,
	pub max_rating: f64,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			like_threshold: 4.0,
			min_rating: 0.0,
			max_rating: 5.0,
		}
	}
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct Catalog {
	items: Vec<Item>,
	users: Vec<User>,
	interactions: Vec<Interaction>,
	config: CatalogConfig,
}

impl Catalog {
	pub fn new(dataset: Dataset, config: CatalogConfig) -> Self {
		Self {
			items: dataset.items,
			users: dataset.users,
			interactions: dataset.interactions,
			config,
		}
	}

	pub fn items(&self) -> &[Item] {
		&self.items
	}

	pub fn users(&self) -> &[User] {
		&self.users
	}

	pub fn interactions(&self) -> &[Interaction] {
		&self.interactions
	}

	pub fn item(&self, id: u32) -> Option<&Item> {
		self.items.iter().find(|i| i.id == id)
	}

	pub fn user(&self, id: u32) -> Option<&User> {
		self.users.iter().find(|u| u.id == id)
	}

	fn user_mut(&mut self, id: u32) -> Result<&mut User, RecommendError> {
		self.users
			.iter_mut()
			.find(|u| u.id == id)
			.ok_or(RecommendError::UserNotFound(id))
	}

	fn require_item(&self, id: u32) -> Result<(), RecommendError> {
		match self.item(id) {
			Some(_) => Ok(()),
			None => Err(RecommendError::ItemNotFound(id)),
		}
	}

	// -- Mutations -----------------------------------------------------------

	/// Record (or overwrite) a user's rating of an item.
	///
	/// The item joins the user's viewed list, and joins or leaves the liked
	/// list depending on `like_threshold`. Returns `true` when an earlier
	/// rating for the same pair was replaced.
	pub fn record_rating(
		&mut self,
		user_id: u32,
		item_id: u32,
		rating: f64,
	) -> Result<bool, RecommendError> {
		let CatalogConfig {
			like_threshold,
			min_rating,
			max_rating,
		} = self.config;
		if !(min_rating..=max_rating).contains(&rating) {
			return Err(RecommendError::InvalidParams(format!(
				"rating must be between {min_rating} and {max_rating}, got {rating}"
			)));
		}
		self.require_item(item_id)?;
		let user = self.user_mut(user_id)?;

		if !user.viewed.contains(&item_id) {
			user.viewed.push(item_id);
		}
		if rating >= like_threshold {
			if !user.liked.contains(&item_id) {
				user.liked.push(item_id);
			}
		} else {
			user.liked.retain(|&id| id != item_id);
		}

		let existing = self
			.interactions
			.iter_mut()
			.find(|e| e.user_id == user_id && e.item_id == item_id);
		let replaced = match existing {
			Some(event) => {
				event.strength = rating;
				true
			}
			None => {
				self.interactions.push(Interaction::new(user_id, item_id, rating));
				false
			}
		};

		tracing::debug!(user_id, item_id, rating, replaced, "Recorded rating");
		Ok(replaced)
	}

	/// Mark an item as viewed. Returns `false` if it already was.
	pub fn record_view(&mut self, user_id: u32, item_id: u32) -> Result<bool, RecommendError> {
		self.require_item(item_id)?;
		let user = self.user_mut(user_id)?;
		if user.viewed.contains(&item_id) {
			return Ok(false);
		}
		user.viewed.push(item_id);
		Ok(true)
	}

	/// Add or remove an item from the liked list. Returns whether the list
	/// changed.
	pub fn set_liked(
		&mut self,
		user_id: u32,
		item_id: u32,
		liked: bool,
	) -> Result<bool, RecommendError> {
		self.require_item(item_id)?;
		let user = self.user_mut(user_id)?;
		let present = user.liked.contains(&item_id);
		match (liked, present) {
			(true, false) => user.liked.push(item_id),
			(false, true) => user.liked.retain(|&id| id != item_id),
			_ => return Ok(false),
		}
		Ok(true)
	}

	/// Build a fresh engine from the current catalog state.
	pub fn build_engine(&self, config: &EngineConfig) -> Result<RecommendationEngine, RecommendError> {
		RecommendationEngine::with_config(
			self.items.clone(),
			self.users.clone(),
			&self.interactions,
			config.clone(),
		)
	}
}

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

struct Published {
	engine: Arc<RecommendationEngine>,
	version: u64,
}

/// Versioned, atomically replaced reference to the current engine.
///
/// Readers take a snapshot and keep using it for the whole call even if a
/// newer engine is published meanwhile.
pub struct EngineHandle {
	current: RwLock<Published>,
}

impl EngineHandle {
	pub fn new(engine: RecommendationEngine) -> Self {
		Self {
			current: RwLock::new(Published {
				engine: Arc::new(engine),
				version: 1,
			}),
		}
	}

	pub fn snapshot(&self) -> Arc<RecommendationEngine> {
		let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
		Arc::clone(&guard.engine)
	}

	pub fn version(&self) -> u64 {
		self.current.read().unwrap_or_else(|e| e.into_inner()).version
	}

	/// Publish a new engine, returning its version.
	pub fn replace(&self, engine: RecommendationEngine) -> u64 {
		let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
		guard.engine = Arc::new(engine);
		guard.version += 1;
		guard.version
	}

	/// Rebuild from `catalog` and publish. On failure the previous engine
	/// stays published.
	pub fn rebuild(&self, catalog: &Catalog, config: &EngineConfig) -> Result<u64, RecommendError> {
		let engine = catalog.build_engine(config)?;
		let version = self.replace(engine);
		tracing::info!(version, "Recommendation engine rebuilt");
		Ok(version)
	}
}
