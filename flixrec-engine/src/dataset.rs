// ---------------------------------------------------------------------------
// Dataset — JSON loading of items, users and interactions
// ---------------------------------------------------------------------------

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RecommendError;
use crate::types::{Interaction, Item, User};

const SAMPLE_JSON: &str = include_str!("../data/sample.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
	pub items: Vec<Item>,
	#[serde(default)]
	pub users: Vec<User>,
	#[serde(default)]
	pub interactions: Vec<Interaction>,
}

impl Dataset {
	pub fn from_json(json: &str) -> Result<Self, RecommendError> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RecommendError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)?;
		let dataset = Self::from_json(&raw)?;
		tracing::info!(
			path = %path.display(),
			items = dataset.items.len(),
			users = dataset.users.len(),
			interactions = dataset.interactions.len(),
			"Loaded dataset"
		);
		Ok(dataset)
	}

	/// The bundled ten-title sample catalog with five users.
	pub fn sample() -> Result<Self, RecommendError> {
		Self::from_json(SAMPLE_JSON)
	}
}
