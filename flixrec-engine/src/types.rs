use serde::{Deserialize, Serialize};

/// A catalog entry. Only `categories`, `quality` and `features` feed the
/// engine; the remaining fields are display metadata passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
	pub id: u32,
	#[serde(default)]
	pub title: String,
	#[serde(alias = "genres")]
	pub categories: Vec<String>,
	#[serde(alias = "rating")]
	pub quality: f64,
	pub features: Vec<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub year: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub director: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub duration: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
}

impl Item {
	/// True when at least one tag is shared with `categories`.
	pub fn shares_category(&self, categories: &[String]) -> bool {
		self.categories.iter().any(|c| categories.contains(c))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
	#[serde(alias = "genres")]
	pub categories: Vec<String>,
	#[serde(alias = "minRating")]
	pub min_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: u32,
	#[serde(default)]
	pub username: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub preferences: Preferences,
	#[serde(default, alias = "viewedItems")]
	pub viewed: Vec<u32>,
	#[serde(default, alias = "likedItems")]
	pub liked: Vec<u32>,
}

impl User {
	pub fn has_viewed(&self, item_id: u32) -> bool {
		self.viewed.contains(&item_id)
	}

	pub fn has_liked(&self, item_id: u32) -> bool {
		self.liked.contains(&item_id)
	}
}

/// A single user-item engagement. Zero strength is indistinguishable from
/// "no interaction" once it lands in the interaction matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
	pub user_id: u32,
	pub item_id: u32,
	#[serde(alias = "rating")]
	pub strength: f64,
}

impl Interaction {
	pub fn new(user_id: u32, item_id: u32, strength: f64) -> Self {
		Self {
			user_id,
			item_id,
			strength,
		}
	}
}
