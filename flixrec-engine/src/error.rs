use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
	#[error("Empty catalog: at least one item is required")]
	EmptyCatalog,
	#[error("Feature length mismatch: item {item_id} has {found} features, expected {expected}")]
	FeatureLengthMismatch {
		item_id: u32,
		expected: usize,
		found: usize,
	},
	#[error("Invalid identifier: {0}")]
	InvalidIdentifier(String),
	#[error("User not found: {0}")]
	UserNotFound(u32),
	#[error("Item not found: {0}")]
	ItemNotFound(u32),
	#[error("Invalid params: {0}")]
	InvalidParams(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl RecommendError {
	pub fn code(&self) -> &str {
		match self {
			Self::EmptyCatalog => "RECOMMEND_EMPTY_CATALOG",
			Self::FeatureLengthMismatch { .. } => "RECOMMEND_FEATURE_MISMATCH",
			Self::InvalidIdentifier(_) => "RECOMMEND_INVALID_ID",
			Self::UserNotFound(_) => "RECOMMEND_USER_NOT_FOUND",
			Self::ItemNotFound(_) => "RECOMMEND_ITEM_NOT_FOUND",
			Self::InvalidParams(_) => "RECOMMEND_INVALID_PARAMS",
			Self::Io(_) => "RECOMMEND_IO",
			Self::Serialization(_) => "RECOMMEND_SERIALIZATION",
		}
	}

	/// Whether the error leaves no usable engine behind.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::EmptyCatalog | Self::FeatureLengthMismatch { .. } | Self::InvalidIdentifier(_)
		)
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"recommendCode": self.code(),
			"message": self.to_string(),
		})
	}
}

impl From<serde_json::Error> for RecommendError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn construction_errors_are_fatal() {
		assert!(RecommendError::EmptyCatalog.is_fatal());
		assert!(RecommendError::FeatureLengthMismatch {
			item_id: 2,
			expected: 5,
			found: 4,
		}
		.is_fatal());
		assert!(!RecommendError::UserNotFound(1).is_fatal());
	}

	#[test]
	fn json_rpc_payload_carries_code() {
		let err = RecommendError::ItemNotFound(42);
		let payload = err.to_json_rpc_error();
		assert_eq!(payload["recommendCode"], "RECOMMEND_ITEM_NOT_FOUND");
		assert_eq!(payload["message"], "Item not found: 42");
	}
}
