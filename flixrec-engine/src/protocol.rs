use serde::{Deserialize, Serialize};

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const RECOMMEND_ERROR: i32 = -32000;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdParams {
	pub id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendParams {
	pub user_id: u32,
	pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridParams {
	pub user_id: u32,
	pub n: Option<usize>,
	pub content_weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarParams {
	pub item_id: u32,
	pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingParams {
	pub user_id: u32,
	pub item_id: u32,
	pub rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParams {
	pub user_id: u32,
	pub item_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeParams {
	pub user_id: u32,
	pub item_id: u32,
	pub liked: bool,
}

// ── Result types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
	pub changed: bool,
	pub version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
	pub version: u64,
	pub items: usize,
	pub users: usize,
	pub interactions: usize,
	pub matrix_rows: usize,
	pub matrix_cols: usize,
	pub neighbor_count: usize,
}
