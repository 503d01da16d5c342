// ---------------------------------------------------------------------------
// RecommendServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to the catalog
// and the current recommendation engine. Reads go through an engine
// snapshot; mutations update the catalog, then rebuild and publish a new
// engine. Unknown users and items are reported as errors here, although
// the engine itself answers them with empty lists.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};
use std::sync::Arc;

use crate::catalog::{Catalog, EngineHandle};
use crate::error::RecommendError;
use crate::protocol::*;
use crate::recommendation::{EngineConfig, RecommendationEngine};
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub default_count: usize,
	pub default_content_weight: f64,
	pub engine: EngineConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			default_count: 5,
			default_content_weight: 0.5,
			engine: EngineConfig::default(),
		}
	}
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct RecommendServer {
	transport: NdjsonTransport,
	catalog: Catalog,
	engine: EngineHandle,
	config: ServerConfig,
}

impl RecommendServer {
	/// Build the initial engine from `catalog`. Fails when the catalog
	/// cannot produce an engine (empty, or malformed feature vectors).
	pub fn new(
		transport: NdjsonTransport,
		catalog: Catalog,
		config: ServerConfig,
	) -> Result<Self, RecommendError> {
		let engine = EngineHandle::new(catalog.build_engine(&config.engine)?);
		Ok(Self {
			transport,
			catalog,
			engine,
			config,
		})
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), RecommendError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					self.transport
						.write_error(0, PARSE_ERROR, "Parse error: invalid JSON", None);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			// -- Catalog -------------------------------------------------
			"catalog/items" => {
				Ok(serde_json::json!({ "items": self.catalog.items() }))
			}
			"catalog/item" => handle_get_item(&self.catalog, req.params),
			"catalog/users" => {
				Ok(serde_json::json!({ "users": self.catalog.users() }))
			}
			"catalog/user" => handle_get_user(&self.catalog, req.params),

			// -- Recommendation ------------------------------------------
			"recommend/contentBased" => {
				handle_content_based(&self.engine.snapshot(), &self.config, req.params)
			}
			"recommend/collaborative" => {
				handle_collaborative(&self.engine.snapshot(), &self.config, req.params)
			}
			"recommend/hybrid" => {
				handle_hybrid(&self.engine.snapshot(), &self.config, req.params)
			}
			"recommend/similar" => {
				handle_similar(&self.engine.snapshot(), &self.config, req.params)
			}

			// -- Mutations -----------------------------------------------
			"ratings/add" => self.handle_add_rating(req.params),
			"views/add" => self.handle_add_view(req.params),
			"likes/set" => self.handle_set_like(req.params),

			// -- Engine --------------------------------------------------
			"engine/info" => self.handle_engine_info(),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match e {
					RecommendError::InvalidParams(_) => INVALID_PARAMS,
					_ => RECOMMEND_ERROR,
				};
				tracing::debug!(method = %req.method, code = e.code(), "Request failed: {}", e);
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()))
			}
		}
	}

	// ── Mutations ─────────────────────────────────────────────────────────

	fn publish(&self) -> Result<u64, RecommendError> {
		self.engine.rebuild(&self.catalog, &self.config.engine)
	}

	fn handle_add_rating(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, RecommendError> {
		let p: RatingParams = parse_params(params)?;
		let replaced = self.catalog.record_rating(p.user_id, p.item_id, p.rating)?;
		let version = self.publish()?;
		Ok(serde_json::json!({ "replaced": replaced, "version": version }))
	}

	fn handle_add_view(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, RecommendError> {
		let p: ViewParams = parse_params(params)?;
		let changed = self.catalog.record_view(p.user_id, p.item_id)?;
		let version = if changed { self.publish()? } else { self.engine.version() };
		Ok(serde_json::to_value(MutationResult { changed, version })?)
	}

	fn handle_set_like(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, RecommendError> {
		let p: LikeParams = parse_params(params)?;
		let changed = self.catalog.set_liked(p.user_id, p.item_id, p.liked)?;
		let version = if changed { self.publish()? } else { self.engine.version() };
		Ok(serde_json::to_value(MutationResult { changed, version })?)
	}

	fn handle_engine_info(&self) -> Result<serde_json::Value, RecommendError> {
		let engine = self.engine.snapshot();
		let matrix = engine.interaction_matrix();
		Ok(serde_json::to_value(EngineInfo {
			version: self.engine.version(),
			items: engine.items().len(),
			users: engine.users().len(),
			interactions: engine.interaction_count(),
			matrix_rows: matrix.rows(),
			matrix_cols: matrix.cols(),
			neighbor_count: engine.config().neighbor_count,
		})?)
	}
}

// ---------------------------------------------------------------------------
// Param parsing
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, RecommendError> {
	serde_json::from_value(params).map_err(|e| RecommendError::InvalidParams(e.to_string()))
}

fn require_user(engine: &RecommendationEngine, user_id: u32) -> Result<(), RecommendError> {
	match engine.user(user_id) {
		Some(_) => Ok(()),
		None => Err(RecommendError::UserNotFound(user_id)),
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_get_item(
	catalog: &Catalog,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: IdParams = parse_params(params)?;
	let item = catalog.item(p.id).ok_or(RecommendError::ItemNotFound(p.id))?;
	Ok(serde_json::json!({ "item": item }))
}

fn handle_get_user(
	catalog: &Catalog,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: IdParams = parse_params(params)?;
	let user = catalog.user(p.id).ok_or(RecommendError::UserNotFound(p.id))?;
	Ok(serde_json::json!({ "user": user }))
}

fn handle_content_based(
	engine: &Arc<RecommendationEngine>,
	config: &ServerConfig,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: RecommendParams = parse_params(params)?;
	require_user(engine, p.user_id)?;
	let items = engine.content_based(p.user_id, p.n.unwrap_or(config.default_count));
	Ok(serde_json::json!({ "items": items }))
}

fn handle_collaborative(
	engine: &Arc<RecommendationEngine>,
	config: &ServerConfig,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: RecommendParams = parse_params(params)?;
	require_user(engine, p.user_id)?;
	let items = engine.collaborative(p.user_id, p.n.unwrap_or(config.default_count));
	Ok(serde_json::json!({ "items": items }))
}

fn handle_hybrid(
	engine: &Arc<RecommendationEngine>,
	config: &ServerConfig,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: HybridParams = parse_params(params)?;
	require_user(engine, p.user_id)?;
	let weight = p.content_weight.unwrap_or(config.default_content_weight);
	if !(0.0..=1.0).contains(&weight) {
		return Err(RecommendError::InvalidParams(format!(
			"contentWeight must be between 0 and 1, got {weight}"
		)));
	}
	let items = engine.hybrid(p.user_id, p.n.unwrap_or(config.default_count), weight);
	Ok(serde_json::json!({ "items": items }))
}

fn handle_similar(
	engine: &Arc<RecommendationEngine>,
	config: &ServerConfig,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: SimilarParams = parse_params(params)?;
	if engine.item(p.item_id).is_none() {
		return Err(RecommendError::ItemNotFound(p.item_id));
	}
	let items = engine.similar_items(p.item_id, p.n.unwrap_or(config.default_count));
	Ok(serde_json::json!({ "items": items }))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::CatalogConfig;
	use crate::dataset::Dataset;

	fn sample_engine() -> Arc<RecommendationEngine> {
		let catalog = Catalog::new(Dataset::sample().unwrap(), CatalogConfig::default());
		Arc::new(catalog.build_engine(&EngineConfig::default()).unwrap())
	}

	fn item_ids(value: &serde_json::Value) -> Vec<u64> {
		value["items"]
			.as_array()
			.unwrap()
			.iter()
			.map(|i| i["id"].as_u64().unwrap())
			.collect()
	}

	#[test]
	fn content_based_handler_uses_default_count() {
		let engine = sample_engine();
		let value = handle_content_based(
			&engine,
			&ServerConfig::default(),
			serde_json::json!({ "userId": 1 }),
		)
		.unwrap();
		assert_eq!(item_ids(&value), vec![9, 6]);
	}

	#[test]
	fn unknown_user_is_an_error_at_the_request_layer() {
		let engine = sample_engine();
		let err = handle_collaborative(
			&engine,
			&ServerConfig::default(),
			serde_json::json!({ "userId": 99 }),
		)
		.unwrap_err();
		assert!(matches!(err, RecommendError::UserNotFound(99)));
	}

	#[test]
	fn hybrid_rejects_out_of_range_weight() {
		let engine = sample_engine();
		let err = handle_hybrid(
			&engine,
			&ServerConfig::default(),
			serde_json::json!({ "userId": 1, "contentWeight": 1.5 }),
		)
		.unwrap_err();
		assert!(matches!(err, RecommendError::InvalidParams(_)));
	}

	#[test]
	fn malformed_params_are_invalid_params() {
		let engine = sample_engine();
		let err = handle_similar(
			&engine,
			&ServerConfig::default(),
			serde_json::json!({ "item": "nope" }),
		)
		.unwrap_err();
		assert!(matches!(err, RecommendError::InvalidParams(_)));
	}

	#[test]
	fn zero_count_is_empty_not_error() {
		let engine = sample_engine();
		let value = handle_hybrid(
			&engine,
			&ServerConfig::default(),
			serde_json::json!({ "userId": 2, "n": 0 }),
		)
		.unwrap();
		assert!(item_ids(&value).is_empty());
	}
}
