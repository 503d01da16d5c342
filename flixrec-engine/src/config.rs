use std::path::PathBuf;

use clap::Parser;

use crate::catalog::CatalogConfig;
use crate::recommendation::{EngineConfig, DEFAULT_NEIGHBOR_COUNT};
use crate::server::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "flixrec-engine", about = "Item recommendation server over JSON-RPC 2.0 / NDJSON stdio")]
pub struct CliArgs {
	/// JSON dataset with `items`, `users` and `interactions`.
	/// The bundled sample catalog is served when omitted.
	#[arg(long, env = "FLIXREC_DATA")]
	pub data: Option<PathBuf>,

	/// Nearest users consulted by collaborative filtering
	#[arg(long, default_value_t = DEFAULT_NEIGHBOR_COUNT, env = "FLIXREC_NEIGHBORS")]
	pub neighbors: usize,

	/// Ratings at or above this value mark the item as liked
	#[arg(long, default_value = "4.0")]
	pub like_threshold: f64,

	/// Result count when a request does not specify `n`
	#[arg(long, default_value = "5")]
	pub default_count: usize,

	/// Hybrid content weight when a request does not specify one
	#[arg(long, default_value = "0.5")]
	pub default_content_weight: f64,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "FLIXREC_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			neighbor_count: self.neighbors,
		}
	}

	pub fn catalog_config(&self) -> CatalogConfig {
		CatalogConfig {
			like_threshold: self.like_threshold,
			..CatalogConfig::default()
		}
	}

	pub fn server_config(&self) -> ServerConfig {
		ServerConfig {
			default_count: self.default_count,
			default_content_weight: self.default_content_weight,
			engine: self.engine_config(),
		}
	}
}
