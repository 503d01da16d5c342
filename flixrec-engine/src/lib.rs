pub mod catalog;
pub mod config;
pub mod cosine;
pub mod dataset;
pub mod error;
pub mod matrix;
pub mod protocol;
pub mod recommendation;
pub mod server;
pub mod transport;
pub mod types;
