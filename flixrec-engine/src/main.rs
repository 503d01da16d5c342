use clap::Parser;
use flixrec_engine::catalog::Catalog;
use flixrec_engine::config::CliArgs;
use flixrec_engine::dataset::Dataset;
use flixrec_engine::error::RecommendError;
use flixrec_engine::server::RecommendServer;
use flixrec_engine::transport::NdjsonTransport;

fn load_dataset(args: &CliArgs) -> Result<Dataset, RecommendError> {
	match &args.data {
		Some(path) => Dataset::from_path(path),
		None => {
			tracing::info!("No --data given, serving the bundled sample catalog");
			Dataset::sample()
		}
	}
}

fn main() {
	let args = CliArgs::parse();

	// stdout carries the protocol, so logs go to stderr
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let dataset = match load_dataset(&args) {
		Ok(d) => d,
		Err(e) => {
			tracing::error!("Failed to load dataset: {}", e);
			std::process::exit(1);
		}
	};

	let catalog = Catalog::new(dataset, args.catalog_config());
	let transport = NdjsonTransport::new();
	let mut server = match RecommendServer::new(transport, catalog, args.server_config()) {
		Ok(s) => s,
		Err(e) => {
			tracing::error!(code = e.code(), "Failed to build recommendation engine: {}", e);
			std::process::exit(1);
		}
	};

	tracing::info!("flixrec-engine ready");

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
