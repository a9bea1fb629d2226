//! Service entry point: load configuration, wire the exchanger, serve until signalled.

// std
use std::sync::Arc;
// self
use line_firebase_auth::{
	config::ExchangeConfig,
	error::StartupError,
	exchange::Exchanger,
	obs::{self, LogFormat},
	server,
};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
	let format = std::env::var("LOG_FORMAT")
		.ok()
		.and_then(|value| value.parse::<LogFormat>().ok())
		.unwrap_or_default();

	obs::init_tracing(format);
	obs::describe_step_metrics();

	let config = ExchangeConfig::from_env().inspect_err(|e| {
		tracing::error!(error = %e, "configuration rejected");
	})?;
	let exchanger = Exchanger::from_config(&config).inspect_err(|e| {
		tracing::error!(error = %e, "exchanger could not be initialized");
	})?;

	tracing::info!(
		channel_id = %config.channel_id,
		project_id = %config.project_id,
		emulator = config.emulator_host.is_some(),
		"starting token exchange service"
	);

	server::serve(config.bind_addr, Arc::new(exchanger)).await?;

	Ok(())
}
