// crates.io
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{_prelude::*, obs::ExchangeStep};

/// Output format for the process-wide subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Pretty,
	/// One JSON object per event.
	Json,
}
impl FromStr for LogFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"" | "pretty" | "text" => Ok(Self::Pretty),
			"json" => Ok(Self::Json),
			other => Err(format!("unknown log format `{other}`")),
		}
	}
}

/// Installs the global subscriber; `RUST_LOG` controls filtering and defaults to `info`.
pub fn init_tracing(format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);
	let result = match format {
		LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
		LogFormat::Json => registry
			.with(fmt::layer().json().with_target(true).with_current_span(true))
			.try_init(),
	};

	if let Err(e) = result {
		tracing::warn!(error = %e, "global tracing subscriber already installed");
	}
}

/// Opens the span an exchange step runs under; `stage` names the calling operation.
pub fn step_span(step: ExchangeStep, stage: &'static str) -> Span {
	tracing::info_span!("line_firebase_auth.step", step = step.as_str(), stage)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn step_span_wraps_future() {
		// crates.io
		use tracing::Instrument;

		let value = async { 42 }.instrument(step_span(ExchangeStep::Verify, "verify")).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn log_format_parses_known_values() {
		assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
		assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
		assert_eq!("".parse::<LogFormat>(), Ok(LogFormat::Pretty));
		assert!("xml".parse::<LogFormat>().is_err());
	}
}
