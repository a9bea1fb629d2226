//! Counter emission through the global `metrics` recorder; inert without the `metrics` feature.

// self
use crate::obs::{ExchangeStep, StepOutcome};

/// Counter labeled by `step` and `outcome`.
pub const STEP_COUNTER: &str = "line_firebase_auth_step_total";

/// Registers the unit and description of [`STEP_COUNTER`] with the installed recorder.
pub fn describe_step_metrics() {
	#[cfg(feature = "metrics")]
	{
		metrics::describe_counter!(
			STEP_COUNTER,
			metrics::Unit::Count,
			"Exchange step entries and results."
		);
	}
}

/// Bumps [`STEP_COUNTER`] for `step` with the given `outcome`.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_step_outcome(step: ExchangeStep, outcome: StepOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(STEP_COUNTER, "step" => step.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
}
