//! Step-level tracing and counters for the exchange pipeline.
//!
//! An exchange is observed at four points: the exchange as a whole, then `verify`,
//! `map_identity` and `mint` nested inside it. Each point runs under a
//! `line_firebase_auth.step` span whose `stage` field names the calling operation. With the
//! `metrics` feature, every point also bumps [`STEP_COUNTER`] once on entry and once with its
//! result.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Points of the exchange pipeline that carry a span and a counter label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeStep {
	/// Entire request, wrapping the three steps below.
	Exchange,
	/// Token verification against the provider, including the channel pin.
	Verify,
	/// Uid derivation, directory lookup, and provisioning on first sign-in.
	MapIdentity,
	/// Custom-token signing.
	Mint,
}
impl ExchangeStep {
	/// Every step, outermost first.
	pub const ALL: [Self; 4] = [Self::Exchange, Self::Verify, Self::MapIdentity, Self::Mint];

	/// Label used for the `step` span field and counter label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Exchange => "exchange",
			Self::Verify => "verify",
			Self::MapIdentity => "map_identity",
			Self::Mint => "mint",
		}
	}
}
impl Display for ExchangeStep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Value of the counter's `outcome` label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
	/// Step entered.
	Attempt,
	/// Step returned `Ok`.
	Success,
	/// Step returned `Err`.
	Failure,
}
impl StepOutcome {
	/// Classifies a finished step.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}

	/// Label used for the `outcome` counter label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}
