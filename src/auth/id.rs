//! Strongly typed identifiers enforced across the exchange domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Firebase uid limit, in characters; shared by every identifier.
const IDENTIFIER_MAX_LEN: usize = 128;
const NAMESPACE_SEPARATOR: char = ':';

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (provider, channel, subject, uid).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (provider, channel, subject, uid).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (provider, channel, subject, uid).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// A provider namespace contains the uid separator.
	#[error("Provider namespace cannot contain `{separator}`.")]
	NamespaceSeparator {
		/// Reserved separator character.
		separator: char,
	},
}

def_id! { ProviderId, "Provider namespace used as the local uid prefix (for example `line`).", "Provider" }
def_id! { ChannelId, "Audience identifier of the application registered with the provider.", "Channel" }
def_id! { SubjectId, "Provider-assigned stable identifier for an end-user account.", "Subject" }
def_id! { LocalUid, "Namespaced identity-platform uid derived from a provider subject.", "Uid" }

impl ProviderId {
	/// Returns the namespace after checking it cannot produce ambiguous uids.
	pub fn namespace(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let id = Self::new(value)?;

		if id.contains(NAMESPACE_SEPARATOR) {
			return Err(IdentifierError::NamespaceSeparator { separator: NAMESPACE_SEPARATOR });
		}

		Ok(id)
	}
}

impl LocalUid {
	/// Derives the local uid for `subject` under `namespace`.
	///
	/// The result depends on nothing but its two inputs, so repeated sign-ins always land on
	/// the same account regardless of profile changes upstream.
	pub fn derive(namespace: &ProviderId, subject: &SubjectId) -> Result<Self, IdentifierError> {
		Self::new(format!("{namespace}{NAMESPACE_SEPARATOR}{subject}"))
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.chars().count() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
