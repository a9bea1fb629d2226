//! Identity-platform contracts and built-in user directory implementations.
//!
//! The exchange only ever reads and creates users; it never updates or deletes them. A lookup
//! answers with an explicit [`UserLookup`] so callers branch on "not found" without inspecting
//! error codes.

pub mod firebase;
pub mod memory;

pub use firebase::{
	AccessTokenSource, FirebaseDirectory, ServiceAccountTokenSource, StaticTokenSource,
};
pub use memory::{DirectoryOp, MemoryDirectory};

// self
use crate::{_prelude::*, auth::LocalUid, error::PlatformError};

/// Boxed future returned by platform contracts.
pub type PlatformFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, PlatformError>> + 'a + Send>>;

/// User directory contract implemented by identity-platform backends.
pub trait UserDirectory
where
	Self: Send + Sync,
{
	/// Looks up the user stored under `uid`.
	fn get_user<'a>(&'a self, uid: &'a LocalUid) -> PlatformFuture<'a, UserLookup>;

	/// Creates a user; backends reject a uid that already exists.
	fn create_user(&self, user: NewUser) -> PlatformFuture<'_, UserRecord>;
}

/// Outcome of a successful directory lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserLookup {
	/// A user exists under the requested uid.
	Found(UserRecord),
	/// No user exists under the requested uid.
	NotFound,
}

/// User record as stored by the identity platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	/// Platform uid.
	pub uid: LocalUid,
	/// Display name, if set.
	pub display_name: Option<String>,
	/// Photo URL, if set.
	pub photo_url: Option<String>,
}

/// Fields used to create a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
	/// Platform uid to create.
	pub uid: LocalUid,
	/// Display name copied from the provider profile.
	pub display_name: Option<String>,
	/// Photo URL copied from the provider profile.
	pub photo_url: Option<String>,
}
impl From<NewUser> for UserRecord {
	fn from(user: NewUser) -> Self {
		Self { uid: user.uid, display_name: user.display_name, photo_url: user.photo_url }
	}
}
