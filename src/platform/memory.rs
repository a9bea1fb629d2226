//! Thread-safe in-memory [`UserDirectory`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::LocalUid,
	error::PlatformError,
	platform::{NewUser, PlatformFuture, UserDirectory, UserLookup, UserRecord},
};

type UserMap = Arc<RwLock<HashMap<LocalUid, UserRecord>>>;

/// Directory operations that can be forced to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
	/// [`UserDirectory::get_user`].
	Lookup,
	/// [`UserDirectory::create_user`].
	Create,
}

/// Storage backend that keeps users in-process and counts calls.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
	users: UserMap,
	lookups: Arc<Mutex<Vec<LocalUid>>>,
	creates: Arc<Mutex<Vec<NewUser>>>,
	failures: Arc<Mutex<HashMap<DirectoryOp, String>>>,
}
impl MemoryDirectory {
	/// Seeds the directory with an existing user.
	pub fn with_user(self, record: UserRecord) -> Self {
		self.users.write().insert(record.uid.clone(), record);

		self
	}

	/// Makes every subsequent `op` fail with a backend error carrying `message`.
	pub fn fail_on(self, op: DirectoryOp, message: impl Into<String>) -> Self {
		self.failures.lock().insert(op, message.into());

		self
	}

	/// Returns the stored user, bypassing call accounting.
	pub fn user(&self, uid: &str) -> Option<UserRecord> {
		self.users.read().get(uid).cloned()
	}

	/// Returns every uid passed to `get_user`, in call order.
	pub fn lookups(&self) -> Vec<LocalUid> {
		self.lookups.lock().clone()
	}

	/// Returns every user passed to `create_user`, in call order.
	pub fn creates(&self) -> Vec<NewUser> {
		self.creates.lock().clone()
	}

	fn check_failure(&self, op: DirectoryOp) -> Result<(), PlatformError> {
		match self.failures.lock().get(&op) {
			Some(message) => Err(PlatformError::Backend { message: message.clone() }),
			None => Ok(()),
		}
	}

	fn get_now(&self, uid: LocalUid) -> Result<UserLookup, PlatformError> {
		self.lookups.lock().push(uid.clone());
		self.check_failure(DirectoryOp::Lookup)?;

		Ok(match self.users.read().get(&uid) {
			Some(record) => UserLookup::Found(record.clone()),
			None => UserLookup::NotFound,
		})
	}

	fn create_now(&self, user: NewUser) -> Result<UserRecord, PlatformError> {
		self.creates.lock().push(user.clone());
		self.check_failure(DirectoryOp::Create)?;

		let mut guard = self.users.write();

		if guard.contains_key(&user.uid) {
			return Err(PlatformError::UserAlreadyExists { uid: user.uid.to_string() });
		}

		let record = UserRecord::from(user);

		guard.insert(record.uid.clone(), record.clone());

		Ok(record)
	}
}
impl UserDirectory for MemoryDirectory {
	fn get_user<'a>(&'a self, uid: &'a LocalUid) -> PlatformFuture<'a, UserLookup> {
		let uid = uid.to_owned();

		Box::pin(async move { self.get_now(uid) })
	}

	fn create_user(&self, user: NewUser) -> PlatformFuture<'_, UserRecord> {
		Box::pin(async move { self.create_now(user) })
	}
}
