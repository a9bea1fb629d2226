//! Exchange LINE access tokens for Firebase custom tokens: verify the token with LINE, map the
//! LINE user onto a namespaced Firebase uid (creating the user on first sign-in), and mint a
//! custom token the client SDK can sign in with.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod http;
pub mod obs;
pub mod platform;
pub mod provider;
pub mod server;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Fixtures shared by unit and integration tests; integration tests need the `test` feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ChannelId,
		credential::{CredentialMinter, ServiceAccountKey, ServiceAccountSigner},
		exchange::Exchanger,
		http::ReqwestHttpClient,
		platform::{MemoryDirectory, UserDirectory},
		provider::{LineClient, ProviderDescriptor},
	};

	/// Service-account key whose private half signs test tokens.
	pub const TEST_SERVICE_ACCOUNT_JSON: &str =
		include_str!("../tests/fixtures/service_account.json");
	/// Public half of [`TEST_SERVICE_ACCOUNT_JSON`], for verifying signatures.
	pub const TEST_SERVICE_ACCOUNT_PUBLIC_PEM: &str =
		include_str!("../tests/fixtures/service_account_public.pem");
	/// Channel the test exchanger expects.
	pub const TEST_CHANNEL_ID: &str = "1234567890";
	/// Verification endpoint path used by mocked providers.
	pub const TEST_VERIFY_PATH: &str = "/v1/oauth/verify";
	/// Profile endpoint path used by mocked providers.
	pub const TEST_PROFILE_PATH: &str = "/v1/profile";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Parses the fixture service account.
	pub fn test_service_account() -> ServiceAccountKey {
		ServiceAccountKey::from_json(TEST_SERVICE_ACCOUNT_JSON.as_bytes())
			.expect("Fixture service account should parse.")
	}

	/// Builds a signer from the fixture service account.
	pub fn test_signer() -> ServiceAccountSigner {
		ServiceAccountSigner::new(&test_service_account())
			.expect("Fixture service account should sign.")
	}

	/// Builds a descriptor whose endpoints live under `base` (for example an `httpmock` URL).
	pub fn test_descriptor(base: &str) -> ProviderDescriptor {
		let endpoint = |path: &str| {
			Url::parse(&format!("{}{path}", base.trim_end_matches('/')))
				.expect("Test endpoint should be a valid URL.")
		};

		ProviderDescriptor::line()
			.expect("LINE descriptor defaults should be valid.")
			.verify_endpoint(endpoint(TEST_VERIFY_PATH))
			.profile_endpoint(endpoint(TEST_PROFILE_PATH))
			.build()
			.expect("Test descriptor should validate.")
	}

	/// Constructs an [`Exchanger`] against a provider rooted at `provider_base`, backed by a fresh
	/// in-memory directory and the fixture signer.
	pub fn build_test_exchanger(provider_base: &str) -> (Exchanger, MemoryDirectory) {
		build_test_exchanger_with(provider_base, MemoryDirectory::default())
	}

	/// Like [`build_test_exchanger`] but reuses a seeded `directory`.
	pub fn build_test_exchanger_with(
		provider_base: &str,
		directory: MemoryDirectory,
	) -> (Exchanger, MemoryDirectory) {
		let provider = LineClient::new(test_descriptor(provider_base), test_reqwest_http_client());
		let channel_id = ChannelId::new(TEST_CHANNEL_ID).expect("Test channel should be valid.");
		let store: Arc<dyn UserDirectory> = Arc::new(directory.clone());
		let minter: Arc<dyn CredentialMinter> = Arc::new(test_signer());

		(Exchanger::new(provider, channel_id, store, minter), directory)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
