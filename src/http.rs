//! Transport primitives for provider and identity-platform calls.
//!
//! Every outbound call goes through [`ReqwestHttpClient`], which applies the configured timeout,
//! refuses redirects, and hands back a buffered [`HttpReply`] so callers can classify the status
//! before parsing the body with path-aware JSON errors.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use reqwest::{
	RequestBuilder,
	header::{ACCEPT, AUTHORIZATION},
	redirect::Policy,
};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::{ConfigError, TransportError}};

const BODY_PREVIEW_LEN: usize = 256;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that gives up on any single request after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(Policy::none())
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self(client))
	}

	/// Issues a bearer-authenticated GET.
	pub async fn get_bearer(&self, url: &Url, bearer: &str) -> Result<HttpReply, TransportError> {
		Self::send(self.0.get(url.clone()).header(AUTHORIZATION, format!("Bearer {bearer}"))).await
	}

	/// Issues a bearer-authenticated POST carrying a JSON body.
	pub async fn post_json<T>(
		&self,
		url: &Url,
		bearer: &str,
		body: &T,
	) -> Result<HttpReply, TransportError>
	where
		T: ?Sized + Serialize,
	{
		Self::send(
			self.0.post(url.clone()).header(AUTHORIZATION, format!("Bearer {bearer}")).json(body),
		)
		.await
	}

	/// Issues an unauthenticated form POST.
	pub async fn post_form(
		&self,
		url: &Url,
		form: &[(&str, &str)],
	) -> Result<HttpReply, TransportError> {
		Self::send(self.0.post(url.clone()).form(form)).await
	}

	async fn send(request: RequestBuilder) -> Result<HttpReply, TransportError> {
		let response = request.header(ACCEPT, "application/json").send().await?;
		let status = response.status().as_u16();
		let body = response.bytes().await?.to_vec();

		Ok(HttpReply { status, body })
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Buffered response returned by [`ReqwestHttpClient`].
#[derive(Clone, Debug)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the body as JSON, reporting the failing field path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Returns a lossy, truncated view of the body suitable for logs and error messages.
	pub fn body_preview(&self) -> String {
		let text = String::from_utf8_lossy(&self.body);

		match text.char_indices().nth(BODY_PREVIEW_LEN) {
			Some((idx, _)) => format!("{}...", &text[..idx]),
			None => text.into_owned(),
		}
	}
}
