// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::json;
// self
use line_firebase_auth::{
	_preludet::*,
	auth::{AccessToken, CustomToken, LocalUid},
	credential::{CUSTOM_TOKEN_AUDIENCE, CredentialMinter},
	error::{PlatformError, ProviderError, TransportError},
	http::ReqwestHttpClient,
	platform::{DirectoryOp, MemoryDirectory, PlatformFuture, UserRecord},
	provider::LineClient,
};

const ACCESS_TOKEN: &str = "line-access-token";
const MID: &str = "U4af4980629";

fn decoded_uid(token: &str) -> String {
	let key = DecodingKey::from_rsa_pem(TEST_SERVICE_ACCOUNT_PUBLIC_PEM.as_bytes())
		.expect("Fixture public key should load.");
	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[CUSTOM_TOKEN_AUDIENCE]);

	let claims = jsonwebtoken::decode::<serde_json::Value>(token, &key, &validation)
		.expect("Minted token should verify against the fixture public key.")
		.claims;

	claims["uid"].as_str().expect("Minted token should carry a uid claim.").to_owned()
}

async fn mock_verify(server: &MockServer, channel_id: serde_json::Value) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(TEST_VERIFY_PATH)
				.header("authorization", format!("Bearer {ACCESS_TOKEN}"));
			then.status(200).json_body(json!({ "mid": MID, "channelId": channel_id.clone() }));
		})
		.await
}

async fn mock_profile(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(TEST_PROFILE_PATH)
				.header("authorization", format!("Bearer {ACCESS_TOKEN}"));
			then.status(200).json_body(json!({
				"displayName": "Alice",
				"pictureUrl": "https://profile.line-scdn.net/alice.png",
				"mid": MID
			}));
		})
		.await
}

struct FailingMinter;
impl CredentialMinter for FailingMinter {
	fn mint<'a>(&'a self, _: &'a LocalUid) -> PlatformFuture<'a, CustomToken> {
		Box::pin(async { Err(PlatformError::Backend { message: "signing key revoked".into() }) })
	}
}

fn existing_user() -> UserRecord {
	UserRecord {
		uid: format!("line:{MID}").parse().expect("Fixture uid should be valid."),
		display_name: Some("Stored Name".into()),
		photo_url: None,
	}
}

#[tokio::test]
async fn first_sign_in_provisions_user_and_mints_token() {
	let server = MockServer::start_async().await;
	let verify = mock_verify(&server, json!(1234567890)).await;
	let profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let outcome = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect("Exchange should succeed for a new user.");

	verify.assert_calls_async(1).await;
	profile.assert_calls_async(1).await;

	assert!(outcome.created);
	assert_eq!(outcome.user.uid.as_ref(), "line:U4af4980629");
	assert_eq!(outcome.user.display_name.as_deref(), Some("Alice"));
	assert_eq!(
		outcome.user.photo_url.as_deref(),
		Some("https://profile.line-scdn.net/alice.png")
	);
	assert_eq!(directory.creates().len(), 1);
	assert_eq!(directory.user("line:U4af4980629"), Some(outcome.user.clone()));
	assert_eq!(decoded_uid(outcome.credential.expose()), "line:U4af4980629");
}

#[tokio::test]
async fn existing_user_is_returned_unchanged_without_profile_call() {
	let server = MockServer::start_async().await;
	let verify = mock_verify(&server, json!(1234567890)).await;
	let profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger_with(
		&server.base_url(),
		MemoryDirectory::default().with_user(existing_user()),
	);
	let outcome = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect("Exchange should succeed for an existing user.");

	verify.assert_calls_async(1).await;
	profile.assert_calls_async(0).await;

	assert!(!outcome.created);
	assert_eq!(outcome.user, existing_user());
	assert!(directory.creates().is_empty());
	assert_eq!(decoded_uid(outcome.credential.expose()), "line:U4af4980629");
}

#[tokio::test]
async fn string_channel_id_is_accepted() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(TEST_CHANNEL_ID)).await;
	let _profile = mock_profile(&server).await;
	let (exchanger, _) = build_test_exchanger(&server.base_url());

	exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect("String channel ids should compare equal to the configured channel.");
}

#[tokio::test]
async fn audience_mismatch_stops_before_directory() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(99)).await;
	let profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Tokens for another channel must be rejected.");

	match err {
		Error::AudienceMismatch { expected, actual } => {
			assert_eq!(expected, TEST_CHANNEL_ID);
			assert_eq!(actual, "99");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	profile.assert_calls_async(0).await;

	assert!(directory.lookups().is_empty());
	assert!(directory.creates().is_empty());
}

#[tokio::test]
async fn empty_token_makes_no_outbound_calls() {
	let server = MockServer::start_async().await;
	let verify = mock_verify(&server, json!(1234567890)).await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let err = exchanger
		.exchange(&AccessToken::new(""))
		.await
		.expect_err("Empty tokens must be rejected.");

	assert!(matches!(err, Error::MissingInput));

	verify.assert_calls_async(0).await;

	assert!(directory.lookups().is_empty());
}

#[tokio::test]
async fn provider_rejection_is_invalid_token() {
	let server = MockServer::start_async().await;
	let verify = server
		.mock_async(|when, then| {
			when.method(GET).path(TEST_VERIFY_PATH);
			then.status(401).json_body(json!({
				"statusCode": "401",
				"statusMessage": "invalid token"
			}));
		})
		.await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Rejected tokens must fail.");

	verify.assert_calls_async(1).await;

	assert!(matches!(err, Error::InvalidToken(ProviderError::Rejected { status: 401, .. })));
	assert!(directory.lookups().is_empty());
}

#[tokio::test]
async fn malformed_verification_body_is_invalid_token() {
	let server = MockServer::start_async().await;
	let _verify = server
		.mock_async(|when, then| {
			when.method(GET).path(TEST_VERIFY_PATH);
			then.status(200).json_body(json!({ "channelId": 1234567890 }));
		})
		.await;
	let (exchanger, _) = build_test_exchanger(&server.base_url());
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Verification bodies without a subject must fail.");

	assert!(matches!(err, Error::InvalidToken(ProviderError::MalformedResponse { .. })));
}

#[tokio::test]
async fn lookup_failure_is_upstream_error_without_create() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(1234567890)).await;
	let profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger_with(
		&server.base_url(),
		MemoryDirectory::default().fail_on(DirectoryOp::Lookup, "lookup offline"),
	);
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Lookup failures must propagate.");

	assert!(matches!(err, Error::UpstreamUserStore(_)));

	profile.assert_calls_async(0).await;

	assert_eq!(directory.lookups().len(), 1);
	assert!(directory.creates().is_empty());
}

#[tokio::test]
async fn create_failure_is_upstream_error() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(1234567890)).await;
	let _profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger_with(
		&server.base_url(),
		MemoryDirectory::default().fail_on(DirectoryOp::Create, "quota exceeded"),
	);
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Create failures must propagate.");

	assert!(matches!(err, Error::UpstreamUserStore(_)));
	assert_eq!(directory.creates().len(), 1);
	assert!(directory.user("line:U4af4980629").is_none());
}

#[tokio::test]
async fn repeated_sign_in_maps_to_the_same_user() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let verify = mock_verify(&server, json!(1234567890)).await;
	let profile = mock_profile(&server).await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let token = AccessToken::new(ACCESS_TOKEN);
	let first = exchanger.exchange(&token).await?;
	let second = exchanger.exchange(&token).await?;

	verify.assert_calls_async(2).await;
	profile.assert_calls_async(1).await;

	assert!(first.created);
	assert!(!second.created);
	assert_eq!(first.user.uid, second.user.uid);
	assert_eq!(directory.creates().len(), 1);
	assert_eq!(
		decoded_uid(first.credential.expose()),
		decoded_uid(second.credential.expose())
	);

	Ok(())
}

#[tokio::test]
async fn mint_failure_is_upstream_error_after_provisioning() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(1234567890)).await;
	let _profile = mock_profile(&server).await;
	let (mut exchanger, directory) = build_test_exchanger(&server.base_url());

	exchanger.minter = Arc::new(FailingMinter);

	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Signing failures must propagate.");

	assert!(matches!(err, Error::UpstreamUserStore(PlatformError::Backend { .. })));
	assert_eq!(directory.creates().len(), 1);
}

#[tokio::test]
async fn profile_failure_is_invalid_token_without_create() {
	let server = MockServer::start_async().await;
	let _verify = mock_verify(&server, json!(1234567890)).await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path(TEST_PROFILE_PATH);
			then.status(500).body("profile backend down");
		})
		.await;
	let (exchanger, directory) = build_test_exchanger(&server.base_url());
	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Profile failures must reject the token.");

	profile.assert_calls_async(1).await;

	assert!(matches!(
		err,
		Error::InvalidToken(ProviderError::Rejected { endpoint: "profile", status: 500, .. })
	));
	assert_eq!(directory.lookups().len(), 1);
	assert!(directory.creates().is_empty());
}

#[tokio::test]
async fn provider_timeout_is_invalid_token() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let _verify = server
		.mock_async(|when, then| {
			when.method(GET).path(TEST_VERIFY_PATH);
			then.status(200)
				.delay(StdDuration::from_millis(500))
				.json_body(json!({ "mid": MID, "channelId": 1234567890 }));
		})
		.await;
	let (mut exchanger, directory) = build_test_exchanger(&server.base_url());
	let client = ReqwestClient::builder().timeout(StdDuration::from_millis(50)).build()?;

	exchanger.provider = LineClient::new(
		test_descriptor(&server.base_url()),
		ReqwestHttpClient::with_client(client),
	);

	let err = exchanger
		.exchange(&AccessToken::new(ACCESS_TOKEN))
		.await
		.expect_err("Slow providers must be cut off.");

	assert!(matches!(
		err,
		Error::InvalidToken(ProviderError::Transport {
			endpoint: "verify",
			source: TransportError::Timeout { .. },
		})
	));
	assert!(directory.lookups().is_empty());

	Ok(())
}
