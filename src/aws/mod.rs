//! AWS request signing and credential loading
//!
//! The inventory client talks to the ECS JSON API directly over HTTP, so
//! every request has to carry an AWS Signature Version 4. Credentials come
//! from the standard environment variables; anything fancier (SSO, assumed
//! roles) is expected to have been materialized into the environment by the
//! operator's own tooling before hoplink runs.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;

use crate::errors::{HoplinkError, Result};

/// Signing name of the ECS API.
pub const ECS_SERVICE: &str = "ecs";

/// Static AWS credentials resolved from the environment.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    /// AWS access key ID
    pub access_key_id: String,
    /// AWS secret access key
    pub secret_access_key: String,
    /// AWS session token (optional, for temporary credentials)
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Load credentials from the standard environment variables.
    ///
    /// Fails before any network call is attempted so a missing login shows
    /// up as a credentials problem, not a signed-request rejection.
    pub fn from_env() -> Result<Self> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("AWS_ACCESS_KEY"))
            .map_err(|_| {
                HoplinkError::Credentials(
                    "AWS_ACCESS_KEY_ID environment variable not set".to_string(),
                )
            })?;

        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_KEY"))
            .map_err(|_| {
                HoplinkError::Credentials(
                    "AWS_SECRET_ACCESS_KEY environment variable not set".to_string(),
                )
            })?;

        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self::new(access_key, secret_key, session_token))
    }
}

/// Resolve the region to sign for: explicit flag > AWS_REGION >
/// AWS_DEFAULT_REGION > us-east-1.
pub fn resolve_region(flag: Option<&str>) -> String {
    match flag {
        Some(region) if !region.is_empty() => region.to_string(),
        _ => std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| "us-east-1".to_string()),
    }
}

/// Sign an HTTP request with AWS SigV4.
///
/// Returns the headers to add to the outgoing request, including the
/// computed Host header so the sent request matches what was signed.
pub fn sign_request(
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    method: &str,
    url: &str,
    headers: &[(String, String)],
    body: &[u8],
) -> Result<Vec<(String, String)>> {
    let parsed_url = url::Url::parse(url)
        .map_err(|e| HoplinkError::Argument(format!("Invalid URL: {}", e)))?;

    // The canonical request is built from path + query; the host rides in
    // the Host header.
    let uri = format!(
        "{}{}",
        parsed_url.path(),
        parsed_url
            .query()
            .map(|q| format!("?{}", q))
            .unwrap_or_default()
    );

    let identity = Credentials::new(
        &credentials.access_key_id,
        &credentials.secret_access_key,
        credentials.session_token.clone(),
        None, // expiry
        "hoplink",
    )
    .into();

    let settings = SigningSettings::default();

    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(service)
        .time(SystemTime::now())
        .settings(settings)
        .build()
        .map_err(|e| HoplinkError::Credentials(format!("Failed to build signing params: {}", e)))?;

    let signable_body = if body.is_empty() {
        SignableBody::empty()
    } else {
        SignableBody::Bytes(body)
    };

    let mut header_map = http::HeaderMap::new();
    for (name, value) in headers {
        if let Ok(header_name) = http::header::HeaderName::try_from(name.as_str()) {
            if let Ok(header_value) = http::header::HeaderValue::from_str(value) {
                header_map.insert(header_name, header_value);
            }
        }
    }

    // The Host header must match what reqwest will actually send: port only
    // when non-standard for the scheme.
    let computed_host = computed_host(&parsed_url);
    if !header_map.contains_key(http::header::HOST) && !computed_host.is_empty() {
        if let Ok(value) = http::header::HeaderValue::from_str(&computed_host) {
            header_map.insert(http::header::HOST, value);
        }
    }

    let signable_request = SignableRequest::new(
        method,
        &uri,
        header_map
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_str().unwrap_or(""))),
        signable_body,
    )
    .map_err(|e| HoplinkError::Credentials(format!("Failed to create signable request: {}", e)))?;

    let signing_output = sign(signable_request, &signing_params.into())
        .map_err(|e| HoplinkError::Credentials(format!("Failed to sign request: {}", e)))?;

    let mut auth_headers = Vec::new();
    let (signing_instructions, _signature) = signing_output.into_parts();

    for (name, value) in signing_instructions.headers() {
        auth_headers.push((name.to_string(), value.to_string()));
    }

    if !computed_host.is_empty()
        && !auth_headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("host"))
    {
        auth_headers.push(("host".to_string(), computed_host));
    }

    Ok(auth_headers)
}

fn computed_host(url: &url::Url) -> String {
    let Some(host) = url.host_str() else {
        return String::new();
    };
    match url.port() {
        Some(port) => {
            let is_standard_port = match url.scheme() {
                "https" => port == 443,
                "http" => port == 80,
                _ => false,
            };
            if is_standard_port {
                host.to_string()
            } else {
                format!("{}:{}", host, port)
            }
        }
        None => host.to_string(),
    }
}
