//! Google sign-in (OpenID Connect relying party).
//!
//! Endpoints come from Google's published discovery document rather than
//! hard-coded URLs. The callback exchanges the authorization code for an
//! access token (with PKCE) and reads identity claims from the `userinfo`
//! endpoint over TLS, so no local JWT validation is required.
//!
//! Client credentials resolve from the environment first, then from a
//! persisted JSON file that the runtime configuration form writes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::slug::slugify;

/// Google's OIDC issuer.
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";

/// Scopes requested at login.
const SCOPE: &str = "openid email profile";

/// The subset of discovery metadata the login flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

/// Identity claims read from the `userinfo` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    /// Stable Google account identifier.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client credentials for the Google OAuth application.
///
/// The serialized field names match the persisted JSON file, which uses
/// the same keys as the environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleCredentials {
    #[serde(rename = "GOOGLE_CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "GOOGLE_CLIENT_SECRET")]
    pub client_secret: String,
}

impl GoogleCredentials {
    /// Load credentials from the persisted JSON file. `Ok(None)` when the
    /// file does not exist or does not contain both keys.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let creds: GoogleCredentials = match serde_json::from_str(&raw) {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "ignoring malformed credentials file");
                return Ok(None);
            }
        };

        if creds.client_id.is_empty() || creds.client_secret.is_empty() {
            return Ok(None);
        }

        Ok(Some(creds))
    }

    /// Persist credentials to the JSON file, creating parent directories
    /// as needed.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("failed to serialize credentials")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(())
    }
}

/// Google sign-in client. Cheap to rebuild; the runtime configuration
/// endpoint swaps in a fresh instance when credentials change.
pub struct GoogleAuth {
    http: reqwest::Client,
    credentials: GoogleCredentials,
    redirect_url: String,
    /// Discovery document, fetched once and cached for the process
    /// lifetime. Guarded by `parking_lot::RwLock`; never held across an
    /// await point.
    discovery: parking_lot::RwLock<Option<DiscoveryDocument>>,
}

impl GoogleAuth {
    /// Create a new client for the given credentials and redirect URL.
    pub fn new(credentials: GoogleCredentials, redirect_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            redirect_url,
            discovery: parking_lot::RwLock::new(None),
        }
    }

    /// Fetch the discovery document, or return the cached copy.
    pub async fn discover(&self) -> Result<DiscoveryDocument> {
        if let Some(cached) = self.discovery.read().clone() {
            return Ok(cached);
        }

        let discovery_url = format!("{GOOGLE_ISSUER}/.well-known/openid-configuration");
        let document: DiscoveryDocument = self
            .http
            .get(&discovery_url)
            .send()
            .await
            .context("failed to fetch discovery document")?
            .error_for_status()
            .context("discovery request rejected")?
            .json()
            .await
            .context("failed to parse discovery document")?;

        if document.issuer != GOOGLE_ISSUER {
            anyhow::bail!(
                "discovery document names unexpected issuer {}",
                document.issuer
            );
        }

        *self.discovery.write() = Some(document.clone());

        Ok(document)
    }

    /// Build the authorization redirect URL carrying the state token and
    /// PKCE challenge.
    pub async fn authorization_url(&self, state: &str, code_challenge: &str) -> Result<String> {
        let discovery = self.discover().await?;

        let mut url = url::Url::parse(&discovery.authorization_endpoint)
            .context("invalid authorization endpoint")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", SCOPE)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String> {
        let discovery = self.discover().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.credentials.client_id),
            ("client_secret", &self.credentials.client_secret),
            ("redirect_uri", &self.redirect_url),
            ("code_verifier", code_verifier),
        ];

        let token: TokenResponse = self
            .http
            .post(&discovery.token_endpoint)
            .form(&params)
            .send()
            .await
            .context("failed to reach token endpoint")?
            .error_for_status()
            .context("token exchange rejected")?
            .json()
            .await
            .context("failed to parse token response")?;

        Ok(token.access_token)
    }

    /// Read identity claims from the `userinfo` endpoint.
    pub async fn fetch_claims(&self, access_token: &str) -> Result<GoogleClaims> {
        let discovery = self.discover().await?;

        let claims: GoogleClaims = self
            .http
            .get(&discovery.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .context("failed to reach userinfo endpoint")?
            .error_for_status()
            .context("userinfo request rejected")?
            .json()
            .await
            .context("failed to parse userinfo response")?;

        Ok(claims)
    }
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAuth")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Generate an unguessable state token for the authorization redirect.
pub fn generate_state_token() -> String {
    use rand::RngCore;
    use sha2::{Digest, Sha256};

    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(chrono::Utc::now().timestamp().to_be_bytes());

    hex::encode(hasher.finalize())
}

/// Generate a PKCE code verifier (RFC 7636): 32 random bytes,
/// base64url-encoded without padding.
pub fn generate_code_verifier() -> String {
    use base64::Engine;
    use rand::RngCore;

    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Derive the S256 code challenge for a verifier.
pub fn code_challenge(code_verifier: &str) -> String {
    use base64::Engine;
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(code_verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// Compare the state token returned by the provider against the one stored
/// in the session. Constant-time to avoid leaking prefix matches.
pub fn state_matches(expected: &str, returned: &str) -> bool {
    use subtle::ConstantTimeEq;

    expected.as_bytes().ct_eq(returned.as_bytes()).into()
}

/// Pick a username base for a new Google-backed account: the display name
/// slugified, else the email's local part, else a random `user_` handle.
/// The caller disambiguates the base against existing usernames with the
/// shared numeric-suffix scheme.
pub fn derive_username_base(name: Option<&str>, email: &str) -> String {
    let from_name = name.map(slugify).unwrap_or_default();
    if !from_name.is_empty() {
        return from_name;
    }

    let local_part = email.split('@').next().unwrap_or("");
    if !local_part.is_empty() {
        return local_part.to_string();
    }

    let mut random_bytes = [0u8; 4];
    {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut random_bytes);
    }
    format!("user_{}", hex::encode(random_bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_token_is_unique_hex() {
        let a = generate_state_token();
        let b = generate_state_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_matches() {
        let token = generate_state_token();
        assert!(state_matches(&token, &token));
        assert!(!state_matches(&token, "something-else"));
        assert!(!state_matches(&token, ""));
    }

    #[test]
    fn test_code_verifier_shape() {
        let verifier = generate_code_verifier();
        // 32 bytes -> 43 base64url characters, within RFC 7636's 43..=128.
        assert_eq!(verifier.len(), 43);
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_code_challenge_known_vector() {
        // Appendix B of RFC 7636.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_derive_username_from_display_name() {
        assert_eq!(
            derive_username_base(Some("Ada Lovelace"), "ada@example.com"),
            "ada-lovelace"
        );
    }

    #[test]
    fn test_derive_username_falls_back_to_local_part() {
        // A name with no sluggable characters falls through to the email.
        assert_eq!(
            derive_username_base(Some("!!!"), "ada.l@example.com"),
            "ada.l"
        );
        assert_eq!(derive_username_base(None, "grace@example.com"), "grace");
    }

    #[test]
    fn test_derive_username_random_fallback() {
        let username = derive_username_base(None, "@example.com");
        assert!(username.starts_with("user_"));
        assert_eq!(username.len(), "user_".len() + 8);
    }

    #[test]
    fn test_claims_parse_with_missing_fields() {
        let claims: GoogleClaims = serde_json::from_str(r#"{"sub": "g-123"}"#).unwrap();
        assert_eq!(claims.sub, "g-123");
        assert!(claims.email.is_none());
        assert!(claims.picture.is_none());
    }

    #[test]
    fn test_credentials_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("google-creds-{}", std::process::id()));
        let path = dir.join("google_oauth.json");

        let creds = GoogleCredentials {
            client_id: "id-123".to_string(),
            client_secret: "secret-456".to_string(),
        };
        creds.save_file(&path).unwrap();

        let loaded = GoogleCredentials::load_file(&path).unwrap().unwrap();
        assert_eq!(loaded.client_id, "id-123");
        assert_eq!(loaded.client_secret, "secret-456");

        // The stored keys match the environment variable names.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("GOOGLE_CLIENT_ID"));
        assert!(raw.contains("GOOGLE_CLIENT_SECRET"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_file_missing_returns_none() {
        let path = std::env::temp_dir().join("google-creds-does-not-exist.json");
        assert!(GoogleCredentials::load_file(&path).unwrap().is_none());
    }
}
