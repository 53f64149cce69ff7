//! Service account authentication for Google APIs.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument};

use crate::client::DriveClient;
use crate::config::Settings;
use crate::error::{DriveError, Result};
use crate::models::{ServiceAccountCredentials, TokenResponse};

/// Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Full read/write access to Drive. The only scope ever requested.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Tokens are renewed this long before they expire.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Authenticator for Google APIs using service account credentials.
#[derive(Clone)]
pub struct Authenticator {
    client_email: Arc<str>,
    token_uri: Arc<str>,
    key: Arc<EncodingKey>,
    http: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Load and validate a service account JSON file.
    ///
    /// Fails with a credential error if the file is missing, is not valid
    /// JSON, or carries a private key that is not an RSA PEM key.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|source| DriveError::CredentialsFileError {
                path: path.to_path_buf(),
                source,
            })?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Self::new(credentials)
    }

    /// Create a new authenticator from credentials.
    pub fn new(credentials: ServiceAccountCredentials) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let token_uri = credentials
            .token_uri
            .unwrap_or_else(|| TOKEN_URI.to_string());

        Ok(Self {
            client_email: credentials.client_email.into(),
            token_uri: token_uri.into(),
            key: Arc::new(key),
            http: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Use a preconfigured HTTP client (timeouts) for the token exchange.
    pub fn with_http(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + EXPIRY_BUFFER {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.refresh_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Exchange a signed JWT assertion for an access token.
    #[instrument(skip(self), fields(client_email = %self.client_email), level = "debug")]
    async fn refresh_token(&self) -> Result<CachedToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::TokenRefreshError(format!("system clock: {}", e)))?
            .as_secs();

        let claims = Claims {
            iss: self.client_email.to_string(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_uri.to_string(),
            iat: now,
            exp: now + 3600,
        };

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &jwt),
        ];

        let response = self
            .http
            .post(self.token_uri.as_ref())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        debug!("Obtained access token valid for {}s", token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: SystemTime::now() + Duration::from_secs(token_response.expires_in),
        })
    }
}

/// Process-wide holder of the authenticated Drive client.
///
/// The credentials file is read on the first call to [`client`](Self::client)
/// and the resulting handle is cached for the lifetime of the provider. A
/// failed load is not cached, but callers should treat it as fatal.
pub struct CredentialProvider {
    settings: Settings,
    client: OnceCell<Arc<DriveClient>>,
}

impl CredentialProvider {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Return the cached client, loading credentials on first use.
    pub async fn client(&self) -> Result<Arc<DriveClient>> {
        self.client
            .get_or_try_init(|| async { self.load() })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    fn load(&self) -> Result<Arc<DriveClient>> {
        let http = Client::builder().timeout(self.settings.timeout()).build()?;
        let auth = Authenticator::from_file(&self.settings.key_path)?.with_http(http.clone());

        info!(
            "Loaded service account {} from {}",
            auth.client_email(),
            self.settings.key_path.display()
        );

        Ok(Arc::new(DriveClient::with_http(
            auth,
            http,
            self.settings.endpoints.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            iss: "backup@example.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_SCOPE.to_string(),
            aud: TOKEN_URI.to_string(),
            iat: 1234567890,
            exp: 1234571490,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("backup@example.iam.gserviceaccount.com"));
        assert!(json.contains(DRIVE_SCOPE));
    }

    #[test]
    fn test_rejects_non_pem_key() {
        let credentials = ServiceAccountCredentials {
            client_email: "backup@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
            token_uri: None,
        };

        let err = Authenticator::new(credentials).unwrap_err();
        assert!(err.is_credential());
    }
}
