//! Speaks the two-step HTTP login + OTP + refresh endpoints. The cookie jar is the
//! single source of truth for tokens: every response is inspected for `Set-Cookie`,
//! never trusted from a response body.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use reqwest_cookie_store::CookieStoreMutex;
use serde::Deserialize;
use serde_json::json;
use tr_types::{Credentials, LoginProcess, TokenPair};

use crate::config::Endpoints;
use crate::error::AuthError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "TradeRepublic/1.0.0 Android/30";

/// Speaks `begin_login`, `complete_login` and `refresh` against a single HTTPS origin.
pub struct AuthClient {
    client: Client,
    cookie_jar: Arc<CookieStoreMutex>,
    endpoints: Endpoints,
}

impl AuthClient {
    /// Builds a client bound to `endpoints` with its own private cookie jar.
    pub fn new(endpoints: Endpoints) -> Self {
        let cookie_jar = Arc::new(CookieStoreMutex::new(cookie_store::CookieStore::default()));
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .cookie_provider(cookie_jar.clone())
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()
            .expect("static client configuration is always valid");
        Self {
            client,
            cookie_jar,
            endpoints,
        }
    }

    /// Step 1: submits phone number and PIN, returning the opaque login process id.
    #[tracing::instrument(skip(self, credentials), fields(phone_number = %credentials.phone_number))]
    pub async fn begin_login(&self, credentials: &Credentials) -> Result<LoginProcess, AuthError> {
        let url = format!("{}/api/v1/auth/web/login", self.endpoints.http_base);
        let response = self
            .client
            .post(url)
            .json(&json!({
                "phoneNumber": credentials.phone_number,
                "pin": credentials.pin,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AuthError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::InvalidCredentials);
        }

        #[derive(Deserialize)]
        struct BeginLoginResponse {
            #[serde(rename = "processId")]
            process_id: String,
        }
        let body: BeginLoginResponse = response.json().await?;
        tracing::debug!(process_id = %body.process_id, "login process started");
        Ok(LoginProcess::new(body.process_id))
    }

    /// Step 2: submits the OTP for `process`, populating `session` and `refresh` from
    /// the response's `Set-Cookie` headers.
    #[tracing::instrument(skip(self, otp), fields(process_id = %process.process_id))]
    pub async fn complete_login(
        &self,
        process: &LoginProcess,
        otp: &str,
    ) -> Result<TokenPair, AuthError> {
        let url = format!(
            "{}/api/v1/auth/web/login/{}/{}",
            self.endpoints.http_base, process.process_id, otp
        );
        let response = self.client.post(url).send().await?;
        let status = response.status();

        // §4.2's failure set for this op is {otp_invalid, otp_expired, network} only,
        // unlike begin_login/refresh: a 429 here still means the OTP attempt itself
        // didn't succeed, so it folds into otp_invalid rather than adding a new kind.
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return if body.to_lowercase().contains("expired") {
                Err(AuthError::OtpExpired)
            } else {
                Err(AuthError::OtpInvalid)
            };
        }
        if !status.is_success() {
            return Err(AuthError::OtpInvalid);
        }
        // Tokens live in cookies, not the response body; still drain it.
        let _ = response.bytes().await;

        let tokens = TokenPair {
            session: self.cookie_value("tr_session"),
            refresh: self.cookie_value("tr_refresh"),
        };
        tracing::info!("login completed");
        Ok(tokens)
    }

    /// Silently renews `session` using a previously obtained `refresh` token. The
    /// server may rotate `refresh` too; if it doesn't, the original value is kept.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let url = format!("{}/api/v1/auth/web/session", self.endpoints.http_base);
        let response = self
            .client
            .get(url)
            .header("Cookie", format!("tr_refresh={refresh_token}"))
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AuthError::RateLimited);
        }
        if !status.is_success() {
            return Err(AuthError::RefreshExpired);
        }
        let _ = response.bytes().await;

        let session = self.cookie_value("tr_session");
        let rotated_refresh = self.cookie_value("tr_refresh");
        let refresh = if rotated_refresh.is_empty() {
            refresh_token.to_string()
        } else {
            rotated_refresh
        };
        tracing::debug!("session refreshed");
        Ok(TokenPair { session, refresh })
    }

    fn cookie_value(&self, name: &str) -> String {
        let host = reqwest::Url::parse(&self.endpoints.http_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.cookie_jar
            .lock()
            .expect("cookie jar mutex is never held across a panic")
            .get(&host, "/", name)
            .map(|cookie| cookie.value().to_string())
            .unwrap_or_default()
    }
}
