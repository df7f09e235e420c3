//! Ties `TokenStore`, `AuthClient`, `StreamMux`, `TimelinePager` and the classifier
//! into the one call a consumer makes per run: login (or silently restore/refresh a
//! session), open the stream, drain the timeline, and emit normalized records.

use tr_types::{Credentials, NormalizedTxn, TokenPair};

use crate::auth::AuthClient;
use crate::classify::normalize;
use crate::config::{Endpoints, HandshakeConfig};
use crate::error::{AuthError, OrchestratorError, StreamError};
use crate::mux::StreamMux;
use crate::pager::TimelinePager;
use crate::token_store::TokenStore;

/// How the orchestrator should obtain a login OTP when a fresh login is required.
/// Takes the opened [`tr_types::LoginProcess`] (exposed only through its id) and
/// returns the code the user received out-of-band.
pub trait OtpPrompt {
    /// Blocks (or awaits, for an async-capable caller wrapping this in `spawn_blocking`)
    /// until an OTP is available for the given process id.
    fn prompt(&self, process_id: &str) -> String;
}

/// Everything the orchestrator needs that this crate does not own outright.
pub struct Orchestrator {
    token_store: TokenStore,
    auth_client: AuthClient,
    endpoints: Endpoints,
    handshake: HandshakeConfig,
}

impl Orchestrator {
    /// Builds an orchestrator persisting tokens at `token_path`, talking to `endpoints`
    /// with the given `handshake` identity.
    pub fn new(token_path: impl Into<std::path::PathBuf>, endpoints: Endpoints, handshake: HandshakeConfig) -> Self {
        Self {
            token_store: TokenStore::new(token_path),
            auth_client: AuthClient::new(endpoints.clone()),
            endpoints,
            handshake,
        }
    }

    /// Runs one full login → stream → paginate → classify cycle.
    ///
    /// `credentials` is only consulted if no usable session or refresh token is on
    /// disk; `otp` is only consulted if a fresh login is required. `limit` of `0`
    /// drains the whole timeline.
    #[tracing::instrument(skip(self, credentials, otp))]
    pub async fn run(
        &self,
        credentials: Option<&Credentials>,
        otp: &dyn OtpPrompt,
        limit: usize,
    ) -> Result<Vec<NormalizedTxn>, OrchestratorError> {
        let mut tokens = self.load_or_obtain_tokens(credentials, otp).await?;

        let mux = match StreamMux::open(&self.endpoints, &tokens.session, &self.handshake).await {
            Ok(mux) => mux,
            Err(StreamError::AuthRejected) if tokens.has_refresh() => {
                tracing::info!("stream rejected session, attempting one refresh-and-retry");
                tokens = self.auth_client.refresh(&tokens.refresh).await?;
                self.token_store.save(&tokens)?;
                StreamMux::open(&self.endpoints, &tokens.session, &self.handshake).await?
            }
            Err(other) => return Err(other.into()),
        };

        let items = TimelinePager::new(&mux, tokens.session.clone(), limit).run().await;
        mux.close().await;

        Ok(items.into_iter().map(normalize).collect())
    }

    async fn load_or_obtain_tokens(
        &self,
        credentials: Option<&Credentials>,
        otp: &dyn OtpPrompt,
    ) -> Result<TokenPair, OrchestratorError> {
        let stored = self.token_store.load()?;

        if let Some(tokens) = &stored {
            if tokens.has_session() {
                return Ok(tokens.clone());
            }
        }

        let tokens = if let Some(tokens) = stored.filter(|t| t.has_refresh()) {
            self.auth_client.refresh(&tokens.refresh).await?
        } else {
            let credentials = credentials.ok_or(OrchestratorError::NoCredentials)?;
            let process = self.auth_client.begin_login(credentials).await?;
            let code = otp.prompt(&process.process_id);
            match self.auth_client.complete_login(&process, &code).await {
                Ok(tokens) => tokens,
                Err(AuthError::OtpExpired) => {
                    tracing::warn!("OTP expired, re-prompting once");
                    let code = otp.prompt(&process.process_id);
                    self.auth_client.complete_login(&process, &code).await?
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.token_store.save(&tokens)?;
        Ok(tokens)
    }
}
