//! Demonstrates the full login → stream → paginate → classify cycle against a real
//! brokerage endpoint. Reading credentials from the environment or a terminal, and
//! rendering the resulting records, are this demo's concern, not the core crate's.

use std::io::Write as _;

use tr_client::{Endpoints, HandshakeConfig, Orchestrator, OtpPrompt};
use tr_types::{Credentials, NormalizedTxn};

/// Reads the OTP from the controlling terminal, prompting with the login process id.
pub struct StdinOtpPrompt;

impl OtpPrompt for StdinOtpPrompt {
    fn prompt(&self, process_id: &str) -> String {
        print!("Enter the OTP for login process {process_id}: ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .expect("stdin is available");
        line.trim().to_string()
    }
}

/// Installs a `tracing-subscriber` `fmt` layer honoring `RUST_LOG`. Call once, from a
/// binary's `main`, never from library code.
pub fn install_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Runs one full ingestion cycle against `endpoints`, restoring or creating a session
/// at `token_path`, draining at most `limit` items (`0` for the whole timeline).
pub async fn run_demo(
    token_path: &str,
    endpoints: Endpoints,
    credentials: Option<Credentials>,
    limit: usize,
) -> Result<Vec<NormalizedTxn>, tr_client::OrchestratorError> {
    let orchestrator = Orchestrator::new(token_path, endpoints, HandshakeConfig::default());
    orchestrator
        .run(credentials.as_ref(), &StdinOtpPrompt, limit)
        .await
}
