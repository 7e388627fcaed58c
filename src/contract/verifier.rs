//! Replays a pact against a real provider

use super::interaction::Interaction;
use super::matcher::Mismatch;
use super::pact::Pact;
use crate::error::{ClientError, Result};
use crate::transport::Transport;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Puts the provider into the state an interaction requires
#[async_trait]
pub trait ProviderStateHandler: Send + Sync {
    /// Prepare `state` before its interaction is replayed
    async fn set_up(&self, state: &str) -> Result<()>;
}

/// State handler for providers that are already prepared
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProviderStates;

#[async_trait]
impl ProviderStateHandler for NoProviderStates {
    async fn set_up(&self, state: &str) -> Result<()> {
        debug!(state, "No state handler configured, assuming provider is prepared");
        Ok(())
    }
}

/// Outcome of replaying one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionResult {
    /// Interaction description
    pub description: String,
    /// Provider state it required
    pub provider_state: Option<String>,
    /// Violations found, empty when the provider honoured the interaction
    pub mismatches: Vec<Mismatch>,
}

impl InteractionResult {
    /// Whether the provider honoured the interaction
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcome of replaying a whole pact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Per-interaction results in pact order
    pub results: Vec<InteractionResult>,
}

impl VerificationReport {
    /// Whether every interaction passed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(InteractionResult::passed)
    }

    /// Results that did not pass
    pub fn failures(&self) -> impl Iterator<Item = &InteractionResult> {
        self.results.iter().filter(|result| !result.passed())
    }

    /// Human-readable listing of every result
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Verifying pact between {} and {}\n",
            self.consumer, self.provider
        );
        for result in &self.results {
            let state = result.provider_state.as_deref().unwrap_or("no state");
            let verdict = if result.passed() { "OK" } else { "FAILED" };
            let _ = writeln!(out, "  {} [{state}]: {verdict}", result.description);
            for mismatch in &result.mismatches {
                let _ = writeln!(out, "      {mismatch}");
            }
        }
        out
    }

    /// Turn a failing report into [`ClientError::VerificationFailed`]
    ///
    /// # Errors
    ///
    /// Fails when at least one interaction did not pass.
    pub fn into_result(self) -> Result<Self> {
        let failures = self.failures().count();
        if failures == 0 {
            Ok(self)
        } else {
            Err(ClientError::VerificationFailed {
                failures,
                summary: self.summary(),
            })
        }
    }
}

/// Checks a running provider against a pact
pub struct ProviderVerifier {
    base_url: String,
    transport: Arc<dyn Transport>,
    states: Arc<dyn ProviderStateHandler>,
}

impl ProviderVerifier {
    /// Verifier for the provider at `base_url` (e.g. `http://localhost:8080`)
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            states: Arc::new(NoProviderStates),
        }
    }

    /// Use `states` to prepare provider states
    #[must_use]
    pub fn with_state_handler(mut self, states: Arc<dyn ProviderStateHandler>) -> Self {
        self.states = states;
        self
    }

    /// Replay every interaction of `pact` in order
    pub async fn verify(&self, pact: &Pact) -> VerificationReport {
        let mut results = Vec::with_capacity(pact.interactions.len());
        for interaction in &pact.interactions {
            let mismatches = self.verify_interaction(interaction).await;
            debug!(
                interaction = %interaction.description,
                mismatches = mismatches.len(),
                "Interaction replayed"
            );
            results.push(InteractionResult {
                description: interaction.description.clone(),
                provider_state: interaction.provider_state.clone(),
                mismatches,
            });
        }

        let report = VerificationReport {
            consumer: pact.consumer.name.clone(),
            provider: pact.provider.name.clone(),
            results,
        };
        info!(
            consumer = %report.consumer,
            provider = %report.provider,
            passed = report.is_success(),
            "Pact verification finished"
        );
        report
    }

    async fn verify_interaction(&self, interaction: &Interaction) -> Vec<Mismatch> {
        if let Some(state) = &interaction.provider_state {
            if let Err(err) = self.states.set_up(state).await {
                return vec![Mismatch::new("state", format!("failed to set up '{state}': {err}"))];
            }
        }

        if !interaction.request.method.eq_ignore_ascii_case("GET") {
            return vec![Mismatch::new(
                "method",
                format!("cannot replay {} requests", interaction.request.method),
            )];
        }

        let url = format!("{}{}", self.base_url, interaction.request.path.example());
        match self
            .transport
            .get(&url, &interaction.request.header_pairs())
            .await
        {
            Ok(response) => interaction.response.check(&response),
            Err(err) => vec![Mismatch::new("request", err.to_string())],
        }
    }
}

impl std::fmt::Debug for ProviderVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderVerifier")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
