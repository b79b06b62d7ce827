//! Identity-proof verification client
//!
//! The proof itself is opaque to us; the upstream verifier accepts a proof
//! bundle and answers valid/invalid with a reason. Network trouble is an
//! invalid verdict, never an error: an unreachable verifier must not take
//! the game down with it.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct ProofBundle {
    pub proof: String,
    pub merkle_root: String,
    pub nullifier_hash: String,
}

#[derive(Debug, Clone)]
pub struct Verdict {
    pub valid: bool,
    pub reason: Option<String>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    proof: &'a str,
    merkle_root: &'a str,
    nullifier_hash: &'a str,
    action: &'a str,
}

#[derive(Deserialize)]
struct VerifyError {
    detail: Option<String>,
}

#[derive(Clone)]
pub struct IdentityVerifier {
    client: reqwest::Client,
    endpoint: String,
    action: String,
}

impl IdentityVerifier {
    pub fn new(endpoint: String, action: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            action,
        }
    }

    pub async fn verify(&self, bundle: &ProofBundle) -> Verdict {
        let request = VerifyRequest {
            proof: &bundle.proof,
            merkle_root: &bundle.merkle_root,
            nullifier_hash: &bundle.nullifier_hash,
            action: &self.action,
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "identity verifier unreachable");
                return Verdict {
                    valid: false,
                    reason: Some("network error during verification".to_string()),
                };
            }
        };

        if response.status().is_success() {
            return Verdict {
                valid: true,
                reason: None,
            };
        }

        let reason = response
            .json::<VerifyError>()
            .await
            .ok()
            .and_then(|e| e.detail)
            .unwrap_or_else(|| "verification failed".to_string());

        Verdict {
            valid: false,
            reason: Some(reason),
        }
    }
}
