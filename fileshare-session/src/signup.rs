//! Registration flow.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use fileshare_core::error::Result;
use fileshare_core::traits::RegistryClient;
use fileshare_core::types::{Identity, TransactionReceipt};

use crate::state::{FailureReason, SignupState};

/// How a signup completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignupOutcome {
    /// The pre-check found the identity registered; no transaction was sent.
    AlreadyRegistered,
    /// `signup()` was mined.
    Registered {
        /// Ledger transaction
        transaction: TransactionReceipt,
    },
}

/// Registers an identity, skipping the call when it is already registered.
pub struct SignupFlow {
    registry: Arc<dyn RegistryClient>,
    state: RwLock<SignupState>,
}

impl SignupFlow {
    /// Creates a flow over the given registry.
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            state: RwLock::new(SignupState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> SignupState {
        self.state.read().clone()
    }

    /// Runs the flow for `identity`.
    #[instrument(skip(self))]
    pub async fn sign_up(&self, identity: &Identity) -> Result<SignupOutcome> {
        let result = self.run(identity).await;
        match &result {
            Ok(_) => *self.state.write() = SignupState::Registered,
            Err(e) => {
                warn!(error = %e, "Signup failed");
                *self.state.write() = SignupState::Failed {
                    reason: FailureReason::from(e),
                };
            }
        }
        result
    }

    async fn run(&self, identity: &Identity) -> Result<SignupOutcome> {
        if self.registry.is_registered(identity).await? {
            info!("Already registered, skipping signup");
            return Ok(SignupOutcome::AlreadyRegistered);
        }

        *self.state.write() = SignupState::Registering;
        let transaction = self.registry.register(identity).await?;
        info!(tx_hash = %transaction.tx_hash, "Registered");
        Ok(SignupOutcome::Registered { transaction })
    }

    /// Resets to `Idle`, e.g. after the active account changed.
    pub fn reset(&self) {
        *self.state.write() = SignupState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_core::error::FileshareError;
    use fileshare_registry::MemoryRegistry;

    fn alice() -> Identity {
        Identity::new("0x00000000000000000000000000000000000000a1").unwrap()
    }

    #[tokio::test]
    async fn test_signup_registers() {
        let registry = Arc::new(MemoryRegistry::new());
        let flow = SignupFlow::new(registry.clone());

        let outcome = flow.sign_up(&alice()).await.unwrap();
        assert!(matches!(outcome, SignupOutcome::Registered { .. }));
        assert_eq!(flow.state(), SignupState::Registered);
        assert!(registry.is_registered(&alice()).await.unwrap());
    }

    #[tokio::test]
    async fn test_signup_skips_when_registered() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.register(&alice()).await.unwrap();
        let flow = SignupFlow::new(registry.clone());

        let outcome = flow.sign_up(&alice()).await.unwrap();
        assert_eq!(outcome, SignupOutcome::AlreadyRegistered);
        assert_eq!(registry.register_calls(), 1);
        assert_eq!(flow.state(), SignupState::Registered);
    }

    #[tokio::test]
    async fn test_signup_connection_lost() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set_online(false);
        let flow = SignupFlow::new(registry.clone());

        let result = flow.sign_up(&alice()).await;
        assert!(matches!(result, Err(FileshareError::ConnectionLost(_))));
        match flow.state() {
            SignupState::Failed { reason } => {
                assert_eq!(reason.code, "CONNECTION_LOST");
                assert!(reason.retryable);
            }
            other => panic!("unexpected state {:?}", other),
        }

        registry.set_online(true);
        assert!(flow.sign_up(&alice()).await.is_ok());
    }
}
