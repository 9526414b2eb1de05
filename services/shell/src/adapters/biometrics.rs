//! services/shell/src/adapters/biometrics.rs
//!
//! Biometric capabilities of the host as declared in configuration. A host
//! with no declared kinds reports no hardware.

use async_trait::async_trait;
use tracing::info;
use webshell_core::domain::{BiometricKind, BiometricOutcome};
use webshell_core::ports::{BiometricService, PortResult};

#[derive(Clone, Debug)]
pub struct HostBiometrics {
    kinds: Vec<BiometricKind>,
    outcome: BiometricOutcome,
}

impl HostBiometrics {
    pub fn new(kinds: Vec<BiometricKind>, outcome: BiometricOutcome) -> Self {
        Self { kinds, outcome }
    }
}

#[async_trait]
impl BiometricService for HostBiometrics {
    async fn has_hardware(&self) -> PortResult<bool> {
        Ok(!self.kinds.is_empty())
    }

    async fn supported_kinds(&self) -> PortResult<Vec<BiometricKind>> {
        Ok(self.kinds.clone())
    }

    async fn authenticate(&self, prompt: &str) -> PortResult<BiometricOutcome> {
        info!(prompt, outcome = ?self.outcome, "Biometric prompt");
        Ok(self.outcome.clone())
    }
}
