//! crates/webshell_core/src/bootstrap.rs
//!
//! Startup and foreground handling: the biometric gate, session
//! revalidation and the choice between the login surface and the main tabs.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{AppLifecycle, BiometricKind, BiometricOutcome, Surface, Tab};
use crate::ports::BiometricService;
use crate::session::SessionStore;

pub const DEFAULT_BIOMETRIC_PROMPT: &str = "Authenticate with your biometrics to continue.";

/// How a failed or unavailable biometric check affects startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiometricPolicy {
    /// Never prompt.
    Skip,
    /// Prompt when supported hardware exists, proceed whatever the result.
    #[default]
    Advisory,
    /// Stay locked unless the prompt succeeds.
    Required,
}

impl FromStr for BiometricPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "advisory" => Ok(Self::Advisory),
            "required" => Ok(Self::Required),
            other => Err(format!("unknown biometric policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub web_base_url: String,
    pub login_path: String,
    pub tabs: Vec<Tab>,
    pub biometric_policy: BiometricPolicy,
    pub biometric_prompt: String,
}

impl BootstrapConfig {
    /// Tabs `home` (/onboarding), `community` and `mypage` on `web_base_url`.
    pub fn with_default_tabs(web_base_url: impl Into<String>) -> Self {
        let web_base_url = web_base_url.into();
        let tab = |name: &str, title: &str, path: &str| Tab {
            name: name.to_string(),
            title: title.to_string(),
            url: join_url(&web_base_url, path),
        };
        let tabs = vec![
            tab("home", "Home", "/onboarding"),
            tab("community", "Community", "/community"),
            tab("mypage", "My Page", "/mypage"),
        ];
        Self {
            web_base_url,
            login_path: "/login".to_string(),
            tabs,
            biometric_policy: BiometricPolicy::default(),
            biometric_prompt: DEFAULT_BIOMETRIC_PROMPT.to_string(),
        }
    }

    pub fn login_url(&self) -> String {
        join_url(&self.web_base_url, &self.login_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub struct AppBootstrap {
    store: Arc<SessionStore>,
    biometrics: Arc<dyn BiometricService>,
    config: BootstrapConfig,
    unlocked: AtomicBool,
}

impl AppBootstrap {
    pub fn new(
        store: Arc<SessionStore>,
        biometrics: Arc<dyn BiometricService>,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            store,
            biometrics,
            config,
            unlocked: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Runs the biometric gate, revalidates the session and returns the surface to show.
    pub async fn start(&self) -> Surface {
        let unlocked = match self.config.biometric_policy {
            BiometricPolicy::Skip => true,
            BiometricPolicy::Advisory => {
                let outcome = self.biometric_gate().await;
                if !outcome.is_success() {
                    info!(?outcome, "Biometric check did not pass; continuing");
                }
                true
            }
            BiometricPolicy::Required => {
                let outcome = self.biometric_gate().await;
                if !outcome.is_success() {
                    warn!(?outcome, "Biometric check failed; staying locked");
                }
                outcome.is_success()
            }
        };
        self.unlocked.store(unlocked, Ordering::SeqCst);

        if !unlocked {
            return Surface::Locked;
        }

        let logged_in = self.store.initialize_auth().await;
        info!(logged_in, "Bootstrap complete");
        self.surface_for(logged_in)
    }

    /// `Active` revalidates the session; other transitions change nothing.
    pub async fn on_lifecycle(&self, state: AppLifecycle) -> Option<Surface> {
        match state {
            AppLifecycle::Active => {
                if !self.unlocked.load(Ordering::SeqCst) {
                    debug!("Foregrounded while locked; ignoring");
                    return Some(Surface::Locked);
                }
                let logged_in = self.store.initialize_auth().await;
                debug!(logged_in, "Session revalidated on foreground");
                Some(self.surface_for(logged_in))
            }
            AppLifecycle::Inactive | AppLifecycle::Background => None,
        }
    }

    pub async fn surface(&self) -> Surface {
        if !self.unlocked.load(Ordering::SeqCst) {
            return Surface::Locked;
        }
        self.surface_for(self.store.is_logged_in().await)
    }

    /// A one-off biometric check, outside the startup gate.
    pub async fn authenticate_biometric(&self, prompt: &str) -> BiometricOutcome {
        match self.biometrics.has_hardware().await {
            Ok(true) => {}
            Ok(false) => return BiometricOutcome::Unavailable,
            Err(e) => {
                warn!(error = %e, "Biometric hardware query failed");
                return BiometricOutcome::Unavailable;
            }
        }
        match self.biometrics.authenticate(prompt).await {
            Ok(outcome) => outcome,
            Err(e) => BiometricOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Prompts only when fingerprint or face recognition is available.
    async fn biometric_gate(&self) -> BiometricOutcome {
        match self.biometrics.has_hardware().await {
            Ok(true) => {}
            Ok(false) => return BiometricOutcome::Unavailable,
            Err(e) => {
                warn!(error = %e, "Biometric hardware query failed");
                return BiometricOutcome::Unavailable;
            }
        }

        let kinds = match self.biometrics.supported_kinds().await {
            Ok(kinds) => kinds,
            Err(e) => {
                warn!(error = %e, "Biometric kind query failed");
                return BiometricOutcome::Unavailable;
            }
        };
        let supported = kinds
            .iter()
            .any(|k| matches!(k, BiometricKind::Fingerprint | BiometricKind::FacialRecognition));
        if !supported {
            return BiometricOutcome::Unavailable;
        }

        match self.biometrics.authenticate(&self.config.biometric_prompt).await {
            Ok(outcome) => outcome,
            Err(e) => BiometricOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    fn surface_for(&self, logged_in: bool) -> Surface {
        if logged_in {
            Surface::Main {
                tabs: self.config.tabs.clone(),
            }
        } else {
            Surface::Authentication {
                url: self.config.login_url(),
            }
        }
    }
}
