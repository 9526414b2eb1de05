//! crates/webshell_core/src/navigation.rs
//!
//! Decides whether a navigation request stays inside the embedded surface or
//! is handed to the operating system.
//!
//! Matching is plain substring containment against the configured patterns.
//! An in-app locator that happens to contain a listed fragment (for example a
//! `/card` path on a listed host) is handed off as well.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{NavigationDecision, NavigationRequest};
use crate::ports::LinkOpener;

/// Map providers, ride-hailing/chat deep-link schemes and the card pages of
/// the known hosts.
pub const DEFAULT_EXTERNAL_PATTERNS: &[&str] = &[
    "map.naver.com",
    "maps.google.com",
    "www.google.com/maps",
    "tmap://",
    "kakaotalk://",
    "kakaomap://",
    "http://192.168.0.4:3003/card",
    "http://1.234.44.179:3004/card",
    "http://1.234.44.179:3003/card",
];

#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    patterns: Vec<String>,
}

impl NavigationPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn classify(&self, url: &str) -> NavigationDecision {
        if self.patterns.iter().any(|p| url.contains(p.as_str())) {
            NavigationDecision::HandOffToOs
        } else {
            NavigationDecision::LoadInPlace
        }
    }
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTERNAL_PATTERNS.iter().copied())
    }
}

pub struct NavigationGate {
    policy: NavigationPolicy,
    opener: Arc<dyn LinkOpener>,
}

impl NavigationGate {
    pub fn new(policy: NavigationPolicy, opener: Arc<dyn LinkOpener>) -> Self {
        Self { policy, opener }
    }

    pub fn policy(&self) -> &NavigationPolicy {
        &self.policy
    }

    /// `true` lets the surface load the request. On `false` the locator is
    /// passed to the OS handler on a detached task; the answer never waits
    /// for the handler.
    pub async fn should_load_in_place(&self, request: &NavigationRequest) -> bool {
        match self.policy.classify(&request.url) {
            NavigationDecision::LoadInPlace => true,
            NavigationDecision::HandOffToOs => {
                info!(url = %request.url, "Handing navigation to the OS");
                let opener = self.opener.clone();
                let url = request.url.clone();
                tokio::spawn(async move {
                    if let Err(e) = opener.open_url(&url).await {
                        warn!(url = %url, error = %e, "OS link handler failed");
                    }
                });
                false
            }
        }
    }
}
