//! services/shell/src/adapters/push.rs
//!
//! HTTP adapters for push: registering the device token with the backend and
//! delivering push messages through the Expo push service.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING};
use reqwest::Client;
use tracing::{debug, warn};
use webshell_core::domain::{NativeTokenRegistration, PushMessage};
use webshell_core::ports::{PortError, PortResult, PushRegistrar};

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("HTTP request failed: {e}"))
}

fn check_status(response: &reqwest::Response, what: &str) -> PortResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        warn!(status = status.as_u16(), what, "Request rejected");
        Err(PortError::Rejected(status.as_u16()))
    }
}

//=========================================================================================
// Native token registration
//=========================================================================================

/// `POST {api_base}/api/users/native-token` with bearer auth.
#[derive(Clone)]
pub struct HttpPushRegistrar {
    client: Client,
    endpoint: String,
}

impl HttpPushRegistrar {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushRegistrar for HttpPushRegistrar {
    async fn register_native_token(
        &self,
        bearer_token: &str,
        registration: &NativeTokenRegistration,
    ) -> PortResult<()> {
        debug!(endpoint = %self.endpoint, user_id = %registration.user_id, "Registering native token");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer_token)
            .json(registration)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(&response, "native token registration")
    }
}

//=========================================================================================
// Push delivery
//=========================================================================================

#[derive(Clone)]
pub struct ExpoPushClient {
    client: Client,
    url: String,
}

impl ExpoPushClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn send(&self, message: &PushMessage) -> PortResult<()> {
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .json(message)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(&response, "push delivery")
    }
}
