//! crates/webshell_core/src/notify.rs
//!
//! Local notifications and push delivery to this device's push token.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::domain::{LocalNotification, PushMessage};
use crate::ports::{NotificationService, PortError, PortResult};

/// Delay of the sample local notification.
pub const TEST_NOTIFICATION_DELAY: Duration = Duration::from_secs(5);

impl LocalNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, delay: Duration) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Null,
            delay,
        }
    }

    /// The sample notification shown five seconds after scheduling.
    pub fn sample() -> Self {
        Self {
            data: json!({ "data": "goes here" }),
            ..Self::new("Test", "A local notification has arrived!", TEST_NOTIFICATION_DELAY)
        }
    }
}

pub struct Notifier {
    service: Arc<dyn NotificationService>,
}

impl Notifier {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }

    pub async fn schedule(&self, notification: LocalNotification) -> PortResult<()> {
        info!(title = %notification.title, delay_secs = notification.delay.as_secs(), "Scheduling local notification");
        self.service.schedule_local(notification).await
    }

    /// Sends a push addressed to this device's own push token.
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` when no push token is known; otherwise whatever
    /// the delivery reports.
    pub async fn push_to_self(&self, title: &str, body: &str) -> PortResult<PushMessage> {
        let token = self
            .service
            .device_push_token()
            .await
            .ok_or_else(|| PortError::NotFound("device push token".into()))?;
        let message = PushMessage::new(token, title, body);
        self.service.send_push(&message).await?;
        info!(title, "Push notification sent");
        Ok(message)
    }
}
