//! services/shell/src/adapters/notifications.rs
//!
//! Notifications on the host: local notifications are broadcast to every
//! connected surface once their delay elapses, push messages go out through
//! the Expo push service.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};
use webshell_core::domain::{LocalNotification, PushMessage};
use webshell_core::ports::{NotificationService, PortResult};

use crate::adapters::push::ExpoPushClient;
use crate::web::protocol::HostFrame;

pub struct HostNotifications {
    frames: broadcast::Sender<HostFrame>,
    push: ExpoPushClient,
    device_push_token: Option<String>,
}

impl HostNotifications {
    pub fn new(
        frames: broadcast::Sender<HostFrame>,
        push: ExpoPushClient,
        device_push_token: Option<String>,
    ) -> Self {
        Self {
            frames,
            push,
            device_push_token,
        }
    }
}

#[async_trait]
impl NotificationService for HostNotifications {
    async fn schedule_local(&self, notification: LocalNotification) -> PortResult<()> {
        let frames = self.frames.clone();
        tokio::spawn(async move {
            tokio::time::sleep(notification.delay).await;
            info!(title = %notification.title, "Local notification due");
            if frames.send(HostFrame::Notification { notification }).is_err() {
                debug!("No surface connected to receive the notification");
            }
        });
        Ok(())
    }

    async fn send_push(&self, message: &PushMessage) -> PortResult<()> {
        self.push.send(message).await
    }

    async fn device_push_token(&self) -> Option<String> {
        self.device_push_token.clone()
    }
}
