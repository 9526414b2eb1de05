pub mod biometrics;
pub mod links;
pub mod notifications;
pub mod push;
pub mod storage;

pub use biometrics::HostBiometrics;
pub use links::OsLinkOpener;
pub use notifications::HostNotifications;
pub use push::{ExpoPushClient, HttpPushRegistrar};
pub use storage::SqliteStorage;
