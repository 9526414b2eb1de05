pub mod bootstrap;
pub mod bridge;
pub mod domain;
pub mod navigation;
pub mod notify;
pub mod ports;
pub mod scripts;
pub mod session;
pub mod token;

#[cfg(test)]
mod testing;

pub use bootstrap::{AppBootstrap, BiometricPolicy, BootstrapConfig};
pub use bridge::{BridgeDispatcher, BridgeOptions, DispatchOutcome};
pub use domain::{
    AppLifecycle, LocalNotification, NavigationDecision, NavigationRequest, PushMessage, Session,
    Surface, Tab, User,
};
pub use navigation::{NavigationGate, NavigationPolicy};
pub use notify::Notifier;
pub use ports::{
    BiometricService, DeviceService, DurableStorage, LinkOpener, NotificationService, PortError,
    PortResult, PushRegistrar, ScriptInjector,
};
pub use session::SessionStore;
