//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{
    BiometricKind, BiometricOutcome, LocalNotification, MediaAsset, MediaSource,
    NativeTokenRegistration, Permission, PermissionStatus, PushMessage,
};
use crate::ports::{
    BiometricService, DeviceService, DurableStorage, LinkOpener, NotificationService, PortError,
    PortResult, PushRegistrar, ScriptInjector,
};

#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStorage {
    pub fn insert(&self, key: &str, value: &str) {
        self.items.lock().unwrap().insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap().get(key).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Storage("disk full".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Storage("i/o error".into()));
        }
        Ok(self.raw(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        self.check()?;
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRegistrar {
    calls: Mutex<Vec<(String, NativeTokenRegistration)>>,
    reject_status: AtomicU16,
}

impl RecordingRegistrar {
    pub fn calls(&self) -> Vec<(String, NativeTokenRegistration)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reject_with(&self, status: u16) {
        self.reject_status.store(status, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushRegistrar for RecordingRegistrar {
    async fn register_native_token(
        &self,
        bearer_token: &str,
        registration: &NativeTokenRegistration,
    ) -> PortResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((bearer_token.to_string(), registration.clone()));
        match self.reject_status.load(Ordering::SeqCst) {
            0 => Ok(()),
            status => Err(PortError::Rejected(status)),
        }
    }
}

#[derive(Default)]
pub struct RecordingInjector {
    scripts: Mutex<Vec<String>>,
}

impl RecordingInjector {
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptInjector for RecordingInjector {
    async fn inject_javascript(&self, script: &str) -> PortResult<()> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkOpener for RecordingOpener {
    async fn open_url(&self, url: &str) -> PortResult<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Vibrate,
    Permission(Permission),
    Picker(MediaSource),
    Alert(String, String),
}

pub struct FakeDevice {
    calls: Mutex<Vec<DeviceCall>>,
    camera: PermissionStatus,
    library: PermissionStatus,
}

impl FakeDevice {
    pub fn granting() -> Self {
        Self::with(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn with(camera: PermissionStatus, library: PermissionStatus) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            camera,
            library,
        }
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DeviceService for FakeDevice {
    async fn vibrate(&self) -> PortResult<()> {
        self.record(DeviceCall::Vibrate);
        Ok(())
    }

    async fn request_permission(&self, permission: Permission) -> PortResult<PermissionStatus> {
        self.record(DeviceCall::Permission(permission));
        Ok(match permission {
            Permission::Camera => self.camera,
            Permission::MediaLibrary => self.library,
        })
    }

    async fn launch_picker(&self, source: MediaSource) -> PortResult<Option<MediaAsset>> {
        self.record(DeviceCall::Picker(source));
        Ok(Some(MediaAsset {
            uri: "file:///tmp/photo.jpg".into(),
        }))
    }

    async fn alert(&self, title: &str, message: &str) -> PortResult<()> {
        self.record(DeviceCall::Alert(title.into(), message.into()));
        Ok(())
    }
}

pub struct FakeBiometrics {
    pub hardware: bool,
    pub kinds: Vec<BiometricKind>,
    pub outcome: BiometricOutcome,
    prompts: Mutex<Vec<String>>,
}

impl FakeBiometrics {
    pub fn new(hardware: bool, kinds: Vec<BiometricKind>, outcome: BiometricOutcome) -> Self {
        Self {
            hardware,
            kinds,
            outcome,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BiometricService for FakeBiometrics {
    async fn has_hardware(&self) -> PortResult<bool> {
        Ok(self.hardware)
    }

    async fn supported_kinds(&self) -> PortResult<Vec<BiometricKind>> {
        Ok(self.kinds.clone())
    }

    async fn authenticate(&self, prompt: &str) -> PortResult<BiometricOutcome> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.outcome.clone())
    }
}

#[derive(Default)]
pub struct FakeNotifications {
    pub push_token: Option<String>,
    scheduled: Mutex<Vec<LocalNotification>>,
    pushed: Mutex<Vec<PushMessage>>,
}

impl FakeNotifications {
    pub fn with_token(token: &str) -> Self {
        Self {
            push_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn scheduled(&self) -> Vec<LocalNotification> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<PushMessage> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for FakeNotifications {
    async fn schedule_local(&self, notification: LocalNotification) -> PortResult<()> {
        self.scheduled.lock().unwrap().push(notification);
        Ok(())
    }

    async fn send_push(&self, message: &PushMessage) -> PortResult<()> {
        self.pushed.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn device_push_token(&self) -> Option<String> {
        self.push_token.clone()
    }
}
