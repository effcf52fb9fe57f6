//! Collaborator ports.
//!
//! Downstream consumers (renderer, tables, toasts) and the outbound command
//! transport are injected into the engine as trait objects at startup.
//! Every port has a first-class "absent" implementation, so wiring nothing
//! is an explicit choice rather than a runtime capability probe.

use crate::view::WorldSnapshot;
use async_trait::async_trait;
use delivery_wire::Command;
use serde::Serialize;
use std::sync::Arc;

/// Severity of a user-facing notice, mirroring the toast levels the
/// dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification produced while applying an event.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Receives a fresh snapshot after every state change.
pub trait ViewSink: Send + Sync {
    fn on_update(&self, snapshot: &WorldSnapshot);
}

/// Receives toast-level notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Outbound command channel to the controller.
///
/// Fire-and-forget: `Ok` means the command left this process; the only
/// acknowledgment is the event stream that follows.
#[async_trait]
pub trait CommandPort: Send + Sync {
    async fn send(&self, command: Command) -> Result<(), CommandPortError>;
}

/// The command channel could not carry the command.
#[derive(Debug, Clone, thiserror::Error)]
#[error("command channel not open: {0}")]
pub struct CommandPortError(pub String);

/// View sink that ignores every update.
pub struct NullViewSink;

impl ViewSink for NullViewSink {
    fn on_update(&self, _snapshot: &WorldSnapshot) {}
}

/// Notifier that drops every notice.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &Notice) {}
}

/// Command port with no transport behind it. Every send fails, which makes
/// speculative orders roll back instead of lingering unconfirmed.
pub struct DisconnectedCommandPort;

#[async_trait]
impl CommandPort for DisconnectedCommandPort {
    async fn send(&self, _command: Command) -> Result<(), CommandPortError> {
        Err(CommandPortError("no transport wired".to_string()))
    }
}

/// The full set of collaborators handed to the engine at startup.
#[derive(Clone)]
pub struct EnginePorts {
    pub commands: Arc<dyn CommandPort>,
    pub views: Arc<dyn ViewSink>,
    pub notices: Arc<dyn Notifier>,
}

impl Default for EnginePorts {
    fn default() -> Self {
        Self {
            commands: Arc::new(DisconnectedCommandPort),
            views: Arc::new(NullViewSink),
            notices: Arc::new(NullNotifier),
        }
    }
}

impl EnginePorts {
    pub fn with_commands(mut self, commands: Arc<dyn CommandPort>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_views(mut self, views: Arc<dyn ViewSink>) -> Self {
        self.views = views;
        self
    }

    pub fn with_notifier(mut self, notices: Arc<dyn Notifier>) -> Self {
        self.notices = notices;
        self
    }
}
