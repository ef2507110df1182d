use tokio::sync::broadcast;
use tracing::warn;

/// Message shown to the user when the session cannot be renewed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Events published to UI subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Expired { message: String },
}

/// Receives the "session expired" signal once per failed refresh.
pub trait SessionNotifier: Send + Sync {
    fn session_expired(&self, message: &str);
}

/// Emits the expiry as a structured warning.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl SessionNotifier for LogNotifier {
    fn session_expired(&self, message: &str) {
        warn!(
            event_name = "client.session.expired",
            event_domain = "session",
            "{}",
            message
        );
    }
}

/// Fans the expiry out to any number of subscribers (toasts, login redirects).
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SessionEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        BroadcastNotifier { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SessionNotifier for BroadcastNotifier {
    fn session_expired(&self, message: &str) {
        // No subscribers is not an error: nobody is showing a UI.
        let _ = self.sender.send(SessionEvent::Expired {
            message: message.to_string(),
        });
    }
}
