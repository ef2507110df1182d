//! User-facing notification channel for terminal session failures.

mod notifier;

pub use notifier::{
    BroadcastNotifier, LogNotifier, SessionEvent, SessionNotifier, SESSION_EXPIRED_MESSAGE,
};
