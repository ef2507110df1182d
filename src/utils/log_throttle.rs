//! Keeps bursty log events (e.g. a page load where every call waits on the same
//! refresh) down to one line per window, reporting how many were skipped.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    suppressed: u64,
}

static WINDOWS: OnceLock<Mutex<HashMap<&'static str, Window>>> = OnceLock::new();

/// Returns `Some(suppressed_count)` when the event named `key` should be logged,
/// or `None` when it falls inside the current window and is only counted.
pub fn should_emit(key: &'static str, interval: Duration) -> Option<u64> {
    let mut windows = WINDOWS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let now = Instant::now();

    let Some(window) = windows.get_mut(key) else {
        windows.insert(
            key,
            Window {
                opened_at: now,
                suppressed: 0,
            },
        );
        return Some(0);
    };
    if now.duration_since(window.opened_at) >= interval {
        let suppressed = std::mem::take(&mut window.suppressed);
        window.opened_at = now;
        return Some(suppressed);
    }
    window.suppressed += 1;
    None
}

#[cfg(test)]
mod tests {
    use super::should_emit;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_first_event_emits_then_window_suppresses() {
        let key = "test.log_throttle.window";
        let interval = Duration::from_millis(40);

        assert_eq!(should_emit(key, interval), Some(0));
        assert_eq!(should_emit(key, interval), None);
        assert_eq!(should_emit(key, interval), None);

        sleep(Duration::from_millis(50));
        assert_eq!(should_emit(key, interval), Some(2));
        assert_eq!(should_emit(key, interval), None);
    }

    #[test]
    fn test_keys_have_independent_windows() {
        let interval = Duration::from_secs(60);
        assert_eq!(should_emit("test.log_throttle.a", interval), Some(0));
        assert_eq!(should_emit("test.log_throttle.b", interval), Some(0));
        assert_eq!(should_emit("test.log_throttle.a", interval), None);
    }
}
