//! Session lifecycle and diagnostics (§4.8).
//!
//! Wraps the atomic session id/active flag from `scan-models` with the
//! diagnostics map the host reads for UI/telemetry, rate-limiting writes to
//! at most once per second per field except for monotone state transitions.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use scan_models::Session;

const DIAGNOSTIC_WRITE_INTERVAL: Duration = Duration::from_secs(1);

/// Coarse lifecycle label surfaced to the host for UI/telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Bound,
    Scanning,
    Stalled,
    Failed,
}

/// One textual or numeric diagnostics field, last-written timestamp
/// included so updates can be rate-limited independently per field.
#[derive(Debug, Clone)]
struct DiagnosticField {
    value: String,
    last_written: Instant,
}

/// Reasons the watchdog can report when frames stop arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallReason {
    NoFrames,
}

pub struct SessionController {
    session: Session,
    fields: HashMap<&'static str, DiagnosticField>,
    lifecycle: Lifecycle,
    missed_watchdog_checks: u32,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            session: Session::new(),
            fields: HashMap::new(),
            lifecycle: Lifecycle::Idle,
            missed_watchdog_checks: 0,
        }
    }

    pub fn start_session(&mut self) -> u64 {
        self.missed_watchdog_checks = 0;
        self.session.start()
    }

    pub fn stop_session(&mut self) {
        self.session.stop();
    }

    pub fn current_id(&self) -> u64 {
        self.session.current_id()
    }

    pub fn is_valid(&self, id: u64) -> bool {
        self.session.is_valid(id)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Monotone state transitions (bound, failed, …) are never rate-limited;
    /// only per-field value updates on the same transition are.
    pub fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    /// Rate-limited diagnostics write: at most once per second per field,
    /// identified by `key`.
    pub fn update_field(&mut self, key: &'static str, value: impl Into<String>) {
        let now = Instant::now();
        let should_write = match self.fields.get(key) {
            Some(existing) => now.duration_since(existing.last_written) >= DIAGNOSTIC_WRITE_INTERVAL,
            None => true,
        };
        if should_write {
            self.fields.insert(
                key,
                DiagnosticField {
                    value: value.into(),
                    last_written: now,
                },
            );
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.value.as_str())
    }

    /// Called by the watchdog timer (design interval 2s). Returns the
    /// resulting stall reason once the watchdog has missed `max_misses`
    /// consecutive checks with no frames.
    pub fn watchdog_tick(&mut self, frames_arrived_since_last_tick: bool, max_misses: u32) -> Option<StallReason> {
        if frames_arrived_since_last_tick {
            self.missed_watchdog_checks = 0;
            return None;
        }
        self.missed_watchdog_checks += 1;
        if self.missed_watchdog_checks >= max_misses {
            self.lifecycle = Lifecycle::Failed;
            Some(StallReason::NoFrames)
        } else {
            self.lifecycle = Lifecycle::Stalled;
            None
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_increase_monotonically() {
        let mut controller = SessionController::new();
        let a = controller.start_session();
        controller.stop_session();
        let b = controller.start_session();
        assert!(b > a);
    }

    #[test]
    fn stale_id_invalid_after_restart() {
        let mut controller = SessionController::new();
        let stale = controller.start_session();
        controller.stop_session();
        controller.start_session();
        assert!(!controller.is_valid(stale));
    }

    #[test]
    fn diagnostics_write_once_immediately() {
        let mut controller = SessionController::new();
        controller.update_field("fps", "30");
        assert_eq!(controller.field("fps"), Some("30"));
    }

    #[test]
    fn watchdog_transitions_to_failed_after_max_misses() {
        let mut controller = SessionController::new();
        assert_eq!(controller.watchdog_tick(false, 3), None);
        assert_eq!(controller.watchdog_tick(false, 3), None);
        assert_eq!(controller.watchdog_tick(false, 3), Some(StallReason::NoFrames));
        assert_eq!(controller.lifecycle(), Lifecycle::Failed);
    }

    #[test]
    fn watchdog_resets_on_frame_arrival() {
        let mut controller = SessionController::new();
        controller.watchdog_tick(false, 3);
        controller.watchdog_tick(true, 3);
        assert_eq!(controller.watchdog_tick(false, 3), None);
    }
}
