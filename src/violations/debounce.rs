//! Per-kind cool-down between repeat violation emissions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::db::models::ViolationKind;

pub struct Debouncer {
    window: Duration,
    last_emitted: HashMap<ViolationKind, DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(window_secs: i64) -> Self {
        Self {
            window: Duration::seconds(window_secs),
            last_emitted: HashMap::new(),
        }
    }

    /// True when an event of this kind may be emitted at `now`; records
    /// the emission. A burst of qualifying frames produces at most one
    /// admitted event per kind per window.
    pub fn admit(&mut self, kind: ViolationKind, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_emitted.get(&kind) {
            if now - *last < self.window {
                return false;
            }
        }
        self.last_emitted.insert(kind, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn repeat_kind_suppressed_inside_window() {
        let mut debouncer = Debouncer::new(3);
        assert!(debouncer.admit(ViolationKind::LookingAway, t0()));
        assert!(!debouncer.admit(ViolationKind::LookingAway, t0() + Duration::seconds(1)));
        assert!(!debouncer.admit(
            ViolationKind::LookingAway,
            t0() + Duration::milliseconds(2999)
        ));
        assert!(debouncer.admit(ViolationKind::LookingAway, t0() + Duration::seconds(3)));
    }

    #[test]
    fn kinds_debounce_independently() {
        let mut debouncer = Debouncer::new(3);
        assert!(debouncer.admit(ViolationKind::NoFace, t0()));
        assert!(debouncer.admit(ViolationKind::TabSwitch, t0()));
        assert!(!debouncer.admit(ViolationKind::NoFace, t0() + Duration::seconds(1)));
        assert!(!debouncer.admit(ViolationKind::TabSwitch, t0() + Duration::seconds(2)));
    }

    #[test]
    fn window_restarts_from_each_emission() {
        let mut debouncer = Debouncer::new(3);
        assert!(debouncer.admit(ViolationKind::MultipleFaces, t0()));
        assert!(debouncer.admit(ViolationKind::MultipleFaces, t0() + Duration::seconds(4)));
        // The second emission reset the window.
        assert!(!debouncer.admit(ViolationKind::MultipleFaces, t0() + Duration::seconds(6)));
        assert!(debouncer.admit(ViolationKind::MultipleFaces, t0() + Duration::seconds(7)));
    }
}
