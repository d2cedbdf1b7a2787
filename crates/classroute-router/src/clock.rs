//! Wall-clock access for time-restricted rules and access logs

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Local, Timelike, Utc};

pub trait Clock: Send + Sync {
    /// Local wall-clock hour, 0–23
    fn current_hour(&self) -> u32;

    /// Timestamp recorded in access logs
    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The machine's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Clock pinned to an hour, adjustable between navigations
#[derive(Debug)]
pub struct FixedClock {
    hour: AtomicU32,
}

impl FixedClock {
    pub fn at_hour(hour: u32) -> Self {
        Self {
            hour: AtomicU32::new(hour % 24),
        }
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn current_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::at_hour(9);
        assert_eq!(clock.current_hour(), 9);
        clock.set_hour(25);
        assert_eq!(clock.current_hour(), 1);
    }

    #[test]
    fn test_system_clock_in_range() {
        assert!(SystemClock.current_hour() < 24);
    }
}
