//! Minimum-interval gate between two translations.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// A slot taken from a [`RateGate`].
///
/// Hand it back with [`RateGate::release`] when the translation it was
/// reserved for did not go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    at: Instant,
    previous: Option<Instant>,
}

/// Enforces a minimum interval between reserved sends.
///
/// Checking and reserving happen under one lock, so two callers can never
/// both pass inside the same interval.
#[derive(Debug)]
pub struct RateGate {
    interval: Option<Duration>,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Reserve the slot at `now`.
    ///
    /// Returns `Ok(None)` when no interval is configured and `Err(remaining)`
    /// while the previous reservation is still too recent.
    pub fn try_reserve(&self, now: Instant) -> Result<Option<Reservation>, Duration> {
        let Some(interval) = self.interval else {
            return Ok(None);
        };

        let mut last = self.last.lock();
        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < interval {
                return Err(interval - elapsed);
            }
        }

        let reservation = Reservation {
            at: now,
            previous: *last,
        };
        *last = Some(now);
        Ok(Some(reservation))
    }

    /// Undo a reservation whose send failed.
    ///
    /// Ignored when a newer reservation has been taken in the meantime.
    pub fn release(&self, reservation: Reservation) {
        let mut last = self.last.lock();
        if *last == Some(reservation.at) {
            *last = reservation.previous;
        }
    }

    pub fn last_send(&self) -> Option<Instant> {
        *self.last.lock()
    }
}
