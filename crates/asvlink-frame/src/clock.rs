//! Process-wide time origin.
//!
//! Every `system_time` field is `now - origin` in milliseconds. The origin is
//! owned by exactly one [`TimeOrigin`]; writing requires `&mut` access, so only
//! whoever holds it (the sync client) can move the origin. Frame writers and
//! other readers get cheap [`OriginHandle`] clones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix epoch milliseconds.
pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Exclusive owner of the time origin.
#[derive(Debug)]
pub struct TimeOrigin {
    epoch_ms: Arc<AtomicU64>,
}

impl TimeOrigin {
    /// Origin fixed at the current instant (the process start default).
    pub fn starting_now() -> Self {
        Self::at(unix_millis_now())
    }

    /// Origin fixed at `epoch_ms` Unix epoch milliseconds.
    pub fn at(epoch_ms: u64) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicU64::new(epoch_ms)),
        }
    }

    /// Read-only handle that follows later `set_origin` calls.
    pub fn handle(&self) -> OriginHandle {
        OriginHandle {
            epoch_ms: Arc::clone(&self.epoch_ms),
        }
    }

    pub fn get_origin(&self) -> u64 {
        self.epoch_ms.load(Ordering::Acquire)
    }

    /// Move the origin. A single store, so readers see either the old or the
    /// new value, never a mix.
    pub fn set_origin(&mut self, epoch_ms: u64) {
        self.epoch_ms.store(epoch_ms, Ordering::Release);
        tracing::debug!(origin_ms = epoch_ms, "time origin updated");
    }
}

impl Default for TimeOrigin {
    fn default() -> Self {
        Self::starting_now()
    }
}

/// Shared read access to a [`TimeOrigin`].
#[derive(Debug, Clone)]
pub struct OriginHandle {
    epoch_ms: Arc<AtomicU64>,
}

impl OriginHandle {
    pub fn get_origin(&self) -> u64 {
        self.epoch_ms.load(Ordering::Acquire)
    }

    /// Origin in whole Unix seconds, as carried by a sync response.
    pub fn origin_secs(&self) -> u32 {
        (self.get_origin() / 1000) as u32
    }

    /// Milliseconds elapsed since the origin.
    ///
    /// Clamps to zero if the origin lies in the future and wraps after
    /// roughly 49.7 days, matching the 32-bit wire field.
    pub fn system_time(&self) -> u32 {
        unix_millis_now().saturating_sub(self.get_origin()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_follows_owner() {
        let mut origin = TimeOrigin::at(1_000);
        let handle = origin.handle();
        let other = handle.clone();
        assert_eq!(handle.get_origin(), 1_000);

        origin.set_origin(5_000);
        assert_eq!(origin.get_origin(), 5_000);
        assert_eq!(handle.get_origin(), 5_000);
        assert_eq!(other.get_origin(), 5_000);
    }

    #[test]
    fn test_system_time_is_relative() {
        let now = unix_millis_now();
        let origin = TimeOrigin::at(now - 2_000);
        let elapsed = origin.handle().system_time();
        assert!((2_000..3_000).contains(&elapsed), "elapsed {elapsed}");
    }

    #[test]
    fn test_future_origin_clamps_to_zero() {
        let origin = TimeOrigin::at(unix_millis_now() + 60_000);
        assert_eq!(origin.handle().system_time(), 0);
    }

    #[test]
    fn test_origin_secs() {
        let origin = TimeOrigin::at(1_700_000_000_999);
        assert_eq!(origin.handle().origin_secs(), 1_700_000_000);
    }
}
