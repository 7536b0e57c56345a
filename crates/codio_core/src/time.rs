//! Time types for codio.
//!
//! Two millisecond representations exist and never mix implicitly:
//! [`RelativeMs`] is an offset from a recording's (or slice's) own origin,
//! [`EpochMs`] is wall-clock time used only to schedule live playback.
//! Conversion is explicit: `origin.offset_by(relative)` and `absolute.since(origin)`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A point on some millisecond axis
pub trait Timepoint: Copy + Ord + std::fmt::Debug {
    /// Raw milliseconds
    fn as_millis(self) -> u64;

    /// Build from raw milliseconds
    fn from_millis(millis: u64) -> Self;
}

/// Offset in milliseconds from a timeline's origin
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RelativeMs(pub u64);

impl RelativeMs {
    /// The origin
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Offset from whole seconds
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000))
    }

    /// Whole seconds, rounded down
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000
    }

    /// Difference clamped at zero
    #[must_use]
    pub const fn saturating_sub(self, other: RelativeMs) -> RelativeMs {
        RelativeMs(self.0.saturating_sub(other.0))
    }

    /// Sum saturating at `u64::MAX`
    #[must_use]
    pub const fn saturating_add(self, other: RelativeMs) -> RelativeMs {
        RelativeMs(self.0.saturating_add(other.0))
    }

    /// Clamp into `[0, max]`
    #[must_use]
    pub fn clamp_to(self, max: RelativeMs) -> RelativeMs {
        self.min(max)
    }

    /// As a std duration
    #[must_use]
    pub const fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }
}

impl Timepoint for RelativeMs {
    fn as_millis(self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        Self(millis)
    }
}

impl std::fmt::Display for RelativeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}ms", self.0)
    }
}

impl From<u64> for RelativeMs {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Wall clock milliseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EpochMs(pub u64);

impl EpochMs {
    /// Absolute time of a relative offset on a timeline starting at `self`
    #[must_use]
    pub const fn offset_by(self, offset: RelativeMs) -> EpochMs {
        EpochMs(self.0.saturating_add(offset.0))
    }

    /// Relative offset of `self` from `origin`, clamped at zero
    #[must_use]
    pub const fn since(self, origin: EpochMs) -> RelativeMs {
        RelativeMs(self.0.saturating_sub(origin.0))
    }
}

impl Timepoint for EpochMs {
    fn as_millis(self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        Self(millis)
    }
}

impl std::fmt::Display for EpochMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}ms", self.0)
    }
}

/// Source of absolute time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> EpochMs;
}

/// Wall clock anchored to a monotonic Tokio instant.
///
/// The epoch is read once; later readings add the monotonic elapsed time, so
/// the clock never goes backwards and follows Tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor_epoch: EpochMs,
    anchor: tokio::time::Instant,
}

impl SystemClock {
    /// Anchor a new clock at the current wall time
    #[must_use]
    pub fn new() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            anchor_epoch: EpochMs(millis),
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> EpochMs {
        let elapsed = u64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(u64::MAX);
        EpochMs(self.anchor_epoch.0.saturating_add(elapsed))
    }
}

/// Hand-driven clock for deterministic recording and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`
    #[must_use]
    pub fn new(start: EpochMs) -> Self {
        Self {
            now: AtomicU64::new(start.0),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: EpochMs) {
        self.now.store(time.0, Ordering::SeqCst);
    }

    /// Move forward by `millis`
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> EpochMs {
        EpochMs(self.now.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> EpochMs {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_saturating_sub() {
        let t = RelativeMs(300);
        assert_eq!(t.saturating_sub(RelativeMs(100)), RelativeMs(200));
        assert_eq!(t.saturating_sub(RelativeMs(500)), RelativeMs::zero());
    }

    #[test]
    fn test_relative_secs() {
        assert_eq!(RelativeMs::from_secs(3), RelativeMs(3_000));
        assert_eq!(RelativeMs(2_999).as_secs(), 2);
    }

    #[test]
    fn test_epoch_conversion_roundtrip() {
        let origin = EpochMs(1_700_000_000_000);
        let absolute = origin.offset_by(RelativeMs(1_250));
        assert_eq!(absolute, EpochMs(1_700_000_001_250));
        assert_eq!(absolute.since(origin), RelativeMs(1_250));
    }

    #[test]
    fn test_epoch_since_clamps() {
        let origin = EpochMs(1_000);
        assert_eq!(EpochMs(400).since(origin), RelativeMs::zero());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(EpochMs(10));
        clock.advance(5);
        assert_eq!(clock.now(), EpochMs(15));
        clock.set(EpochMs(100));
        assert_eq!(clock.now(), EpochMs(100));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&RelativeMs(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_paused_time() {
        let clock = SystemClock::new();
        let before = clock.now();
        tokio::time::advance(std::time::Duration::from_millis(750)).await;
        assert_eq!(clock.now().since(before), RelativeMs(750));
    }
}
