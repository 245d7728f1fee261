use time::OffsetDateTime;
use tokio::time::Instant;

/// Time as seen by the detection loop
pub trait Clock: Send {
    /// Monotonic time used for history timestamps
    fn now(&self) -> Instant;

    /// Wall-clock time used to name snapshots
    fn wall(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
