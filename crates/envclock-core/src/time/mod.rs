//! Wall-clock time
//!
//! The [`WallClock`] starts at the Unix epoch and is set by a [`TimeSource`]
//! once the network is up. Between synchronisations it advances with the
//! monotonic embassy timer.

pub mod ntp;
pub mod zone;

use core::cell::Cell;

use chrono::{DateTime, Datelike, NaiveDateTime};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Timer, with_timeout};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use self::zone::DstZone;
use crate::error::{Operation, escalate};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncError {
    #[error("no answer within the sync timeout")]
    Timeout,
    #[error("could not resolve the time server")]
    Dns,
    #[error("network error talking to the time server")]
    Network,
    #[error("reply too short ({len} bytes)")]
    ShortPacket { len: usize },
    #[error("server is unsynchronised (stratum {stratum})")]
    BadStratum { stratum: u8 },
    #[error("reply has mode {mode}, expected a server reply")]
    BadMode { mode: u8 },
}

/// Timeout and fallback parameters for [`wait_for_time_blocking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSyncPolicy {
    /// How long the initial synchronisation may take.
    pub timeout: Duration,
    /// Plausibility polls after a failed synchronisation.
    pub fallback_retries: u8,
    pub fallback_interval: Duration,
    /// Delay between background attempts while the clock is unset or the
    /// last attempt failed.
    pub retry_interval: Duration,
    /// A clock reporting this year or earlier has never been set.
    pub sentinel_year: i32,
}

/// Outcome of [`wait_for_time_blocking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStatus {
    /// The source answered and the clock was set.
    Synced,
    /// The source did not answer but the clock was already plausible.
    Plausible,
    /// Continuing with an unset clock.
    Unsynced,
}

/// Anything that can tell the current Unix time.
pub trait TimeSource {
    fn sync(&mut self) -> impl Future<Output = Result<i64, TimeSyncError>>;
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    unix_secs: i64,
    at: Instant,
}

/// Process-wide calendar clock.
pub struct WallClock {
    anchor: Mutex<CriticalSectionRawMutex, Cell<Anchor>>,
}

impl WallClock {
    /// A clock that reads 1970-01-01T00:00:00 at boot.
    pub const fn new() -> Self {
        Self {
            anchor: Mutex::new(Cell::new(Anchor {
                unix_secs: 0,
                at: Instant::from_ticks(0),
            })),
        }
    }

    pub fn set_unix_time(&self, unix_secs: i64) {
        let anchor = Anchor {
            unix_secs,
            at: Instant::now(),
        };
        self.anchor.lock(|cell| cell.set(anchor));
    }

    pub fn unix_time(&self) -> i64 {
        let anchor = self.anchor.lock(Cell::get);
        let elapsed = Instant::now().saturating_duration_since(anchor.at);
        anchor.unix_secs + elapsed.as_secs() as i64
    }

    pub fn utc_now(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.unix_time(), 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }

    pub fn local_now(&self, zone: &DstZone) -> NaiveDateTime {
        zone.to_local(self.utc_now())
    }

    /// Whether the clock has obviously been set.
    pub fn is_plausible(&self, sentinel_year: i32) -> bool {
        self.utc_now().year() > sentinel_year
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

pub static SYSTEM_CLOCK: WallClock = WallClock::new();

/// Set `clock` from `source`, giving up after the policy's timeout.
///
/// If the source does not answer, the clock is polled for plausibility a few
/// times before continuing with whatever it shows. Never fails the caller.
pub async fn wait_for_time_blocking<S: TimeSource>(
    source: &mut S,
    clock: &WallClock,
    policy: &TimeSyncPolicy,
) -> TimeStatus {
    let result = match with_timeout(policy.timeout, source.sync()).await {
        Ok(result) => result,
        Err(_) => Err(TimeSyncError::Timeout),
    };

    if let Some(unix_secs) = escalate(Operation::TimeSync, result) {
        clock.set_unix_time(unix_secs);
        info!("Time synchronized: {}", clock.utc_now());
        return TimeStatus::Synced;
    }

    for attempt in 1..=policy.fallback_retries {
        if clock.is_plausible(policy.sentinel_year) {
            return TimeStatus::Plausible;
        }
        debug!(
            "Waiting for system time to be set... ({}/{})",
            attempt, policy.fallback_retries
        );
        Timer::after(policy.fallback_interval).await;
    }

    if clock.is_plausible(policy.sentinel_year) {
        return TimeStatus::Plausible;
    }

    warn!("Failed to synchronize time, continuing with {}", clock.utc_now());
    TimeStatus::Unsynced
}

/// One background synchronisation attempt. Returns whether the clock was set.
pub async fn resync_once<S: TimeSource>(
    source: &mut S,
    clock: &WallClock,
    timeout: Duration,
) -> bool {
    let result = match with_timeout(timeout, source.sync()).await {
        Ok(result) => result,
        Err(_) => Err(TimeSyncError::Timeout),
    };
    match escalate(Operation::TimeSync, result) {
        Some(unix_secs) => {
            clock.set_unix_time(unix_secs);
            debug!("Clock re-synchronized: {}", clock.utc_now());
            true
        }
        None => false,
    }
}

/// Delay before the next background attempt: `interval` after a successful
/// sync of a plausible clock, the policy's retry interval otherwise.
pub fn next_resync_delay(
    last_synced: bool,
    clock: &WallClock,
    policy: &TimeSyncPolicy,
    interval: Duration,
) -> Duration {
    if last_synced && clock.is_plausible(policy.sentinel_year) {
        interval
    } else {
        policy.retry_interval
    }
}

/// Keep `clock` synchronised forever, starting from the boot-time `status`.
pub async fn resync_forever<S: TimeSource>(
    source: &mut S,
    clock: &WallClock,
    policy: &TimeSyncPolicy,
    interval: Duration,
    status: TimeStatus,
) -> ! {
    let mut last_synced = status == TimeStatus::Synced;
    loop {
        Timer::after(next_resync_delay(last_synced, clock, policy, interval)).await;
        last_synced = resync_once(source, clock, policy.timeout).await;
    }
}
