use std::time::Instant;

use embassy_futures::block_on;
use embassy_time::{Duration, with_timeout};
use envclock_core::time::{
    TimeSource, TimeStatus, TimeSyncError, TimeSyncPolicy, WallClock, resync_forever,
    wait_for_time_blocking,
};

const POLICY: TimeSyncPolicy = TimeSyncPolicy {
    timeout: Duration::from_millis(100),
    fallback_retries: 3,
    fallback_interval: Duration::from_millis(20),
    retry_interval: Duration::from_millis(20),
    sentinel_year: 2016,
};

/// A server that never answers.
struct SilentSource;

impl TimeSource for SilentSource {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        core::future::pending().await
    }
}

struct FixedSource(i64);

impl TimeSource for FixedSource {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        Ok(self.0)
    }
}

struct FailingSource;

impl TimeSource for FailingSource {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        Err(TimeSyncError::Dns)
    }
}

/// Fails the first `failures` requests, then answers.
struct FlakySource {
    failures: usize,
    calls: usize,
}

impl TimeSource for FlakySource {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        self.calls += 1;
        if self.calls <= self.failures {
            Err(TimeSyncError::Network)
        } else {
            // 2024-06-01T12:00:00Z
            Ok(1_717_243_200)
        }
    }
}

const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn test_silent_server_returns_after_timeout_and_fallback() {
    let clock = WallClock::new();
    let started = Instant::now();

    let status = block_on(wait_for_time_blocking(&mut SilentSource, &clock, &POLICY));

    assert_eq!(status, TimeStatus::Unsynced);
    assert!(started.elapsed() >= std::time::Duration::from_millis(100 + 3 * 20));
    assert!(!clock.is_plausible(2016));
}

#[test]
fn test_answer_sets_clock() {
    let clock = WallClock::new();
    // 2024-06-01T12:00:00Z
    let status = block_on(wait_for_time_blocking(
        &mut FixedSource(1_717_243_200),
        &clock,
        &POLICY,
    ));

    assert_eq!(status, TimeStatus::Synced);
    assert!(clock.unix_time() >= 1_717_243_200);
}

#[test]
fn test_already_set_clock_is_accepted() {
    let clock = WallClock::new();
    clock.set_unix_time(1_717_243_200);

    let status = block_on(wait_for_time_blocking(&mut FailingSource, &clock, &POLICY));
    assert_eq!(status, TimeStatus::Plausible);
}

#[test]
fn test_failed_boot_sync_is_retried_before_the_hourly_interval() {
    let clock = WallClock::new();
    let mut source = FlakySource {
        failures: 2,
        calls: 0,
    };

    let status = block_on(wait_for_time_blocking(&mut source, &clock, &POLICY));
    assert_eq!(status, TimeStatus::Unsynced);

    let result = block_on(with_timeout(
        Duration::from_millis(300),
        resync_forever(&mut source, &clock, &POLICY, HOUR, status),
    ));

    assert!(result.is_err());
    assert!(clock.is_plausible(2016));
    // One failed retry, one success, then the hourly wait.
    assert_eq!(source.calls, 3);
}

#[test]
fn test_synced_clock_waits_the_full_interval() {
    let clock = WallClock::new();
    let mut source = FlakySource {
        failures: 0,
        calls: 0,
    };

    let status = block_on(wait_for_time_blocking(&mut source, &clock, &POLICY));
    assert_eq!(status, TimeStatus::Synced);

    let result = block_on(with_timeout(
        Duration::from_millis(100),
        resync_forever(&mut source, &clock, &POLICY, HOUR, status),
    ));

    assert!(result.is_err());
    assert_eq!(source.calls, 1);
}
