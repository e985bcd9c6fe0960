//! Device readiness monitoring for padgate.
//!
//! The monitor repeatedly scans the I2C bus and waits for every required
//! device to answer in the *same* scan. Seeing the IMU in one scan and the
//! barometer in a later one does not count; readiness is a property of a
//! single snapshot.
//!
//! Handoff happens at most once per monitor lifetime. The monitor owns the
//! single [`LaunchToken`] and surrenders it exactly when readiness is first
//! observed; the launcher consumes the token, so the type system rules out a
//! second launch.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::Result;
use crate::scan::{BusScan, BusScanner, DeviceAddress};

/// Proof that readiness was observed and handoff may happen.
///
/// Not `Clone` and only constructed inside this crate: there is exactly one
/// per monitor run, and spending it is irreversible.
#[derive(Debug)]
pub struct LaunchToken {
    _private: (),
}

impl LaunchToken {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// How a monitor run ended.
#[derive(Debug)]
pub enum MonitorOutcome {
    /// Every required device answered in one scan; handoff may proceed.
    Ready(LaunchToken),
    /// Shutdown was requested before the bus became ready. No launch.
    Interrupted,
}

impl MonitorOutcome {
    /// Whether this outcome permits a launch.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Polls the bus until every required device is present, or shutdown.
///
/// The loop is sequential: scan, check, sleep, repeat. The sleep races the
/// shutdown signal so a service stop interrupts waiting promptly instead of
/// being ignored until the next wakeup. Scan failures are fatal and
/// propagate out of [`run`](Self::run); there is no retry on a broken bus.
pub struct ReadinessMonitor<S> {
    scanner: S,
    required: Vec<DeviceAddress>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S> fmt::Debug for ReadinessMonitor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessMonitor")
            .field("required", &self.required)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<S: BusScanner> ReadinessMonitor<S> {
    /// Create a monitor over the given scanner.
    pub fn new(
        scanner: S,
        required: Vec<DeviceAddress>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            scanner,
            required,
            interval,
            shutdown,
        }
    }

    /// Evaluate the readiness predicate for one scan.
    #[must_use]
    pub fn is_ready(&self, scan: &BusScan) -> bool {
        scan.contains_all(&self.required)
    }

    /// Run the poll loop to completion.
    ///
    /// Waits indefinitely for the hardware to come online; the only exits are
    /// readiness, shutdown, or a scanner fault.
    ///
    /// # Errors
    ///
    /// Returns the scanner's error if a scan fails. No launch happens in that
    /// case.
    pub async fn run(mut self) -> Result<MonitorOutcome> {
        info!(
            scanner = self.scanner.name(),
            interval_ms = self.interval.as_millis(),
            "waiting for required devices"
        );

        loop {
            if *self.shutdown.borrow() {
                info!("shutdown requested while waiting, no launch");
                return Ok(MonitorOutcome::Interrupted);
            }

            let scan = self.scanner.scan().await?;
            if self.is_ready(&scan) {
                info!(detected = %scan, "all required devices present");
                return Ok(MonitorOutcome::Ready(LaunchToken::new()));
            }
            debug!(detected = %scan, "bus not ready yet");

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = self.shutdown.changed() => {
                    // A closed channel means the controlling side is gone;
                    // treat it the same as an explicit stop.
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("shutdown requested while waiting, no launch");
                        return Ok(MonitorOutcome::Interrupted);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::scan::BusScan;
    use async_trait::async_trait;

    const IMU: DeviceAddress = DeviceAddress::new(0x28);
    const BARO: DeviceAddress = DeviceAddress::new(0x76);

    /// Scanner that replays a fixed script of scan results.
    ///
    /// Counts every scan through a shared handle so tests can pin down the
    /// exact poll on which the monitor acted. Optionally fires the shutdown
    /// signal once the script is drained, for exercising interrupted waits
    /// without racing the clock.
    struct ScriptedScanner {
        script: VecDeque<Result<BusScan>>,
        calls: Arc<AtomicUsize>,
        stop_when_drained: Option<watch::Sender<bool>>,
    }

    impl ScriptedScanner {
        fn new(script: Vec<Result<BusScan>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    script: script.into(),
                    calls: Arc::clone(&calls),
                    stop_when_drained: None,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl BusScanner for ScriptedScanner {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn scan(&mut self) -> Result<BusScan> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .script
                .pop_front()
                .expect("monitor scanned past the end of the script");
            if self.script.is_empty() {
                if let Some(tx) = &self.stop_when_drained {
                    let _ = tx.send(true);
                }
            }
            result
        }
    }

    fn scan_of(addrs: &[DeviceAddress]) -> Result<BusScan> {
        Ok(BusScan::from_addresses(addrs.iter().copied()))
    }

    fn monitor_with(
        script: Vec<Result<BusScan>>,
    ) -> (
        ReadinessMonitor<ScriptedScanner>,
        watch::Sender<bool>,
        Arc<AtomicUsize>,
    ) {
        let (tx, rx) = watch::channel(false);
        let (scanner, calls) = ScriptedScanner::new(script);
        let monitor =
            ReadinessMonitor::new(scanner, vec![IMU, BARO], Duration::from_millis(1), rx);
        (monitor, tx, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_on_fourth_scan_after_three_empty() {
        let (monitor, _tx, calls) = monitor_with(vec![
            scan_of(&[]),
            scan_of(&[]),
            scan_of(&[]),
            scan_of(&[IMU, BARO]),
        ]);
        let outcome = monitor.run().await.unwrap();
        assert!(outcome.is_ready());
        // Exactly the fourth poll, not an early fire on a quiet bus.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_fire_on_devices_seen_separately() {
        // IMU alone, then barometer alone, then both together. The token is
        // only surrendered on the joint observation: presence must not be
        // accumulated across scans.
        let (monitor, _tx, calls) = monitor_with(vec![
            scan_of(&[IMU]),
            scan_of(&[BARO]),
            scan_of(&[IMU, BARO]),
        ]);
        let outcome = monitor.run().await.unwrap();
        assert!(outcome.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_devices_never_joint_means_no_launch() {
        // One device per scan, never both, then the stop request arrives.
        // The wait must end interrupted with the token still unspent.
        let (tx, rx) = watch::channel(false);
        let (mut scanner, calls) =
            ScriptedScanner::new(vec![scan_of(&[IMU]), scan_of(&[BARO])]);
        scanner.stop_when_drained = Some(tx);
        let monitor =
            ReadinessMonitor::new(scanner, vec![IMU, BARO], Duration::from_millis(1), rx);
        let outcome = monitor.run().await.unwrap();
        assert!(!outcome.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superset_with_extras_is_ready() {
        let extra = DeviceAddress::new(0x3c);
        let (monitor, _tx, calls) = monitor_with(vec![scan_of(&[IMU, BARO, extra])]);
        let outcome = monitor.run().await.unwrap();
        assert!(outcome.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_fault_is_fatal_and_no_launch() {
        let (monitor, _tx, calls) = monitor_with(vec![
            scan_of(&[]),
            Err(Error::scan_parse("bus fell over")),
        ]);
        let err = monitor.run().await.unwrap_err();
        assert!(err.is_scanner_error());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_scan() {
        let (monitor, tx, calls) = monitor_with(vec![]);
        tx.send(true).unwrap();
        let outcome = monitor.run().await.unwrap();
        assert!(!outcome.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_waiting() {
        // The controlling side goes away while the monitor is between scans.
        // The closed channel must end the wait instead of leaving the loop
        // asleep until the next poll.
        let (monitor, tx, calls) = monitor_with(vec![scan_of(&[]), scan_of(&[IMU])]);
        drop(tx);
        let outcome = monitor.run().await.unwrap();
        assert!(!outcome.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_ready_predicate() {
        let (monitor, _tx, _calls) = monitor_with(vec![]);
        assert!(!monitor.is_ready(&BusScan::default()));
        assert!(!monitor.is_ready(&BusScan::from_addresses([IMU])));
        assert!(!monitor.is_ready(&BusScan::from_addresses([BARO])));
        assert!(monitor.is_ready(&BusScan::from_addresses([IMU, BARO])));
    }

    #[test]
    fn test_readiness_is_stable_for_unchanged_state() {
        let (monitor, _tx, _calls) = monitor_with(vec![]);
        let scan = BusScan::from_addresses([IMU, BARO]);
        for _ in 0..3 {
            assert!(monitor.is_ready(&scan));
        }
    }
}
