//! `padgate` - Launch-pad readiness gate for a model-rocket avionics stack
//!
//! This library provides the device-readiness gating and handoff protocol:
//! poll the I2C bus enumeration until the required sensors all answer in the
//! same scan, then start the external data-acquisition program exactly once
//! and wait for it to finish.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod monitor;
pub mod scan;

pub use config::Config;
pub use error::{Error, Result};
pub use launcher::AcquisitionLauncher;
pub use logging::init_logging;
pub use monitor::{LaunchToken, MonitorOutcome, ReadinessMonitor};
pub use scan::{BusScan, BusScanner, DeviceAddress, I2cdetectScanner};
