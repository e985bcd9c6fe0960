//! Bus enumeration for padgate.
//!
//! This module defines the types for a single I2C bus scan: the 7-bit device
//! address, the snapshot of addresses that answered, and the scanner that
//! produces such snapshots by running the `i2cdetect` utility.
//!
//! Parsing is anchored to the `i2cdetect` table layout. Each cell is either
//! `--` (no device), `UU` (address claimed by a kernel driver, which still
//! means a device is present) or the two-digit hex address itself, and the
//! cell position must agree with the printed address. A stray `28` elsewhere
//! in the output can therefore never register as a detected device.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::process::Command;
use tracing::trace;

use crate::error::{Error, Result};

/// Number of address cells per table row in `i2cdetect` output.
const CELLS_PER_ROW: u8 = 16;

/// A 7-bit I2C device address.
///
/// Serializes as a `"0x28"`-style hex string so configuration files read the
/// way datasheets do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Create an address from its raw 7-bit value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// The raw address value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this address lies in the range `i2cdetect` actually probes
    /// (0x03 through 0x77).
    #[must_use]
    pub const fn is_probeable(self) -> bool {
        self.0 >= 0x03 && self.0 <= 0x77
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let value = u8::from_str_radix(hex, 16).map_err(|_| Error::InvalidAddress {
            input: s.to_string(),
        })?;
        if value > 0x7f {
            return Err(Error::InvalidAddress {
                input: s.to_string(),
            });
        }
        Ok(Self(value))
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The set of device addresses that answered in one bus scan.
///
/// A scan is a fresh snapshot: no history is carried between polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusScan {
    addresses: BTreeSet<DeviceAddress>,
}

impl BusScan {
    /// Build a scan from a list of addresses (used by tests and fakes).
    #[must_use]
    pub fn from_addresses(addresses: impl IntoIterator<Item = DeviceAddress>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Check whether a single address answered.
    #[must_use]
    pub fn contains(&self, address: DeviceAddress) -> bool {
        self.addresses.contains(&address)
    }

    /// Check whether every required address answered in this scan.
    ///
    /// This is the readiness predicate: all required devices must be present
    /// in the *same* snapshot. Extra devices on the bus do not matter.
    #[must_use]
    pub fn contains_all(&self, required: &[DeviceAddress]) -> bool {
        required.iter().all(|addr| self.addresses.contains(addr))
    }

    /// Iterate over the detected addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DeviceAddress> + '_ {
        self.addresses.iter().copied()
    }

    /// Number of devices that answered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether no device answered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl fmt::Display for BusScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.addresses.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for addr in &self.addresses {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{addr}")?;
            first = false;
        }
        Ok(())
    }
}

/// Parse the table printed by `i2cdetect` into a [`BusScan`].
///
/// # Errors
///
/// Returns an error if a row label is not hex, a cell is not one of the
/// known tokens, or a printed address disagrees with its cell position.
pub fn parse_i2cdetect(output: &str) -> Result<BusScan> {
    let mut addresses = BTreeSet::new();

    for line in output.lines() {
        // The column header row carries no colon and is skipped.
        let Some((label, cells)) = line.split_once(':') else {
            continue;
        };
        let base = u8::from_str_radix(label.trim(), 16)
            .map_err(|_| Error::scan_parse(format!("bad row label '{label}'")))?;
        // Rows run 0x00 through 0x70 in steps of 16; anything else keeps
        // base + offset inside the 7-bit range or is corrupt output.
        if base > 0x70 || base % 0x10 != 0 {
            return Err(Error::scan_parse(format!(
                "row label 0x{base:02x} outside the address table"
            )));
        }

        for offset in 0..CELLS_PER_ROW {
            // Cells are three columns wide: a space then two characters.
            let start = 1 + 3 * usize::from(offset);
            let Some(cell) = cells.get(start..start + 2) else {
                break;
            };
            match cell.trim() {
                // Blank cells are addresses i2cdetect does not probe.
                "" | "--" => {}
                "UU" => {
                    addresses.insert(DeviceAddress::new(base + offset));
                }
                token => {
                    let addr = u8::from_str_radix(token, 16)
                        .map_err(|_| Error::scan_parse(format!("bad cell '{token}'")))?;
                    if addr != base + offset {
                        return Err(Error::scan_parse(format!(
                            "cell '{token}' out of position in row 0x{base:02x}"
                        )));
                    }
                    addresses.insert(DeviceAddress::new(addr));
                }
            }
        }
    }

    Ok(BusScan { addresses })
}

/// A source of bus scans.
///
/// The production implementation shells out to `i2cdetect`; tests substitute
/// a scripted scanner to drive the readiness monitor deterministically.
#[async_trait]
pub trait BusScanner: Send {
    /// The name of this scanner (for logging).
    fn name(&self) -> &'static str;

    /// Perform one bus scan and return the snapshot of detected addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan itself fails. Scan failures are fatal to
    /// the caller; there is no retry-on-query-error.
    async fn scan(&mut self) -> Result<BusScan>;
}

/// Bus scanner backed by the `i2cdetect` command-line utility.
#[derive(Debug, Clone)]
pub struct I2cdetectScanner {
    program: PathBuf,
    bus: u8,
}

impl I2cdetectScanner {
    /// Create a scanner that runs `program -y <bus>`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, bus: u8) -> Self {
        Self {
            program: program.into(),
            bus,
        }
    }

    /// The bus index this scanner probes.
    #[must_use]
    pub fn bus(&self) -> u8 {
        self.bus
    }
}

#[async_trait]
impl BusScanner for I2cdetectScanner {
    fn name(&self) -> &'static str {
        "i2cdetect"
    }

    async fn scan(&mut self) -> Result<BusScan> {
        let output = Command::new(&self.program)
            .arg("-y")
            .arg(self.bus.to_string())
            .output()
            .await
            .map_err(|source| Error::ScannerSpawn {
                path: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::ScannerExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!(bus = self.bus, "i2cdetect output:\n{stdout}");
        parse_i2cdetect(&stdout)
    }
}
