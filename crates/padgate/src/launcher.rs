//! Acquisition handoff for padgate.
//!
//! Once the readiness monitor surrenders its [`LaunchToken`], the launcher
//! starts the external acquisition program and blocks until it exits. The
//! acquisition program controls its own run duration and owns its own
//! robustness; the launcher does not supervise, retry, or relaunch it.

use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{info, warn};

use crate::config::AcquisitionConfig;
use crate::error::{Error, Result};
use crate::monitor::LaunchToken;

/// Starts the acquisition program exactly once.
#[derive(Debug, Clone)]
pub struct AcquisitionLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl AcquisitionLauncher {
    /// Create a launcher for the given program and arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create a launcher from the acquisition section of the configuration.
    #[must_use]
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Spawn the acquisition program and wait for it to finish.
    ///
    /// Consumes the launch token: a second launch cannot be expressed. A
    /// non-zero exit of the acquisition program is logged but is not an
    /// error here — its failure handling is its own concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or waited on.
    pub async fn launch(self, token: LaunchToken) -> Result<ExitStatus> {
        drop(token);

        info!(
            program = %self.program.display(),
            args = ?self.args,
            "starting acquisition program"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .spawn()
            .map_err(|source| Error::AcquisitionSpawn {
                program: self.program.clone(),
                source,
            })?;

        let status = child.wait().await?;
        if status.success() {
            info!("acquisition program finished");
        } else {
            warn!(%status, "acquisition program exited abnormally");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_waits_for_exit() {
        let launcher = AcquisitionLauncher::new("true", vec![]);
        let status = launcher.launch(LaunchToken::new()).await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let launcher = AcquisitionLauncher::new("sh", vec!["-c".into(), "exit 3".into()]);
        let status = launcher.launch(LaunchToken::new()).await.unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let launcher = AcquisitionLauncher::new("/nonexistent/acquire", vec![]);
        let err = launcher.launch(LaunchToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::AcquisitionSpawn { .. }));
    }

    #[test]
    fn test_from_config() {
        let config = AcquisitionConfig::default();
        let launcher = AcquisitionLauncher::from_config(&config);
        assert_eq!(launcher.program, PathBuf::from("python3"));
        assert_eq!(launcher.args, vec!["/home/pi/avionics/main.py"]);
    }
}
