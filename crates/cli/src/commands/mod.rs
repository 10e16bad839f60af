//! Command implementations.

mod info;
mod record_imu;
mod run;
mod snapshot;
mod validate;

pub use info::run_info;
pub use record_imu::run_record_imu;
pub use run::run_stream;
pub use snapshot::run_snapshot;
pub use validate::run_validate;

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::BridgeConfig;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cli::DeviceArgs;
use crate::error::{CliError, Result};

/// Load the configuration named by `args` (defaults when absent) and apply
/// the command-line overrides.
pub(crate) fn load_config(args: &DeviceArgs) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)?
        }
        None => BridgeConfig::default(),
    };

    if let Some(resolution) = args.resolution {
        config.device.resolution = resolution.into();
    }
    if let Some(fps) = args.fps {
        config.device.fps = fps;
    }
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Instant after `seconds`, or `None` for "no limit" (`<= 0`)
pub(crate) fn deadline_after(seconds: f64) -> Option<Instant> {
    (seconds > 0.0).then(|| Instant::now() + Duration::from_secs_f64(seconds))
}

/// Sleep until `deadline`, forever when there is none
pub(crate) async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ResolutionArg;
    use contracts::Resolution;
    use std::io::Write;

    fn device_args(config: Option<std::path::PathBuf>) -> DeviceArgs {
        DeviceArgs {
            config,
            resolution: None,
            fps: None,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(&device_args(None)).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_overrides_apply_after_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[device]\nfps = 15").unwrap();
        let mut args = device_args(Some(file.path().to_path_buf()));
        args.resolution = Some(ResolutionArg::Hd);
        let config = load_config(&args).unwrap();
        assert_eq!(config.device.fps, 15);
        assert_eq!(config.device.resolution, Resolution::Hd1280x800);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut args = device_args(None);
        args.fps = Some(0);
        assert!(matches!(load_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let args = device_args(Some("/nonexistent/imsee.toml".into()));
        assert!(matches!(
            load_config(&args),
            Err(CliError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_deadline() {
        assert!(deadline_after(0.0).is_none());
        assert!(deadline_after(1.0).is_some());
    }
}
