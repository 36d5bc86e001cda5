use crossing::config::{ConfigError, ControllerConfig};
use crossing::controller::{LogSink, Runner, StatusFileSink};
use crossing::signals::{FilePresenceSource, MonotonicClock, PedestrianRequestFile, SignalSampler};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "crossing.json";

fn main() -> ExitCode {
    crossing::logging::init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        presence = %config.detection.presence_path.display(),
        pedestrian = %config.detection.pedestrian_path.display(),
        tick_ms = config.tick_interval.as_millis() as u64,
        "starting controller"
    );

    let sampler = SignalSampler::new(
        FilePresenceSource::new(&config.detection.presence_path),
        PedestrianRequestFile::new(&config.detection.pedestrian_path),
        config.detection.stale_after,
    );
    let sinks = (LogSink::new(), config.status_path.as_ref().map(StatusFileSink::new));

    Runner::new(&config, MonotonicClock::new(), sampler, sinks).run()
}

/// Load the file named by the first argument, or `crossing.json` if it
/// exists, or the built-in defaults.
fn load_config() -> Result<ControllerConfig, ConfigError> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => ControllerConfig::load(path),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if path.exists() {
                ControllerConfig::load(path)
            } else {
                info!("no configuration file, using defaults");
                Ok(ControllerConfig::default())
            }
        }
    }
}
