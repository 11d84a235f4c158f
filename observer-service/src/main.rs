use std::{path::PathBuf, thread, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod config;
mod http;
mod observe;
mod simulation;
mod teleplot;

use crate::{
    config::{Config, RawConfig},
    http::WatchSink,
};

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Follow the telemetry of an iris attached over serial
    Observe,
    /// Run the control loop against a simulated light source
    Simulate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    // Parse command line arguments
    let args = Args::parse();

    // Parse config
    let raw_config = match RawConfig::load(&args.config) {
        Ok(val) => val,
        Err(e) => {
            println!("Error: Failed to load config: {:#}", e);
            println!();
            println!(
                "Example config:\n\n{}",
                toml::to_string(&RawConfig::example())?
            );
            return Ok(());
        }
    };
    let config: Config = raw_config.try_into()?;

    let (mut sink, snapshots) = WatchSink::channel();

    // The control side is blocking, keep it off the runtime
    match args.mode {
        Mode::Observe => {
            let serial = config
                .serial
                .as_ref()
                .context("Observe mode needs a [serial] section in the config")?;
            let port = observe::open(serial)?;
            thread::Builder::new()
                .name("observe".into())
                .spawn(move || {
                    let count = observe::process_lines(port, &mut sink);
                    warn!("Serial stream ended after {} snapshots", count);
                })
                .context("Failed to spawn observer thread")?;
        }
        Mode::Simulate => {
            let controller = simulation::build(config.iris, config.simulation, sink)?;
            let pass_interval = Duration::from_millis(config.simulation.pass_interval_ms);
            info!(
                "Simulating a {} s day between {} and {} lux",
                config.simulation.day_length_s,
                config.simulation.min_lux,
                config.simulation.max_lux,
            );
            thread::Builder::new()
                .name("simulation".into())
                .spawn(move || simulation::run(controller, pass_interval))
                .context("Failed to spawn simulation thread")?;
        }
    }

    http::serve(config.http.bind, snapshots).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["iris-observer", "simulate"]).unwrap();
        assert_eq!(args.mode, Mode::Simulate);
        assert_eq!(args.config, PathBuf::from("config.toml"));

        let args =
            Args::try_parse_from(["iris-observer", "--config", "/etc/iris.toml", "observe"]).unwrap();
        assert_eq!(args.mode, Mode::Observe);
        assert_eq!(args.config, PathBuf::from("/etc/iris.toml"));

        assert!(Args::try_parse_from(["iris-observer"]).is_err());
    }
}
