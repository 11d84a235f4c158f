use std::{
    fs::File,
    io::Read,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use iris_firmware::IrisConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawConfig {
    pub serial: Option<Serial>,
    #[serde(default)]
    pub http: RawHttp,
    pub iris: Option<IrisConfig>,
    pub simulation: Option<Simulation>,
}

impl RawConfig {
    /// Parse the config file at the specified path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file at {:?}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file to string")?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn example() -> Self {
        Self {
            serial: Some(Serial {
                port: PathBuf::from_str("/dev/ttyACM0").unwrap(),
                baudrate: 115200,
            }),
            http: RawHttp::default(),
            iris: Some(IrisConfig::default()),
            simulation: Some(Simulation::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Serial {
    /// The serial port.
    pub port: PathBuf,

    /// The baud rate.
    pub baudrate: u32,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawHttp {
    /// Listen address of the telemetry endpoint
    pub bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Settings of the simulated light source
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Simulation {
    /// Length of a simulated day in seconds
    pub day_length_s: f32,

    /// Light level at midnight
    pub min_lux: f32,

    /// Light level at noon
    pub max_lux: f32,

    /// Maximum random noise added to every reading
    pub jitter_lux: f32,

    /// Delay between two passes of the control loop
    pub pass_interval_ms: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            day_length_s: 120.0,
            min_lux: 0.1,
            max_lux: 30_000.0,
            jitter_lux: 2.0,
            pass_interval_ms: 1,
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub serial: Option<Serial>,
    pub http: Http,
    pub iris: IrisConfig,
    pub simulation: Simulation,
}

#[derive(Debug)]
pub struct Http {
    /// Listen address of the telemetry endpoint
    pub bind: SocketAddr,
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        let bind = raw_config
            .http
            .bind
            .parse::<SocketAddr>()
            .context(format!("Invalid HTTP bind address {:?}", raw_config.http.bind))?;

        // Validate iris config
        let iris = raw_config.iris.unwrap_or_default();
        iris.validate()
            .map_err(|e| anyhow::anyhow!("Invalid iris config: {}", e))?;

        let simulation = raw_config.simulation.unwrap_or_default();
        if !(simulation.day_length_s > 0.0) {
            anyhow::bail!("Simulated day length must be positive");
        }
        if !(simulation.min_lux > 0.0 && simulation.min_lux <= simulation.max_lux) {
            anyhow::bail!("Simulated lux range must be positive and ordered");
        }
        if !(simulation.jitter_lux >= 0.0) {
            anyhow::bail!("Simulated jitter must not be negative");
        }

        Ok(Config {
            serial: raw_config.serial,
            http: Http { bind },
            iris,
            simulation,
        })
    }
}
