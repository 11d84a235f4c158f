//! Board-agnostic core of the light-adaptive iris.
//!
//! The firmware reads the ambient light level, smooths it, maps it onto an
//! aperture position on a logarithmic scale and drives the iris stepper
//! there, faster for big light changes and gently for small ones.
//!
//! Hardware is reached through traits ([`sensor::IlluminanceSource`],
//! [`motor::Actuator`], [`telemetry::TelemetrySink`]) so that the control
//! loop can be exercised on the host.
#![cfg_attr(not(test), no_std)]

pub mod ambient_light;
pub mod config;
pub mod controller;
pub mod errors;
pub mod mapping;
pub mod motor;
pub mod planner;
pub mod sensor;
pub mod serial;
pub mod telemetry;

pub use crate::config::IrisConfig;
pub use crate::controller::IrisController;
pub use crate::errors::{ConfigError, Error};
pub use crate::telemetry::Snapshot;
