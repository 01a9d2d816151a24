//! Sky quality meter.
//!
//! Reads an ambient light sensor, smooths the readings and shows the
//! resulting Bortle class on three indicator LEDs. The pipeline is hardware
//! independent and runs on the host for unit testing; the board binary in
//! `main.rs` wires it up to the actual peripherals.
#![cfg_attr(not(test), no_std)]

pub mod ambient_light;
pub mod bortle;
pub mod config;
pub mod control;
pub mod errors;
pub mod indicators;
pub mod sensor;
pub mod smoother;
pub mod states;
pub mod telemetry;
