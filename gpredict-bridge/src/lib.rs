//! Hamlib-compatible TCP endpoints for satellite tracking clients such as
//! Gpredict.
//!
//! Each endpoint is a [`Server`] driving a [`Controller`]: the server owns the
//! socket and the worker thread, the controller owns the tracked values and
//! turns commands into replies and bus [`Event`](bus::Event)s.

pub mod command;
pub mod config;
pub mod controller;
mod error;
mod server;
pub mod session;

pub use config::{AzElLimitConfig, DopplerConfig, RotorConfig, ServerConfig, VelocityConfig};
pub use controller::{
    AzElGate, Controller, DopplerController, RotorController, VelocityController, VelocityHandle,
};
pub use error::{Error, Result};
pub use server::Server;
