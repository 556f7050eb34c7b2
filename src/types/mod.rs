//! Public types for seatkit
//!
//! This module contains all the shared types used across the crate.

mod config;
mod error;
mod parameter;

pub use config::{CollectorConfig, DEFAULT_HELPER, HELPER_ENV_VAR};
pub use error::{ArgvError, ErrorCode, Result, SeatError};
pub use parameter::{
    ASSIGNMENT_SEPARATOR, DISCOVERED_KEYS, Parameter, ParameterKind, ParameterSet,
    ParameterValue, parse_helper_output,
};
