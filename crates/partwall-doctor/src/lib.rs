#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use cli::{Cli, run, run_with_output};
pub use error::{DoctorError, Result};
