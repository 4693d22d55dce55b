#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature enabled the macros below are the real
//! `tracing` macros. Without it they expand to nothing, so the engine
//! carries no logging cost for clients that only run speculative checks.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}
