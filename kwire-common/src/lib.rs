//! Ambient pieces shared by the kwire crates: logging bootstrap and the
//! broker error-code catalog.

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod error_code;
pub mod logging;

pub use error_code::{error_string, ErrorCode};
