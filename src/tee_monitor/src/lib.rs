//! The security monitor as seen from inside an enclave: key issuance bound to
//! the enclave measurement, and the exit call that hands control back.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod monitor;
pub mod types;

pub use monitor::MonitorProvider;

#[cfg(any(feature = "mock", test))]
pub mod mock;

#[cfg(feature = "sm")]
#[allow(unsafe_code)]
pub mod sm;
