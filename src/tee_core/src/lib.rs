//! Attested execution sessions. A session provisions keys from the security
//! monitor, runs one guest workload while hashing everything it prints,
//! signs the digest and exports the signature before handing control back to
//! the monitor.
//!
//! # Maintainers Notes
//!
//! Everything in here is part of the trusted computing base. Keep the
//! dependency list short.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

// "sm" is production and we don't want any mock data slipping in.
#[cfg(all(feature = "sm", feature = "mock"))]
compile_error!(
	"feature \"sm\" and feature \"mock\" cannot be enabled at the same time; build with `--no-default-features --features sm`"
);

pub mod accumulator;
pub mod cli;
pub mod console;
pub mod guest;
pub mod parser;
pub mod provisioner;
pub mod session;
pub mod signer;

/// Capacity of the shared console region the simulator hands to a session.
pub const DEFAULT_CONSOLE_CAPACITY: usize = 64 * 1024;

/// Interpreter the simulator runs the workload source with.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Argument that precedes the source text on the interpreter's command line.
pub const DEFAULT_INTERPRETER_ARG: &str = "-c";
