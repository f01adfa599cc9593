//! Session error

use tee_crypto::CryptoError;

use super::state::SessionPhase;
use crate::{console::ConsoleError, provisioner::ProvisionError};

/// Why a session halted. Every variant is unrecoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
	/// Keys could not be provisioned.
	Provision(ProvisionError),
	/// A console write failed outside the workload.
	Console(ConsoleError),
	/// The workload runtime broke down.
	GuestFatal(String),
	/// Reporting a raised workload error through the console failed.
	FaultWhileRecovering(ConsoleError),
	/// The signature did not verify under the session public key.
	SignatureSelfCheck(CryptoError),
	/// The session tried to leave its fixed phase sequence.
	InvalidStateTransition(SessionPhase, SessionPhase),
	/// A debug assertion failed inside the session.
	AssertionFailed(String),
	/// The monitor returned from `exit_enclave`.
	ExitReturned,
}

impl std::fmt::Display for SessionError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Provision(e) => write!(f, "provisioning failed: {e}"),
			Self::Console(e) => write!(f, "{e}"),
			Self::GuestFatal(text) => write!(f, "workload runtime failed: {text}"),
			Self::FaultWhileRecovering(e) => {
				write!(f, "fault while reporting a workload error: {e}")
			}
			Self::SignatureSelfCheck(e) => {
				write!(f, "signature self check failed: {e}")
			}
			Self::InvalidStateTransition(from, to) => {
				write!(f, "invalid phase transition {from} -> {to}")
			}
			Self::AssertionFailed(text) => write!(f, "assertion failed: {text}"),
			Self::ExitReturned => write!(f, "monitor returned from exit"),
		}
	}
}

impl std::error::Error for SessionError {}

impl From<ProvisionError> for SessionError {
	fn from(err: ProvisionError) -> Self {
		Self::Provision(err)
	}
}

impl From<ConsoleError> for SessionError {
	fn from(err: ConsoleError) -> Self {
		Self::Console(err)
	}
}

impl From<CryptoError> for SessionError {
	fn from(err: CryptoError) -> Self {
		Self::SignatureSelfCheck(err)
	}
}
