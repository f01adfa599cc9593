//! Endpoints of the security monitor consumed by an enclave.

use crate::types::{ApiResult, KeyBundle};

/// Something that implements the monitor calls an enclave makes. This is made
/// generic so mock providers can be subbed in for testing and simulation. On
/// hardware use [`crate::sm::SecurityMonitor`].
pub trait MonitorProvider {
	/// Ask the monitor for the enclave's measurement, key pair and
	/// attestation.
	///
	/// A non-[`ApiResult::Ok`] status carries no key material and may be
	/// transient; callers decide whether to retry.
	fn get_keys(&mut self) -> Result<KeyBundle, ApiResult>;

	/// Leave the enclave and hand control back to the monitor.
	///
	/// On hardware this never returns. Simulated monitors record the request
	/// and return, which an enclave must treat as a contract violation.
	fn exit_enclave(&mut self);
}
