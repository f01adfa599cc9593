//! Binding to the security monitor's enclave call interface.
//!
//! Layouts follow the monitor ABI as deployed with P-256 enclave keys: a 64
//! byte measurement, a 65 byte uncompressed public key, a 32 byte secret
//! scalar and a 64 byte attestation.

use std::os::raw::c_int;

use tee_crypto::{PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use zeroize::Zeroizing;

use crate::{
	types::{ApiResult, KeyBundle, ATTESTATION_LEN, MEASUREMENT_LEN},
	MonitorProvider,
};

extern "C" {
	fn sm_enclave_get_keys(
		measurement: *mut u8,
		public_key: *mut u8,
		secret_key: *mut u8,
		attestation: *mut u8,
	) -> c_int;

	fn sm_exit_enclave() -> c_int;
}

/// The security monitor of the machine the enclave runs on.
pub struct SecurityMonitor;

impl MonitorProvider for SecurityMonitor {
	fn get_keys(&mut self) -> Result<KeyBundle, ApiResult> {
		let mut measurement = [0u8; MEASUREMENT_LEN];
		let mut public_key = vec![0u8; PUBLIC_KEY_LEN];
		let mut secret_key = Zeroizing::new(vec![0u8; SECRET_KEY_LEN]);
		let mut attestation = vec![0u8; ATTESTATION_LEN];

		// SAFETY: every pointer refers to an exclusively borrowed buffer of
		// exactly the length the monitor writes for that argument.
		let code = unsafe {
			sm_enclave_get_keys(
				measurement.as_mut_ptr(),
				public_key.as_mut_ptr(),
				secret_key.as_mut_ptr(),
				attestation.as_mut_ptr(),
			)
		};

		match ApiResult::from_raw(i64::from(code)) {
			ApiResult::Ok => {
				Ok(KeyBundle { measurement, public_key, secret_key, attestation })
			}
			status => Err(status),
		}
	}

	fn exit_enclave(&mut self) {
		// SAFETY: takes no arguments; the monitor tears the enclave down and
		// does not come back here.
		let _ = unsafe { sm_exit_enclave() };
	}
}
