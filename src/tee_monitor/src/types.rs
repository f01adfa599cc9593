//! Types exchanged with the security monitor.

use zeroize::Zeroizing;

/// Length of the enclave measurement.
pub const MEASUREMENT_LEN: usize = 64;
/// Length of the monitor's attestation over the issued keys.
pub const ATTESTATION_LEN: usize = 64;

/// Digest of the code and data loaded into the enclave.
pub type Measurement = [u8; MEASUREMENT_LEN];

/// Status returned by every monitor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiResult {
	/// The call succeeded.
	Ok,
	/// An argument was rejected.
	InvalidValue,
	/// The monitor or enclave is not in a state that allows the call.
	InvalidState,
	/// Another core is inside the monitor; the call may be retried.
	ConcurrentCall,
	/// The caller is not allowed to make the call.
	AccessDenied,
	/// The call is not supported by this monitor.
	Unsupported,
	/// A code this crate does not know about.
	Unknown(i64),
}

impl ApiResult {
	/// Map a raw status code from the monitor.
	#[must_use]
	pub fn from_raw(code: i64) -> Self {
		match code {
			0 => Self::Ok,
			1 => Self::InvalidValue,
			2 => Self::InvalidState,
			3 => Self::ConcurrentCall,
			4 => Self::AccessDenied,
			5 => Self::Unsupported,
			other => Self::Unknown(other),
		}
	}
}

impl std::fmt::Display for ApiResult {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Ok => write!(f, "ok"),
			Self::InvalidValue => write!(f, "invalid value"),
			Self::InvalidState => write!(f, "invalid state"),
			Self::ConcurrentCall => write!(f, "concurrent call"),
			Self::AccessDenied => write!(f, "access denied"),
			Self::Unsupported => write!(f, "unsupported"),
			Self::Unknown(code) => write!(f, "unknown monitor status {code}"),
		}
	}
}

impl std::error::Error for ApiResult {}

/// Everything the monitor hands out for one enclave: the measurement, a key
/// pair bound to it and the monitor's attestation of that binding.
pub struct KeyBundle {
	/// Measurement of the enclave image.
	pub measurement: Measurement,
	/// SEC1 encoded public key.
	pub public_key: Vec<u8>,
	/// Raw secret scalar. Wiped on drop.
	pub secret_key: Zeroizing<Vec<u8>>,
	/// Monitor signature binding `measurement` to `public_key`.
	pub attestation: Vec<u8>,
}

impl std::fmt::Debug for KeyBundle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyBundle")
			.field("measurement", &tee_hex::encode(&self.measurement))
			.field("public_key", &tee_hex::encode(&self.public_key))
			.field("secret_key", &"<redacted>")
			.field("attestation", &tee_hex::encode(&self.attestation))
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn raw_codes_map_to_statuses() {
		assert_eq!(ApiResult::from_raw(0), ApiResult::Ok);
		assert_eq!(ApiResult::from_raw(3), ApiResult::ConcurrentCall);
		assert_eq!(ApiResult::from_raw(-1), ApiResult::Unknown(-1));
		assert_eq!(ApiResult::from_raw(4), ApiResult::AccessDenied);
	}

	#[test]
	fn debug_never_shows_the_secret() {
		let bundle = KeyBundle {
			measurement: [0xAB; MEASUREMENT_LEN],
			public_key: vec![4, 1, 2],
			secret_key: Zeroizing::new(vec![0x42; 32]),
			attestation: vec![9; ATTESTATION_LEN],
		};

		let debug = format!("{bundle:?}");
		assert!(debug.contains("<redacted>"));
		assert!(!debug.contains(&tee_hex::encode(&[0x42; 32])));
		assert!(debug.contains("040102"));
	}
}
