//! Mocks for external monitor interfaces. Only for testing and local
//! simulation.

use tee_crypto::{sha_512, SignPair, SignPublic};

use crate::{
	types::{ApiResult, KeyBundle, Measurement},
	MonitorProvider,
};

/// Image the mock measurement is computed over.
pub const MOCK_ENCLAVE_IMAGE: &[u8] = b"tee mock enclave image";

/// Status handed out while the mock is failing transiently.
pub const MOCK_TRANSIENT_STATUS: ApiResult = ApiResult::ConcurrentCall;

/// How the mock corrupts the key material it hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corruption {
	None,
	/// The secret is not a valid scalar.
	Secret,
	/// The public key belongs to a different pair than the secret.
	Public,
}

/// Mock monitor. Issues one fresh P-256 pair per instance and attests it with
/// its own root key.
pub struct MockMonitor {
	pair: SignPair,
	root: SignPair,
	measurement: Measurement,
	transient_failures: usize,
	corruption: Corruption,
	get_keys_calls: usize,
	exit_calls: usize,
}

impl Default for MockMonitor {
	fn default() -> Self {
		Self::new()
	}
}

impl MockMonitor {
	/// Create a mock that issues keys on the first call.
	#[must_use]
	pub fn new() -> Self {
		Self {
			pair: SignPair::generate(),
			root: SignPair::generate(),
			measurement: sha_512(MOCK_ENCLAVE_IMAGE),
			transient_failures: 0,
			corruption: Corruption::None,
			get_keys_calls: 0,
			exit_calls: 0,
		}
	}

	/// Fail the first `count` calls to `get_keys` with
	/// [`MOCK_TRANSIENT_STATUS`].
	#[must_use]
	pub fn with_transient_failures(mut self, count: usize) -> Self {
		self.transient_failures = count;
		self
	}

	/// Hand out a secret key that is not a valid scalar.
	#[must_use]
	pub fn with_invalid_secret(mut self) -> Self {
		self.corruption = Corruption::Secret;
		self
	}

	/// Hand out a public key that does not belong to the secret key.
	#[must_use]
	pub fn with_mismatched_public_key(mut self) -> Self {
		self.corruption = Corruption::Public;
		self
	}

	/// Public key of the pair this mock issues.
	#[must_use]
	pub fn public_key(&self) -> SignPublic {
		self.pair.public_key()
	}

	/// Public key the attestations are signed with.
	#[must_use]
	pub fn root_public_key(&self) -> SignPublic {
		self.root.public_key()
	}

	/// Measurement this mock reports.
	#[must_use]
	pub fn measurement(&self) -> Measurement {
		self.measurement
	}

	/// Number of `get_keys` calls so far, failed ones included.
	#[must_use]
	pub fn get_keys_calls(&self) -> usize {
		self.get_keys_calls
	}

	/// Number of `exit_enclave` calls so far.
	#[must_use]
	pub fn exit_calls(&self) -> usize {
		self.exit_calls
	}

	/// Bytes covered by the attestation: `measurement || public_key`.
	#[must_use]
	pub fn attested_bytes(measurement: &Measurement, public_key: &[u8]) -> Vec<u8> {
		let mut buf = measurement.to_vec();
		buf.extend_from_slice(public_key);
		buf
	}
}

impl MonitorProvider for MockMonitor {
	fn get_keys(&mut self) -> Result<KeyBundle, ApiResult> {
		self.get_keys_calls += 1;
		if self.get_keys_calls <= self.transient_failures {
			return Err(MOCK_TRANSIENT_STATUS);
		}

		let public_key = match self.corruption {
			Corruption::Public => SignPair::generate().public_key().to_bytes(),
			_ => self.pair.public_key().to_bytes(),
		};
		let mut secret_key = self.pair.to_bytes();
		if self.corruption == Corruption::Secret {
			secret_key.iter_mut().for_each(|b| *b = 0);
		}
		let attestation = self
			.root
			.sign(&Self::attested_bytes(&self.measurement, &public_key));

		Ok(KeyBundle {
			measurement: self.measurement,
			public_key,
			secret_key,
			attestation,
		})
	}

	fn exit_enclave(&mut self) {
		self.exit_calls += 1;
	}
}
