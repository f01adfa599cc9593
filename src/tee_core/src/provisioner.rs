//! Key and measurement provisioning from the security monitor.
//!
//! The monitor is trusted and local; a failed `get_keys` is taken to be a
//! transient race on the privilege transition and is retried straight away,
//! with no backoff and no bound. Only test and simulation builds can bound
//! the number of attempts.

use log::{info, trace};
use tee_crypto::{CryptoError, SignPair, SignPublic};
use tee_monitor::{
	types::{ApiResult, KeyBundle, Measurement},
	MonitorProvider,
};

/// How long to keep polling the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
	/// Poll until the monitor issues keys.
	Unbounded,
	/// Give up after this many attempts.
	#[cfg(any(feature = "mock", test))]
	Bounded(usize),
}

/// Provisioning error. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
	/// A bounded policy ran out of attempts.
	RetriesExhausted {
		/// Attempts made.
		attempts: usize,
		/// Status of the last attempt.
		last: ApiResult,
	},
	/// The monitor issued a secret that is not a valid key.
	InvalidSecretKey(CryptoError),
	/// The monitor issued a public key that does not parse.
	InvalidPublicKey(CryptoError),
	/// The issued public key does not belong to the issued secret.
	MismatchedPublicKey,
}

impl std::fmt::Display for ProvisionError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::RetriesExhausted { attempts, last } => write!(
				f,
				"no keys after {attempts} attempts, last status: {last}"
			),
			Self::InvalidSecretKey(e) => write!(f, "issued secret key: {e}"),
			Self::InvalidPublicKey(e) => write!(f, "issued public key: {e}"),
			Self::MismatchedPublicKey => {
				write!(f, "issued public key does not match the secret key")
			}
		}
	}
}

impl std::error::Error for ProvisionError {}

/// Measurement, key pair and attestation for one session.
pub struct SessionKeys {
	measurement: Measurement,
	pair: SignPair,
	public: SignPublic,
	attestation: Vec<u8>,
}

impl SessionKeys {
	/// Measurement of the enclave image the keys are bound to.
	#[must_use]
	pub fn measurement(&self) -> &Measurement {
		&self.measurement
	}

	/// The session key pair.
	#[must_use]
	pub fn pair(&self) -> &SignPair {
		&self.pair
	}

	/// The session public key.
	#[must_use]
	pub fn public_key(&self) -> &SignPublic {
		&self.public
	}

	/// The monitor's attestation. Kept as issued, never checked here.
	#[must_use]
	pub fn attestation(&self) -> &[u8] {
		&self.attestation
	}
}

impl TryFrom<KeyBundle> for SessionKeys {
	type Error = ProvisionError;

	fn try_from(bundle: KeyBundle) -> Result<Self, Self::Error> {
		let pair = SignPair::from_bytes(&bundle.secret_key)
			.map_err(ProvisionError::InvalidSecretKey)?;
		let public = SignPublic::from_bytes(&bundle.public_key)
			.map_err(ProvisionError::InvalidPublicKey)?;

		if pair.public_key() != public {
			return Err(ProvisionError::MismatchedPublicKey);
		}

		Ok(Self {
			measurement: bundle.measurement,
			pair,
			public,
			attestation: bundle.attestation,
		})
	}
}

/// Blocking key acquisition. Once keys are acquired they are final.
pub struct Provisioner {
	policy: RetryPolicy,
	attempts: usize,
	keys: Option<SessionKeys>,
}

impl Provisioner {
	/// Create a instance of [`Self`].
	#[must_use]
	pub fn new(policy: RetryPolicy) -> Self {
		Self { policy, attempts: 0, keys: None }
	}

	/// Poll the monitor until it issues keys. Returns the keys already held
	/// without touching the monitor if this succeeded before.
	pub fn acquire(
		&mut self,
		monitor: &mut dyn MonitorProvider,
	) -> Result<&SessionKeys, ProvisionError> {
		let keys = match self.keys.take() {
			Some(keys) => keys,
			None => self.poll(monitor)?,
		};

		Ok(&*self.keys.insert(keys))
	}

	fn poll(
		&mut self,
		monitor: &mut dyn MonitorProvider,
	) -> Result<SessionKeys, ProvisionError> {
		loop {
			self.attempts += 1;
			match monitor.get_keys() {
				Ok(bundle) => {
					info!("monitor issued keys after {} attempt(s)", self.attempts);
					return SessionKeys::try_from(bundle);
				}
				Err(status) => {
					trace!("get_keys attempt {} failed: {status}", self.attempts);
					if self.exhausted() {
						return Err(ProvisionError::RetriesExhausted {
							attempts: self.attempts,
							last: status,
						});
					}
				}
			}
		}
	}

	fn exhausted(&self) -> bool {
		match self.policy {
			RetryPolicy::Unbounded => false,
			#[cfg(any(feature = "mock", test))]
			RetryPolicy::Bounded(max) => self.attempts >= max,
		}
	}
}
