//! Cryptographic primitives consumed by the enclave session.
//!
//! Nothing here is session aware: the hash context and the signing keys are
//! plain building blocks. The session decides when they are created and makes
//! sure each one is used exactly once.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use sha2::Digest;

mod sign;

pub use sign::{SignPair, SignPublic, PUBLIC_KEY_LEN, SECRET_KEY_LEN, SIGNATURE_LEN};

/// Length of every digest produced by this crate.
pub const DIGEST_LEN: usize = 64;

/// 512bit digest.
pub type Digest512 = [u8; DIGEST_LEN];

/// Errors for the crypto primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
	/// The secret key bytes are not a valid P-256 scalar.
	FailedToReadSecret,
	/// The public key bytes are not a valid SEC1 encoded P-256 point.
	FailedToReadPublicKey,
	/// The signature bytes are not a valid `r || s` encoding.
	FailedToDeserializeSignature,
	/// The signature does not verify against the message and public key.
	FailedSignatureVerification,
}

impl std::fmt::Display for CryptoError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::FailedToReadSecret => write!(f, "invalid secret key bytes"),
			Self::FailedToReadPublicKey => write!(f, "invalid public key bytes"),
			Self::FailedToDeserializeSignature => {
				write!(f, "invalid signature encoding")
			}
			Self::FailedSignatureVerification => {
				write!(f, "signature verification failed")
			}
		}
	}
}

impl std::error::Error for CryptoError {}

/// Create a SHA512 hash digest of `buf`.
#[must_use]
pub fn sha_512(buf: &[u8]) -> Digest512 {
	let mut context = HashContext::new();
	context.extend(buf);
	context.finalize()
}

/// Running SHA512 digest.
///
/// Memory use is constant no matter how much is fed in. [`Self::finalize`]
/// consumes the context, so nothing can be folded in after the digest has
/// been produced.
#[derive(Clone, Default)]
pub struct HashContext {
	hasher: sha2::Sha512,
}

impl HashContext {
	/// Create an empty context.
	#[must_use]
	pub fn new() -> Self {
		Self { hasher: sha2::Sha512::new() }
	}

	/// Fold `bytes` into the digest, in order.
	pub fn extend(&mut self, bytes: &[u8]) {
		self.hasher.update(bytes);
	}

	/// Close the context and return the digest.
	#[must_use]
	pub fn finalize(self) -> Digest512 {
		let mut digest = [0u8; DIGEST_LEN];
		digest.copy_from_slice(&self.hasher.finalize());
		digest
	}
}
