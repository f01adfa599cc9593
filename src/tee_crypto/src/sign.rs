//! Signing and signature verification with NIST P-256.

use p256::ecdsa::{
	signature::{Signer, Verifier},
	Signature, SigningKey, VerifyingKey,
};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Length of a raw secret scalar.
pub const SECRET_KEY_LEN: usize = 32;
/// Length of an uncompressed SEC1 encoded public key.
pub const PUBLIC_KEY_LEN: usize = 65;
/// Length of a fixed size `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Sign key pair. The secret scalar is wiped when the pair is dropped.
pub struct SignPair {
	private: SigningKey,
}

impl SignPair {
	/// Generate a new key using the OS randomness source.
	#[must_use]
	pub fn generate() -> Self {
		Self { private: SigningKey::random(&mut OsRng) }
	}

	/// Sign `message`. Signing is deterministic (RFC 6979): the same key and
	/// message always give the same signature.
	#[must_use]
	pub fn sign(&self, message: &[u8]) -> Vec<u8> {
		let signature: Signature = self.private.sign(message);
		signature.to_bytes().to_vec()
	}

	/// Get the public key of this pair.
	#[must_use]
	pub fn public_key(&self) -> SignPublic {
		SignPublic { public: VerifyingKey::from(&self.private) }
	}

	/// Deserialize key from a raw scalar byte slice.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		if bytes.len() != SECRET_KEY_LEN {
			return Err(CryptoError::FailedToReadSecret);
		}

		Ok(Self {
			private: SigningKey::from_slice(bytes)
				.map_err(|_| CryptoError::FailedToReadSecret)?,
		})
	}

	/// Serialize key to a raw scalar.
	#[must_use]
	pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
		Zeroizing::new(self.private.to_bytes().to_vec())
	}
}

/// Public key for verifying signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignPublic {
	public: VerifyingKey,
}

impl SignPublic {
	/// Verify a `signature` over `message` against this public key.
	///
	/// Returns Ok if the signature is good.
	pub fn verify(
		&self,
		message: &[u8],
		signature: &[u8],
	) -> Result<(), CryptoError> {
		let signature = Signature::from_slice(signature)
			.map_err(|_| CryptoError::FailedToDeserializeSignature)?;

		self.public
			.verify(message, &signature)
			.map_err(|_| CryptoError::FailedSignatureVerification)
	}

	/// Serialize to SEC1 encoded point, not compressed.
	#[must_use]
	pub fn to_bytes(&self) -> Vec<u8> {
		self.public.to_encoded_point(false).as_bytes().to_vec()
	}

	/// Deserialize from a SEC1 encoded point.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		Ok(Self {
			public: VerifyingKey::from_sec1_bytes(bytes)
				.map_err(|_| CryptoError::FailedToReadPublicKey)?,
		})
	}
}
