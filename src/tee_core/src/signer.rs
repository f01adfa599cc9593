//! Attestation signer: signs the finalized output digest with the session key
//! and renders the signature as the export line.

use tee_crypto::CryptoError;

use crate::{accumulator::OutputDigest, provisioner::SessionKeys};

/// Signature over a session's [`OutputDigest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
	/// Raw signature bytes.
	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// Sign `digest` with the session key.
///
/// Debug builds verify the fresh signature against the session public key
/// before handing it out.
pub fn sign(
	digest: &OutputDigest,
	keys: &SessionKeys,
) -> Result<Signature, CryptoError> {
	let signature = Signature(keys.pair().sign(digest));

	if cfg!(debug_assertions) {
		keys.public_key().verify(digest, signature.as_bytes())?;
	}

	Ok(signature)
}

/// Export encoding of `signature`: uppercase hex, most significant nibble
/// first, followed by one line feed.
#[must_use]
pub fn encode_hex(signature: &Signature) -> Vec<u8> {
	tee_hex::encode_line(signature.as_bytes())
}

#[cfg(test)]
mod test {
	use tee_crypto::{sha_512, SIGNATURE_LEN};
	use tee_monitor::{mock::MockMonitor, MonitorProvider};

	use super::*;

	fn keys(monitor: &mut MockMonitor) -> SessionKeys {
		SessionKeys::try_from(monitor.get_keys().unwrap()).unwrap()
	}

	#[test]
	fn signature_verifies_against_the_digest_only() {
		let mut monitor = MockMonitor::new();
		let keys = keys(&mut monitor);
		let digest = sha_512(b"hello\r\n");

		let signature = sign(&digest, &keys).unwrap();
		assert_eq!(signature.as_bytes().len(), SIGNATURE_LEN);

		let public = monitor.public_key();
		assert!(public.verify(&digest, signature.as_bytes()).is_ok());

		let mutated = sha_512(b"hellO\r\n");
		assert_eq!(
			public.verify(&mutated, signature.as_bytes()),
			Err(CryptoError::FailedSignatureVerification)
		);
	}

	#[test]
	fn export_line_is_uppercase_hex_plus_line_feed() {
		assert_eq!(encode_hex(&Signature(vec![0xAF])), b"AF\n".to_vec());
		assert_eq!(encode_hex(&Signature(vec![])), b"\n".to_vec());

		let mut monitor = MockMonitor::new();
		let keys = keys(&mut monitor);
		let signature = sign(&sha_512(b""), &keys).unwrap();
		let line = encode_hex(&signature);

		assert_eq!(line.len(), 2 * SIGNATURE_LEN + 1);
		assert_eq!(tee_hex::decode_from_vec(line).unwrap(), signature.as_bytes());
	}
}
