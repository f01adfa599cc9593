//! Integrity accumulator: the running digest over every byte a session emits.

use tee_crypto::{Digest512, HashContext};

/// Finalized digest of a session's output.
pub type OutputDigest = Digest512;

/// Running digest over emitted bytes.
///
/// Constant memory no matter how much is emitted. [`Self::finalize`] takes
/// the accumulator by value, so extending a finalized digest does not
/// compile.
pub struct Accumulator {
	context: HashContext,
	len: u64,
}

impl Accumulator {
	/// Start an empty digest.
	#[must_use]
	pub fn init() -> Self {
		Self { context: HashContext::new(), len: 0 }
	}

	/// Fold one byte into the digest.
	pub fn extend(&mut self, byte: u8) {
		self.context.extend(&[byte]);
		self.len += 1;
	}

	/// Number of bytes folded in so far.
	pub(crate) fn len(&self) -> u64 {
		self.len
	}

	/// Close the digest.
	#[must_use]
	pub fn finalize(self) -> OutputDigest {
		self.context.finalize()
	}
}
