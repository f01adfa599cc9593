//! Console transport over the shared region the host supplies at entry.
//!
//! The region is host memory. The enclave only ever writes into it, front to
//! back, past a cursor it keeps itself; nothing is ever read back from it.
//! Capacity is the length of the region as handed over at entry and writes
//! are fail-closed: a string that does not fit is rejected before any of its
//! bytes are hashed or written.

use crate::accumulator::{Accumulator, OutputDigest};

/// Value returned by [`Console::read_byte`]. There is no input channel.
pub const CONSOLE_NO_INPUT: u8 = 0;

const CARRIAGE_RETURN: u8 = b'\r';
const LINE_FEED: u8 = b'\n';

/// Console transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
	/// The write does not fit in what is left of the region.
	Overflow {
		/// Bytes the write needs.
		needed: usize,
		/// Bytes left in the region.
		remaining: usize,
	},
}

impl std::fmt::Display for ConsoleError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Overflow { needed, remaining } => write!(
				f,
				"console overflow: {needed} bytes needed, {remaining} remaining"
			),
		}
	}
}

impl std::error::Error for ConsoleError {}

/// Cursor into the host region.
struct Cursor<'a> {
	region: &'a mut [u8],
	next: usize,
}

impl Cursor<'_> {
	fn remaining(&self) -> usize {
		self.region.len() - self.next
	}

	fn reserve(&self, needed: usize) -> Result<(), ConsoleError> {
		let remaining = self.remaining();
		if needed > remaining {
			return Err(ConsoleError::Overflow { needed, remaining });
		}
		Ok(())
	}

	/// Caller must have reserved room for `byte`.
	fn put(&mut self, byte: u8) {
		self.region[self.next] = byte;
		self.next += 1;
	}
}

/// A host region the session has taken hold of but cannot write to yet.
/// Becomes a [`Console`] once the accumulator exists, so no byte can reach
/// the region unhashed.
pub struct ConsoleBinding<'a> {
	cursor: Cursor<'a>,
}

impl<'a> ConsoleBinding<'a> {
	/// Bind to the region supplied by the host.
	#[must_use]
	pub fn bind(region: &'a mut [u8]) -> Self {
		Self { cursor: Cursor { region, next: 0 } }
	}

	/// Capacity of the bound region.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.cursor.region.len()
	}

	/// Start hashing and writing.
	#[must_use]
	pub fn attach(self, accumulator: Accumulator) -> Console<'a> {
		Console { cursor: self.cursor, accumulator }
	}
}

/// Hashed writer into the host region. Every byte is folded into the
/// accumulator and then written at the cursor, in that order.
pub struct Console<'a> {
	cursor: Cursor<'a>,
	accumulator: Accumulator,
}

impl<'a> Console<'a> {
	/// Hash and write one byte.
	pub fn write_byte(&mut self, byte: u8) -> Result<(), ConsoleError> {
		self.cursor.reserve(1)?;
		self.emit(byte);
		Ok(())
	}

	/// Hash and write `bytes` in order. Nothing is written unless all of
	/// `bytes` fits.
	pub fn write_string(&mut self, bytes: &[u8]) -> Result<(), ConsoleError> {
		self.cursor.reserve(bytes.len())?;
		bytes.iter().for_each(|b| self.emit(*b));
		Ok(())
	}

	/// Like [`Self::write_string`], but every line feed is preceded by a
	/// carriage return. Both bytes are hashed and written.
	pub fn write_string_cooked(
		&mut self,
		bytes: &[u8],
	) -> Result<(), ConsoleError> {
		let line_feeds = bytes.iter().filter(|b| **b == LINE_FEED).count();
		self.cursor.reserve(bytes.len() + line_feeds)?;

		for b in bytes {
			if *b == LINE_FEED {
				self.emit(CARRIAGE_RETURN);
			}
			self.emit(*b);
		}
		Ok(())
	}

	/// There is no input channel; always [`CONSOLE_NO_INPUT`].
	#[must_use]
	pub fn read_byte(&self) -> u8 {
		CONSOLE_NO_INPUT
	}

	/// Bytes written so far.
	#[must_use]
	pub fn bytes_written(&self) -> usize {
		self.cursor.next
	}

	/// Bytes left in the region.
	#[must_use]
	pub fn remaining(&self) -> usize {
		self.cursor.remaining()
	}

	/// Finalize the accumulator. What is left of the region can only be
	/// used for the single unhashed export line.
	#[must_use]
	pub fn seal(self) -> (OutputDigest, ExportChannel<'a>) {
		// Every byte in the region went through the accumulator.
		debug_assert_eq!(self.accumulator.len(), self.cursor.next as u64);
		(self.accumulator.finalize(), ExportChannel { cursor: self.cursor })
	}

	fn emit(&mut self, byte: u8) {
		self.accumulator.extend(byte);
		self.cursor.put(byte);
	}
}

/// One-shot writer for the export line. Bytes written here are not part of
/// the digest they carry the signature of.
pub struct ExportChannel<'a> {
	cursor: Cursor<'a>,
}

impl ExportChannel<'_> {
	/// Write `line` after everything the session emitted. Consumes the
	/// channel. Returns the total number of bytes now in the region.
	pub fn transmit_line(mut self, line: &[u8]) -> Result<usize, ConsoleError> {
		self.cursor.reserve(line.len())?;
		line.iter().for_each(|b| self.cursor.put(*b));
		Ok(self.cursor.next)
	}
}

#[cfg(test)]
mod test {
	use tee_crypto::sha_512;

	use super::*;

	const UNTOUCHED: u8 = 0xEE;

	fn console(region: &mut [u8]) -> Console<'_> {
		ConsoleBinding::bind(region).attach(Accumulator::init())
	}

	#[test]
	fn cooked_writer_inserts_carriage_returns() {
		let mut region = [UNTOUCHED; 8];
		let mut console = console(&mut region);

		console.write_string_cooked(b"a\nb").unwrap();
		assert_eq!(console.bytes_written(), 4);
		let (digest, _) = console.seal();

		assert_eq!(&region[..4], b"a\r\nb");
		assert_eq!(digest, sha_512(b"a\r\nb"));
		assert!(region[4..].iter().all(|b| *b == UNTOUCHED));
	}

	#[test]
	fn raw_and_cooked_writes_hash_in_emission_order() {
		let mut region = [UNTOUCHED; 32];
		let mut console = console(&mut region);

		console.write_byte(b'>').unwrap();
		console.write_string(b"x\n").unwrap();
		console.write_string_cooked(b"\n\ny").unwrap();
		let (digest, _) = console.seal();

		let expected = b">x\n\r\n\r\ny";
		assert_eq!(&region[..expected.len()], expected);
		assert_eq!(digest, sha_512(expected));
	}

	#[test]
	fn overflow_is_rejected_before_anything_is_written() {
		let mut region = [UNTOUCHED; 4];
		let mut console = console(&mut region);

		console.write_string(b"ab").unwrap();
		assert_eq!(
			console.write_string(b"cde"),
			Err(ConsoleError::Overflow { needed: 3, remaining: 2 })
		);
		// cooked "c\n" needs three bytes
		assert_eq!(
			console.write_string_cooked(b"c\n"),
			Err(ConsoleError::Overflow { needed: 3, remaining: 2 })
		);
		let (digest, _) = console.seal();

		assert_eq!(digest, sha_512(b"ab"));
		assert_eq!(region, [b'a', b'b', UNTOUCHED, UNTOUCHED]);
	}

	#[test]
	fn write_byte_fails_when_full() {
		let mut region = [UNTOUCHED; 1];
		let mut console = console(&mut region);

		console.write_byte(1).unwrap();
		assert_eq!(console.remaining(), 0);
		assert!(console.write_byte(2).is_err());
	}

	#[test]
	fn export_line_is_not_hashed() {
		let mut region = [UNTOUCHED; 16];
		let mut console = console(&mut region);

		console.write_string(b"out").unwrap();
		let (digest, export) = console.seal();
		let end = export.transmit_line(b"AF\n").unwrap();

		assert_eq!(end, 6);
		assert_eq!(&region[..6], b"outAF\n");
		assert_eq!(digest, sha_512(b"out"));
	}

	#[test]
	fn export_line_that_does_not_fit_writes_nothing() {
		let mut region = [UNTOUCHED; 4];
		let console = console(&mut region);

		let (_, export) = console.seal();
		assert!(export.transmit_line(b"ABCDEF\n").is_err());
		assert_eq!(region, [UNTOUCHED; 4]);
	}

	#[test]
	fn reads_return_the_sentinel() {
		let mut region = [0u8; 1];
		let console = console(&mut region);

		assert_eq!(console.read_byte(), CONSOLE_NO_INPUT);
	}

	#[test]
	fn binding_reports_capacity() {
		let mut region = [0u8; 12];
		assert_eq!(ConsoleBinding::bind(&mut region).capacity(), 12);
	}
}
