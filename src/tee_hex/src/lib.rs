//! Hex encoding for everything that leaves the enclave as text.
//!
//! The export encoding is fixed: two uppercase characters per byte, most
//! significant nibble first, no separators. Decoding is case insensitive so
//! relying parties can feed exported lines straight back in.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use std::{num::ParseIntError, string::FromUtf8Error};

const MEGABYTE: usize = 1024 * 1024;
const STR_MAX_LENGTH: usize = 16 * MEGABYTE;

/// Terminator appended to every exported line.
pub const LINE_FEED: u8 = b'\n';

/// Digits used for each nibble, indexed by nibble value.
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Error type for decoding hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexError {
	/// Input was of length 1, which is an odd length.
	LengthOne,
	/// Could not decode the input because it was an odd length.
	OddLength,
	/// Error trying to parse hex characters to a u8.
	ParseInt(ParseIntError),
	/// The input could not be decoded because it exceeds the max allowed
	/// length.
	// See `STR_MAX_LENGTH` for the max length.
	ExceedsMaxLength,
	/// A non ascii char was used as input
	NonAsciiChar,
	/// An ascii char that is not a hex digit was used as input.
	InvalidHexChar(char),
	/// Invalid UTF-8 byte vector when converting to String
	InvalidUtf8(FromUtf8Error),
}

impl From<ParseIntError> for HexError {
	fn from(e: ParseIntError) -> Self {
		HexError::ParseInt(e)
	}
}

impl From<FromUtf8Error> for HexError {
	fn from(e: FromUtf8Error) -> Self {
		HexError::InvalidUtf8(e)
	}
}

impl std::fmt::Display for HexError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::LengthOne => write!(f, "hex input has length one"),
			Self::OddLength => write!(f, "hex input has odd length"),
			Self::ParseInt(e) => write!(f, "invalid hex digit: {e}"),
			Self::ExceedsMaxLength => write!(f, "hex input is too long"),
			Self::NonAsciiChar => write!(f, "hex input is not ascii"),
			Self::InvalidHexChar(c) => write!(f, "invalid hex digit `{c}`"),
			Self::InvalidUtf8(e) => write!(f, "hex input is not utf8: {e}"),
		}
	}
}

impl std::error::Error for HexError {}

fn verify_hex_digit(byte: u8) -> Result<(), HexError> {
	if byte >= 128 {
		return Err(HexError::NonAsciiChar);
	}
	// `from_str_radix` would also take a leading sign.
	if !byte.is_ascii_hexdigit() {
		return Err(HexError::InvalidHexChar(char::from(byte)));
	}
	Ok(())
}

/// Decode bytes from a hex encoded string.
///
/// Accepts upper and lower case digits, with or without a `0x` prefix.
pub fn decode(raw_s: &str) -> Result<Vec<u8>, HexError> {
	let sanitized_s = match raw_s.len() {
		0 => return Ok(Vec::new()),
		1 => return Err(HexError::LengthOne),
		_ => raw_s.strip_prefix("0x").unwrap_or(raw_s),
	};

	let len = sanitized_s.len();
	match (len % 2 == 0, len < STR_MAX_LENGTH) {
		(true, true) => {
			let bytes = sanitized_s.as_bytes();
			bytes
				.chunks(2)
				.map(|pair| {
					verify_hex_digit(pair[0])?;
					verify_hex_digit(pair[1])?;

					// Both bytes are ascii so this cannot split a char.
					let s = std::str::from_utf8(pair)
						.map_err(|_| HexError::NonAsciiChar)?;
					u8::from_str_radix(s, 16).map_err(Into::into)
				})
				.collect()
		}
		(_, false) => Err(HexError::ExceedsMaxLength),
		(false, true) => Err(HexError::OddLength),
	}
}

/// Decode a hex encoded byte vector, ignoring surrounding whitespace. This is
/// the inverse of [`encode_line`] once the line is read back as bytes.
pub fn decode_from_vec(vec: Vec<u8>) -> Result<Vec<u8>, HexError> {
	let hex_string = String::from_utf8(vec)?;
	decode(hex_string.trim())
}

/// Encode a byte slice to an uppercase hex string.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
	String::from_utf8(encode_to_vec(bytes))
		.expect("HEX_DIGITS only contains ascii. qed.")
}

/// Encode a byte slice to uppercase hex, as bytes.
#[must_use]
pub fn encode_to_vec(bytes: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(bytes.len() * 2);
	for &b in bytes {
		out.push(HEX_DIGITS[usize::from(b >> 4)]);
		out.push(HEX_DIGITS[usize::from(b & 0x0F)]);
	}
	out
}

/// Encode a byte slice as a single exported line: the uppercase hex encoding
/// followed by one [`LINE_FEED`].
#[must_use]
pub fn encode_line(bytes: &[u8]) -> Vec<u8> {
	let mut line = encode_to_vec(bytes);
	line.push(LINE_FEED);
	line
}
