//! Primitive types for test setup.

use std::ops::Deref;

use rand::{distributions::Alphanumeric, Rng};

const TMP_SUFFIX_LEN: usize = 12;

#[derive(Debug)]
enum Internal<'a> {
	String(String),
	Str(&'a str),
}

/// Wrapper type for [`std::path::Path`] that attempts to remove a file or
/// directory at the path on drop.
#[derive(Debug)]
pub struct PathWrapper<'a>(Internal<'a>);

impl<'a> From<&'a str> for PathWrapper<'a> {
	fn from(path: &'a str) -> Self {
		Self(Internal::Str(path))
	}
}

impl From<String> for PathWrapper<'_> {
	fn from(path: String) -> Self {
		Self(Internal::String(path))
	}
}

impl Drop for PathWrapper<'_> {
	fn drop(&mut self) {
		// Try removing it both as a file and as a directory. One of these
		// will always fail
		drop(std::fs::remove_dir_all(&**self));
		drop(std::fs::remove_file(&**self));
	}
}

impl Deref for PathWrapper<'_> {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		match &self.0 {
			Internal::String(i) => i,
			Internal::Str(i) => i,
		}
	}
}

/// A path under the system temp dir that no other test will pick, cleaned up
/// when the wrapper drops.
#[must_use]
pub fn tmp_path(name: &str) -> PathWrapper<'static> {
	let suffix: String = rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(TMP_SUFFIX_LEN)
		.map(char::from)
		.collect();

	let path = std::env::temp_dir().join(format!("{name}.{suffix}"));
	path.to_string_lossy().into_owned().into()
}
