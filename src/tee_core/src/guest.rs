//! The guest workload: one source text, run exactly once, that may only
//! emit through the session console.

use std::process::{Command, Stdio};

use crate::console::{Console, ConsoleError};

/// Source text of the workload a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestProgram {
	name: String,
	source: String,
}

impl GuestProgram {
	/// Create a instance of [`Self`].
	#[must_use]
	pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
		Self { name: name.into(), source: source.into() }
	}

	/// Name used in logs.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Source text handed to the runtime.
	#[must_use]
	pub fn source(&self) -> &str {
		&self.source
	}
}

/// How a workload run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestFault {
	/// The workload raised an error it did not catch itself. The session
	/// reports the text and carries on.
	Raised(String),
	/// The runtime itself broke. Ends the session.
	Fatal(String),
}

impl std::fmt::Display for GuestFault {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Raised(text) => write!(f, "raised: {text}"),
			Self::Fatal(text) => write!(f, "fatal: {text}"),
		}
	}
}

impl std::error::Error for GuestFault {}

// A workload that can no longer reach the console cannot be reported on.
impl From<ConsoleError> for GuestFault {
	fn from(err: ConsoleError) -> Self {
		Self::Fatal(err.to_string())
	}
}

/// Script engine seam. The session calls `init`, `exec` once, then `deinit`.
pub trait GuestRuntime {
	/// Bring the runtime up. Any error here ends the session.
	fn init(&mut self) -> Result<(), GuestFault> {
		Ok(())
	}

	/// Compile and run `source`, emitting only through `console`.
	fn exec(
		&mut self,
		source: &str,
		console: &mut Console<'_>,
	) -> Result<(), GuestFault>;

	/// Tear the runtime down.
	fn deinit(&mut self) {}
}

/// Runs the source with an external interpreter, e.g. `python3 -c <source>`.
///
/// Standard output is forwarded through the cooked writer once the
/// interpreter exits. A non-zero exit is a raised error described by the
/// interpreter's standard error. An interpreter that cannot be started or
/// that is killed by a signal is fatal.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
	interpreter: String,
	source_arg: String,
}

impl ProcessRuntime {
	/// Create a instance of [`Self`].
	#[must_use]
	pub fn new(
		interpreter: impl Into<String>,
		source_arg: impl Into<String>,
	) -> Self {
		Self { interpreter: interpreter.into(), source_arg: source_arg.into() }
	}
}

impl GuestRuntime for ProcessRuntime {
	fn exec(
		&mut self,
		source: &str,
		console: &mut Console<'_>,
	) -> Result<(), GuestFault> {
		let output = Command::new(&self.interpreter)
			.arg(&self.source_arg)
			.arg(source)
			.stdin(Stdio::null())
			.output()
			.map_err(|e| {
				GuestFault::Fatal(format!(
					"failed to start {}: {e}",
					self.interpreter
				))
			})?;

		console.write_string_cooked(&output.stdout)?;

		if output.status.success() {
			return Ok(());
		}
		// No exit code means the interpreter was killed, not that the
		// workload raised.
		if output.status.code().is_none() {
			return Err(GuestFault::Fatal(format!(
				"{} terminated: {}",
				self.interpreter, output.status
			)));
		}

		let stderr = String::from_utf8_lossy(&output.stderr);
		let description = match stderr.trim_end() {
			"" => format!("{} exited with {}", self.interpreter, output.status),
			text => text.to_string(),
		};
		Err(GuestFault::Raised(description))
	}
}

/// Scripted runtime for tests and simulation.
#[cfg(any(feature = "mock", test))]
pub mod mock {
	use super::{Console, GuestFault, GuestRuntime};

	/// Replays fixed output, then ends with a fixed outcome.
	#[derive(Debug, Clone, Default)]
	pub struct ScriptedRuntime {
		output: Vec<u8>,
		init_outcome: Option<GuestFault>,
		outcome: Option<GuestFault>,
		init_calls: usize,
		exec_calls: usize,
		deinit_calls: usize,
	}

	impl ScriptedRuntime {
		/// Emit `output` through the cooked writer and succeed.
		#[must_use]
		pub fn new(output: impl Into<Vec<u8>>) -> Self {
			Self { output: output.into(), ..Default::default() }
		}

		/// End the run with `fault` after emitting the output.
		#[must_use]
		pub fn failing_with(mut self, fault: GuestFault) -> Self {
			self.outcome = Some(fault);
			self
		}

		/// Fail `init` with `fault`.
		#[must_use]
		pub fn failing_init(mut self, fault: GuestFault) -> Self {
			self.init_outcome = Some(fault);
			self
		}

		/// Number of `init` calls.
		#[must_use]
		pub fn init_calls(&self) -> usize {
			self.init_calls
		}

		/// Number of `exec` calls.
		#[must_use]
		pub fn exec_calls(&self) -> usize {
			self.exec_calls
		}

		/// Number of `deinit` calls.
		#[must_use]
		pub fn deinit_calls(&self) -> usize {
			self.deinit_calls
		}
	}

	impl GuestRuntime for ScriptedRuntime {
		fn init(&mut self) -> Result<(), GuestFault> {
			self.init_calls += 1;
			match &self.init_outcome {
				None => Ok(()),
				Some(fault) => Err(fault.clone()),
			}
		}

		fn exec(
			&mut self,
			_source: &str,
			console: &mut Console<'_>,
		) -> Result<(), GuestFault> {
			self.exec_calls += 1;
			console.write_string_cooked(&self.output)?;
			match &self.outcome {
				None => Ok(()),
				Some(fault) => Err(fault.clone()),
			}
		}

		fn deinit(&mut self) {
			self.deinit_calls += 1;
		}
	}
}
