//! CLI for running one attested session, either on a real security monitor
//! or as a host-side simulation against the mock monitor.

use std::{
	env, fs,
	io::{self, Write},
};

use env_logger::Env;
use log::error;

use crate::{
	guest::{GuestProgram, GuestRuntime, ProcessRuntime},
	parser::{GetParserForOptions, OptionsParser, Parser, Token},
	session::Halt,
	DEFAULT_CONSOLE_CAPACITY, DEFAULT_INTERPRETER, DEFAULT_INTERPRETER_ARG,
};

/// "mock"
pub const MOCK: &str = "mock";
/// Name for the option to make the mock monitor fail before issuing keys.
pub const MOCK_FAILURES: &str = "mock-failures";
/// Name for the option to specify the workload source file.
pub const SOURCE_FILE: &str = "source-file";
/// Name for the option to specify the interpreter program.
pub const INTERPRETER: &str = "interpreter";
/// Name for the option to specify the flag preceding the source text.
pub const INTERPRETER_ARG: &str = "interpreter-arg";
/// Name for the option to specify the console region size.
pub const CONSOLE_CAPACITY: &str = "console-capacity";
/// Name for the option to write the console region to a file.
pub const CONSOLE_OUT: &str = "console-out";
/// Name for the option to write the session public key to a file.
pub const PUBLIC_KEY_OUT: &str = "public-key-out";

#[cfg(not(feature = "sm"))]
const SM_BUILD_HINT: &str = "\"sm\" feature must be enabled to use the security monitor; build with `--no-default-features --features sm`";

/// Error from running the CLI.
#[derive(Debug)]
pub enum CliError {
	/// The workload source could not be read.
	ReadSource(io::Error),
	/// The console region or public key could not be written out.
	WriteOutput(io::Error),
	/// The session halted before exporting its signature.
	Halted(Halt),
}

impl std::fmt::Display for CliError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::ReadSource(e) => write!(f, "reading workload source: {e}"),
			Self::WriteOutput(e) => write!(f, "writing output: {e}"),
			Self::Halted(halt) => {
				write!(f, "session halted in {}: {}", halt.phase, halt.reason)
			}
		}
	}
}

impl std::error::Error for CliError {}

/// CLI options for running a session.
#[derive(Default, Clone, Debug, PartialEq)]
struct SessionOpts {
	parsed: Parser,
}

impl SessionOpts {
	fn new(args: &mut Vec<String>) -> Self {
		let parsed = OptionsParser::<SessionParser>::parse(args)
			.expect("Entered invalid CLI args");

		Self { parsed }
	}

	fn mock(&self) -> bool {
		self.parsed.flag(MOCK).unwrap_or(false)
	}

	fn mock_failures(&self) -> usize {
		self.parsed.single(MOCK_FAILURES).map_or(0, |n| {
			n.parse().expect("mock-failures must be a non-negative integer")
		})
	}

	fn source_file(&self) -> &str {
		self.parsed.single(SOURCE_FILE).expect("source-file is required.")
	}

	fn console_capacity(&self) -> usize {
		self.parsed
			.single(CONSOLE_CAPACITY)
			.expect("has a default value.")
			.parse()
			.expect("console-capacity must be a number of bytes")
	}

	fn program(&self) -> Result<GuestProgram, CliError> {
		let path = self.source_file();
		let source = fs::read_to_string(path).map_err(CliError::ReadSource)?;
		Ok(GuestProgram::new(path, source))
	}

	fn runtime(&self) -> ProcessRuntime {
		ProcessRuntime::new(
			self.parsed.single(INTERPRETER).expect("has a default value."),
			self.parsed.single(INTERPRETER_ARG).expect("has a default value."),
		)
	}

	fn run(&self) -> Result<(), CliError> {
		let program = self.program()?;
		let mut runtime = self.runtime();
		let mut region = vec![0u8; self.console_capacity()];

		if !self.mock() {
			#[cfg(feature = "sm")]
			{
				let mut monitor = tee_monitor::sm::SecurityMonitor;
				crate::session::enclave_entry(
					&mut region,
					&mut monitor,
					&mut runtime,
					&program,
				)
			}
			#[cfg(not(feature = "sm"))]
			{
				panic!("{SM_BUILD_HINT}")
			}
		}

		self.simulate(&mut region, &mut runtime, &program)
	}

	/// Run the session against the mock monitor and hand its output to the
	/// host the way a relying party would see it.
	#[cfg(feature = "mock")]
	fn simulate(
		&self,
		region: &mut [u8],
		runtime: &mut dyn GuestRuntime,
		program: &GuestProgram,
	) -> Result<(), CliError> {
		use tee_monitor::mock::MockMonitor;

		use crate::{provisioner::RetryPolicy, session::Session};

		let mut monitor =
			MockMonitor::new().with_transient_failures(self.mock_failures());
		let public_key = monitor.public_key();

		let halt = Session::new(
			region,
			&mut monitor,
			runtime,
			program,
			RetryPolicy::Unbounded,
		)
		.run();
		if !halt.exported() {
			return Err(CliError::Halted(halt));
		}

		// The export line is the last line in the region.
		let end = region
			.iter()
			.rposition(|b| *b == tee_hex::LINE_FEED)
			.map_or(0, |i| i + 1);

		let written = match self.parsed.single(CONSOLE_OUT) {
			Some(path) => fs::write(path, &region[..end]),
			None => {
				let mut stdout = io::stdout();
				stdout.write_all(&region[..end]).and_then(|()| stdout.flush())
			}
		};
		written.map_err(CliError::WriteOutput)?;

		if let Some(path) = self.parsed.single(PUBLIC_KEY_OUT) {
			fs::write(path, tee_hex::encode_line(&public_key.to_bytes()))
				.map_err(CliError::WriteOutput)?;
		}

		Ok(())
	}

	#[cfg(not(feature = "mock"))]
	fn simulate(
		&self,
		_region: &mut [u8],
		_runtime: &mut dyn GuestRuntime,
		_program: &GuestProgram,
	) -> Result<(), CliError> {
		panic!("\"mock\" feature must be enabled to use `MockMonitor`")
	}
}

/// Session CLI.
pub struct CLI;
impl CLI {
	/// Execute the CLI with the environment args.
	///
	/// Exits the process with status 1 if the session did not export a
	/// signature.
	pub fn execute() {
		env_logger::Builder::from_env(Env::default().default_filter_or("info"))
			.init();

		let mut args: Vec<String> = env::args().collect();
		let opts = SessionOpts::new(&mut args);

		if opts.parsed.version() {
			println!("version: {}", env!("CARGO_PKG_VERSION"));
		} else if opts.parsed.help() {
			println!("{}", opts.parsed.info());
		} else if let Err(e) = opts.run() {
			error!("{e}");
			std::process::exit(1);
		}
	}
}

/// Parser for the session CLI
struct SessionParser;
impl GetParserForOptions for SessionParser {
	fn parser() -> Parser {
		Parser::new()
			.token(
				Token::new(MOCK, "include to use the mock security monitor; helpful for local dev. Without it the binary must be built with `--no-default-features --features sm`.")
			)
			.token(
				Token::new(MOCK_FAILURES, "number of times the mock monitor fails before issuing keys.")
					.takes_value(true)
					.requires(MOCK),
			)
			.token(
				Token::new(SOURCE_FILE, "path to the workload source to run.")
					.takes_value(true)
					.required(true),
			)
			.token(
				Token::new(INTERPRETER, "program that runs the workload source.")
					.takes_value(true)
					.default_value(DEFAULT_INTERPRETER),
			)
			.token(
				Token::new(INTERPRETER_ARG, "argument passed to the interpreter before the source text.")
					.takes_value(true)
					.default_value(DEFAULT_INTERPRETER_ARG),
			)
			.token(
				Token::new(CONSOLE_CAPACITY, "size in bytes of the shared console region.")
					.takes_value(true)
					.default_value(&DEFAULT_CONSOLE_CAPACITY.to_string()),
			)
			.token(
				Token::new(CONSOLE_OUT, "file to write the console region to instead of stdout. Only with --mock.")
					.takes_value(true)
					.requires(MOCK),
			)
			.token(
				Token::new(PUBLIC_KEY_OUT, "file to write the hex session public key to. Only with --mock.")
					.takes_value(true)
					.requires(MOCK),
			)
	}
}
