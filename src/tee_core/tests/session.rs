#![cfg(feature = "mock")]

use tee_core::{
	console::{Console, ConsoleError},
	guest::{
		mock::ScriptedRuntime, GuestFault, GuestProgram, GuestRuntime,
		ProcessRuntime,
	},
	provisioner::{ProvisionError, RetryPolicy},
	session::{Halt, Session, SessionError, SessionPhase},
};
use tee_crypto::{sha_512, CryptoError, SIGNATURE_LEN};
use tee_monitor::mock::{MockMonitor, MOCK_TRANSIENT_STATUS};

const UNTOUCHED: u8 = 0xEE;
const LINE_LEN: usize = 2 * SIGNATURE_LEN + 1;

fn program() -> GuestProgram {
	GuestProgram::new("job.py", "print('hello')")
}

fn run(
	region: &mut [u8],
	monitor: &mut MockMonitor,
	runtime: &mut dyn GuestRuntime,
	policy: RetryPolicy,
) -> Halt {
	let program = program();
	Session::new(region, monitor, runtime, &program, policy).run()
}

fn run_shell(
	region: &mut [u8],
	monitor: &mut MockMonitor,
	interpreter: &str,
	script: &str,
) -> Halt {
	let program = GuestProgram::new("job.sh", script);
	let mut runtime = ProcessRuntime::new(interpreter, "-c");
	Session::new(region, monitor, &mut runtime, &program, RetryPolicy::Bounded(1))
		.run()
}

/// Runtime that panics mid-run after emitting some output.
struct PanickingRuntime;

impl GuestRuntime for PanickingRuntime {
	fn exec(
		&mut self,
		_source: &str,
		console: &mut Console<'_>,
	) -> Result<(), GuestFault> {
		console.write_string_cooked(b"before\n")?;
		panic!("accumulator out of step");
	}
}

/// Split a completed session's region into the attested output and the
/// signature bytes.
fn split(region: &[u8]) -> (&[u8], Vec<u8>) {
	let end = region.iter().rposition(|b| *b == b'\n').unwrap() + 1;
	let (output, line) = region[..end].split_at(end - LINE_LEN);
	let hex = std::str::from_utf8(&line[..line.len() - 1]).unwrap();
	(output, tee_hex::decode(hex).unwrap())
}

#[test]
fn completed_session_signs_exactly_what_it_emitted() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"hello\nworld\n".to_vec());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));

	assert!(halt.exported());
	assert_eq!(halt.phase, SessionPhase::Exiting);
	assert_eq!(halt.reason, SessionError::ExitReturned);

	let (output, signature) = split(&region);
	assert_eq!(output, b"hello\r\nworld\r\n");
	assert!(region[output.len() + LINE_LEN..].iter().all(|b| *b == UNTOUCHED));

	let public = monitor.public_key();
	assert!(public.verify(&sha_512(output), &signature).is_ok());
	assert_eq!(
		public.verify(&sha_512(b"hello\r\nworlD\r\n"), &signature),
		Err(CryptoError::FailedSignatureVerification)
	);
	// the export line itself is not covered
	let mut with_line = output.to_vec();
	with_line.extend_from_slice(&region[output.len()..output.len() + LINE_LEN]);
	assert!(public.verify(&sha_512(&with_line), &signature).is_err());

	assert_eq!(monitor.exit_calls(), 1);
	assert_eq!(runtime.init_calls(), 1);
	assert_eq!(runtime.exec_calls(), 1);
	assert_eq!(runtime.deinit_calls(), 1);
}

#[test]
fn empty_output_is_still_signed() {
	let mut region = [UNTOUCHED; LINE_LEN];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(Vec::new());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));
	assert!(halt.exported());

	let (output, signature) = split(&region);
	assert!(output.is_empty());
	assert!(monitor.public_key().verify(&sha_512(b""), &signature).is_ok());
}

#[test]
fn raised_workload_error_is_reported_and_signed() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"partial\n".to_vec())
		.failing_with(GuestFault::Raised("ValueError: boom".to_string()));

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));
	assert!(halt.exported());

	let (output, signature) = split(&region);
	assert_eq!(output, b"partial\r\nValueError: boom\r\n");
	assert!(monitor.public_key().verify(&sha_512(output), &signature).is_ok());
	assert_eq!(monitor.exit_calls(), 1);
}

#[test]
fn fatal_workload_fault_halts_silently() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"before\n".to_vec())
		.failing_with(GuestFault::Fatal("engine crashed".to_string()));

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));

	assert_eq!(
		halt,
		Halt {
			phase: SessionPhase::Executing,
			reason: SessionError::GuestFatal("engine crashed".to_string()),
		}
	);
	// nothing after the fault point
	assert_eq!(&region[..8], b"before\r\n");
	assert!(region[8..].iter().all(|b| *b == UNTOUCHED));
	assert_eq!(monitor.exit_calls(), 0);
	assert_eq!(runtime.deinit_calls(), 1);
}

#[test]
fn fault_while_reporting_a_fault_halts() {
	let mut region = [UNTOUCHED; 6];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"abc".to_vec())
		.failing_with(GuestFault::Raised("too long to report".to_string()));

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));

	assert_eq!(halt.phase, SessionPhase::Executing);
	assert!(matches!(
		halt.reason,
		SessionError::FaultWhileRecovering(ConsoleError::Overflow { .. })
	));
	assert_eq!(region, [b'a', b'b', b'c', UNTOUCHED, UNTOUCHED, UNTOUCHED]);
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn signature_line_that_does_not_fit_halts_before_exit() {
	let mut region = [UNTOUCHED; 20];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"fits\n".to_vec());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));

	assert_eq!(
		halt,
		Halt {
			phase: SessionPhase::Exiting,
			reason: SessionError::Console(ConsoleError::Overflow {
				needed: LINE_LEN,
				remaining: 14,
			}),
		}
	);
	assert_eq!(&region[..6], b"fits\r\n");
	assert!(region[6..].iter().all(|b| *b == UNTOUCHED));
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn transient_monitor_failures_are_retried() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new().with_transient_failures(4);
	let mut runtime = ScriptedRuntime::new(b"ok\n".to_vec());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(5));

	assert!(halt.exported());
	assert_eq!(monitor.get_keys_calls(), 5);
	let (output, signature) = split(&region);
	assert!(monitor.public_key().verify(&sha_512(output), &signature).is_ok());
}

#[test]
fn no_keys_means_no_output() {
	let mut region = [UNTOUCHED; 64];
	let mut monitor = MockMonitor::new().with_transient_failures(10);
	let mut runtime = ScriptedRuntime::new(b"never\n".to_vec());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(3));

	assert_eq!(
		halt,
		Halt {
			phase: SessionPhase::Provisioning,
			reason: SessionError::Provision(ProvisionError::RetriesExhausted {
				attempts: 3,
				last: MOCK_TRANSIENT_STATUS,
			}),
		}
	);
	assert_eq!(region, [UNTOUCHED; 64]);
	assert_eq!(runtime.exec_calls(), 0);
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn inconsistent_key_material_halts_without_output() {
	let mut region = [UNTOUCHED; 64];
	let mut monitor = MockMonitor::new().with_mismatched_public_key();
	let mut runtime = ScriptedRuntime::new(b"never\n".to_vec());

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(3));

	assert_eq!(halt.phase, SessionPhase::Provisioning);
	assert_eq!(
		halt.reason,
		SessionError::Provision(ProvisionError::MismatchedPublicKey)
	);
	assert_eq!(monitor.get_keys_calls(), 1);
	assert_eq!(region, [UNTOUCHED; 64]);
	assert_eq!(runtime.exec_calls(), 0);
}

#[test]
fn interpreter_killed_by_a_signal_halts_without_a_signature() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();

	let halt =
		run_shell(&mut region, &mut monitor, "sh", "echo partial; kill -SEGV $$");

	assert_eq!(halt.phase, SessionPhase::Executing);
	assert!(matches!(halt.reason, SessionError::GuestFatal(_)));
	assert_eq!(&region[..9], b"partial\r\n");
	assert!(region[9..].iter().all(|b| *b == UNTOUCHED));
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn missing_interpreter_halts_without_output() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();

	let halt = run_shell(
		&mut region,
		&mut monitor,
		"/nonexistent/interpreter",
		"echo never",
	);

	assert_eq!(halt.phase, SessionPhase::Executing);
	match halt.reason {
		SessionError::GuestFatal(text) => {
			assert!(text.starts_with("failed to start /nonexistent/interpreter"));
		}
		other => panic!("unexpected halt reason: {other:?}"),
	}
	assert_eq!(region, [UNTOUCHED; 512]);
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn runtime_that_fails_to_start_is_never_run() {
	let mut region = [UNTOUCHED; 64];
	let mut monitor = MockMonitor::new();
	let mut runtime = ScriptedRuntime::new(b"never\n".to_vec())
		.failing_init(GuestFault::Raised("no heap".to_string()));

	let halt =
		run(&mut region, &mut monitor, &mut runtime, RetryPolicy::Bounded(1));

	assert_eq!(
		halt,
		Halt {
			phase: SessionPhase::Executing,
			reason: SessionError::GuestFatal("no heap".to_string()),
		}
	);
	assert_eq!(runtime.init_calls(), 1);
	assert_eq!(runtime.exec_calls(), 0);
	assert_eq!(runtime.deinit_calls(), 0);
	assert_eq!(region, [UNTOUCHED; 64]);
	assert_eq!(monitor.exit_calls(), 0);
}

#[test]
fn panic_inside_the_session_halts_in_place() {
	let mut region = [UNTOUCHED; 512];
	let mut monitor = MockMonitor::new();

	let halt = run(
		&mut region,
		&mut monitor,
		&mut PanickingRuntime,
		RetryPolicy::Bounded(1),
	);

	assert_eq!(
		halt,
		Halt {
			phase: SessionPhase::Executing,
			reason: SessionError::AssertionFailed(
				"accumulator out of step".to_string()
			),
		}
	);
	assert_eq!(&region[..8], b"before\r\n");
	assert!(region[8..].iter().all(|b| *b == UNTOUCHED));
	assert_eq!(monitor.exit_calls(), 0);
}
