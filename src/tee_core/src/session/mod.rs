//! Lifecycle controller for one attested session.
//!
//! A session is a single pass: bind the console, provision keys, run the
//! workload, finalize, sign, export the signature and exit to the monitor.
//! There is no way back into a session and no way to reset one. Anything
//! that goes wrong outside the single workload recovery point halts it.

mod error;
mod state;

use std::{
	any::Any,
	convert::Infallible,
	panic::{self, AssertUnwindSafe},
	time::Instant,
};

use log::{error, info, warn};
use tee_monitor::MonitorProvider;

pub use self::{error::SessionError, state::SessionPhase};
use self::state::PhaseTracker;
use crate::{
	accumulator::Accumulator,
	console::{Console, ConsoleBinding},
	guest::{GuestFault, GuestProgram, GuestRuntime},
	provisioner::{Provisioner, RetryPolicy},
	signer,
};

/// How a session ended.
///
/// A session that completed exported its signature line and then saw the
/// monitor return from `exit_enclave`; its reason is
/// [`SessionError::ExitReturned`] and its phase [`SessionPhase::Exiting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
	/// Phase the session was in when it halted.
	pub phase: SessionPhase,
	/// What halted it.
	pub reason: SessionError,
}

impl Halt {
	/// Whether the signature line was exported before the halt.
	#[must_use]
	pub fn exported(&self) -> bool {
		self.reason == SessionError::ExitReturned
	}
}

/// One attested session. Every piece of trusted state lives in here for
/// exactly as long as [`Self::run`] does.
pub struct Session<'a> {
	region: &'a mut [u8],
	monitor: &'a mut dyn MonitorProvider,
	guest: &'a mut dyn GuestRuntime,
	program: &'a GuestProgram,
	policy: RetryPolicy,
}

impl<'a> Session<'a> {
	/// Create a instance of [`Self`].
	///
	/// `region` is the shared console region from the host. It is only ever
	/// written to.
	#[must_use]
	pub fn new(
		region: &'a mut [u8],
		monitor: &'a mut dyn MonitorProvider,
		guest: &'a mut dyn GuestRuntime,
		program: &'a GuestProgram,
		policy: RetryPolicy,
	) -> Self {
		Self { region, monitor, guest, program, policy }
	}

	/// Run the session to its end. Never comes back with a result: the
	/// best case is the monitor returning from exit, which is itself a halt.
	///
	/// A panic inside the session, such as a failed debug assertion, halts
	/// it in the phase it was in.
	#[must_use]
	pub fn run(self) -> Halt {
		let mut tracker = PhaseTracker::new();
		let driven =
			panic::catch_unwind(AssertUnwindSafe(|| self.drive(&mut tracker)));
		let reason = match driven {
			Ok(Ok(never)) => match never {},
			Ok(Err(reason)) => reason,
			Err(payload) => SessionError::AssertionFailed(panic_text(&*payload)),
		};
		let phase = tracker.halt();

		if reason == SessionError::ExitReturned {
			warn!("halted in {phase}: {reason}");
		} else {
			error!("halted in {phase}: {reason}");
		}

		Halt { phase, reason }
	}

	fn drive(
		self,
		tracker: &mut PhaseTracker,
	) -> Result<Infallible, SessionError> {
		let Self { region, monitor, guest, program, policy } = self;
		let binding = ConsoleBinding::bind(region);
		info!(
			"session bound to a {} byte console region",
			binding.capacity()
		);

		tracker.advance(SessionPhase::Provisioning)?;
		let mut provisioner = Provisioner::new(policy);
		let keys = provisioner.acquire(monitor)?;
		info!(
			"session public key: {}",
			tee_hex::encode(&keys.public_key().to_bytes())
		);

		let mut console = binding.attach(Accumulator::init());

		tracker.advance(SessionPhase::Executing)?;
		invoke_guest(guest, program, &mut console)?;

		tracker.advance(SessionPhase::Finalizing)?;
		let (digest, export) = console.seal();

		tracker.advance(SessionPhase::Signing)?;
		let signature = signer::sign(&digest, keys)?;
		let line = signer::encode_hex(&signature);

		tracker.advance(SessionPhase::Exiting)?;
		export.transmit_line(&line)?;
		monitor.exit_enclave();

		Err(SessionError::ExitReturned)
	}
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
	if let Some(text) = payload.downcast_ref::<&str>() {
		(*text).to_string()
	} else if let Some(text) = payload.downcast_ref::<String>() {
		text.clone()
	} else {
		"unknown panic".to_string()
	}
}

/// The single recovery point. A raised workload error is written to the
/// console as text and the session carries on; anything else halts,
/// including any failure to bring the runtime up.
fn invoke_guest(
	guest: &mut dyn GuestRuntime,
	program: &GuestProgram,
	console: &mut Console<'_>,
) -> Result<(), SessionError> {
	if let Err(fault) = guest.init() {
		let text = match fault {
			GuestFault::Raised(text) | GuestFault::Fatal(text) => text,
		};
		return Err(SessionError::GuestFatal(text));
	}

	let started = Instant::now();
	let outcome = guest.exec(program.source(), console);
	// Host side only; timing never reaches the console.
	info!(
		"workload {} ran for {} us",
		program.name(),
		started.elapsed().as_micros()
	);
	guest.deinit();

	match outcome {
		Ok(()) => {
			info!("workload {} returned", program.name());
			Ok(())
		}
		Err(GuestFault::Raised(text)) => {
			warn!("workload {} raised: {text}", program.name());
			let mut report = text.into_bytes();
			if report.last() != Some(&tee_hex::LINE_FEED) {
				report.push(tee_hex::LINE_FEED);
			}
			console
				.write_string_cooked(&report)
				.map_err(SessionError::FaultWhileRecovering)
		}
		Err(GuestFault::Fatal(text)) => Err(SessionError::GuestFatal(text)),
	}
}

/// Enclave entry point. Runs one session against `region` and never
/// returns.
pub fn enclave_entry(
	region: &mut [u8],
	monitor: &mut dyn MonitorProvider,
	guest: &mut dyn GuestRuntime,
	program: &GuestProgram,
) -> ! {
	let halt =
		Session::new(region, monitor, guest, program, RetryPolicy::Unbounded)
			.run();
	park(&halt)
}

/// Permanent halt. Nothing after this point has an observable effect.
pub fn park(halt: &Halt) -> ! {
	error!("parking in {}", halt.phase);
	loop {
		std::hint::spin_loop();
	}
}
