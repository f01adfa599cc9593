//! Session phase state machine.

use log::info;

use super::error::SessionError;

/// Session phase
#[derive(Debug, Copy, PartialEq, Eq, Clone)]
pub enum SessionPhase {
	/// Entered, nothing bound yet.
	Init,
	/// Waiting on the monitor for keys.
	Provisioning,
	/// The workload is running.
	Executing,
	/// Closing the output digest.
	Finalizing,
	/// Signing the output digest.
	Signing,
	/// Exporting the signature and handing back to the monitor.
	Exiting,
	/// The session cannot go anywhere. Nothing it does is observable.
	Halted,
}

impl std::fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Init => "init",
			Self::Provisioning => "provisioning",
			Self::Executing => "executing",
			Self::Finalizing => "finalizing",
			Self::Signing => "signing",
			Self::Exiting => "exiting",
			Self::Halted => "halted",
		};
		f.write_str(name)
	}
}

impl SessionPhase {
	/// The one phase that may follow `self`. Any phase can halt instead.
	#[must_use]
	pub fn successor(self) -> Option<Self> {
		match self {
			Self::Init => Some(Self::Provisioning),
			Self::Provisioning => Some(Self::Executing),
			Self::Executing => Some(Self::Finalizing),
			Self::Finalizing => Some(Self::Signing),
			Self::Signing => Some(Self::Exiting),
			Self::Exiting | Self::Halted => None,
		}
	}
}

/// Current phase of a session. Only moves forward.
#[derive(Debug)]
pub(crate) struct PhaseTracker {
	phase: SessionPhase,
}

impl PhaseTracker {
	pub(crate) fn new() -> Self {
		Self { phase: SessionPhase::Init }
	}

	#[cfg(test)]
	pub(crate) fn phase(&self) -> SessionPhase {
		self.phase
	}

	/// Move to `next`, which must be the successor of the current phase.
	pub(crate) fn advance(
		&mut self,
		next: SessionPhase,
	) -> Result<(), SessionError> {
		if self.phase.successor() != Some(next) {
			return Err(SessionError::InvalidStateTransition(self.phase, next));
		}

		info!("session phase: {} -> {next}", self.phase);
		self.phase = next;
		Ok(())
	}

	/// Move to [`SessionPhase::Halted`] from wherever the session is.
	/// Returns the phase it halted in.
	pub(crate) fn halt(&mut self) -> SessionPhase {
		std::mem::replace(&mut self.phase, SessionPhase::Halted)
	}
}
