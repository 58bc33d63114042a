use crate::driver::XspiError;

/// Activity count of an idle device.
pub const XSPI_ACTIVITY_NONE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No transfer in flight; configuration may change.
    Idle,
    /// At least one transfer in flight.
    Busy,
}

/// Counts in-flight transfers.
///
/// Only ever touched under the device lock, so the idle check and a
/// concurrent `begin` cannot interleave.
#[derive(Debug, Default)]
pub struct ActivityGate {
    count: u32,
}

impl ActivityGate {
    pub const fn new() -> Self {
        Self {
            count: XSPI_ACTIVITY_NONE,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn state(&self) -> GateState {
        if self.count == XSPI_ACTIVITY_NONE {
            GateState::Idle
        } else {
            GateState::Busy
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == GateState::Idle
    }

    /// Records a new transfer, returning the state before it.
    pub fn begin(&mut self) -> GateState {
        let before = self.state();
        self.count = self.count.saturating_add(1);
        before
    }

    /// Retires a transfer, returning the state after it.
    ///
    /// Returns `None` and leaves the count untouched if nothing was in flight.
    pub fn end(&mut self) -> Option<GateState> {
        self.count = self.count.checked_sub(1)?;
        Some(self.state())
    }

    /// Fails with [`XspiError::TryAgain`] unless the device is idle.
    pub fn ensure_idle(&self) -> Result<(), XspiError> {
        match self.state() {
            GateState::Idle => Ok(()),
            GateState::Busy => Err(XspiError::TryAgain),
        }
    }
}
