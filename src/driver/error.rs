use crate::shadow::ShadowError;

/// Errors returned by configuration operations and device bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XspiError {
    /// Argument outside its closed domain.
    InvalidArgument,
    /// Target channel is not physically present.
    ChannelUnavailable,
    /// Device is busy with a transfer; retry once activity has ceased.
    TryAgain,
    /// Not enough room for the register mirror or device table.
    ResourceExhausted,
    /// Hardware did not acknowledge a reset within the poll bound.
    HardwareTimeout,
    /// Operation is not permitted in the current chip-select mode.
    Denied,
    /// The platform does not provide the requested device.
    NoDevice,
    /// Request code is not part of the command surface.
    UnknownRequest,
}

impl XspiError {
    /// Negative errno reported through the device-file surface.
    pub fn errno(&self) -> i32 {
        match self {
            XspiError::InvalidArgument => -22,
            XspiError::ChannelUnavailable => -19,
            XspiError::TryAgain => -11,
            XspiError::ResourceExhausted => -12,
            XspiError::HardwareTimeout => -110,
            XspiError::Denied => -1,
            XspiError::NoDevice => -19,
            XspiError::UnknownRequest => -25,
        }
    }
}

impl From<ShadowError> for XspiError {
    fn from(err: ShadowError) -> Self {
        match err {
            ShadowError::Exhausted => XspiError::ResourceExhausted,
            ShadowError::OutOfBounds | ShadowError::Misaligned => XspiError::InvalidArgument,
        }
    }
}

impl core::fmt::Display for XspiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            XspiError::InvalidArgument => write!(f, "argument out of range"),
            XspiError::ChannelUnavailable => write!(f, "channel is not available"),
            XspiError::TryAgain => write!(f, "device busy, try again"),
            XspiError::ResourceExhausted => write!(f, "resources exhausted"),
            XspiError::HardwareTimeout => write!(f, "hardware did not acknowledge reset"),
            XspiError::Denied => write!(f, "not permitted in current chip-select mode"),
            XspiError::NoDevice => write!(f, "no such device"),
            XspiError::UnknownRequest => write!(f, "unknown request"),
        }
    }
}

/// A failed bring-up step, handing ownership of the bus back for release.
#[derive(Debug)]
pub struct BringUpError<B> {
    pub error: XspiError,
    pub bus: B,
}
