/// Errors that can occur during shadow cache operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowError {
    /// Register offset lies outside the mapped region.
    OutOfBounds,
    /// Register offset is not aligned to a 32-bit word.
    Misaligned,
    /// Mapped region does not fit in the mirror.
    Exhausted,
}

impl core::fmt::Display for ShadowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ShadowError::OutOfBounds => write!(f, "register offset exceeds mapped region"),
            ShadowError::Misaligned => write!(f, "register offset is not word aligned"),
            ShadowError::Exhausted => write!(f, "mapped region exceeds mirror capacity"),
        }
    }
}
