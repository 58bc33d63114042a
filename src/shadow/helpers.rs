//! Utility functions for register offset calculations.
//!
//! These helpers are useful when implementing custom
//! [`MirrorPolicy`](crate::shadow::MirrorPolicy) types or register maps that
//! need to reason about word boundaries and channel blocks.

use crate::shadow::ShadowError;

/// Size of one register word in bytes.
pub const WORD: usize = 4;

/// Calculates the byte range and word index of a 32-bit register.
///
/// Returns `(start_offset, word_index)` for the register at `offset` inside a
/// region of `size` bytes, or an error if the register is not addressable.
///
/// # Errors
/// * [`ShadowError::Misaligned`] - if `offset` is not a multiple of 4
/// * [`ShadowError::OutOfBounds`] - if the word extends past `size`
///
/// # Example
/// ```
/// use xspi::shadow::helpers::word_span;
///
/// assert_eq!(word_span(0x128, 0x180), Ok((0x128, 0x4A)));
/// assert!(word_span(0x17E, 0x180).is_err());
/// ```
pub fn word_span(offset: u16, size: usize) -> Result<(usize, usize), ShadowError> {
    let start = offset as usize;
    if start % WORD != 0 {
        return Err(ShadowError::Misaligned);
    }

    let end = start.checked_add(WORD).ok_or(ShadowError::OutOfBounds)?;
    if end > size {
        return Err(ShadowError::OutOfBounds);
    }

    Ok((start, start / WORD))
}

/// Computes `base + channel * stride + offset` for a channel-indexed register.
///
/// Overflow past `u16` is reported as [`ShadowError::OutOfBounds`]; the
/// result still has to pass [`word_span`] before it touches the mirror.
pub fn channel_offset(base: u16, stride: u16, channel: u8, offset: u16) -> Result<u16, ShadowError> {
    stride
        .checked_mul(channel as u16)
        .and_then(|c| c.checked_add(base))
        .and_then(|c| c.checked_add(offset))
        .ok_or(ShadowError::OutOfBounds)
}

#[test]
fn word_span_edge_cases() {
    // First word
    assert_eq!(word_span(0, 16), Ok((0, 0)));

    // Last word of region
    assert_eq!(word_span(12, 16), Ok((12, 3)));

    // One past the end
    assert_eq!(word_span(16, 16), Err(ShadowError::OutOfBounds));

    // Straddling the end is caught by alignment first
    assert_eq!(word_span(14, 16), Err(ShadowError::Misaligned));

    // Unaligned inside the region
    assert_eq!(word_span(1, 16), Err(ShadowError::Misaligned));
}

#[test]
fn channel_offset_edge_cases() {
    assert_eq!(channel_offset(0x12C, 0x14, 0, 0), Ok(0x12C));
    assert_eq!(channel_offset(0x12C, 0x14, 3, 0x4), Ok(0x12C + 3 * 0x14 + 0x4));
    assert_eq!(
        channel_offset(0xFFF0, 0x14, 1, 0),
        Err(ShadowError::OutOfBounds)
    );
}
