/// Controls which register bits and words the mirror keeps in sync.
pub trait MirrorPolicy {
    /// Bits of the register at `offset` that self-clear in hardware.
    ///
    /// They are written through but never retained in the mirror.
    fn write_only_mask(&self, offset: u16) -> u32;

    /// Returns true if a bulk refresh may read the register at `offset`.
    ///
    /// Registers whose reads have side effects (data FIFOs) must return false.
    fn refreshable(&self, offset: u16) -> bool;
}

/// Default policy that mirrors every bit and refreshes every word.
#[derive(Debug, Default, Clone, Copy)]
pub struct MirrorAll {}

impl MirrorPolicy for MirrorAll {
    fn write_only_mask(&self, _offset: u16) -> u32 {
        0
    }

    fn refreshable(&self, _offset: u16) -> bool {
        true
    }
}
