//! Test support utilities - only compiled in test builds.

use crate::shadow::{MirrorAll, MirrorPolicy, RegisterBus, RegisterMap, RegisterShadow};

/// Standard test geometry: 64 bytes, channel blocks of 8 bytes starting at 0x20
pub const TEST_MAP: RegisterMap = RegisterMap {
    size: 64,
    channel_base: 0x20,
    channel_stride: 0x08,
};

pub type TestShadow = RegisterShadow<RecordingBus, MirrorAll, 64, 16>;

/// Plain register file that records every hardware access.
#[derive(Debug)]
pub struct RecordingBus {
    pub regs: [u32; 16],
    pub writes: heapless::Vec<(u16, u32), 64>,
    pub reads: u32,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            writes: heapless::Vec::new(),
            reads: 0,
        }
    }
}

impl Default for RecordingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for RecordingBus {
    fn read(&mut self, offset: u16) -> u32 {
        self.reads += 1;
        self.regs[offset as usize / 4]
    }

    fn write(&mut self, offset: u16, value: u32) {
        self.regs[offset as usize / 4] = value;
        self.writes
            .push((offset, value))
            .expect("write log capacity exceeded");
    }
}

/// Policy where bit 0 of register 0 self-clears
#[derive(Debug)]
pub struct SelfClearingLowBit;

impl MirrorPolicy for SelfClearingLowBit {
    fn write_only_mask(&self, offset: u16) -> u32 {
        if offset == 0 { 1 } else { 0 }
    }

    fn refreshable(&self, _offset: u16) -> bool {
        true
    }
}

/// Helper to create a default test shadow
pub fn test_shadow() -> TestShadow {
    RegisterShadow::new(RecordingBus::new(), TEST_MAP, MirrorAll::default())
        .unwrap_or_else(|_| panic!("test map fits the mirror"))
}
