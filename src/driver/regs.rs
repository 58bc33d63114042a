//! OMAP2 McSPI register map.
//!
//! Only the registers the configuration core touches are described here.
//! Offsets are relative to the start of the mapped region.

use crate::shadow::{MirrorPolicy, RegisterMap, RegisterShadow};

/// Generates shift/mask constants and get/set helpers for one register field.
macro_rules! register_field {
    ($reg:ident, $field:ident, $shift:literal, $width:literal) => {
        paste::paste! {
            #[doc = "Bit position of `" $reg "." $field "`."]
            pub const [<$reg _ $field _SHIFT>]: u32 = $shift;

            #[doc = "Mask of `" $reg "." $field "` in place."]
            pub const [<$reg _ $field _MASK>]: u32 = ((1u32 << $width) - 1) << $shift;

            #[doc = "Extracts `" $reg "." $field "` from a register word."]
            #[inline]
            pub const fn [<$reg:lower _ $field:lower>](word: u32) -> u32 {
                (word & [<$reg _ $field _MASK>]) >> $shift
            }

            #[doc = "Returns `word` with `" $reg "." $field "` replaced by `value`."]
            #[inline]
            pub const fn [<set_ $reg:lower _ $field:lower>](word: u32, value: u32) -> u32 {
                (word & ![<$reg _ $field _MASK>]) | ((value << $shift) & [<$reg _ $field _MASK>])
            }
        }
    };
}

/// Number of chip-select channels the register block provides.
pub const MAX_CHANNELS: usize = 4;

/// Functional clock feeding the SPICLK divider.
pub const REF_CLOCK_HZ: u32 = 48_000_000;

pub const REVISION: u16 = 0x000;
pub const SYSCONFIG: u16 = 0x110;
pub const SYSSTATUS: u16 = 0x114;
pub const MODULCTRL: u16 = 0x128;
pub const XFERLEVEL: u16 = 0x17C;

/// First channel block.
pub const CH_BASE: u16 = 0x12C;
/// Distance between channel blocks.
pub const CH_STRIDE: u16 = 0x14;

// Offsets inside a channel block
pub const CHCONF: u16 = 0x00;
pub const CHSTAT: u16 = 0x04;
pub const CHCTRL: u16 = 0x08;
pub const TX: u16 = 0x0C;
pub const RX: u16 = 0x10;

/// Size of the mapped register region in bytes.
pub const REGION_SIZE: usize = 0x180;
/// Number of 32-bit words in the region.
pub const REGION_WORDS: usize = REGION_SIZE / 4;

pub const MCSPI_MAP: RegisterMap = RegisterMap {
    size: REGION_SIZE,
    channel_base: CH_BASE,
    channel_stride: CH_STRIDE,
};

register_field!(SYSCONFIG, SOFTRESET, 1, 1);
register_field!(SYSSTATUS, RESETDONE, 0, 1);

register_field!(MODULCTRL, SINGLE, 0, 1);
register_field!(MODULCTRL, PIN34, 1, 1);
register_field!(MODULCTRL, MS, 2, 1);
register_field!(MODULCTRL, INITDLY, 4, 3);

register_field!(CHCONF, PHA, 0, 1);
register_field!(CHCONF, POL, 1, 1);
register_field!(CHCONF, CLKD, 2, 4);
register_field!(CHCONF, EPOL, 6, 1);
register_field!(CHCONF, WL, 7, 5);
register_field!(CHCONF, TRM, 12, 2);
register_field!(CHCONF, DPE0, 16, 1);
register_field!(CHCONF, DPE1, 17, 1);
register_field!(CHCONF, IS, 18, 1);
register_field!(CHCONF, FORCE, 20, 1);
register_field!(CHCONF, TCS, 25, 2);
register_field!(CHCONF, FFEW, 27, 1);
register_field!(CHCONF, FFER, 28, 1);

/// Largest SPICLK divider exponent (`CHCONF.CLKD`).
pub const CLKD_MAX: u32 = 15;

/// Mirror policy for the McSPI block.
///
/// `SYSCONFIG.SOFTRESET` self-clears, and the per-channel TX/RX data
/// registers are never read in bulk since reading RX pops the FIFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct McspiPolicy;

impl MirrorPolicy for McspiPolicy {
    fn write_only_mask(&self, offset: u16) -> u32 {
        match offset {
            SYSCONFIG => SYSCONFIG_SOFTRESET_MASK,
            _ => 0,
        }
    }

    fn refreshable(&self, offset: u16) -> bool {
        let end = CH_BASE + CH_STRIDE * MAX_CHANNELS as u16;
        if !(CH_BASE..end).contains(&offset) {
            return true;
        }
        !matches!((offset - CH_BASE) % CH_STRIDE, TX | RX)
    }
}

/// Register shadow sized for one McSPI instance.
pub type McspiShadow<B> = RegisterShadow<B, McspiPolicy, REGION_SIZE, REGION_WORDS>;

/// Offset of a channel-block register, for logging and tests.
pub const fn chn_reg(channel: usize, offset: u16) -> u16 {
    CH_BASE + CH_STRIDE * channel as u16 + offset
}
