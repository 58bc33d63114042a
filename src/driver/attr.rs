//! Closed argument domains for every configurable attribute.
//!
//! Each domain parses from the raw `i32` carried by a request and rejects
//! anything outside its range with [`XspiError::InvalidArgument`]. Encoding
//! back to `i32` gives the value a getter reports.

use crate::driver::{
    XspiError,
    regs::{CLKD_MAX, MAX_CHANNELS, REF_CLOCK_HZ},
};

/// Defines a fieldless enum whose discriminants are both the request
/// encoding and the register field encoding.
macro_rules! closed_domain {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code ),+
        }

        impl $name {
            /// Field encoding of this value.
            #[inline]
            pub const fn code(self) -> u32 {
                self as u32
            }

            /// Decodes a field value, `None` for reserved encodings.
            pub const fn from_code(code: u32) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = XspiError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                u32::try_from(value)
                    .ok()
                    .and_then(Self::from_code)
                    .ok_or(XspiError::InvalidArgument)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.code() as i32
            }
        }
    };
}

closed_domain! {
    /// How the SPIEN pins are used.
    pub enum CsMode {
        /// SPIEN is used as a chip select.
        #[default]
        Enabled = 0,
        /// SPIEN is not used; chip selects are driven externally.
        Disabled = 1,
    }
}

closed_domain! {
    /// Controller role.
    pub enum MasterSlave {
        /// The module generates SPICLK and SPIEN.
        #[default]
        Master = 0,
        /// The module receives SPICLK and SPIEN.
        Slave = 1,
    }
}

closed_domain! {
    pub enum ChannelMode {
        #[default]
        Multi = 0,
        Single = 1,
    }
}

closed_domain! {
    /// Delay before the first SPI word, in SPICLK cycles.
    pub enum InitialDelay {
        #[default]
        NoDelay = 0,
        Clocks4 = 1,
        Clocks8 = 2,
        Clocks16 = 3,
        Clocks32 = 4,
    }
}

closed_domain! {
    pub enum TransferMode {
        #[default]
        TxRx = 0,
        RxOnly = 1,
        TxOnly = 2,
    }
}

closed_domain! {
    /// Direction of the two data lines.
    pub enum PinLayout {
        /// D0 transmits, D1 receives.
        #[default]
        TxRx = 0,
        /// D0 receives, D1 transmits.
        RxTx = 1,
    }
}

closed_domain! {
    /// Chip-select to first clock edge delay.
    pub enum CsDelay {
        #[default]
        HalfCycle = 0,
        OneAndHalf = 1,
        TwoAndHalf = 2,
        ThreeAndHalf = 3,
    }
}

closed_domain! {
    pub enum CsPolarity {
        /// CS is held high during the active state.
        ActiveHigh = 0,
        /// CS is held low during the active state.
        #[default]
        ActiveLow = 1,
    }
}

closed_domain! {
    /// Forced level of the chip-select pin.
    pub enum CsState {
        #[default]
        Inactive = 0,
        Active = 1,
    }
}

closed_domain! {
    pub enum ClockPhase {
        /// Data is latched on odd numbered edges of SPICLK.
        #[default]
        Odd = 0,
        /// Data is latched on even numbered edges of SPICLK.
        Even = 1,
    }
}

closed_domain! {
    pub enum ClockPolarity {
        /// SPICLK is held high during the active state.
        #[default]
        ActiveHigh = 0,
        /// SPICLK is held low during the active state.
        ActiveLow = 1,
    }
}

/// Index of a hardware channel, `0..MAX_CHANNELS`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_CHANNELS {
            Some(Self(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every channel the register block provides, in order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..MAX_CHANNELS as u8).map(ChannelId)
    }
}

impl TryFrom<i32> for ChannelId {
    type Error = XspiError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(ChannelId::new)
            .ok_or(XspiError::InvalidArgument)
    }
}

impl From<ChannelId> for i32 {
    fn from(value: ChannelId) -> Self {
        value.0 as i32
    }
}

/// The channel allowed to use the shared FIFO, if any.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FifoChannel {
    #[default]
    Disabled,
    Channel(ChannelId),
}

impl FifoChannel {
    /// Request encoding of [`FifoChannel::Disabled`].
    pub const DISABLED: i32 = -1;

    pub fn channel(self) -> Option<ChannelId> {
        match self {
            FifoChannel::Disabled => None,
            FifoChannel::Channel(chn) => Some(chn),
        }
    }

    pub fn is(self, chn: ChannelId) -> bool {
        self == FifoChannel::Channel(chn)
    }
}

impl TryFrom<i32> for FifoChannel {
    type Error = XspiError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            FifoChannel::DISABLED => Ok(FifoChannel::Disabled),
            v => ChannelId::try_from(v).map(FifoChannel::Channel),
        }
    }
}

impl From<FifoChannel> for i32 {
    fn from(value: FifoChannel) -> Self {
        match value {
            FifoChannel::Disabled => FifoChannel::DISABLED,
            FifoChannel::Channel(chn) => chn.into(),
        }
    }
}

/// SPI word length in bits, `4..=32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WordLength(u8);

impl WordLength {
    pub const MIN: u8 = 4;
    pub const MAX: u8 = 32;

    pub const fn new(bits: u8) -> Option<Self> {
        if bits >= Self::MIN && bits <= Self::MAX {
            Some(Self(bits))
        } else {
            None
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for WordLength {
    fn default() -> Self {
        Self(8)
    }
}

impl TryFrom<i32> for WordLength {
    type Error = XspiError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(WordLength::new)
            .ok_or(XspiError::InvalidArgument)
    }
}

impl From<WordLength> for i32 {
    fn from(value: WordLength) -> Self {
        value.0 as i32
    }
}

/// SPICLK frequency, stored as the power-of-two divider of the 48 MHz
/// functional clock.
///
/// Requests resolve to the fastest achievable rate that does not exceed the
/// requested one, so reading the value back reports the effective rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFreq {
    divider: u8,
}

impl ClockFreq {
    pub const MAX_HZ: u32 = REF_CLOCK_HZ;
    pub const MIN_HZ: u32 = REF_CLOCK_HZ >> CLKD_MAX;

    /// Resolves `hz` to a divider, rejecting rates outside `MIN_HZ..=MAX_HZ`.
    pub fn from_hz(hz: u32) -> Result<Self, XspiError> {
        if !(Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            return Err(XspiError::InvalidArgument);
        }
        let divider = (0..=CLKD_MAX)
            .find(|clkd| REF_CLOCK_HZ >> clkd <= hz)
            .ok_or(XspiError::InvalidArgument)?;
        Ok(Self {
            divider: divider as u8,
        })
    }

    /// `None` if `divider` exceeds the `CLKD` field.
    pub const fn from_divider(divider: u32) -> Option<Self> {
        if divider <= CLKD_MAX {
            Some(Self {
                divider: divider as u8,
            })
        } else {
            None
        }
    }

    #[inline]
    pub const fn divider(self) -> u32 {
        self.divider as u32
    }

    /// Effective SPICLK rate.
    #[inline]
    pub const fn hz(self) -> u32 {
        REF_CLOCK_HZ >> self.divider
    }
}

impl Default for ClockFreq {
    /// 750 kHz, the fastest rate not above 1 MHz.
    fn default() -> Self {
        Self { divider: 6 }
    }
}

impl TryFrom<i32> for ClockFreq {
    type Error = XspiError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let hz = u32::try_from(value).map_err(|_| XspiError::InvalidArgument)?;
        ClockFreq::from_hz(hz)
    }
}

impl From<ClockFreq> for i32 {
    fn from(value: ClockFreq) -> Self {
        value.hz() as i32
    }
}
