use crate::driver::{
    attr::{
        ClockFreq, ClockPhase, ClockPolarity, CsDelay, CsPolarity, CsState, PinLayout,
        TransferMode, WordLength,
    },
    regs::*,
};

/// Channel-local configuration, one per chip select.
///
/// Maps onto the channel's `CHCONF` register; fields the driver does not
/// model (DMA requests, turbo, start bit) are preserved on every push.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub transfer_mode: TransferMode,
    pub pin_layout: PinLayout,
    pub cs_delay: CsDelay,
    pub cs_polarity: CsPolarity,
    pub cs_state: CsState,
    pub word_length: WordLength,
    pub clock_phase: ClockPhase,
    pub clock_polarity: ClockPolarity,
    pub clock_freq: ClockFreq,
}

impl ChannelConfig {
    /// Returns `word` with every modelled field replaced, and the FIFO
    /// enable bits set only if `fifo` is true.
    pub fn apply(&self, word: u32, fifo: bool) -> u32 {
        let (dpe0, dpe1, is) = match self.pin_layout {
            PinLayout::TxRx => (0, 1, 1),
            PinLayout::RxTx => (1, 0, 0),
        };

        let mut word = set_chconf_pha(word, self.clock_phase.code());
        word = set_chconf_pol(word, self.clock_polarity.code());
        word = set_chconf_clkd(word, self.clock_freq.divider());
        word = set_chconf_epol(word, self.cs_polarity.code());
        word = set_chconf_wl(word, self.word_length.bits() as u32 - 1);
        word = set_chconf_trm(word, self.transfer_mode.code());
        word = set_chconf_dpe0(word, dpe0);
        word = set_chconf_dpe1(word, dpe1);
        word = set_chconf_is(word, is);
        word = set_chconf_force(word, self.cs_state.code());
        word = set_chconf_tcs(word, self.cs_delay.code());
        word = set_chconf_ffew(word, fifo as u32);
        set_chconf_ffer(word, fifo as u32)
    }

    /// Decodes a `CHCONF` word produced by [`apply`](Self::apply).
    ///
    /// Reserved encodings read back as the field's default.
    pub fn from_chconf(word: u32) -> Self {
        let pin_layout = if chconf_is(word) == 1 {
            PinLayout::TxRx
        } else {
            PinLayout::RxTx
        };

        Self {
            transfer_mode: TransferMode::from_code(chconf_trm(word)).unwrap_or_default(),
            pin_layout,
            cs_delay: CsDelay::from_code(chconf_tcs(word)).unwrap_or_default(),
            cs_polarity: CsPolarity::from_code(chconf_epol(word)).unwrap_or_default(),
            cs_state: CsState::from_code(chconf_force(word)).unwrap_or_default(),
            word_length: WordLength::new(chconf_wl(word) as u8 + 1).unwrap_or_default(),
            clock_phase: ClockPhase::from_code(chconf_pha(word)).unwrap_or_default(),
            clock_polarity: ClockPolarity::from_code(chconf_pol(word)).unwrap_or_default(),
            clock_freq: ClockFreq::from_divider(chconf_clkd(word)).unwrap_or_default(),
        }
    }
}

/// Snapshot of one hardware channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    /// Physically present on this board; fixed at bring-up.
    pub online: bool,
    pub config: ChannelConfig,
}

/// Returns true if both FIFO enable bits are set in a `CHCONF` word.
pub fn fifo_enabled(word: u32) -> bool {
    chconf_ffew(word) == 1 && chconf_ffer(word) == 1
}
