//! Configuration setters and getters.
//!
//! Setters follow one protocol: the argument is already a parsed domain
//! value, the target channel must be online, and hardware-affecting changes
//! are refused with [`XspiError::TryAgain`] while a transfer is in flight.
//! Each accepted change costs exactly one register write per touched
//! register. Getters read the published snapshot and always succeed.

use crate::{
    driver::{
        XspiError,
        attr::{
            ChannelId, ChannelMode, ClockFreq, ClockPhase, ClockPolarity, CsDelay, CsMode,
            CsPolarity, CsState, FifoChannel, InitialDelay, MasterSlave, PinLayout, TransferMode,
            WordLength,
        },
        channel::ChannelConfig,
        config::GlobalConfig,
        context::DeviceContext,
    },
    shadow::RegisterBus,
};

/// Setter/getter pair for a `MODULCTRL` attribute.
macro_rules! global_attr {
    ($(#[$doc:meta])* $field:ident: $ty:ty) => {
        paste::paste! {
            $(#[$doc])*
            pub fn [<set_ $field>](&self, value: $ty) -> Result<(), XspiError> {
                self.update_global(|global| global.$field = value)
            }

            pub fn $field(&self) -> $ty {
                self.global_config().$field
            }
        }
    };
}

/// Setter/getter pair for a `CHCONF` attribute.
macro_rules! channel_attr {
    ($(#[$doc:meta])* $field:ident: $ty:ty) => {
        paste::paste! {
            $(#[$doc])*
            pub fn [<set_ $field>](&self, chn: ChannelId, value: $ty) -> Result<(), XspiError> {
                self.update_channel(chn, |config| config.$field = value)
            }

            pub fn $field(&self, chn: ChannelId) -> $ty {
                self.channel_config(chn).$field
            }
        }
    };
}

impl<B: RegisterBus> DeviceContext<B> {
    /// Selects the channel addressed by channel-scoped requests.
    ///
    /// Bookkeeping only: nothing is written, so this is allowed mid-transfer.
    pub fn set_current_channel(&self, chn: ChannelId) -> Result<(), XspiError> {
        self.require_online(chn)?;
        self.rebook(|core| core.global.active_channel = chn);
        Ok(())
    }

    pub fn current_channel(&self) -> ChannelId {
        self.global_config().active_channel
    }

    /// Hands the shared FIFO to `fifo`.
    ///
    /// The previous holder's FIFO bits are cleared before the new holder's
    /// are set, so two channels never hold the FIFO at once.
    pub fn set_fifo_channel(&self, fifo: FifoChannel) -> Result<(), XspiError> {
        if let Some(chn) = fifo.channel() {
            self.require_online(chn)?;
        }
        self.reconfigure(|core| {
            let previous = core.global.fifo_channel.channel().filter(|&old| !fifo.is(old));
            if let Some(old) = previous {
                core.global.fifo_channel = FifoChannel::Disabled;
                core.push_channel(old)?;
                log::debug!("fifo released by channel {}", old.raw());
            }
            core.global.fifo_channel = fifo;
            if let Some(new) = fifo.channel() {
                core.push_channel(new)?;
            }
            Ok(())
        })
    }

    pub fn fifo_channel(&self) -> FifoChannel {
        self.global_config().fifo_channel
    }

    global_attr! {
        /// Chooses whether SPIEN acts as chip select.
        cs_mode: CsMode
    }

    global_attr! {
        master_slave: MasterSlave
    }

    global_attr! {
        channel_mode: ChannelMode
    }

    global_attr! {
        /// Delay inserted before the first word of a transfer.
        initial_delay: InitialDelay
    }

    channel_attr! {
        transfer_mode: TransferMode
    }

    channel_attr! {
        pin_layout: PinLayout
    }

    channel_attr! {
        word_length: WordLength
    }

    channel_attr! {
        cs_delay: CsDelay
    }

    channel_attr! {
        cs_polarity: CsPolarity
    }

    channel_attr! {
        clock_phase: ClockPhase
    }

    channel_attr! {
        clock_polarity: ClockPolarity
    }

    channel_attr! {
        /// Requests a SPICLK rate; the fastest achievable rate not above it
        /// is used and reported back by the getter.
        clock_freq: ClockFreq
    }

    /// Forces the chip-select pin level.
    ///
    /// Fails with [`XspiError::Denied`] while chip selects are not driven by
    /// the module ([`CsMode::Disabled`]).
    pub fn set_cs_state(&self, chn: ChannelId, state: CsState) -> Result<(), XspiError> {
        self.require_online(chn)?;
        self.reconfigure(|core| {
            if core.global.cs_mode == CsMode::Disabled {
                return Err(XspiError::Denied);
            }
            let config = ChannelConfig {
                cs_state: state,
                ..core.channels[chn.index()]
            };
            core.commit_channel(chn, config)
        })
    }

    pub fn cs_state(&self, chn: ChannelId) -> CsState {
        self.channel_config(chn).cs_state
    }

    fn update_global(&self, f: impl FnOnce(&mut GlobalConfig)) -> Result<(), XspiError> {
        self.reconfigure(|core| {
            let mut global = core.global;
            f(&mut global);
            core.commit_global(global)
        })
    }

    fn update_channel(
        &self,
        chn: ChannelId,
        f: impl FnOnce(&mut ChannelConfig),
    ) -> Result<(), XspiError> {
        self.require_online(chn)?;
        self.reconfigure(|core| {
            let mut config = core.channels[chn.index()];
            f(&mut config);
            core.commit_channel(chn, config)
        })
    }
}
