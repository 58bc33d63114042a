use crate::driver::{
    attr::{ChannelId, ChannelMode, CsMode, FifoChannel, InitialDelay, MasterSlave},
    channel::ChannelConfig,
    regs::*,
};

/// Device-wide configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Channel addressed by channel-scoped requests.
    pub active_channel: ChannelId,
    /// The single channel holding the shared FIFO.
    pub fifo_channel: FifoChannel,
    pub cs_mode: CsMode,
    pub master_slave: MasterSlave,
    pub channel_mode: ChannelMode,
    pub initial_delay: InitialDelay,
}

impl GlobalConfig {
    /// Returns `word` with the `MODULCTRL` fields this config owns replaced.
    pub fn apply(&self, word: u32) -> u32 {
        let mut word = set_modulctrl_single(word, self.channel_mode.code());
        word = set_modulctrl_pin34(word, self.cs_mode.code());
        word = set_modulctrl_ms(word, self.master_slave.code());
        set_modulctrl_initdly(word, self.initial_delay.code())
    }

    /// Decodes a `MODULCTRL` word; channel selection is not part of it.
    pub fn from_modulctrl(word: u32, active_channel: ChannelId, fifo_channel: FifoChannel) -> Self {
        Self {
            active_channel,
            fifo_channel,
            cs_mode: CsMode::from_code(modulctrl_pin34(word)).unwrap_or_default(),
            master_slave: MasterSlave::from_code(modulctrl_ms(word)).unwrap_or_default(),
            channel_mode: ChannelMode::from_code(modulctrl_single(word)).unwrap_or_default(),
            initial_delay: InitialDelay::from_code(modulctrl_initdly(word)).unwrap_or_default(),
        }
    }
}

/// Run-time configuration applied at device bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Number of `SYSSTATUS` polls before a reset is declared timed out.
    pub reset_poll_limit: u32,
    /// Soft-reset the controller before pushing the initial configuration.
    pub reset_on_init: bool,
    /// Power-on global configuration; channel selection is derived at bring-up.
    pub global: GlobalConfig,
    /// Power-on configuration of every channel.
    pub channel: ChannelConfig,
}

impl DeviceConfig {
    pub const DEFAULT_RESET_POLL_LIMIT: u32 = 10_000;

    pub fn builder() -> DeviceConfigBuilder {
        DeviceConfigBuilder::new()
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            reset_poll_limit: Self::DEFAULT_RESET_POLL_LIMIT,
            reset_on_init: true,
            global: GlobalConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

/// Builder for [`DeviceConfig`]; unset fields keep their defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceConfigBuilder {
    config: DeviceConfig,
}

impl DeviceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reset poll bound.
    ///
    /// A bound of zero still polls once.
    pub fn reset_poll_limit(mut self, polls: u32) -> Self {
        self.config.reset_poll_limit = polls;
        self
    }

    /// Skip the soft reset at bring-up; the mirror is refreshed instead.
    pub fn skip_reset(mut self) -> Self {
        self.config.reset_on_init = false;
        self
    }

    pub fn cs_mode(mut self, mode: CsMode) -> Self {
        self.config.global.cs_mode = mode;
        self
    }

    pub fn master_slave(mut self, mode: MasterSlave) -> Self {
        self.config.global.master_slave = mode;
        self
    }

    pub fn channel_mode(mut self, mode: ChannelMode) -> Self {
        self.config.global.channel_mode = mode;
        self
    }

    pub fn initial_delay(mut self, delay: InitialDelay) -> Self {
        self.config.global.initial_delay = delay;
        self
    }

    pub fn channel_defaults(mut self, channel: ChannelConfig) -> Self {
        self.config.channel = channel;
        self
    }

    pub fn build(self) -> DeviceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::attr::WordLength;

    #[test]
    fn builder_overrides_only_what_is_set() {
        let config = DeviceConfig::builder()
            .reset_poll_limit(50)
            .master_slave(MasterSlave::Slave)
            .build();

        assert_eq!(config.reset_poll_limit, 50);
        assert!(config.reset_on_init);
        assert_eq!(config.global.master_slave, MasterSlave::Slave);
        assert_eq!(config.global.cs_mode, CsMode::Enabled);
        assert_eq!(config.channel, ChannelConfig::default());
    }

    #[test]
    fn builder_channel_defaults_and_skip_reset() {
        let channel = ChannelConfig {
            word_length: WordLength::new(12).unwrap(),
            ..ChannelConfig::default()
        };
        let config = DeviceConfig::builder()
            .skip_reset()
            .channel_defaults(channel)
            .build();

        assert!(!config.reset_on_init);
        assert_eq!(config.channel.word_length.bits(), 12);
    }

    #[test]
    fn global_apply_touches_only_owned_fields() {
        let global = GlobalConfig {
            cs_mode: CsMode::Disabled,
            master_slave: MasterSlave::Slave,
            channel_mode: ChannelMode::Single,
            initial_delay: InitialDelay::Clocks16,
            ..GlobalConfig::default()
        };
        // SYSTEM_TEST (bit 3) is not owned
        let word = global.apply(1 << 3);

        assert_eq!(word & (1 << 3), 1 << 3);
        assert_eq!(modulctrl_single(word), 1);
        assert_eq!(modulctrl_pin34(word), 1);
        assert_eq!(modulctrl_ms(word), 1);
        assert_eq!(modulctrl_initdly(word), 3);

        let decoded = GlobalConfig::from_modulctrl(word, ChannelId::default(), FifoChannel::Disabled);
        assert_eq!(decoded, global);
    }
}
