use core::{
    cell::RefCell,
    sync::atomic::{AtomicI8, AtomicU8, AtomicU32, Ordering},
};

use critical_section::Mutex;

use crate::{
    driver::{
        BringUpError, XspiError,
        attr::{ChannelId, FifoChannel},
        channel::{ChannelConfig, ChannelState, fifo_enabled},
        config::{DeviceConfig, GlobalConfig},
        diag::{DiagMsg, api_require},
        gate::{ActivityGate, GateState},
        platform::Resources,
        regs::*,
    },
    shadow::RegisterBus,
};

/// Validity tag stamped into every context when contract checks are on.
pub const CONTEXT_SIGNATURE: u32 = 0xDEAD_BEEF;

/// Mutable device state, only reachable under the device lock.
pub(crate) struct Core<B: RegisterBus> {
    pub(crate) shadow: McspiShadow<B>,
    pub(crate) global: GlobalConfig,
    pub(crate) channels: [ChannelConfig; MAX_CHANNELS],
    pub(crate) gate: ActivityGate,
    reset_poll_limit: u32,
    /// Set when a reset was not acknowledged; cleared by the next good one.
    needs_reset: bool,
}

impl<B: RegisterBus> Core<B> {
    /// Pushes `global` to `MODULCTRL`, then adopts it.
    pub(crate) fn commit_global(&mut self, global: GlobalConfig) -> Result<(), XspiError> {
        let word = self.shadow.modify(MODULCTRL, |word| global.apply(word))?;
        log::debug!("modulctrl <- {:#010x}", word);
        self.global = global;
        Ok(())
    }

    /// Pushes `config` to the channel's `CHCONF`, then adopts it.
    ///
    /// FIFO bits follow the current FIFO holder.
    pub(crate) fn commit_channel(
        &mut self,
        chn: ChannelId,
        config: ChannelConfig,
    ) -> Result<(), XspiError> {
        let fifo = self.global.fifo_channel.is(chn);
        let word = self
            .shadow
            .chn_modify(chn.raw(), CHCONF, |word| config.apply(word, fifo))?;
        log::debug!("chconf{} <- {:#010x}", chn.raw(), word);
        self.channels[chn.index()] = config;
        Ok(())
    }

    /// Rewrites the channel's `CHCONF` from the stored config.
    pub(crate) fn push_channel(&mut self, chn: ChannelId) -> Result<(), XspiError> {
        self.commit_channel(chn, self.channels[chn.index()])
    }

    fn push_all(&mut self, online: &[bool; MAX_CHANNELS]) -> Result<(), XspiError> {
        self.commit_global(self.global)?;
        for chn in ChannelId::all().filter(|chn| online[chn.index()]) {
            self.push_channel(chn)?;
        }
        Ok(())
    }

    /// Soft-resets the controller and restores the configuration.
    fn reset(&mut self, online: &[bool; MAX_CHANNELS]) -> Result<(), XspiError> {
        self.shadow
            .modify(SYSCONFIG, |word| set_sysconfig_softreset(word, 1))?;

        let mut done = false;
        for _ in 0..self.reset_poll_limit.max(1) {
            let status = self.shadow.read_through_refresh(SYSSTATUS)?;
            if sysstatus_resetdone(status) == 1 {
                done = true;
                break;
            }
        }
        // Whatever state the controller was left in is what the mirror holds.
        self.shadow.refresh_all();
        if !done {
            log::error!(
                "reset not acknowledged after {} polls",
                self.reset_poll_limit.max(1)
            );
            self.needs_reset = true;
            return Err(XspiError::HardwareTimeout);
        }

        self.push_all(online)?;
        self.needs_reset = false;
        Ok(())
    }

    /// Refuses hardware changes until a reset has been acknowledged.
    fn ensure_ready(&self) -> Result<(), XspiError> {
        if self.needs_reset {
            Err(XspiError::HardwareTimeout)
        } else {
            Ok(())
        }
    }

    /// Configuration decoded from the mirrored registers.
    fn hardware_view(&self) -> (GlobalConfig, [ChannelConfig; MAX_CHANNELS]) {
        let mut fifo_channel = FifoChannel::Disabled;
        let mut channels = [ChannelConfig::default(); MAX_CHANNELS];
        for chn in ChannelId::all() {
            let word = self.shadow.chn_read(chn.raw(), CHCONF).unwrap_or_default();
            channels[chn.index()] = ChannelConfig::from_chconf(word);
            if fifo_channel == FifoChannel::Disabled && fifo_enabled(word) {
                fifo_channel = FifoChannel::Channel(chn);
            }
        }
        let modulctrl = self.shadow.read(MODULCTRL).unwrap_or_default();
        let global =
            GlobalConfig::from_modulctrl(modulctrl, self.global.active_channel, fifo_channel);
        (global, channels)
    }
}

/// Lock-free copy of the configuration, republished after every mutation.
struct Published {
    active_channel: AtomicU8,
    fifo_channel: AtomicI8,
    modulctrl: AtomicU32,
    chconf: [AtomicU32; MAX_CHANNELS],
}

impl Published {
    fn new() -> Self {
        Self {
            active_channel: AtomicU8::new(0),
            fifo_channel: AtomicI8::new(FifoChannel::DISABLED as i8),
            modulctrl: AtomicU32::new(0),
            chconf: core::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    fn store(&self, global: &GlobalConfig, channels: &[ChannelConfig; MAX_CHANNELS]) {
        self.active_channel
            .store(global.active_channel.raw(), Ordering::Relaxed);
        self.fifo_channel
            .store(i32::from(global.fifo_channel) as i8, Ordering::Relaxed);
        self.modulctrl.store(global.apply(0), Ordering::Relaxed);
        for (slot, config) in self.chconf.iter().zip(channels.iter()) {
            slot.store(config.apply(0, false), Ordering::Relaxed);
        }
    }

    fn global(&self) -> GlobalConfig {
        let active = ChannelId::new(self.active_channel.load(Ordering::Relaxed)).unwrap_or_default();
        let fifo = FifoChannel::try_from(self.fifo_channel.load(Ordering::Relaxed) as i32)
            .unwrap_or_default();
        GlobalConfig::from_modulctrl(self.modulctrl.load(Ordering::Relaxed), active, fifo)
    }

    fn channel(&self, chn: ChannelId) -> ChannelConfig {
        ChannelConfig::from_chconf(self.chconf[chn.index()].load(Ordering::Relaxed))
    }
}

/// One SPI controller instance.
///
/// Mutations run inside a critical section, so every method is safe to call
/// from interrupt context. Getters never take the lock: they read a snapshot
/// republished at the end of each successful mutation and may lag a
/// concurrent setter by one update.
pub struct DeviceContext<B: RegisterBus> {
    id: u32,
    online: [bool; MAX_CHANNELS],
    core: Mutex<RefCell<Core<B>>>,
    published: Published,
    #[cfg(any(debug_assertions, feature = "contracts"))]
    signature: u32,
}

impl<B: RegisterBus> DeviceContext<B> {
    /// Builds the context for a freshly mapped controller.
    ///
    /// `is_online` is asked once per channel; the answers never change. The
    /// controller is soft-reset (unless the config skips it) and the initial
    /// configuration is pushed to `MODULCTRL` and every online channel.
    ///
    /// On failure the bus is handed back inside the error.
    pub fn new(
        id: u32,
        resources: Resources<B>,
        config: &DeviceConfig,
        mut is_online: impl FnMut(ChannelId) -> bool,
    ) -> Result<Self, BringUpError<B>> {
        let Resources { bus, region_size } = resources;
        if region_size < REGION_SIZE {
            log::error!("xspi{}: region of {:#x} bytes is too small", id, region_size);
            return Err(BringUpError {
                error: XspiError::InvalidArgument,
                bus,
            });
        }

        if region_size > REGION_SIZE {
            log::debug!(
                "xspi{}: mirroring {:#x} of {:#x} mapped bytes",
                id,
                REGION_SIZE,
                region_size
            );
        }

        // Nothing past the register map is ever addressed.
        let shadow = McspiShadow::new(bus, MCSPI_MAP, McspiPolicy).map_err(|rejected| {
            log::error!("xspi{}: no room to mirror {:#x} bytes", id, REGION_SIZE);
            BringUpError {
                error: rejected.error.into(),
                bus: rejected.bus,
            }
        })?;

        let mut online = [false; MAX_CHANNELS];
        for chn in ChannelId::all() {
            online[chn.index()] = is_online(chn);
            log::debug!("xspi{}: channel {} online: {}", id, chn.raw(), online[chn.index()]);
        }
        log::info!(
            "xspi{}: {} channels online",
            id,
            online.iter().filter(|&&on| on).count()
        );
        let active_channel = ChannelId::all()
            .find(|chn| online[chn.index()])
            .unwrap_or_default();

        let mut core = Core {
            shadow,
            global: GlobalConfig {
                active_channel,
                fifo_channel: FifoChannel::Disabled,
                ..config.global
            },
            channels: [config.channel; MAX_CHANNELS],
            gate: ActivityGate::new(),
            reset_poll_limit: config.reset_poll_limit,
            needs_reset: false,
        };

        let init = if config.reset_on_init {
            core.reset(&online)
        } else {
            core.shadow.refresh_all();
            core.push_all(&online)
        };
        if let Err(error) = init {
            return Err(BringUpError {
                error,
                bus: core.shadow.into_bus(),
            });
        }

        let published = Published::new();
        published.store(&core.global, &core.channels);

        Ok(Self {
            id,
            online,
            core: Mutex::new(RefCell::new(core)),
            published,
            #[cfg(any(debug_assertions, feature = "contracts"))]
            signature: CONTEXT_SIGNATURE,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the channel is physically present; fixed at bring-up.
    pub fn is_online(&self, chn: ChannelId) -> bool {
        self.online[chn.index()]
    }

    /// Snapshot of one channel.
    pub fn channel(&self, chn: ChannelId) -> ChannelState {
        ChannelState {
            online: self.is_online(chn),
            config: self.channel_config(chn),
        }
    }

    pub fn channel_config(&self, chn: ChannelId) -> ChannelConfig {
        self.published.channel(chn)
    }

    pub fn global_config(&self) -> GlobalConfig {
        self.published.global()
    }

    /// Marks the start of a transfer. Configuration changes fail with
    /// [`XspiError::TryAgain`] until the matching [`end_activity`](Self::end_activity).
    pub fn begin_activity(&self) {
        self.validate();
        if self.with_core(|core| core.gate.begin()) == GateState::Idle {
            log::trace!("xspi{}: busy", self.id);
        }
    }

    /// Marks the end of a transfer.
    ///
    /// Ending more transfers than were begun is a contract violation.
    pub fn end_activity(&self) {
        self.validate();
        let after = self.with_core(|core| core.gate.end());
        api_require!(DiagMsg::UsageFailure, after.is_some());
        if after == Some(GateState::Idle) {
            log::trace!("xspi{}: idle", self.id);
        }
    }

    /// Begins a transfer that ends when the guard is dropped.
    pub fn activity(&self) -> Activity<'_, B> {
        self.begin_activity();
        Activity { ctx: self }
    }

    pub fn activity_count(&self) -> u32 {
        self.with_core(|core| core.gate.count())
    }

    pub fn is_idle(&self) -> bool {
        self.with_core(|core| core.gate.is_idle())
    }

    /// Soft-resets the controller, waiting at most the configured number of
    /// polls for the acknowledgement, and restores the current configuration.
    ///
    /// If the acknowledgement never comes, getters report what the registers
    /// hold and every other hardware-affecting setter fails with
    /// [`XspiError::HardwareTimeout`] until a later reset succeeds.
    pub fn reset(&self) -> Result<(), XspiError> {
        log::info!("xspi{}: reset", self.id);
        self.validate();
        self.with_core(|core| {
            self.ensure_idle(core)?;
            let result = core.reset(&self.online);
            self.publish(core);
            result
        })
    }

    /// Reads the module revision from hardware.
    pub fn revision(&self) -> Result<u32, XspiError> {
        self.validate();
        self.with_core(|core| Ok(core.shadow.read_through_refresh(REVISION)?))
    }

    /// Reads the channel status register from hardware.
    pub fn channel_status(&self, chn: ChannelId) -> Result<u32, XspiError> {
        self.require_online(chn)?;
        self.with_core(|core| Ok(core.shadow.chn_read_through_refresh(chn.raw(), CHSTAT)?))
    }

    /// Whether the driver holds a known value for the register at `offset`.
    pub fn is_mirrored(&self, offset: u16) -> Result<bool, XspiError> {
        self.with_core(|core| Ok(core.shadow.is_mirrored(offset)?))
    }

    /// Tears the context down, returning the bus for release.
    pub fn into_bus(self) -> B {
        self.core.into_inner().into_inner().shadow.into_bus()
    }

    #[cfg(test)]
    pub(crate) fn with_bus<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        self.with_core(|core| f(core.shadow.bus_mut()))
    }

    pub(crate) fn with_core<R>(&self, f: impl FnOnce(&mut Core<B>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.core.borrow_ref_mut(cs)))
    }

    /// Runs a hardware-affecting mutation: lock, gate check, mutate, publish.
    pub(crate) fn reconfigure<R>(
        &self,
        f: impl FnOnce(&mut Core<B>) -> Result<R, XspiError>,
    ) -> Result<R, XspiError> {
        self.validate();
        self.with_core(|core| {
            self.ensure_idle(core)?;
            core.ensure_ready()?;
            let out = f(core)?;
            self.publish(core);
            Ok(out)
        })
    }

    /// Bookkeeping-only mutation; not gated.
    pub(crate) fn rebook(&self, f: impl FnOnce(&mut Core<B>)) {
        self.validate();
        self.with_core(|core| {
            f(core);
            self.publish(core);
        })
    }

    fn ensure_idle(&self, core: &Core<B>) -> Result<(), XspiError> {
        core.gate.ensure_idle().inspect_err(|_| {
            log::debug!(
                "xspi{}: refused, {} transfers in flight",
                self.id,
                core.gate.count()
            );
        })
    }

    /// Republishes the snapshot; after a failed reset it mirrors the registers
    /// rather than the requested configuration.
    fn publish(&self, core: &Core<B>) {
        if core.needs_reset {
            let (global, channels) = core.hardware_view();
            self.published.store(&global, &channels);
        } else {
            self.published.store(&core.global, &core.channels);
        }
    }

    pub(crate) fn require_online(&self, chn: ChannelId) -> Result<(), XspiError> {
        if self.is_online(chn) {
            Ok(())
        } else {
            Err(XspiError::ChannelUnavailable)
        }
    }

    #[inline]
    fn validate(&self) {
        #[cfg(any(debug_assertions, feature = "contracts"))]
        api_require!(DiagMsg::ObjectNotValid, self.signature == CONTEXT_SIGNATURE);
    }
}

impl<B: RegisterBus> core::fmt::Debug for DeviceContext<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("id", &self.id)
            .field("online", &self.online)
            .field("global", &self.global_config())
            .finish_non_exhaustive()
    }
}

/// An in-flight transfer; ends on drop.
#[must_use = "the transfer ends as soon as the guard is dropped"]
pub struct Activity<'a, B: RegisterBus> {
    ctx: &'a DeviceContext<B>,
}

impl<B: RegisterBus> Drop for Activity<'_, B> {
    fn drop(&mut self) {
        self.ctx.end_activity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{
        attr::{CsDelay, MasterSlave, WordLength},
        test_support::{McspiSim, ch, two_channel_ctx},
    };

    fn resources(sim: McspiSim) -> Resources<McspiSim> {
        Resources {
            bus: sim,
            region_size: REGION_SIZE,
        }
    }

    #[test]
    fn bring_up_resets_and_pushes_online_channels_only() {
        let ctx = DeviceContext::new(
            0,
            resources(McspiSim::new()),
            &DeviceConfig::default(),
            |chn| chn.index() < 2,
        )
        .unwrap();

        ctx.with_bus(|bus| {
            assert_eq!(bus.writes[0], (SYSCONFIG, SYSCONFIG_SOFTRESET_MASK));
            let pushed: heapless::Vec<u16, 8> = bus.writes[1..].iter().map(|w| w.0).collect();
            assert_eq!(
                pushed.as_slice(),
                &[MODULCTRL, chn_reg(0, CHCONF), chn_reg(1, CHCONF)]
            );
        });
        assert_eq!(ctx.current_channel(), ch(0));
        assert!(ctx.is_online(ch(1)));
        assert!(!ctx.is_online(ch(2)));
        // Reset value was slave; the default config is master
        assert_eq!(ctx.global_config().master_slave, crate::driver::attr::MasterSlave::Master);
    }

    #[test]
    fn bring_up_picks_first_online_channel() {
        let ctx = DeviceContext::new(
            0,
            resources(McspiSim::new()),
            &DeviceConfig::default(),
            |chn| chn.index() == 2,
        )
        .unwrap();
        assert_eq!(ctx.current_channel(), ch(2));
    }

    #[test]
    fn bring_up_without_reset_refreshes_mirror() {
        let config = DeviceConfig::builder().skip_reset().build();
        let ctx = DeviceContext::new(0, resources(McspiSim::new()), &config, |_| true).unwrap();

        ctx.with_bus(|bus| {
            assert!(bus.writes.iter().all(|w| w.0 != SYSCONFIG));
            assert!(bus.reads > 0);
        });
        assert!(ctx.is_mirrored(REVISION).unwrap());
        // Data registers are never bulk-read
        assert!(!ctx.is_mirrored(chn_reg(0, RX)).unwrap());
    }

    #[test]
    fn bring_up_timeout_hands_bus_back() {
        let config = DeviceConfig::builder().reset_poll_limit(5).build();
        let sim = McspiSim::stuck_in_reset();

        let err = DeviceContext::new(0, resources(sim), &config, |_| true).unwrap_err();

        assert_eq!(err.error, XspiError::HardwareTimeout);
        assert_eq!(err.bus.status_polls(), 5);
    }

    #[test]
    fn undersized_region_is_rejected_and_larger_mapping_accepted() {
        let small = Resources {
            bus: McspiSim::new(),
            region_size: REGION_SIZE - 4,
        };
        let err = DeviceContext::new(0, small, &DeviceConfig::default(), |_| true).unwrap_err();
        assert_eq!(err.error, XspiError::InvalidArgument);
        assert!(err.bus.writes.is_empty());

        // Instances are commonly mapped with a full 1 KiB window
        let large = Resources {
            bus: McspiSim::new(),
            region_size: 0x400,
        };
        let ctx = DeviceContext::new(0, large, &DeviceConfig::default(), |_| true).unwrap();
        assert!(ctx.is_mirrored(MODULCTRL).unwrap());
        assert_eq!(
            ctx.is_mirrored(REGION_SIZE as u16),
            Err(XspiError::InvalidArgument)
        );
    }

    #[test]
    fn reset_restores_configuration() {
        let ctx = two_channel_ctx();
        ctx.set_word_length(ch(1), WordLength::new(24).unwrap())
            .unwrap();

        ctx.reset().unwrap();

        let word = ctx.with_bus(|bus| bus.reg(chn_reg(1, CHCONF)));
        assert_eq!(chconf_wl(word), 23);
        assert_eq!(ctx.word_length(ch(1)).bits(), 24);
        // Self-clearing bit is not retained in the mirror
        ctx.with_core(|core| {
            assert_eq!(sysconfig_softreset(core.shadow.read(SYSCONFIG).unwrap()), 0);
        });
    }

    #[test]
    fn reset_waits_for_slow_hardware() {
        let ctx = two_channel_ctx();
        ctx.with_bus(|bus| bus.reset_latency = Some(3));

        assert_eq!(ctx.reset(), Ok(()));
        ctx.with_bus(|bus| assert_eq!(bus.status_polls(), 4));
    }

    #[test]
    fn reset_times_out_instead_of_hanging() {
        let ctx = two_channel_ctx();
        ctx.with_bus(|bus| bus.reset_latency = None);

        assert_eq!(ctx.reset(), Err(XspiError::HardwareTimeout));
    }

    #[test]
    fn timed_out_reset_reports_registers_and_blocks_setters() {
        let ctx = two_channel_ctx();
        ctx.set_word_length(ch(0), WordLength::new(16).unwrap())
            .unwrap();
        ctx.with_bus(|bus| bus.reset_latency = None);

        assert_eq!(ctx.reset(), Err(XspiError::HardwareTimeout));

        // Controller sits at its reset values: slave mode, default CHCONF
        let (modulctrl, chconf0) =
            ctx.with_bus(|bus| (bus.reg(MODULCTRL), bus.reg(chn_reg(0, CHCONF))));
        ctx.with_core(|core| assert_eq!(core.shadow.read(MODULCTRL).unwrap(), modulctrl));
        assert_eq!(ctx.master_slave(), MasterSlave::Slave);
        assert_eq!(ctx.channel_config(ch(0)), ChannelConfig::from_chconf(chconf0));
        assert_ne!(ctx.word_length(ch(0)).bits(), 16);

        ctx.with_bus(|bus| bus.clear_log());
        assert_eq!(
            ctx.set_cs_delay(ch(0), CsDelay::OneAndHalf),
            Err(XspiError::HardwareTimeout)
        );
        ctx.with_bus(|bus| assert!(bus.writes.is_empty()));

        // Bookkeeping keeps the register view
        ctx.set_current_channel(ch(1)).unwrap();
        assert_eq!(ctx.master_slave(), MasterSlave::Slave);

        ctx.with_bus(|bus| bus.reset_latency = Some(0));
        assert_eq!(ctx.reset(), Ok(()));
        assert_eq!(ctx.master_slave(), MasterSlave::Master);
        assert_eq!(ctx.word_length(ch(0)).bits(), 16);
        assert_eq!(modulctrl_ms(ctx.with_bus(|bus| bus.reg(MODULCTRL))), 0);
        assert_eq!(ctx.set_cs_delay(ch(0), CsDelay::OneAndHalf), Ok(()));
    }

    #[test]
    fn reset_is_gated() {
        let ctx = two_channel_ctx();
        let _transfer = ctx.activity();

        assert_eq!(ctx.reset(), Err(XspiError::TryAgain));
        ctx.with_bus(|bus| assert!(bus.writes.is_empty()));
    }

    #[test]
    fn activity_guard_balances_count() {
        let ctx = two_channel_ctx();
        {
            let _a = ctx.activity();
            let _b = ctx.activity();
            assert_eq!(ctx.activity_count(), 2);
            assert!(!ctx.is_idle());
        }
        assert!(ctx.is_idle());
    }

    #[test]
    #[cfg_attr(not(any(debug_assertions, feature = "contracts")), ignore)]
    #[should_panic(expected = "contract violation")]
    fn unbalanced_end_is_a_contract_violation() {
        let ctx = two_channel_ctx();
        ctx.end_activity();
    }

    #[test]
    fn status_reads_bypass_mirror_and_gate() {
        let ctx = two_channel_ctx();
        ctx.with_bus(|bus| bus.set_reg(chn_reg(0, CHSTAT), 0b101));
        let _transfer = ctx.activity();

        assert_eq!(ctx.revision(), Ok(0x21));
        assert_eq!(ctx.channel_status(ch(0)), Ok(0b101));
        assert_eq!(
            ctx.channel_status(ch(3)),
            Err(XspiError::ChannelUnavailable)
        );
    }

    #[test]
    fn into_bus_returns_hardware() {
        let ctx = two_channel_ctx();
        let sim = ctx.into_bus();
        assert_eq!(sim.reg(REVISION), 0x21);
    }
}
