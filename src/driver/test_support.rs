//! Simulated McSPI block and platform for driver tests.

use crate::{
    driver::{
        DeviceConfig, DeviceContext, XspiError,
        attr::ChannelId,
        platform::{Platform, Resources},
        regs::*,
    },
    shadow::RegisterBus,
};

pub fn ch(n: u8) -> ChannelId {
    ChannelId::new(n).unwrap()
}

/// Register file with McSPI reset values and soft-reset behaviour.
#[derive(Debug)]
pub struct McspiSim {
    regs: [u32; REGION_WORDS],
    pub writes: heapless::Vec<(u16, u32), 256>,
    pub reads: u32,
    status_polls: u32,
    /// `SYSSTATUS` polls before a soft reset completes; `None` never completes.
    pub reset_latency: Option<u32>,
    polls_left: Option<u32>,
}

impl McspiSim {
    pub fn new() -> Self {
        Self {
            regs: Self::reset_values(),
            writes: heapless::Vec::new(),
            reads: 0,
            status_polls: 0,
            reset_latency: Some(0),
            polls_left: None,
        }
    }

    pub fn stuck_in_reset() -> Self {
        Self {
            reset_latency: None,
            ..Self::new()
        }
    }

    fn reset_values() -> [u32; REGION_WORDS] {
        let mut regs = [0; REGION_WORDS];
        regs[REVISION as usize / 4] = 0x21;
        regs[SYSSTATUS as usize / 4] = SYSSTATUS_RESETDONE_MASK;
        regs[MODULCTRL as usize / 4] = 0x0000_0004;
        for n in 0..MAX_CHANNELS {
            regs[chn_reg(n, CHCONF) as usize / 4] = 0x0006_0000;
        }
        regs
    }

    pub fn reg(&self, offset: u16) -> u32 {
        self.regs[offset as usize / 4]
    }

    /// Changes a register behind the driver's back.
    pub fn set_reg(&mut self, offset: u16, value: u32) {
        self.regs[offset as usize / 4] = value;
    }

    /// `SYSSTATUS` reads issued while a reset was pending.
    pub fn status_polls(&self) -> u32 {
        self.status_polls
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.reads = 0;
        self.status_polls = 0;
    }
}

impl Default for McspiSim {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for McspiSim {
    fn read(&mut self, offset: u16) -> u32 {
        self.reads += 1;
        if offset == SYSSTATUS && self.reg(SYSSTATUS) & SYSSTATUS_RESETDONE_MASK == 0 {
            self.status_polls += 1;
            match self.polls_left {
                Some(0) => {
                    self.regs[SYSSTATUS as usize / 4] |= SYSSTATUS_RESETDONE_MASK;
                    self.polls_left = None;
                }
                Some(n) => self.polls_left = Some(n - 1),
                None => {}
            }
        }
        self.reg(offset)
    }

    fn write(&mut self, offset: u16, value: u32) {
        self.writes
            .push((offset, value))
            .expect("write log capacity exceeded");

        if offset == SYSCONFIG && sysconfig_softreset(value) == 1 {
            self.regs = Self::reset_values();
            self.regs[SYSSTATUS as usize / 4] = 0;
            self.polls_left = self.reset_latency;
            self.set_reg(SYSCONFIG, set_sysconfig_softreset(value, 0));
        } else {
            self.set_reg(offset, value);
        }
    }
}

/// Context with channels 0 and 1 online, 2 and 3 offline, and an empty
/// access log.
pub fn two_channel_ctx() -> DeviceContext<McspiSim> {
    let resources = Resources {
        bus: McspiSim::new(),
        region_size: REGION_SIZE,
    };
    let ctx = DeviceContext::new(1, resources, &DeviceConfig::default(), |chn| {
        chn.index() < 2
    })
    .unwrap();
    ctx.with_bus(|bus| bus.clear_log());
    ctx
}

/// Board with controllers `0..devices`, channels `0..channels` wired on
/// each, recording every release.
#[derive(Debug, Default)]
pub struct SimPlatform {
    pub devices: u32,
    pub channels: usize,
    /// Controller whose reset never completes.
    pub stuck: Option<u32>,
    /// Controller whose region cannot be mapped.
    pub unmappable: Option<u32>,
    pub acquired: heapless::Vec<u32, 8>,
    pub released: heapless::Vec<u32, 8>,
}

impl SimPlatform {
    pub fn new(devices: u32, channels: usize) -> Self {
        Self {
            devices,
            channels,
            ..Self::default()
        }
    }
}

impl Platform for SimPlatform {
    type Bus = McspiSim;

    fn is_device_ready(&self, id: u32) -> bool {
        id < self.devices
    }

    fn acquire(&mut self, id: u32) -> Result<Resources<McspiSim>, XspiError> {
        if self.unmappable == Some(id) {
            return Err(XspiError::ResourceExhausted);
        }
        self.acquired.push(id).expect("acquire log capacity exceeded");
        let bus = if self.stuck == Some(id) {
            McspiSim::stuck_in_reset()
        } else {
            McspiSim::new()
        };
        Ok(Resources {
            bus,
            region_size: REGION_SIZE,
        })
    }

    fn is_channel_online(&self, _id: u32, chn: ChannelId) -> bool {
        chn.index() < self.channels
    }

    fn release(&mut self, id: u32, _bus: McspiSim) {
        self.released.push(id).expect("release log capacity exceeded");
    }
}
