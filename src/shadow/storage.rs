use crate::shadow::{
    ShadowError,
    bus::RegisterBus,
    helpers::{WORD, channel_offset, word_span},
    policy::MirrorPolicy,
    table::ShadowTable,
};

/// Geometry of a mapped register region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// Size of the mapped region in bytes.
    pub size: usize,
    /// Offset of channel 0's register block.
    pub channel_base: u16,
    /// Distance between consecutive channel blocks.
    pub channel_stride: u16,
}

/// A mirror that could not be created, handing the bus back for release.
#[derive(Debug)]
pub struct Rejected<B> {
    pub bus: B,
    pub error: ShadowError,
}

/// Write-through mirror of a hardware register block.
///
/// Every `write` goes to hardware first and then to the mirror; `read` only
/// ever looks at the mirror. Hardware state that changes behind the driver's
/// back is pulled in explicitly with [`read_through_refresh`](Self::read_through_refresh)
/// or [`refresh_all`](Self::refresh_all).
///
/// # Const Generics
/// - `TS`: Mirror capacity in bytes
/// - `WC`: Word count (must equal `TS / 4`)
///
/// # Type Parameters
/// - `B`: Hardware bus the mirror writes through to
/// - `P`: Mirror policy for self-clearing bits and refresh exclusions
pub struct RegisterShadow<B, P, const TS: usize, const WC: usize>
where
    B: RegisterBus,
    P: MirrorPolicy,
    bitmaps::BitsImpl<WC>: bitmaps::Bits,
{
    bus: B,
    policy: P,
    map: RegisterMap,
    table: ShadowTable<TS, WC>,
}

impl<B, P, const TS: usize, const WC: usize> core::fmt::Debug for RegisterShadow<B, P, TS, WC>
where
    B: RegisterBus,
    P: MirrorPolicy,
    bitmaps::BitsImpl<WC>: bitmaps::Bits,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterShadow")
            .field("map", &self.map)
            .finish_non_exhaustive()
    }
}

impl<B, P, const TS: usize, const WC: usize> RegisterShadow<B, P, TS, WC>
where
    B: RegisterBus,
    P: MirrorPolicy,
    bitmaps::BitsImpl<WC>: bitmaps::Bits,
{
    /// Creates an empty mirror for the region described by `map`.
    ///
    /// Fails with [`ShadowError::Exhausted`] if the region is larger than the
    /// mirror capacity `TS`; the bus is returned so the caller can unmap it.
    pub fn new(bus: B, map: RegisterMap, policy: P) -> Result<Self, Rejected<B>> {
        if map.size > TS || map.size % WORD != 0 {
            return Err(Rejected {
                bus,
                error: ShadowError::Exhausted,
            });
        }

        Ok(Self {
            bus,
            policy,
            map,
            table: ShadowTable::new(),
        })
    }

    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Copies every refreshable register from hardware into the mirror.
    ///
    /// Used after a hardware reset, which changes register values outside
    /// the driver's control.
    pub fn refresh_all(&mut self) {
        for offset in (0..self.map.size).step_by(WORD) {
            let offset = offset as u16;
            if !self.policy.refreshable(offset) {
                continue;
            }
            let value = self.bus.read(offset);
            // In range by construction of the loop.
            let _ = self.table.store(offset, value);
        }
    }

    /// Writes `value` to hardware, then stores it in the mirror.
    pub fn write(&mut self, offset: u16, value: u32) -> Result<(), ShadowError> {
        self.check(offset)?;
        self.bus.write(offset, value);
        let kept = value & !self.policy.write_only_mask(offset);
        self.table.store(offset, kept)
    }

    /// Returns the mirrored value without touching hardware.
    pub fn read(&self, offset: u16) -> Result<u32, ShadowError> {
        self.check(offset)?;
        self.table.load(offset)
    }

    /// Reads the register from hardware and updates the mirror with it.
    pub fn read_through_refresh(&mut self, offset: u16) -> Result<u32, ShadowError> {
        self.check(offset)?;
        let value = self.bus.read(offset);
        self.table.store(offset, value)?;
        Ok(value)
    }

    /// Read-modify-write computed from the mirror, costing one hardware write.
    ///
    /// Returns the value written.
    pub fn modify(&mut self, offset: u16, f: impl FnOnce(u32) -> u32) -> Result<u32, ShadowError> {
        let value = f(self.read(offset)?);
        self.write(offset, value)?;
        Ok(value)
    }

    pub fn chn_write(&mut self, channel: u8, offset: u16, value: u32) -> Result<(), ShadowError> {
        let reg = self.chn_offset(channel, offset)?;
        self.write(reg, value)
    }

    pub fn chn_read(&self, channel: u8, offset: u16) -> Result<u32, ShadowError> {
        let reg = self.chn_offset(channel, offset)?;
        self.read(reg)
    }

    pub fn chn_read_through_refresh(&mut self, channel: u8, offset: u16) -> Result<u32, ShadowError> {
        let reg = self.chn_offset(channel, offset)?;
        self.read_through_refresh(reg)
    }

    pub fn chn_modify(
        &mut self,
        channel: u8,
        offset: u16,
        f: impl FnOnce(u32) -> u32,
    ) -> Result<u32, ShadowError> {
        let reg = self.chn_offset(channel, offset)?;
        self.modify(reg, f)
    }

    /// Returns true if the driver has written or refreshed the register.
    pub fn is_mirrored(&self, offset: u16) -> Result<bool, ShadowError> {
        self.check(offset)?;
        self.table.is_mirrored(offset)
    }

    /// Number of registers holding a driver-known value.
    pub fn mirrored_count(&self) -> usize {
        self.table.mirrored_count()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Direct bus access. Anything written here bypasses the mirror until
    /// the next refresh.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consumes the mirror, returning the bus for release.
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn chn_offset(&self, channel: u8, offset: u16) -> Result<u16, ShadowError> {
        channel_offset(self.map.channel_base, self.map.channel_stride, channel, offset)
    }

    fn check(&self, offset: u16) -> Result<(), ShadowError> {
        word_span(offset, self.map.size).map(|_| ())
    }
}
