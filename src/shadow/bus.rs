/// Raw access to a memory-mapped register block.
///
/// This is the only path from the shadow to hardware. Implementations wrap
/// the remapped I/O region of one controller instance; offsets are relative
/// to the start of that region and always word aligned.
pub trait RegisterBus {
    /// Reads the 32-bit register at `offset`.
    ///
    /// Takes `&mut self` because reads of status and data registers may have
    /// side effects on the peripheral.
    fn read(&mut self, offset: u16) -> u32;

    /// Writes `value` to the 32-bit register at `offset`.
    fn write(&mut self, offset: u16, value: u32);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read(&mut self, offset: u16) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: u16, value: u32) {
        (**self).write(offset, value)
    }
}
