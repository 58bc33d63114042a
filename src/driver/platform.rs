use crate::{
    driver::{XspiError, attr::ChannelId},
    shadow::RegisterBus,
};

/// A mapped controller handed to the driver by the platform.
#[derive(Debug)]
pub struct Resources<B> {
    pub bus: B,
    /// Size of the mapped register region in bytes.
    pub region_size: usize,
}

/// Board support the driver needs to bring controllers up and down.
pub trait Platform {
    type Bus: RegisterBus;

    /// Whether controller `id` exists and is enabled on this board.
    fn is_device_ready(&self, id: u32) -> bool;

    /// Requests and maps the controller's register region.
    fn acquire(&mut self, id: u32) -> Result<Resources<Self::Bus>, XspiError>;

    /// Whether channel `chn` of controller `id` is wired on this board.
    fn is_channel_online(&self, id: u32, chn: ChannelId) -> bool;

    /// Unmaps and releases a region obtained from [`acquire`](Self::acquire).
    fn release(&mut self, id: u32, bus: Self::Bus);
}
