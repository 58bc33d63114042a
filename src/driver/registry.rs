use crate::driver::{
    BringUpError, DeviceConfig, XspiError, context::DeviceContext, platform::Platform,
};

/// Owns every brought-up controller of a board.
///
/// Contexts live here from registration until teardown; dropping the
/// registry tears every device down and releases its region.
pub struct DeviceRegistry<P: Platform, const MAX: usize> {
    platform: P,
    config: DeviceConfig,
    devices: heapless::Vec<DeviceContext<P::Bus>, MAX>,
}

impl<P: Platform, const MAX: usize> DeviceRegistry<P, MAX> {
    pub fn new(platform: P, config: DeviceConfig) -> Self {
        Self {
            platform,
            config,
            devices: heapless::Vec::new(),
        }
    }

    /// Maps, initialises and registers controller `id`.
    ///
    /// Anything acquired before a failing step is released again.
    pub fn bring_up(&mut self, id: u32) -> Result<&DeviceContext<P::Bus>, XspiError> {
        if self.position(id).is_some() {
            log::warn!("SPI device {} is already online", id);
            return Err(XspiError::InvalidArgument);
        }
        if !self.platform.is_device_ready(id) {
            return Err(XspiError::NoDevice);
        }
        if self.devices.is_full() {
            log::error!("no room to register SPI device {}", id);
            return Err(XspiError::ResourceExhausted);
        }

        log::info!("building SPI device: {}", id);
        let resources = self.platform.acquire(id).inspect_err(|err| {
            log::error!("failed to build device: {}, err: {}", id, err.errno());
        })?;

        log::info!("initializing SPI device: {}", id);
        let platform = &self.platform;
        let ctx = match DeviceContext::new(id, resources, &self.config, |chn| {
            platform.is_channel_online(id, chn)
        }) {
            Ok(ctx) => ctx,
            Err(BringUpError { error, bus }) => {
                log::error!("failed to initialize device: {}, err: {}", id, error.errno());
                self.platform.release(id, bus);
                return Err(error);
            }
        };

        log::info!("registering SPI device: {}", id);
        if let Err(ctx) = self.devices.push(ctx) {
            self.platform.release(id, ctx.into_bus());
            return Err(XspiError::ResourceExhausted);
        }
        log::info!("SPI device {} successfully brought online", id);

        self.get(id).ok_or(XspiError::NoDevice)
    }

    /// Brings up every ready controller with an id below `MAX`, stopping at
    /// the first failure. Returns the number of devices brought up.
    pub fn bring_up_all(&mut self) -> Result<usize, XspiError> {
        let mut count = 0;
        for id in 0..MAX as u32 {
            if !self.platform.is_device_ready(id) {
                log::debug!("skipping SPI device: {}", id);
                continue;
            }
            self.bring_up(id)?;
            count += 1;
        }
        Ok(count)
    }

    /// Unregisters controller `id` and releases its region.
    ///
    /// A device with a transfer in flight is left alone and
    /// [`XspiError::TryAgain`] is returned.
    pub fn tear_down(&mut self, id: u32) -> Result<(), XspiError> {
        let pos = self.position(id).ok_or(XspiError::NoDevice)?;
        if !self.devices[pos].is_idle() {
            return Err(XspiError::TryAgain);
        }
        let ctx = self.devices.swap_remove(pos);
        self.platform.release(id, ctx.into_bus());
        log::info!("SPI device {} offline", id);
        Ok(())
    }

    /// Tears every device down, busy or not.
    pub fn tear_down_all(&mut self) {
        while let Some(ctx) = self.devices.pop() {
            let id = ctx.id();
            if !ctx.is_idle() {
                log::warn!(
                    "SPI device {} torn down with {} transfers in flight",
                    id,
                    ctx.activity_count()
                );
            }
            self.platform.release(id, ctx.into_bus());
        }
    }

    pub fn get(&self, id: u32) -> Option<&DeviceContext<P::Bus>> {
        self.devices.iter().find(|ctx| ctx.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceContext<P::Bus>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.devices.iter().position(|ctx| ctx.id() == id)
    }
}

impl<P: Platform, const MAX: usize> Drop for DeviceRegistry<P, MAX> {
    fn drop(&mut self) {
        self.tear_down_all();
    }
}
