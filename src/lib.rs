//! Core of a real-time SPI controller driver.
//!
//! A single SPI peripheral exposes several hardware channels (chip selects).
//! This crate owns the configuration side of such a controller: a register
//! shadow cache, per-channel state, and a device context whose mutations are
//! gated against in-flight transfers. The wire datapath itself lives elsewhere.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ioctl  ┌──────────────────────────┐         ┌──────────────┐
//! │ device file  │────────▶│ DeviceContext            │  write  │ RegisterBus  │
//! │ (dispatch)   │         │  ├─ lock (critical sect) │────────▶│ (hardware)   │
//! │              │◀────────│  ├─ ActivityGate         │  read   │              │
//! └──────────────┘  value  │  └─ RegisterShadow ──────│◀────────│              │
//!                          └──────────────────────────┘ refresh └──────────────┘
//! ```
//!
//! - **Setters** validate, take the device lock, check the activity gate, then
//!   read-modify-write through the shadow (one hardware write per change)
//! - **Getters** read a published snapshot and never take the lock
//! - **Transfers** bracket themselves with `begin_activity`/`end_activity`;
//!   while any is in flight, hardware-affecting setters return `TryAgain`
//!
//! # Example
//!
//! ```rust,ignore
//! use xspi::prelude::*;
//!
//! let resources = Resources { bus, region_size: 0x180 };
//! let ctx = DeviceContext::new(1, resources, &DeviceConfig::default(), |chn| chn.index() < 2)
//!     .map_err(|e| e.error)?;
//!
//! ctx.set_fifo_channel(FifoChannel::Channel(ChannelId::try_from(0)?))?;
//! ctx.set_word_length(ctx.current_channel(), WordLength::try_from(16)?)?;
//!
//! let transfer = ctx.activity();
//! assert_eq!(ctx.set_cs_mode(CsMode::Disabled), Err(XspiError::TryAgain));
//! drop(transfer);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

pub mod driver;
pub mod shadow;

pub mod prelude {
    pub use crate::driver::prelude::*;
    pub use crate::shadow::prelude::*;
}
