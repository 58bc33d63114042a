pub mod attr;
pub mod channel;
pub mod config;
pub mod context;
pub mod diag;
pub mod error;
pub mod gate;
pub mod ioctl;
mod ops;
pub mod platform;
pub mod regs;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use attr::{
    ChannelId, ChannelMode, ClockFreq, ClockPhase, ClockPolarity, CsDelay, CsMode, CsPolarity,
    CsState, FifoChannel, InitialDelay, MasterSlave, PinLayout, TransferMode, WordLength,
};
pub use channel::{ChannelConfig, ChannelState};
pub use config::{DeviceConfig, DeviceConfigBuilder, GlobalConfig};
pub use context::{Activity, DeviceContext};
pub use error::{BringUpError, XspiError};
pub use ioctl::{Command, Direction, Request, dispatch};
pub use platform::{Platform, Resources};
pub use regs::{McspiPolicy, McspiShadow};
pub use registry::DeviceRegistry;

pub mod prelude {
    pub use super::{
        ChannelConfig, ChannelId, ChannelMode, ClockFreq, ClockPhase, ClockPolarity, CsDelay,
        CsMode, CsPolarity, CsState, DeviceConfig, DeviceContext, DeviceRegistry, FifoChannel,
        InitialDelay, MasterSlave, PinLayout, Platform, Resources, TransferMode, WordLength,
        XspiError, dispatch,
    };
}
