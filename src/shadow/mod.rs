pub mod bus;
pub mod error;
pub mod helpers;
pub mod policy;
pub mod storage;
pub(crate) mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use bus::RegisterBus;
pub use error::ShadowError;
pub use policy::{MirrorAll, MirrorPolicy};
pub use storage::{RegisterMap, RegisterShadow, Rejected};

pub mod prelude {
    pub use super::{
        MirrorAll, MirrorPolicy, RegisterBus, RegisterMap, RegisterShadow, Rejected, ShadowError,
    };
}
