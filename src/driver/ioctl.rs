//! Device-file command surface.
//!
//! Requests are Linux `_IOC` words carrying an `int` argument. A "set"
//! command is `_IOW` and its "get" counterpart is `_IOR` with the same
//! command number.

use crate::{
    driver::{XspiError, context::DeviceContext},
    shadow::RegisterBus,
};

pub const XSPI_IOC_MAGIC: u32 = 1;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;

const IOC_NRMASK: u32 = 0xFF;
const IOC_TYPEMASK: u32 = 0xFF;
const IOC_SIZEMASK: u32 = 0x3FFF;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Size of the `int` argument every command carries.
const ARG_SIZE: u32 = core::mem::size_of::<i32>() as u32;

pub const fn ioc(dir: u32, nr: u32, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT)
        | (size << IOC_SIZESHIFT)
        | (XSPI_IOC_MAGIC << IOC_TYPESHIFT)
        | (nr << IOC_NRSHIFT)
}

pub const fn iow(nr: u32) -> u32 {
    ioc(IOC_WRITE, nr, ARG_SIZE)
}

pub const fn ior(nr: u32) -> u32 {
    ioc(IOC_READ, nr, ARG_SIZE)
}

/// Declares the command set together with its `XSPI_IOC_SET_*` and
/// `XSPI_IOC_GET_*` request words.
macro_rules! commands {
    ($( $(#[$meta:meta])* $variant:ident = $nr:literal => $name:ident ),+ $(,)?) => {
        /// A configurable attribute, identified by its command number.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Command {
            $( $(#[$meta])* $variant = $nr ),+
        }

        impl Command {
            pub const ALL: &'static [Command] = &[$(Command::$variant),+];

            pub const fn nr(self) -> u32 {
                self as u32
            }

            pub const fn from_nr(nr: u32) -> Option<Self> {
                match nr {
                    $( $nr => Some(Command::$variant), )+
                    _ => None,
                }
            }
        }

        paste::paste! {
            $(
                pub const [<XSPI_IOC_SET_ $name>]: u32 = iow($nr);
                pub const [<XSPI_IOC_GET_ $name>]: u32 = ior($nr);
            )+
        }
    };
}

commands! {
    /// `0..=3`
    CurrentChannel = 1 => CURRENT_CHN,
    /// `-1` disables the FIFO, `0..=3` hands it to that channel.
    FifoChannel = 2 => FIFO_MODE,
    CsMode = 3 => CS_MODE,
    MasterSlave = 4 => MODE,
    PinLayout = 5 => PIN_LAYOUT,
    InitialDelay = 6 => INITIAL_DELAY,
    CsDelay = 7 => CS_DELAY,
    ChannelMode = 8 => CHANNEL_MODE,
    /// `4..=32` bits.
    WordLength = 100 => WORD_LENGTH,
    CsPolarity = 102 => CS_POLARITY,
    /// Refused while chip selects are not module driven.
    CsState = 103 => CS_STATE,
    /// SPICLK rate in Hz.
    ClockFreq = 104 => CLOCK_FREQ,
    ClockPhase = 105 => CLOCK_PHASE,
    ClockPolarity = 106 => CLOCK_POLARITY,
    TransferMode = 107 => TRANSFER_MODE,
}

impl Command {
    pub const fn set(self) -> u32 {
        iow(self.nr())
    }

    pub const fn get(self) -> u32 {
        ior(self.nr())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Set,
    Get,
}

/// A decoded request word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub direction: Direction,
}

impl Request {
    /// Decodes a request word, rejecting foreign magic numbers, argument
    /// sizes and command numbers with [`XspiError::UnknownRequest`].
    pub fn decode(request: u32) -> Result<Self, XspiError> {
        let magic = (request >> IOC_TYPESHIFT) & IOC_TYPEMASK;
        let size = (request >> IOC_SIZESHIFT) & IOC_SIZEMASK;
        if magic != XSPI_IOC_MAGIC || size != ARG_SIZE {
            return Err(XspiError::UnknownRequest);
        }

        let direction = match request >> IOC_DIRSHIFT {
            IOC_WRITE => Direction::Set,
            IOC_READ => Direction::Get,
            _ => return Err(XspiError::UnknownRequest),
        };
        let command =
            Command::from_nr((request >> IOC_NRSHIFT) & IOC_NRMASK).ok_or(XspiError::UnknownRequest)?;

        Ok(Self { command, direction })
    }

    pub const fn encode(self) -> u32 {
        match self.direction {
            Direction::Set => self.command.set(),
            Direction::Get => self.command.get(),
        }
    }
}

/// Runs one device-file request against `ctx`.
///
/// Set requests parse `arg` into the attribute's domain and return 0;
/// get requests ignore `arg` and return the encoded current value.
/// Channel-scoped commands act on the current channel.
pub fn dispatch<B: RegisterBus>(
    ctx: &DeviceContext<B>,
    request: u32,
    arg: i32,
) -> Result<i32, XspiError> {
    let Request { command, direction } = Request::decode(request)?;
    log::trace!("xspi{}: {:?} {:?} {}", ctx.id(), direction, command, arg);

    match direction {
        Direction::Set => set(ctx, command, arg).map(|()| 0),
        Direction::Get => Ok(get(ctx, command)),
    }
}

fn set<B: RegisterBus>(ctx: &DeviceContext<B>, command: Command, arg: i32) -> Result<(), XspiError> {
    let chn = ctx.current_channel();
    match command {
        Command::CurrentChannel => ctx.set_current_channel(arg.try_into()?),
        Command::FifoChannel => ctx.set_fifo_channel(arg.try_into()?),
        Command::CsMode => ctx.set_cs_mode(arg.try_into()?),
        Command::MasterSlave => ctx.set_master_slave(arg.try_into()?),
        Command::ChannelMode => ctx.set_channel_mode(arg.try_into()?),
        Command::InitialDelay => ctx.set_initial_delay(arg.try_into()?),
        Command::PinLayout => ctx.set_pin_layout(chn, arg.try_into()?),
        Command::CsDelay => ctx.set_cs_delay(chn, arg.try_into()?),
        Command::WordLength => ctx.set_word_length(chn, arg.try_into()?),
        Command::CsPolarity => ctx.set_cs_polarity(chn, arg.try_into()?),
        Command::CsState => ctx.set_cs_state(chn, arg.try_into()?),
        Command::ClockFreq => ctx.set_clock_freq(chn, arg.try_into()?),
        Command::ClockPhase => ctx.set_clock_phase(chn, arg.try_into()?),
        Command::ClockPolarity => ctx.set_clock_polarity(chn, arg.try_into()?),
        Command::TransferMode => ctx.set_transfer_mode(chn, arg.try_into()?),
    }
}

fn get<B: RegisterBus>(ctx: &DeviceContext<B>, command: Command) -> i32 {
    let chn = ctx.current_channel();
    match command {
        Command::CurrentChannel => ctx.current_channel().into(),
        Command::FifoChannel => ctx.fifo_channel().into(),
        Command::CsMode => ctx.cs_mode().into(),
        Command::MasterSlave => ctx.master_slave().into(),
        Command::ChannelMode => ctx.channel_mode().into(),
        Command::InitialDelay => ctx.initial_delay().into(),
        Command::PinLayout => ctx.pin_layout(chn).into(),
        Command::CsDelay => ctx.cs_delay(chn).into(),
        Command::WordLength => ctx.word_length(chn).into(),
        Command::CsPolarity => ctx.cs_polarity(chn).into(),
        Command::CsState => ctx.cs_state(chn).into(),
        Command::ClockFreq => ctx.clock_freq(chn).into(),
        Command::ClockPhase => ctx.clock_phase(chn).into(),
        Command::ClockPolarity => ctx.clock_polarity(chn).into(),
        Command::TransferMode => ctx.transfer_mode(chn).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{
        attr::{FifoChannel, WordLength},
        test_support::{ch, two_channel_ctx},
    };

    #[test]
    fn request_words_match_linux_encoding() {
        // _IOW(1, 1, int) and _IOR(1, 100, int)
        assert_eq!(XSPI_IOC_SET_CURRENT_CHN, 0x4004_0101);
        assert_eq!(XSPI_IOC_GET_WORD_LENGTH, 0x8004_0164);
        assert_eq!(Command::TransferMode.set(), XSPI_IOC_SET_TRANSFER_MODE);
    }

    #[test]
    fn every_command_decodes_from_both_directions() {
        for &command in Command::ALL {
            assert_eq!(
                Request::decode(command.set()),
                Ok(Request {
                    command,
                    direction: Direction::Set
                })
            );
            assert_eq!(
                Request::decode(command.get()).map(|r| r.encode()),
                Ok(command.get())
            );
        }
    }

    #[test]
    fn foreign_requests_are_unknown() {
        assert_eq!(Request::decode(iow(101)), Err(XspiError::UnknownRequest));
        assert_eq!(Request::decode(iow(0)), Err(XspiError::UnknownRequest));
        // Wrong magic
        assert_eq!(
            Request::decode(XSPI_IOC_SET_CS_MODE ^ (3 << 8)),
            Err(XspiError::UnknownRequest)
        );
        // Wrong argument size
        assert_eq!(
            Request::decode(ioc(IOC_WRITE, 3, 8)),
            Err(XspiError::UnknownRequest)
        );
        // _IO without direction
        assert_eq!(
            Request::decode(ioc(0, 3, ARG_SIZE)),
            Err(XspiError::UnknownRequest)
        );
    }

    #[test]
    fn dispatch_parses_and_targets_current_channel() {
        let ctx = two_channel_ctx();

        assert_eq!(dispatch(&ctx, XSPI_IOC_SET_CURRENT_CHN, 1), Ok(0));
        assert_eq!(dispatch(&ctx, XSPI_IOC_SET_WORD_LENGTH, 16), Ok(0));

        assert_eq!(ctx.word_length(ch(1)), WordLength::new(16).unwrap());
        assert_eq!(ctx.word_length(ch(0)), WordLength::default());
        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_WORD_LENGTH, 0), Ok(16));
        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_CURRENT_CHN, 0), Ok(1));
    }

    #[test]
    fn dispatch_reports_domain_and_availability_errors() {
        let ctx = two_channel_ctx();

        assert_eq!(
            dispatch(&ctx, XSPI_IOC_SET_WORD_LENGTH, 3),
            Err(XspiError::InvalidArgument)
        );
        assert_eq!(
            dispatch(&ctx, XSPI_IOC_SET_CURRENT_CHN, 4),
            Err(XspiError::InvalidArgument)
        );
        assert_eq!(
            dispatch(&ctx, XSPI_IOC_SET_FIFO_MODE, 2),
            Err(XspiError::ChannelUnavailable)
        );
        assert_eq!(dispatch(&ctx, 0xDEAD, 0), Err(XspiError::UnknownRequest));
        ctx.with_bus(|bus| assert!(bus.writes.is_empty()));
    }

    #[test]
    fn fifo_round_trips_through_disabled_sentinel() {
        let ctx = two_channel_ctx();

        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_FIFO_MODE, 0), Ok(FifoChannel::DISABLED));
        dispatch(&ctx, XSPI_IOC_SET_FIFO_MODE, 0).unwrap();
        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_FIFO_MODE, 0), Ok(0));
        dispatch(&ctx, XSPI_IOC_SET_FIFO_MODE, -1).unwrap();
        assert_eq!(ctx.fifo_channel(), FifoChannel::Disabled);
    }

    #[test]
    fn clock_frequency_reports_effective_rate() {
        let ctx = two_channel_ctx();

        dispatch(&ctx, XSPI_IOC_SET_CLOCK_FREQ, 1_000_000).unwrap();
        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_CLOCK_FREQ, 0), Ok(750_000));
        assert_eq!(
            dispatch(&ctx, XSPI_IOC_SET_CLOCK_FREQ, 100),
            Err(XspiError::InvalidArgument)
        );
    }

    #[test]
    fn busy_device_still_answers_get_requests() {
        let ctx = two_channel_ctx();
        let _transfer = ctx.activity();

        assert_eq!(
            dispatch(&ctx, XSPI_IOC_SET_MODE, 1),
            Err(XspiError::TryAgain)
        );
        assert_eq!(dispatch(&ctx, XSPI_IOC_GET_MODE, 0), Ok(0));
        assert_eq!(XspiError::TryAgain.errno(), -11);
    }
}
