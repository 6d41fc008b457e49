//! Everything related to the [`Interface`] trait + its per-command
//! capability traits.
//!
//! An [`Interface`] is one logical memory region (a flash bank, an EEPROM,
//! an external QSPI part) with its own command handlers and its own index
//! in the dispatcher's table. It is the primary bridge between the generic
//! protocol core and a target's project/platform-specific flash code.
//!
//! # Implementing `Interface`
//!
//! Command support is expressed through *capability methods*: for every
//! global command there is a `support_*` method returning
//! `Option<...Ops>`, where `...Ops` is a `&mut dyn` reference to a small
//! per-command trait. Return `Some(self)` from the ones you implement and
//! leave the rest defaulted to `None`:
//!
//! ```rust,ignore
//! impl Interface for QspiFlash {
//!     fn support_erase_range(&mut self) -> Option<EraseRangeOps<'_>> {
//!         Some(self)
//!     }
//!     fn support_prog_verify(&mut self) -> Option<ProgVerifyOps<'_>> {
//!         Some(self)
//!     }
//! }
//! ```
//!
//! The dispatcher resolves the capability when a command arrives; a `None`
//! answer terminates the command with `ERR_IMPLEMENTATION` without invoking
//! any driver code. `QUERY_CAP` is answered by the core itself and has no
//! capability trait.
//!
//! # Handler contract
//!
//! A handler is invoked at most once per tick, repeatedly, until it
//! produces a terminal result. Each invocation must make bounded forward
//! progress and return; never block, never spin on the host:
//!
//! - Return `Ok(Step::Pending)` to be called again next tick (e.g. while
//!   waiting for a buffer, or between erase sectors).
//! - Return `Ok(Step::Done)` to complete with `OK`.
//! - Return `Err(CmdError::...)` to complete with the corresponding
//!   terminal error status.
//!
//! Handlers hold no stack across invocations; anything that must survive a
//! suspension lives in the driver itself. [`Exchange::is_first_call`] is
//! true for the first invocation of a freshly ingested command and is the
//! conventional point to reset that per-command scratch state. On every
//! return, any buffers the handler owns must be in a consistent state.
//!
//! [`Exchange::is_first_call`]: crate::Exchange::is_first_call

use crate::common::Status;

mod commands;

pub use commands::{CrcRegion, CustomCmd, EraseRange, MassErase, ProgVerify, ReadRegion};

macro_rules! define_ops {
    ($opsname:ident, $trait:ident) => {
        #[doc = concat!("See [`", stringify!($trait), "`].")]
        pub type $opsname<'a> = &'a mut dyn $trait;
    };
}

define_ops!(MassEraseOps, MassErase);
define_ops!(EraseRangeOps, EraseRange);
define_ops!(ProgVerifyOps, ProgVerify);
define_ops!(CrcRegionOps, CrcRegion);
define_ops!(ReadRegionOps, ReadRegion);
define_ops!(CustomCmdOps, CustomCmd);

/// A terminal command failure, mapped onto the wire status posted back to
/// the host.
///
/// Variants carrying a `u32` also set the block's `Code` field, which the
/// host surfaces as diagnostic detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdError {
    /// One of `P1..P6` failed validation (`ERR_PARAM`).
    Param,
    /// A hardware step failed (`ERR_EXECUTION`); the payload lands in
    /// `Code`.
    Execution(u32),
    /// The handler gave up on an internal deadline (`ERR_TIMEOUT`).
    Timeout,
    /// The operation is not supported here (`ERR_IMPLEMENTATION`).
    Unimplemented,
    /// Any other failure (`ERR_OTHER`); the payload lands in `Code`.
    Other(u32),
}

impl CmdError {
    pub(crate) fn status(self) -> Status {
        match self {
            CmdError::Param => Status::ErrParam,
            CmdError::Execution(_) => Status::ErrExecution,
            CmdError::Timeout => Status::ErrTimeout,
            CmdError::Unimplemented => Status::ErrImplementation,
            CmdError::Other(_) => Status::ErrOther,
        }
    }

    pub(crate) fn code(self) -> Option<u32> {
        match self {
            CmdError::Execution(code) | CmdError::Other(code) => Some(code),
            _ => None,
        }
    }
}

/// What a handler invocation achieved this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains; invoke the handler again next tick.
    Pending,
    /// The command completed successfully.
    Done,
}

/// A specialized `Result` for handler invocations.
pub type CmdResult<T> = Result<T, CmdError>;

/// One logical memory region serviced by the dispatcher.
///
/// See the [module level documentation](self) for the capability pattern
/// and the handler contract.
pub trait Interface {
    /// One-time hook, run during dispatcher construction before the
    /// parameter block is published to the host.
    fn init(&mut self) {}

    /// Support for the `MASS_ERASE` command.
    #[inline(always)]
    fn support_mass_erase(&mut self) -> Option<MassEraseOps<'_>> {
        None
    }

    /// Support for the `ERASE_RANGE` command.
    #[inline(always)]
    fn support_erase_range(&mut self) -> Option<EraseRangeOps<'_>> {
        None
    }

    /// Support for the `PROG_VERIFY` command.
    #[inline(always)]
    fn support_prog_verify(&mut self) -> Option<ProgVerifyOps<'_>> {
        None
    }

    /// Support for the `CRC` command.
    #[inline(always)]
    fn support_crc(&mut self) -> Option<CrcRegionOps<'_>> {
        None
    }

    /// Support for the `READ` command.
    #[inline(always)]
    fn support_read(&mut self) -> Option<ReadRegionOps<'_>> {
        None
    }

    /// Support for interface-specific commands (opcodes `0x80..=0xFF`).
    #[inline(always)]
    fn support_custom_cmd(&mut self) -> Option<CustomCmdOps<'_>> {
        None
    }
}
