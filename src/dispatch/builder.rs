use core::fmt::{self, Display};

use managed::ManagedSlice;

use crate::common::MemMap;
use crate::mem::SharedMem;
use crate::time::Clock;

use super::{Iface, MemProg};

/// An error which may occur when building a [`MemProg`].
#[derive(Debug)]
pub enum MemProgBuilderError {
    /// No [`MemMap`] was provided via `with_map`.
    MissingMemMap,
    /// No interfaces were provided via `with_interfaces`.
    MissingInterfaces,
    /// More interfaces than the parameter block's 8-bit index can address.
    TooManyInterfaces,
    /// `buffer_size` does not fit in the 24 bits `QUERY_CAP` packs it into.
    BufferSizeTooLarge,
    /// A non-empty buffer pool with zero-sized buffers.
    ZeroSizedBuffers,
}

impl Display for MemProgBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::MemProgBuilderError::*;
        match self {
            MissingMemMap => write!(f, "Must provide a region placement using `with_map`."),
            MissingInterfaces => {
                write!(f, "Must register at least one interface using `with_interfaces`.")
            }
            TooManyInterfaces => write!(f, "At most 256 interfaces can be addressed."),
            BufferSizeTooLarge => write!(f, "`buffer_size` must fit in 24 bits."),
            ZeroSizedBuffers => write!(f, "`buffer_size` must be non-zero when buffers exist."),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MemProgBuilderError {}

/// Helper to construct and customize [`MemProg`].
pub struct MemProgBuilder<'a, M: SharedMem, C: Clock> {
    mem: M,
    clock: C,
    map: Option<MemMap>,
    ifaces: Option<ManagedSlice<'a, Iface<'a>>>,
    #[cfg(feature = "debug-io")]
    debug: Option<&'a mut dyn crate::debug::DebugIo>,
}

impl<'a, M: SharedMem, C: Clock> MemProgBuilder<'a, M, C> {
    /// Create a new `MemProgBuilder` over the given shared memory and
    /// clock.
    pub fn new(mem: M, clock: C) -> MemProgBuilder<'a, M, C> {
        MemProgBuilder {
            mem,
            clock,
            map: None,
            ifaces: None,
            #[cfg(feature = "debug-io")]
            debug: None,
        }
    }

    /// Set the placement of the three shared regions.
    pub fn with_map(mut self, map: MemMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Register the interface table. Index assignment follows slice order:
    /// `ifaces[0]` answers commands addressed to interface 0, and so on.
    ///
    /// Accepts a borrowed `&mut [Iface]` (required in `#![no_std]` mode) or
    /// an owned `Vec<Iface>` when the `alloc` feature is enabled.
    pub fn with_interfaces(mut self, ifaces: impl Into<ManagedSlice<'a, Iface<'a>>>) -> Self {
        self.ifaces = Some(ifaces.into());
        self
    }

    /// Attach the optional character/pin debug side-channel.
    #[cfg(feature = "debug-io")]
    pub fn with_debug_io(mut self, debug: &'a mut dyn crate::debug::DebugIo) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Build the `MemProg`, initialize the shared regions, and publish the
    /// parameter block to the host (`Status = IDLE`, token released).
    ///
    /// Interface `init` hooks run during this call, before the block is
    /// published.
    pub fn build(self) -> Result<MemProg<'a, M, C>, MemProgBuilderError> {
        let map = self.map.ok_or(MemProgBuilderError::MissingMemMap)?;
        let ifaces = self.ifaces.ok_or(MemProgBuilderError::MissingInterfaces)?;

        if ifaces.is_empty() {
            return Err(MemProgBuilderError::MissingInterfaces);
        }
        if ifaces.len() > usize::from(u8::MAX) + 1 {
            return Err(MemProgBuilderError::TooManyInterfaces);
        }
        if map.buffer_size > 0x00FF_FFFF {
            return Err(MemProgBuilderError::BufferSizeTooLarge);
        }
        if map.num_buffers > 0 && map.buffer_size == 0 {
            return Err(MemProgBuilderError::ZeroSizedBuffers);
        }

        let mut prog = MemProg {
            mem: self.mem,
            clock: self.clock,
            map,
            ifaces,
            #[cfg(feature = "debug-io")]
            debug: self.debug,
        };
        prog.static_init();
        Ok(prog)
    }
}
