//! The core [`MemProg`] dispatcher, used to drive command traffic between
//! the host's debug-probe driver and a set of registered [`Interface`]s
//! over the shared RAM regions described by a [`MemMap`].

use managed::ManagedSlice;

use crate::common::{MemMap, Param, Status};
use crate::iface::Interface;
use crate::mem::SharedMem;
use crate::time::Clock;

mod builder;
mod core_impl;
mod exchange;
mod pool;

pub use builder::{MemProgBuilder, MemProgBuilderError};
pub use exchange::{Exchange, Inbound, Outbound};

/// A registered interface: the driver plus the dispatcher-owned runtime
/// state riding along with it.
pub struct Iface<'a> {
    pub(crate) driver: &'a mut dyn Interface,
    pub(crate) state: IfaceState,
}

impl<'a> Iface<'a> {
    /// Wrap a driver for registration. Its index is assigned by
    /// registration order when the dispatcher is built.
    pub fn new(driver: &'a mut dyn Interface) -> Iface<'a> {
        Iface {
            driver,
            state: IfaceState::default(),
        }
    }
}

/// Per-interface runtime state. `local` is the working copy of the live
/// command's parameters, so handlers never poll the shared block
/// mid-command.
#[derive(Clone)]
pub(crate) struct IfaceState {
    pub(crate) index: u8,
    pub(crate) active: bool,
    pub(crate) local: Param,
    pub(crate) tx_seq: u8,
    pub(crate) rx_seq: u8,
}

impl Default for IfaceState {
    fn default() -> IfaceState {
        IfaceState {
            index: 0,
            active: false,
            local: Param::default(),
            tx_seq: 0,
            rx_seq: 0,
        }
    }
}

/// Read-only snapshot of an interface's progress, for firmware-side
/// watchdog or telemetry use.
#[derive(Debug, Clone, Copy)]
pub struct IfaceReport {
    /// Whether a command is currently bound to the interface.
    pub active: bool,
    /// Raw opcode of the bound command (stale if `active` is false).
    pub command: u8,
    /// Working status of the bound command.
    pub status: Status,
    /// Working auxiliary code of the bound command.
    pub code: u32,
}

/// Drive a set of [`Interface`]s from the firmware's idle loop, servicing
/// host commands arriving through the shared parameter block.
///
/// Construct one via [`MemProg::builder`] at startup, then call
/// [`MemProg::run_tick`] periodically. One call is one tick: the parameter
/// block is serviced if the target holds its token, every running handler
/// advances at most one step under the [`HANDLER_TIMEOUT_MS`] budget, and
/// unused or orphaned buffers are handed back to the host.
///
/// [`HANDLER_TIMEOUT_MS`]: crate::common::HANDLER_TIMEOUT_MS
pub struct MemProg<'a, M: SharedMem, C: Clock> {
    pub(crate) mem: M,
    pub(crate) clock: C,
    pub(crate) map: MemMap,
    pub(crate) ifaces: ManagedSlice<'a, Iface<'a>>,
    #[cfg(feature = "debug-io")]
    pub(crate) debug: Option<&'a mut dyn crate::debug::DebugIo>,
}

impl<'a, M: SharedMem, C: Clock> core::fmt::Debug for MemProg<'a, M, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemProg").field("map", &self.map).finish()
    }
}

impl<'a, M: SharedMem, C: Clock> MemProg<'a, M, C> {
    /// Create a [`MemProgBuilder`] over the given shared memory and clock.
    pub fn builder(mem: M, clock: C) -> MemProgBuilder<'a, M, C> {
        MemProgBuilder::new(mem, clock)
    }

    /// The region placement this dispatcher was configured with.
    pub fn map(&self) -> &MemMap {
        &self.map
    }

    /// Number of registered interfaces.
    pub fn num_interfaces(&self) -> usize {
        self.ifaces.len()
    }

    /// Borrow the underlying shared-memory accessor.
    ///
    /// Mostly useful in hosted simulation, where the test harness plays the
    /// host between ticks.
    pub fn borrow_mem(&mut self) -> &mut M {
        &mut self.mem
    }

    /// Snapshot interface `index`'s progress, or `None` for an unknown
    /// index.
    pub fn inspect(&self, index: u8) -> Option<IfaceReport> {
        let slot = self.ifaces.get(index as usize)?;
        Some(IfaceReport {
            active: slot.state.active,
            command: slot.state.local.command,
            status: slot.state.local.status,
            code: slot.state.local.code,
        })
    }
}
