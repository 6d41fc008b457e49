//! Tick internals: parameter-block servicing, handler advancement, and
//! buffer reclamation.

use log::*;

use crate::common::{BufferStatus, Command, Status, Token, HANDLER_TIMEOUT_MS, VERSION};
use crate::iface::{CmdError, CmdResult, Interface, Step};
use crate::mem::SharedMem;
use crate::protocol::{bdt, param};
use crate::time::Clock;

use super::exchange::Exchange;
use super::pool;
use super::{Iface, IfaceState, MemProg};

/// What parameter-block servicing accomplished this tick.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Serviced {
    Nothing,
    Ingested,
    Posted,
}

impl<'a, M: SharedMem, C: Clock> MemProg<'a, M, C> {
    /// One scheduler tick. Call this from the firmware's idle loop.
    ///
    /// In order: service the parameter block (ingest a new command or post
    /// a completed result, if the target holds the token); advance every
    /// running handler by at most one invocation, stopping once
    /// [`HANDLER_TIMEOUT_MS`] has elapsed; hand unused and orphaned
    /// buffers back to the host.
    ///
    /// Never blocks. If the host holds the parameter-block token this
    /// tick, command servicing simply waits for a later tick; data
    /// buffers keep flowing regardless, since each descriptor carries its
    /// own token.
    pub fn run_tick(&mut self) {
        self.dbg_tick(true);
        match self.service_param() {
            Serviced::Ingested => self.dbg_mark(b'C'),
            Serviced::Posted => self.dbg_mark(b'R'),
            Serviced::Nothing => {}
        }
        self.dbg_handlers(true);
        self.advance_handlers();
        self.dbg_handlers(false);
        self.pass_buffers();
        self.dbg_tick(false);
    }

    /// Shared-region bring-up, run once from the builder: clear every
    /// descriptor, assign interface indices in registration order, run the
    /// drivers' `init` hooks, then publish the parameter block
    /// (`Status = IDLE`, token to the host).
    pub(crate) fn static_init(&mut self) {
        let Self {
            mem, map, ifaces, ..
        } = self;
        let mem: &mut dyn SharedMem = mem;

        for i in 0..map.num_buffers {
            bdt::clear(mem, map.bdt_addr(i));
        }
        for (i, slot) in ifaces.iter_mut().enumerate() {
            slot.state.index = i as u8;
            slot.driver.init();
        }
        param::clear(mem, map.param_base);
        info!(
            "ready: {} interfaces, {} x {}-byte buffers",
            ifaces.len(),
            map.num_buffers,
            map.buffer_size
        );
    }

    fn service_param(&mut self) -> Serviced {
        let Self {
            mem, map, ifaces, ..
        } = self;
        let mem: &mut dyn SharedMem = mem;
        let base = map.param_base;

        // non-blocking acquire: not ours this tick, try again next tick
        if param::read_token(mem, base) != Some(Token::Target) {
            return Serviced::Nothing;
        }
        mem.barrier();

        let raw = param::read_status_raw(mem, base);
        match Status::from_u8(raw) {
            Some(Status::Start) => {
                let p = match param::read(mem, base) {
                    Some(p) => p,
                    None => {
                        warn!("param: corrupt block under START, releasing");
                        release_token(mem, base);
                        return Serviced::Nothing;
                    }
                };
                let slot = match ifaces.get_mut(usize::from(p.interface)) {
                    Some(slot) => slot,
                    None => {
                        error!(
                            "param: command {:#04x} addressed to unknown interface {}",
                            p.command, p.interface
                        );
                        param::write_status(mem, base, Status::ErrParam);
                        release_token(mem, base);
                        return Serviced::Nothing;
                    }
                };
                if slot.state.active {
                    // malformed host traffic: the previous command has not
                    // been read out yet. Leave the block as-is so the host
                    // can observe its mistake.
                    warn!(
                        "iface {}: START while a command is active, ignoring",
                        p.interface
                    );
                    release_token(mem, base);
                    return Serviced::Nothing;
                }

                let state = &mut slot.state;
                state.local = p;
                state.local.code = 0;
                state.active = true;
                state.tx_seq = 0;
                state.rx_seq = 0;
                debug!("iface {}: ingest command {:#04x}", p.interface, p.command);

                match Command::from_u8(p.command) {
                    None => {
                        debug!("iface {}: unassigned opcode {:#04x}", p.interface, p.command);
                        state.local.status = Status::ErrImplementation;
                    }
                    // answered by the core itself, in the same tick
                    Some(Command::QueryCap) => {
                        state.local.code = VERSION;
                        state.local.p1 = map.bdt_base;
                        state.local.p2 = map.buffer_base;
                        state.local.p3 = (u32::from(map.num_buffers) << 24) | map.buffer_size;
                        state.local.status = Status::Ok;
                    }
                    Some(cmd) => {
                        if !has_handler(&mut *slot.driver, cmd) {
                            debug!("iface {}: no handler for {:?}", p.interface, cmd);
                            state.local.status = Status::ErrImplementation;
                        }
                    }
                }

                param::write_status(mem, base, Status::Ack);
                release_token(mem, base);
                Serviced::Ingested
            }

            Some(Status::Idle) => {
                // post at most one completed result per tick
                let mut posted = false;
                for slot in ifaces.iter_mut() {
                    if !slot.state.active || !slot.state.local.status.is_terminal() {
                        continue;
                    }
                    let state = &mut slot.state;
                    if pool::iface_holds_buffers(mem, map, state.index) {
                        warn!(
                            "iface {}: completed while still holding buffers",
                            state.index
                        );
                        let original = state.local.status as u8;
                        state.local.code = (state.local.code << 8) | u32::from(original);
                        state.local.status = Status::Buffer;
                    }
                    debug!(
                        "iface {}: result posted (status {:?}, code {:#010x})",
                        state.index, state.local.status, state.local.code
                    );
                    param::write_result(mem, base, &state.local);
                    state.active = false;
                    posted = true;
                    break;
                }
                release_token(mem, base);
                if posted {
                    Serviced::Posted
                } else {
                    Serviced::Nothing
                }
            }

            Some(Status::Ack) => {
                // our own ack, not yet consumed by the host
                trace!("param: ack still pending on the host");
                release_token(mem, base);
                Serviced::Nothing
            }

            Some(other) => {
                warn!("param: unexpected status {:?} while holding token", other);
                release_token(mem, base);
                Serviced::Nothing
            }

            None => {
                warn!("param: corrupt status byte {:#04x}, releasing", raw);
                release_token(mem, base);
                Serviced::Nothing
            }
        }
    }

    fn advance_handlers(&mut self) {
        let Self {
            mem,
            clock,
            map,
            ifaces,
            ..
        } = self;
        let mem: &mut dyn SharedMem = mem;
        let start = clock.now_ms();

        for slot in ifaces.iter_mut() {
            if !slot.state.active || slot.state.local.status.is_terminal() {
                continue;
            }
            let Iface { driver, state } = slot;
            let IfaceState {
                index,
                local,
                tx_seq,
                rx_seq,
                ..
            } = state;

            let cmd = Command::from_u8(local.command);
            let mut cx = Exchange {
                mem: &mut *mem,
                map,
                index: *index,
                param: &mut *local,
                tx_seq: &mut *tx_seq,
                rx_seq: &mut *rx_seq,
            };
            let result = match cmd {
                Some(cmd) => invoke(&mut **driver, cmd, &mut cx),
                // ingest already stamped ERR_IMPLEMENTATION for these
                None => Err(CmdError::Unimplemented),
            };

            local.status = match result {
                // internal marker: `Status == START` must only be true on
                // the handler's first invocation
                Ok(Step::Pending) => Status::Idle,
                Ok(Step::Done) => Status::Ok,
                Err(e) => {
                    if let Some(code) = e.code() {
                        local.code = code;
                    }
                    e.status()
                }
            };
            if local.status.is_terminal() {
                debug!(
                    "iface {}: handler finished (status {:?})",
                    index, local.status
                );
            }

            let elapsed = clock.now_ms().wrapping_sub(start);
            if elapsed > HANDLER_TIMEOUT_MS {
                if elapsed > 2 * HANDLER_TIMEOUT_MS {
                    warn!("tick overran its handler budget: {}ms", elapsed);
                }
                break;
            }
        }
    }

    /// Return target-held buffers the target has no use for: free grants go
    /// straight back, and anything still held on behalf of an inactive
    /// interface is an orphan left behind by a completed (or buggy)
    /// handler.
    fn pass_buffers(&mut self) {
        let Self {
            mem, map, ifaces, ..
        } = self;
        let mem: &mut dyn SharedMem = mem;

        for i in 0..map.num_buffers {
            let base = map.bdt_addr(i);
            if bdt::read_token(mem, base) != Some(Token::Target) {
                continue;
            }
            mem.barrier();
            match bdt::read_status(mem, base) {
                Some(BufferStatus::Free) => {
                    mem.barrier();
                    bdt::write_token(mem, base, Token::Host);
                }
                Some(_) => {
                    let owner = bdt::read_interface(mem, base);
                    let active = ifaces
                        .get(usize::from(owner))
                        .map(|s| s.state.active)
                        .unwrap_or(false);
                    if !active {
                        warn!("bdt {}: orphaned by iface {}, force-releasing", i, owner);
                        bdt::write_status(mem, base, BufferStatus::Free);
                        mem.barrier();
                        bdt::write_token(mem, base, Token::Host);
                    }
                }
                None => {
                    warn!("bdt {}: corrupt status byte, force-releasing", i);
                    bdt::write_status(mem, base, BufferStatus::Free);
                    mem.barrier();
                    bdt::write_token(mem, base, Token::Host);
                }
            }
        }
    }

    fn dbg_tick(&mut self, _high: bool) {
        #[cfg(feature = "debug-io")]
        if let Some(d) = self.debug.as_deref_mut() {
            d.pin(crate::debug::PIN_TICK, _high);
        }
    }

    fn dbg_handlers(&mut self, _high: bool) {
        #[cfg(feature = "debug-io")]
        if let Some(d) = self.debug.as_deref_mut() {
            d.pin(crate::debug::PIN_HANDLERS, _high);
        }
    }

    fn dbg_mark(&mut self, _c: u8) {
        #[cfg(feature = "debug-io")]
        if let Some(d) = self.debug.as_deref_mut() {
            d.putc(_c);
        }
    }
}

fn release_token(mem: &mut dyn SharedMem, base: u32) {
    mem.barrier();
    param::write_token(mem, base, Token::Host);
}

fn has_handler(driver: &mut dyn Interface, cmd: Command) -> bool {
    match cmd {
        Command::MassErase => driver.support_mass_erase().is_some(),
        Command::EraseRange => driver.support_erase_range().is_some(),
        Command::ProgVerify => driver.support_prog_verify().is_some(),
        Command::Crc => driver.support_crc().is_some(),
        Command::Read => driver.support_read().is_some(),
        Command::QueryCap => true,
        Command::Custom(_) => driver.support_custom_cmd().is_some(),
    }
}

fn invoke(driver: &mut dyn Interface, cmd: Command, cx: &mut Exchange<'_>) -> CmdResult<Step> {
    match cmd {
        Command::MassErase => match driver.support_mass_erase() {
            Some(ops) => ops.mass_erase(cx),
            None => Err(CmdError::Unimplemented),
        },
        Command::EraseRange => {
            let (start, length) = (cx.param().p1, cx.param().p2);
            match driver.support_erase_range() {
                Some(ops) => ops.erase_range(start, length, cx),
                None => Err(CmdError::Unimplemented),
            }
        }
        Command::ProgVerify => match driver.support_prog_verify() {
            Some(ops) => ops.prog_verify(cx),
            None => Err(CmdError::Unimplemented),
        },
        Command::Crc => match driver.support_crc() {
            Some(ops) => ops.crc(cx),
            None => Err(CmdError::Unimplemented),
        },
        Command::Read => match driver.support_read() {
            Some(ops) => ops.read(cx),
            None => Err(CmdError::Unimplemented),
        },
        Command::Custom(op) => match driver.support_custom_cmd() {
            Some(ops) => ops.custom_cmd(op, cx),
            None => Err(CmdError::Unimplemented),
        },
        // answered at ingest; reaching here means the working status was
        // tampered with; finish again, harmlessly
        Command::QueryCap => Ok(Step::Done),
    }
}
