//! The 32-byte parameter block.
//!
//! ```text
//! +0  Token     u8
//! +1  Status    u8
//! +2  Interface u8
//! +3  Command   u8
//! +4  Code      u32
//! +8  P6        u32
//! +12 P5        u32
//! +16 P4        u32
//! +20 P3        u32
//! +24 P2        u32
//! +28 P1        u32
//! ```
//!
//! P1..P6 sit in reverse order so a future revision can repurpose P6
//! without moving the parameters existing hosts use most.

use crate::common::{Param, Status, Token};
use crate::mem::SharedMem;

/// Size of the block, in bytes.
pub const SIZE: u32 = 32;

const TOKEN: u32 = 0;
const STATUS: u32 = 1;
const INTERFACE: u32 = 2;
const COMMAND: u32 = 3;
const CODE: u32 = 4;
const P6: u32 = 8;
const P5: u32 = 12;
const P4: u32 = 16;
const P3: u32 = 20;
const P2: u32 = 24;
const P1: u32 = 28;

pub fn read_token(mem: &dyn SharedMem, base: u32) -> Option<Token> {
    Token::from_u8(mem.read_u8(base + TOKEN))
}

pub fn read_status_raw(mem: &dyn SharedMem, base: u32) -> u8 {
    mem.read_u8(base + STATUS)
}

/// Decode the whole block. `None` if the token or status byte is corrupt.
pub fn read(mem: &dyn SharedMem, base: u32) -> Option<Param> {
    Some(Param {
        token: Token::from_u8(mem.read_u8(base + TOKEN))?,
        status: Status::from_u8(mem.read_u8(base + STATUS))?,
        interface: mem.read_u8(base + INTERFACE),
        command: mem.read_u8(base + COMMAND),
        code: mem.read_u32(base + CODE),
        p6: mem.read_u32(base + P6),
        p5: mem.read_u32(base + P5),
        p4: mem.read_u32(base + P4),
        p3: mem.read_u32(base + P3),
        p2: mem.read_u32(base + P2),
        p1: mem.read_u32(base + P1),
    })
}

pub fn write_status(mem: &mut dyn SharedMem, base: u32, status: Status) {
    mem.write_u8(base + STATUS, status as u8);
}

/// Write every field except the token. The caller publishes the result by
/// barriering and flipping the token afterwards.
pub fn write_result(mem: &mut dyn SharedMem, base: u32, p: &Param) {
    mem.write_u8(base + STATUS, p.status as u8);
    mem.write_u8(base + INTERFACE, p.interface);
    mem.write_u8(base + COMMAND, p.command);
    mem.write_u32(base + CODE, p.code);
    mem.write_u32(base + P6, p.p6);
    mem.write_u32(base + P5, p.p5);
    mem.write_u32(base + P4, p.p4);
    mem.write_u32(base + P3, p.p3);
    mem.write_u32(base + P2, p.p2);
    mem.write_u32(base + P1, p.p1);
}

pub fn write_token(mem: &mut dyn SharedMem, base: u32, token: Token) {
    mem.write_u8(base + TOKEN, token as u8);
}

/// Zero-initialize the block: payload first, token byte last.
pub fn clear(mem: &mut dyn SharedMem, base: u32) {
    for off in STATUS..SIZE {
        mem.write_u8(base + off, 0);
    }
    mem.barrier();
    mem.write_u8(base + TOKEN, Token::Host as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::SliceMem;

    #[test]
    fn field_offsets_and_endianness() {
        let mut ram = [0u8; 32];
        let mut mem = SliceMem::new(0x2000_0000, &mut ram);
        let p = Param {
            token: Token::Host,
            status: Status::Ok,
            interface: 2,
            command: 0x10,
            code: 0x0002_0000,
            p1: 0x1122_3344,
            p2: 0xAABB_CCDD,
            p3: 0,
            p4: 0,
            p5: 0,
            p6: 0x5566_7788,
        };
        write_result(&mut mem, 0x2000_0000, &p);
        drop(mem);

        assert_eq!(ram[1], 0x40); // status
        assert_eq!(ram[2], 2); // interface
        assert_eq!(ram[3], 0x10); // command
        assert_eq!(&ram[4..8], &[0x00, 0x00, 0x02, 0x00]); // code, LE
        assert_eq!(&ram[8..12], &[0x88, 0x77, 0x66, 0x55]); // P6 at +8
        assert_eq!(&ram[24..28], &[0xDD, 0xCC, 0xBB, 0xAA]); // P2 at +24
        assert_eq!(&ram[28..32], &[0x44, 0x33, 0x22, 0x11]); // P1 at +28
    }

    #[test]
    fn roundtrip() {
        let mut ram = [0u8; 32];
        let mut mem = SliceMem::new(0, &mut ram);
        let p = Param {
            status: Status::ErrExecution,
            command: 0xAB,
            code: 7,
            p4: 42,
            ..Param::default()
        };
        write_result(&mut mem, 0, &p);
        write_token(&mut mem, 0, Token::Target);

        let back = read(&mem, 0).unwrap();
        assert_eq!(back.token, Token::Target);
        assert_eq!(back.status, Status::ErrExecution);
        assert_eq!(back.command, 0xAB);
        assert_eq!(back.code, 7);
        assert_eq!(back.p4, 42);
    }

    #[test]
    fn corrupt_status_rejected() {
        let mut ram = [0u8; 32];
        ram[1] = 0x3F; // reserved handshake value
        let mem = SliceMem::new(0, &mut ram);
        assert!(read(&mem, 0).is_none());
    }

    #[test]
    fn clear_publishes_idle_under_host_token() {
        let mut ram = [0xFFu8; 32];
        let mut mem = SliceMem::new(0, &mut ram);
        clear(&mut mem, 0);
        assert_eq!(read_token(&mem, 0), Some(Token::Host));
        assert_eq!(read_status_raw(&mem, 0), Status::Idle as u8);
    }
}
