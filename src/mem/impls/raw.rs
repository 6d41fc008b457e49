use core::sync::atomic::{compiler_fence, fence, Ordering};

use crate::mem::SharedMem;

/// [`SharedMem`] performing volatile accesses to absolute target addresses.
///
/// This is the implementation a real firmware uses: the shared regions are
/// plain RAM that the debug probe reads and writes behind the CPU's back, so
/// every access must be volatile and every hand-off fenced.
///
/// `barrier` issues the strongest fence the `core` atomics API expresses. On
/// targets where that does not lower to a full `DMB; DSB; ISB` sequence,
/// wrap `RawMem` in a newtype that overrides [`SharedMem::barrier`] with the
/// platform intrinsic.
pub struct RawMem {
    _priv: (),
}

impl RawMem {
    /// Create an accessor for absolute addresses.
    ///
    /// # Safety
    ///
    /// Every address the dispatcher is configured with (the [`MemMap`]
    /// regions) must point to readable, writable RAM that outlives the
    /// accessor, and nothing else in the firmware may write those regions
    /// while the dispatcher runs.
    ///
    /// [`MemMap`]: crate::common::MemMap
    pub unsafe fn new() -> RawMem {
        RawMem { _priv: () }
    }
}

impl SharedMem for RawMem {
    fn read_u8(&self, addr: u32) -> u8 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u8) }
    }

    fn write_u8(&mut self, addr: u32, val: u8) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u8, val) }
    }

    fn read_u32(&self, addr: u32) -> u32 {
        // descriptor word fields are 4-aligned, so a single volatile word
        // access is safe and keeps SWD traffic coherent
        if addr % 4 == 0 {
            let v = unsafe { core::ptr::read_volatile(addr as usize as *const u32) };
            u32::from_le(v)
        } else {
            let mut bytes = [0; 4];
            self.read_bytes(addr, &mut bytes);
            u32::from_le_bytes(bytes)
        }
    }

    fn write_u32(&mut self, addr: u32, val: u32) {
        if addr % 4 == 0 {
            unsafe { core::ptr::write_volatile(addr as usize as *mut u32, val.to_le()) }
        } else {
            self.write_bytes(addr, &val.to_le_bytes());
        }
    }

    fn barrier(&mut self) {
        compiler_fence(Ordering::SeqCst);
        fence(Ordering::SeqCst);
    }
}
