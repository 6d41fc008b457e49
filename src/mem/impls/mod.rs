mod raw;
mod slice;

pub use raw::RawMem;
pub use slice::SliceMem;
