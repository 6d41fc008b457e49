//! Byte-exact codecs for the shared-memory layout.
//!
//! The structures the host and target exchange are a wire format, not
//! native records: the layout must come out byte-identical regardless of
//! what either side's compiler would do to a `struct`. Everything here
//! therefore works on explicit field offsets with little-endian accessors
//! through [`SharedMem`](crate::mem::SharedMem).

pub(crate) mod bdt;
pub(crate) mod param;
