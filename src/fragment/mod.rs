//! Fragment codec
//!
//! Splits payloads too large for a single backend slot into indexed
//! fragments plus a metadata record, and reassembles them on read.

mod codec;
mod types;

pub use codec::{split_code_points, FragmentCodec};
pub use types::*;
