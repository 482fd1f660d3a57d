//! MBAP framing and length-delimited reads

/// MBAP header encoding and reply validation
pub mod frame;
pub(crate) mod reader;
