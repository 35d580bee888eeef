//! Command handlers, one module per top-level command.

pub mod artifacts;
pub mod pins;
pub mod version;
