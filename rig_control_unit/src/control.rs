//! Control engine root.
//!
//! Filtered PID, command shaping and settle detection. Each stage is a plain
//! value owned by the control loop.

pub mod output;
pub mod pid;
pub mod settle;
