//! Render Fiji stack alignment job scripts and submit them to a TORQUE/PBS cluster

pub mod batch;
pub mod error;
pub mod pbs;
pub mod template;
pub mod transform;
