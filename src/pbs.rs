//! TORQUE/PBS job submission
//!
//! A [`job::JobDescriptor`] collects the optional scheduling attributes of one job. The
//! [`client::SubmissionClient`] turns the set attributes into the ordered attribute list the
//! resource manager expects and drives the connect, submit, disconnect exchange.

/// Job descriptors and their optional attributes
pub mod job;

/// Protocol attribute names and the fixed size attribute list
pub mod attribute;

/// The resource manager client contract
pub mod manager;

/// Resource manager backed by the qsub command
pub mod qsub;

/// Submitting host environment exported to jobs
pub mod env;

pub mod client;
