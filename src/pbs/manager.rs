use std::path::Path;

use crate::pbs::attribute::Attribute;

/// Handle to an open resource manager connection
///
/// Negative handles mean the connect failed, as with `pbs_connect`.
#[derive(Debug, PartialEq, Eq)]
pub struct Connection(pub i32);

impl Connection {
    pub fn is_open(&self) -> bool {
        self.0 >= 0
    }
}

/// Outcome of the last call made against a resource manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStatus {
    /// 0 on success, otherwise the manager's error number
    pub code: i32,
    pub message: String,
}

impl ManagerStatus {
    pub fn ok() -> Self {
        ManagerStatus::default()
    }

    pub fn is_error(&self) -> bool {
        self.code != 0
    }
}

/// Client side of a TORQUE/PBS resource manager
///
/// This is the whole contract the submission client relies on: connect to a server, submit a
/// script with an attribute list, disconnect, and ask what went wrong.
pub trait ResourceManager {
    /// Server used when the caller doesn't name one
    fn default_server(&self) -> String;

    fn connect(&mut self, server: &str) -> Connection;

    /// Submit `script`, returning the new job identifier on success
    fn submit(&mut self, connection: &Connection, attributes: &[Attribute], script: &Path,
              queue: Option<&str>, destination: Option<&str>) -> Option<String>;

    fn disconnect(&mut self, connection: Connection);

    /// Status of the most recent call
    fn error(&self) -> ManagerStatus;
}
