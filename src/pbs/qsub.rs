use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};

use crate::pbs::attribute::{Attribute, ATTR_DEPEND, ATTR_E, ATTR_L, ATTR_M, ATTR_N, ATTR_O, ATTR_V};
use crate::pbs::manager::{Connection, ManagerStatus, ResourceManager};

/// TORQUE keeps the default server name here
static SERVER_NAME_FILE: &str = "/var/spool/torque/server_name";

/// Resource manager backed by the `qsub` command line client
///
/// qsub doesn't keep a session open, so a connection only remembers which server to send to.
/// Each submit runs qsub once and blocks until it exits.
pub struct QsubManager {
    program: PathBuf,
    server: Option<(i32, String)>,
    next_handle: i32,
    status: ManagerStatus,
}

impl QsubManager {
    pub fn new() -> Self {
        QsubManager::with_program("qsub")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        QsubManager { program: program.into(), server: None, next_handle: 0, status: ManagerStatus::ok() }
    }

    fn fail(&mut self, code: i32, message: impl Into<String>) {
        self.status = ManagerStatus { code, message: message.into() };
    }
}

impl Default for QsubManager {
    fn default() -> Self {
        QsubManager::new()
    }
}

impl ResourceManager for QsubManager {
    fn default_server(&self) -> String {
        if let Ok(server) = env::var("PBS_DEFAULT") {
            if !server.is_empty() {
                return server;
            }
        }
        fs::read_to_string(SERVER_NAME_FILE)
            .ok()
            .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
            .unwrap_or_default()
    }

    fn connect(&mut self, server: &str) -> Connection {
        self.next_handle += 1;
        self.server = Some((self.next_handle, server.to_string()));
        self.status = ManagerStatus::ok();
        debug!("Connection {} bound to server '{}'", self.next_handle, server);
        Connection(self.next_handle)
    }

    fn submit(&mut self, connection: &Connection, attributes: &[Attribute], script: &Path,
              queue: Option<&str>, destination: Option<&str>) -> Option<String> {
        let server = match &self.server {
            Some((handle, server)) if *handle == connection.0 => server.clone(),
            _ => {
                self.fail(-1, format!("connection {} is not open", connection.0));
                return None;
            }
        };

        let destination = destination.map(str::to_string)
            .or_else(|| resolve_destination(queue, &server));
        let arguments = qsub_args(attributes, script, destination.as_deref());

        let mut qsub = Command::new(&self.program);
        let cmd = qsub.args(&arguments);
        info!("Running qsub process");
        debug!("{:?}", &cmd);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                warn!("Can't execute {}: {}", self.program.display(), err);
                self.fail(-1, format!("can't execute {}: {}", self.program.display(), err));
                return None;
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            self.fail(output.status.code().unwrap_or(-1), stderr);
            return None;
        }

        let job_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if job_id.is_empty() {
            self.fail(-1, "qsub exited successfully but printed no job id");
            return None;
        }
        self.status = ManagerStatus::ok();
        Some(job_id)
    }

    fn disconnect(&mut self, connection: Connection) {
        if matches!(&self.server, Some((handle, _)) if *handle == connection.0) {
            self.server = None;
        }
    }

    fn error(&self) -> ManagerStatus {
        self.status.clone()
    }
}

/// `queue@server`, `@server` or plain queue, whichever applies
fn resolve_destination(queue: Option<&str>, server: &str) -> Option<String> {
    match (queue, server.is_empty()) {
        (Some(queue), false) => Some(format!("{queue}@{server}")),
        (None, false) => Some(format!("@{server}")),
        (Some(queue), true) => Some(queue.to_string()),
        (None, true) => None,
    }
}

/// Translate an attribute list into qsub command line arguments
pub fn qsub_args(attributes: &[Attribute], script: &Path, destination: Option<&str>) -> Vec<String> {
    let mut args = Vec::with_capacity(attributes.len() * 2 + 3);
    if let Some(destination) = destination {
        args.push("-q".to_string());
        args.push(destination.to_string());
    }
    for attribute in attributes {
        let (flag, value) = match (attribute.name, attribute.resource) {
            (ATTR_L, Some(resource)) => ("-l", format!("{}={}", resource, attribute.value)),
            (ATTR_V, _) => ("-v", attribute.value.clone()),
            (ATTR_N, _) => ("-N", attribute.value.clone()),
            (ATTR_O, _) => ("-o", attribute.value.clone()),
            (ATTR_E, _) => ("-e", attribute.value.clone()),
            (ATTR_DEPEND, _) => ("-W", format!("depend={}", attribute.value)),
            (ATTR_M, _) => ("-m", attribute.value.clone()),
            (name, _) => ("-W", format!("{}={}", name, attribute.value)),
        };
        args.push(flag.to_string());
        args.push(value);
    }
    args.push(script.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbs::job::JobAttribute;

    #[test]
    fn test_qsub_args() {
        let attributes = vec![
            Attribute::new(ATTR_V, "PBS_O_WORKDIR=/scratch,PBS_O_HOST=login1"),
            Attribute::for_job(JobAttribute::Name, "align_K1"),
            Attribute::for_job(JobAttribute::Walltime, "4:00:00"),
            Attribute::for_job(JobAttribute::Nodes, "1:ppn=8"),
            Attribute::for_job(JobAttribute::StdoutPath, "K1.out"),
            Attribute::for_job(JobAttribute::StderrPath, "K1.err"),
            Attribute::for_job(JobAttribute::DependencyList, "afterok:41.pbs"),
            Attribute::for_job(JobAttribute::MailOptions, "ae"),
            Attribute::for_job(JobAttribute::Mem, "14gb"),
            Attribute::for_job(JobAttribute::Vmem, "25gb"),
        ];
        let args = qsub_args(&attributes, Path::new("/tmp/alignsub-x.sh"), Some("@pbs"));
        assert_eq!(args, vec![
            "-q", "@pbs",
            "-v", "PBS_O_WORKDIR=/scratch,PBS_O_HOST=login1",
            "-N", "align_K1",
            "-l", "walltime=4:00:00",
            "-l", "nodes=1:ppn=8",
            "-o", "K1.out",
            "-e", "K1.err",
            "-W", "depend=afterok:41.pbs",
            "-m", "ae",
            "-l", "mem=14gb",
            "-l", "vmem=25gb",
            "/tmp/alignsub-x.sh",
        ]);
    }

    #[test]
    fn test_resolve_destination() {
        assert_eq!(resolve_destination(None, ""), None);
        assert_eq!(resolve_destination(None, "pbs"), Some("@pbs".to_string()));
        assert_eq!(resolve_destination(Some("batch"), "pbs"), Some("batch@pbs".to_string()));
        assert_eq!(resolve_destination(Some("batch"), ""), Some("batch".to_string()));
    }

    #[test]
    fn test_missing_program() {
        let mut manager = QsubManager::with_program("/nonexistent/qsub");
        let connection = manager.connect("");
        let id = manager.submit(&connection, &[], Path::new("job.sh"), None, None);
        assert!(id.is_none());
        assert_eq!(manager.error().code, -1);
        manager.disconnect(connection);
    }

    #[test]
    fn test_submit_without_connection() {
        let mut manager = QsubManager::with_program("/nonexistent/qsub");
        let id = manager.submit(&Connection(7), &[], Path::new("job.sh"), None, None);
        assert!(id.is_none());
        assert!(manager.error().message.contains("not open"));
    }
}
