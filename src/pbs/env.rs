use std::env;
use std::path::Path;
use std::process::Command;

use log::debug;

/// Submitting host details exported to the job as `PBS_O_*` variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Fully qualified name of the submitting host
    pub host: String,
    pub path: Option<String>,
    pub home: Option<String>,
    pub logname: Option<String>,
}

impl HostEnvironment {
    /// Read the host name and PATH, HOME and LOGNAME from the running process
    pub fn capture() -> Self {
        HostEnvironment {
            host: fqdn(),
            path: var("PATH"),
            home: var("HOME"),
            logname: var("LOGNAME"),
        }
    }

    /// The `Variable_List` value for a job running in `workdir`
    ///
    /// Scripts start with `cd $PBS_O_WORKDIR`, so that one is always present. Unset ambient
    /// variables are left out. Values are not escaped: qsub splits the list on `,`, so a
    /// working directory or PATH containing a comma produces a broken list.
    pub fn variable_list(&self, workdir: &Path) -> String {
        let mut vars = vec![
            format!("PBS_O_WORKDIR={}", workdir.display()),
            format!("PBS_O_HOST={}", self.host),
        ];
        let optional = [
            ("PBS_O_PATH", &self.path),
            ("PBS_O_HOME", &self.home),
            ("PBS_O_LOGNAME", &self.logname),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                vars.push(format!("{key}={value}"));
            }
        }
        vars.join(",")
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// `hostname -f`, falling back to the system host name
fn fqdn() -> String {
    let from_command = Command::new("hostname")
        .arg("-f")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).into_owned());

    pick_host(from_command, system_hostname)
}

fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
}

fn pick_host(fqdn: Option<String>, fallback: impl FnOnce() -> Option<String>) -> String {
    let nonblank = |name: String| Some(name.trim().to_string()).filter(|name| !name.is_empty());
    fqdn.and_then(nonblank)
        .or_else(|| {
            debug!("hostname -f failed, using system host name");
            fallback().and_then(nonblank)
        })
        .unwrap_or_else(|| "localhost".to_string())
}
