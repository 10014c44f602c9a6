use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Optional job attributes, in the order they're sent to the resource manager
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobAttribute {
    Name,
    Walltime,
    Nodes,
    StdoutPath,
    StderrPath,
    DependencyList,
    MailOptions,
    Mem,
    Vmem,
}

impl JobAttribute {
    pub const COUNT: usize = 9;

    /// Canonical submission order
    pub const ALL: [JobAttribute; JobAttribute::COUNT] = [
        JobAttribute::Name,
        JobAttribute::Walltime,
        JobAttribute::Nodes,
        JobAttribute::StdoutPath,
        JobAttribute::StderrPath,
        JobAttribute::DependencyList,
        JobAttribute::MailOptions,
        JobAttribute::Mem,
        JobAttribute::Vmem,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for JobAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobAttribute::Name => write!(f, "name"),
            JobAttribute::Walltime => write!(f, "walltime"),
            JobAttribute::Nodes => write!(f, "nodes"),
            JobAttribute::StdoutPath => write!(f, "stdout"),
            JobAttribute::StderrPath => write!(f, "stderr"),
            JobAttribute::DependencyList => write!(f, "depend"),
            JobAttribute::MailOptions => write!(f, "mail"),
            JobAttribute::Mem => write!(f, "mem"),
            JobAttribute::Vmem => write!(f, "vmem"),
        }
    }
}

/// A TORQUE job waiting to be submitted
///
/// Holds the path of a rendered job script and whichever optional attributes were explicitly
/// set. An attribute set to an empty string is unset. [`JobDescriptor::attribute_count`] is
/// counted from the stored values on every call, so it can't drift from them.
///
/// The descriptor doesn't own the script file, deleting it is up to the caller.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    script: PathBuf,
    workdir: Option<PathBuf>,
    attributes: [Option<String>; JobAttribute::COUNT],
    job_id: Option<String>,
}

impl JobDescriptor {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        JobDescriptor {
            script: script.into(),
            workdir: None,
            attributes: Default::default(),
            job_id: None,
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Remote job identifier, present after a successful submission
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub(crate) fn set_job_id(&mut self, job_id: String) {
        self.job_id = Some(job_id);
    }

    /// Working directory of the job, resolved to the current directory on first use
    ///
    /// Once resolved the value sticks, even if the process changes directory later.
    pub fn working_directory(&mut self) -> io::Result<&Path> {
        let workdir = match self.workdir.take() {
            Some(workdir) => workdir,
            None => env::current_dir()?,
        };
        Ok(self.workdir.insert(workdir).as_path())
    }

    pub fn set_working_directory(&mut self, workdir: impl Into<PathBuf>) {
        self.workdir = Some(workdir.into());
    }

    pub fn get(&self, attr: JobAttribute) -> Option<&str> {
        self.attributes[attr.index()].as_deref()
    }

    pub fn is_set(&self, attr: JobAttribute) -> bool {
        self.get(attr).is_some()
    }

    pub fn set(&mut self, attr: JobAttribute, value: impl Into<String>) {
        let value = value.into();
        self.attributes[attr.index()] = if value.is_empty() { None } else { Some(value) };
    }

    pub fn clear(&mut self, attr: JobAttribute) {
        self.attributes[attr.index()] = None;
    }

    /// Number of optional attributes currently set
    pub fn attribute_count(&self) -> usize {
        self.attributes.iter().filter(|v| v.is_some()).count()
    }

    /// Set attributes with their values, in canonical order
    pub fn attributes(&self) -> impl Iterator<Item = (JobAttribute, &str)> + '_ {
        JobAttribute::ALL.into_iter()
            .filter_map(move |attr| self.get(attr).map(|value| (attr, value)))
    }

    pub fn with(mut self, attr: JobAttribute, value: impl Into<String>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with(JobAttribute::Name, name)
    }

    pub fn with_walltime(self, walltime: impl Into<String>) -> Self {
        self.with(JobAttribute::Walltime, walltime)
    }

    pub fn with_nodes(self, nodes: impl Into<String>) -> Self {
        self.with(JobAttribute::Nodes, nodes)
    }

    pub fn with_mail_options(self, mail_options: impl Into<String>) -> Self {
        self.with(JobAttribute::MailOptions, mail_options)
    }

    pub fn with_mem(self, mem: impl Into<String>) -> Self {
        self.with(JobAttribute::Mem, mem)
    }

    pub fn with_vmem(self, vmem: impl Into<String>) -> Self {
        self.with(JobAttribute::Vmem, vmem)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(JobAttribute::Name)
    }

    pub fn walltime(&self) -> Option<&str> {
        self.get(JobAttribute::Walltime)
    }

    pub fn nodes(&self) -> Option<&str> {
        self.get(JobAttribute::Nodes)
    }

    pub fn stdout_path(&self) -> Option<&str> {
        self.get(JobAttribute::StdoutPath)
    }

    pub fn stderr_path(&self) -> Option<&str> {
        self.get(JobAttribute::StderrPath)
    }

    pub fn dependency_list(&self) -> Option<&str> {
        self.get(JobAttribute::DependencyList)
    }

    pub fn mail_options(&self) -> Option<&str> {
        self.get(JobAttribute::MailOptions)
    }

    pub fn mem(&self) -> Option<&str> {
        self.get(JobAttribute::Mem)
    }

    pub fn vmem(&self) -> Option<&str> {
        self.get(JobAttribute::Vmem)
    }

    pub fn set_stdout_path(&mut self, path: impl Into<String>) {
        self.set(JobAttribute::StdoutPath, path)
    }

    pub fn set_stderr_path(&mut self, path: impl Into<String>) {
        self.set(JobAttribute::StderrPath, path)
    }

    pub fn set_dependency_list(&mut self, dependency_list: impl Into<String>) {
        self.set(JobAttribute::DependencyList, dependency_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_count_transitions() {
        let mut job = JobDescriptor::new("job.sh");
        assert_eq!(job.attribute_count(), 0);

        // unset -> empty
        job.set(JobAttribute::Name, "");
        assert_eq!(job.attribute_count(), 0);

        job.set(JobAttribute::Name, "align_a.tif");
        assert_eq!(job.attribute_count(), 1);

        // set -> set again
        job.set(JobAttribute::Name, "align_b.tif");
        assert_eq!(job.attribute_count(), 1);
        assert_eq!(job.name(), Some("align_b.tif"));

        // set -> empty
        job.set(JobAttribute::Name, "");
        assert_eq!(job.attribute_count(), 0);
        assert_eq!(job.name(), None);

        job.clear(JobAttribute::Name);
        assert_eq!(job.attribute_count(), 0);
    }

    #[test]
    fn test_builder() {
        let job = JobDescriptor::new("job.sh")
            .with_name("align_K1")
            .with_walltime("4:00:00")
            .with_nodes("1:ppn=8")
            .with_mail_options("ae")
            .with_mem("14gb")
            .with_vmem("25gb");

        assert_eq!(job.attribute_count(), 6);
        let attrs: Vec<JobAttribute> = job.attributes().map(|(attr, _)| attr).collect();
        assert_eq!(attrs, vec![
            JobAttribute::Name,
            JobAttribute::Walltime,
            JobAttribute::Nodes,
            JobAttribute::MailOptions,
            JobAttribute::Mem,
            JobAttribute::Vmem,
        ]);
        assert!(job.job_id().is_none());
    }

    #[test]
    fn test_working_directory() {
        let mut job = JobDescriptor::new("job.sh");
        let cwd = env::current_dir().unwrap();
        assert_eq!(job.working_directory().unwrap(), cwd.as_path());

        job.set_working_directory("/scratch/run");
        assert_eq!(job.working_directory().unwrap(), Path::new("/scratch/run"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(JobAttribute, String),
        Clear(JobAttribute),
    }

    fn arb_attribute() -> impl Strategy<Value = JobAttribute> {
        (0..JobAttribute::COUNT).prop_map(|i| JobAttribute::ALL[i])
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (arb_attribute(), prop_oneof![Just(String::new()), "[a-z0-9:=]{1,8}"])
                .prop_map(|(attr, value)| Op::Set(attr, value)),
            arb_attribute().prop_map(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn test_count_matches_set_attributes(ops in prop::collection::vec(arb_op(), 0..64)) {
            let mut job = JobDescriptor::new("job.sh");
            for op in ops {
                match op {
                    Op::Set(attr, value) => job.set(attr, value),
                    Op::Clear(attr) => job.clear(attr),
                }
                let non_empty = JobAttribute::ALL.iter()
                    .filter(|attr| job.get(**attr).map_or(false, |v| !v.is_empty()))
                    .count();
                prop_assert_eq!(job.attribute_count(), non_empty);
            }
        }
    }
}
