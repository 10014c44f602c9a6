use std::io::Write;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::batch::config::RunConfig;
use crate::batch::pair::pair_stacks;
use crate::batch::read::get_stack_paths;
use crate::error::{JobError, RunError, TemplateError};
use crate::pbs::client::SubmissionClient;
use crate::pbs::job::JobDescriptor;
use crate::pbs::manager::ResourceManager;
use crate::template::script::{PairedStackScript, SingleStackScript};

/// What happened to each input of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// (input label, job id)
    pub submitted: Vec<(String, String)>,
    pub failed: Vec<(String, JobError)>,
    /// Stacks without a matching channel
    pub skipped: Vec<PathBuf>,
    /// Inputs rendered but not submitted because of `--dry-run`
    pub rendered: Vec<String>,
}

/// Renders and submits one job per input, one at a time
///
/// A failing job is logged and recorded in the summary, the run continues with the next input.
/// Bad input (unreadable directory, badly named stacks) stops the run before anything is
/// submitted.
pub struct Orchestrator<M: ResourceManager> {
    config: RunConfig,
    client: SubmissionClient<M>,
}

impl<M: ResourceManager> Orchestrator<M> {
    pub fn new(config: RunConfig, client: SubmissionClient<M>) -> Self {
        Orchestrator { config, client }
    }

    pub fn client(&self) -> &SubmissionClient<M> {
        &self.client
    }

    /// One alignment job per TIFF stack in `dir`
    pub fn run_single(&mut self, dir: &Path) -> Result<RunSummary, RunError> {
        let stacks = self.scan(dir)?;
        let heap = self.heap();
        let mut summary = RunSummary::default();

        for stack in stacks {
            info!("Creating job to process {}", stack.display());
            let file_name = stack.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let script = SingleStackScript::new(&stack, self.config.single_fiji(), heap).generate();
            self.process(&mut summary, stack.display().to_string(), format!("align_{file_name}"), script);
        }

        Ok(summary)
    }

    /// One multi-channel alignment job per background/glomeruli pair in `dir`
    pub fn run_paired(&mut self, dir: &Path) -> Result<RunSummary, RunError> {
        let stacks = self.scan(dir)?;
        let pairing = pair_stacks(&stacks)?;
        let heap = self.heap();
        let mut summary = RunSummary { skipped: pairing.unmatched, ..Default::default() };

        let mut display = self.config.first_display;
        for pair in pairing.pairs {
            info!("Creating job to process {},{}", pair.background.display(), pair.glomeruli.display());
            let mut script = PairedStackScript::new(&pair.background, &pair.glomeruli,
                                                    self.config.paired_fiji(), heap, display);
            script.transformations_out = Some(format!("{}_transformations.txt", pair.id));
            script.transformation = self.config.transformation;
            display += 1;
            self.process(&mut summary, pair.id.clone(), format!("align_{}", pair.id), script.generate());
        }

        Ok(summary)
    }

    fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, RunError> {
        if !dir.is_dir() {
            return Err(RunError::InvalidArgument(format!("{} is not a directory", dir.display())));
        }
        let display = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        info!("Processing image stacks in {}", display.display());
        let stacks = get_stack_paths(dir)?;
        if stacks.is_empty() {
            warn!("No TIFF stacks found in {}", display.display());
        }
        Ok(stacks)
    }

    fn heap(&self) -> u32 {
        let heap = self.config.heap_mb();
        info!("Setting Fiji Java max heap to {heap}");
        heap
    }

    fn process(&mut self, summary: &mut RunSummary, label: String, name: String,
               script: Result<String, TemplateError>) {
        let script = match script {
            Ok(script) => script,
            Err(err) => {
                error!("Can't render job script for {label}: {err}");
                summary.failed.push((label, err.into()));
                return;
            }
        };

        if self.config.dry_run {
            info!("--dry-run set, not submitting {label}:\n{script}");
            summary.rendered.push(label);
            return;
        }

        match self.submit_script(&name, &script) {
            Ok(job_id) => {
                info!("Submitted {label} with batch id {job_id}");
                summary.submitted.push((label, job_id));
            }
            Err(err) => {
                error!("Submitting {label} failed: {err}");
                summary.failed.push((label, err));
            }
        }
    }

    /// Write the script to a temporary file, submit it and remove the file again
    ///
    /// The file is removed on every path out of here, including errors.
    fn submit_script(&mut self, name: &str, script: &str) -> Result<String, JobError> {
        let mut file = tempfile::Builder::new()
            .prefix("alignsub-")
            .suffix(".sh")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let mut job = JobDescriptor::new(file.path())
            .with_name(name)
            .with_walltime(self.config.walltime.as_str())
            .with_nodes(self.config.nodes.as_str())
            .with_mail_options(self.config.mail_options.as_str())
            .with_mem(self.config.mem())
            .with_vmem(self.config.vmem());

        let result = self.client.submit(&mut job);
        if let Err(err) = file.close() {
            warn!("Can't remove job script {}: {}", job.script().display(), err);
        }
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::pbs::attribute::ATTR_N;
    use crate::pbs::env::HostEnvironment;
    use crate::pbs::manager::mock::RecordingManager;
    use crate::transform::TransformationType;

    fn orchestrator(manager: RecordingManager, config: RunConfig) -> Orchestrator<RecordingManager> {
        let host = HostEnvironment { host: "login1".to_string(), path: None, home: None, logname: None };
        Orchestrator::new(config, SubmissionClient::with_environment(manager, host))
    }

    fn stack_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"II*").unwrap();
        }
        dir
    }

    #[test]
    fn test_run_single() {
        let dir = stack_dir(&["sample.tiff", "other.TIF", "readme.txt"]);
        let mut run = orchestrator(RecordingManager::default(), RunConfig::default());

        let summary = run.run_single(dir.path()).unwrap();
        assert_eq!(summary.submitted.len(), 2);
        assert!(summary.failed.is_empty());

        let manager = run.client().manager();
        assert_eq!(manager.disconnects, 2);
        let sample = &manager.submitted[1];
        assert!(sample.contents.contains("--heap 13332"));
        assert!(sample.contents.contains(":sample-aligned.tiff\""));
        assert_eq!(sample.attributes.len(), 7);
        assert_eq!(sample.attributes[1].name, ATTR_N);
        assert_eq!(sample.attributes[1].value, "align_sample.tiff");
        for submitted in &manager.submitted {
            assert!(!submitted.script.exists());
        }
    }

    #[test]
    fn test_run_paired() {
        let dir = stack_dir(&["K1_B.tif", "K1_G.tif", "K2_B.tif", "K3_G.tif", "K3_B.tif"]);
        let config = RunConfig { transformation: TransformationType::Affine, ..Default::default() };
        let mut run = orchestrator(RecordingManager::default(), config);

        let summary = run.run_paired(dir.path()).unwrap();
        let labels: Vec<&str> = summary.submitted.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["K1", "K3"]);
        assert_eq!(summary.skipped, vec![dir.path().join("K2_B.tif")]);

        let manager = run.client().manager();
        assert_eq!(manager.submitted.len(), 2);
        assert!(manager.submitted[0].contents.contains("DISPLAY=:1000\n"));
        assert!(manager.submitted[1].contents.contains("DISPLAY=:1001\n"));
        assert!(manager.submitted[1].contents.contains(":K3_transformations.txt:Affine\""));
        assert_eq!(manager.submitted[1].attributes[1].value, "align_K3");
    }

    #[test]
    fn test_failed_submission_continues_and_cleans_up() {
        let dir = stack_dir(&["a.tif", "b.tif"]);
        let mut run = orchestrator(RecordingManager::rejecting(15025, "Queue does not exist"),
                                   RunConfig::default());

        let summary = run.run_single(dir.path()).unwrap();
        assert!(summary.submitted.is_empty());
        assert_eq!(summary.failed.len(), 2);
        assert!(matches!(summary.failed[0].1, JobError::Submit(_)));

        let manager = run.client().manager();
        assert_eq!(manager.disconnects, 2);
        for submitted in &manager.submitted {
            assert!(!submitted.contents.is_empty());
            assert!(!submitted.script.exists());
        }
    }

    #[test]
    fn test_bad_pairing_submits_nothing() {
        let dir = stack_dir(&["K1_B.tif", "K1_R.tif"]);
        let mut run = orchestrator(RecordingManager::default(), RunConfig::default());
        assert!(matches!(run.run_paired(dir.path()), Err(RunError::InvalidArgument(_))));
        assert!(run.client().manager().submitted.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let mut run = orchestrator(RecordingManager::default(), RunConfig::default());
        let err = run.run_single(Path::new("/nonexistent/stacks")).unwrap_err();
        assert!(matches!(err, RunError::InvalidArgument(_)));
    }

    #[test]
    fn test_dry_run() {
        let dir = stack_dir(&["a.tif"]);
        let config = RunConfig { dry_run: true, ..Default::default() };
        let mut run = orchestrator(RecordingManager::default(), config);

        let summary = run.run_single(dir.path()).unwrap();
        assert_eq!(summary.rendered.len(), 1);
        assert_eq!(run.client().manager().connects, 0);
    }

    #[test]
    fn test_template_failure_is_per_job() {
        let dir = stack_dir(&["a.tif"]);
        let config = RunConfig { fiji_home: PathBuf::new(), ..Default::default() };
        let mut run = orchestrator(RecordingManager::default(), config);

        let summary = run.run_single(dir.path()).unwrap();
        assert!(matches!(
            &summary.failed[0].1,
            JobError::Template(TemplateError::MissingToken(token)) if token == "FIJI_HOME_DIR"
        ));
        assert!(run.client().manager().submitted.is_empty());
    }
}
