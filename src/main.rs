use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use log::{error, info};

use alignsub::batch::config::{RunConfig, DEFAULT_FIJI_HOME, DEFAULT_MEM_GB, DEFAULT_VMEM_GB, DEFAULT_WALLTIME};
use alignsub::batch::run::{Orchestrator, RunSummary};
use alignsub::pbs::client::SubmissionClient;
use alignsub::pbs::qsub::QsubManager;
use alignsub::transform::TransformationType;

/// Submit Fiji stack alignment jobs to a TORQUE/PBS cluster
#[derive(Parser)]
#[command(name = "alignsub", version)]
struct Cli {
    /// Log debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Submit one alignment job for each TIFF stack in a directory
    Single {
        #[command(flatten)]
        job: JobOptions,
    },
    /// Submit one job for each background (B) and glomeruli (G) stack pair in a directory
    ///
    /// Stacks must be named ID_CHANNEL[_OPTIONAL...].tif. The B channel is aligned and the same
    /// transformations are applied to the G channel.
    Paired {
        #[command(flatten)]
        job: JobOptions,

        /// Transformation type, names with spaces must be quoted
        #[arg(short, long, value_enum, default_value_t = TransformationType::RigidBody)]
        transformation: TransformationType,
    },
}

#[derive(Args)]
struct JobOptions {
    /// Walltime for each job
    #[arg(short, long, value_name = "HH:MM:SS", default_value = DEFAULT_WALLTIME)]
    walltime: String,

    /// Physical memory limit for each job in gigabytes
    #[arg(short, long, value_name = "GB", default_value_t = DEFAULT_MEM_GB)]
    mem: u32,

    /// Virtual memory limit for each job in gigabytes
    #[arg(short, long, value_name = "GB", default_value_t = DEFAULT_VMEM_GB)]
    vmem: u32,

    /// Fiji installation directory
    #[arg(long, default_value = DEFAULT_FIJI_HOME)]
    fiji_home: PathBuf,

    /// Alignment macro, defaults to the mode's standard macro
    #[arg(long = "macro", value_name = "PATH")]
    align_macro: Option<PathBuf>,

    /// Render job scripts and log them without submitting
    #[arg(long)]
    dry_run: bool,

    /// Directory of TIFF stacks
    dir: PathBuf,
}

impl JobOptions {
    fn config(&self) -> RunConfig {
        RunConfig {
            walltime: self.walltime.clone(),
            mem_gb: self.mem,
            vmem_gb: self.vmem,
            fiji_home: self.fiji_home.clone(),
            dry_run: self.dry_run,
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(parse_failure_code(&err));
        }
    };

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    info!("alignsub {} starting up", env!("CARGO_PKG_VERSION"));

    match run(cli.mode) {
        Ok(summary) => {
            if let Err(err) = report(&summary, &mut io::stdout().lock()) {
                error!("Can't write job ids: {err}");
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

/// Help and version exit 0, bad or missing arguments 1, anything else clap rejects 2
fn parse_failure_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        ErrorKind::MissingRequiredArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        | ErrorKind::MissingSubcommand
        | ErrorKind::InvalidValue
        | ErrorKind::ValueValidation => 1,
        _ => 2,
    }
}

fn run(mode: Mode) -> anyhow::Result<RunSummary> {
    let client = SubmissionClient::new(QsubManager::new());
    let summary = match mode {
        Mode::Single { job } => {
            let mut config = job.config();
            if let Some(align_macro) = &job.align_macro {
                config.single_macro = align_macro.clone();
            }
            Orchestrator::new(config, client).run_single(&job.dir)
                .with_context(|| batch_failed(&job.dir))?
        }
        Mode::Paired { job, transformation } => {
            let mut config = job.config();
            config.transformation = transformation;
            if let Some(align_macro) = &job.align_macro {
                config.paired_macro = align_macro.clone();
            }
            info!("MultiStackReg batch submission, transformation {transformation}");
            Orchestrator::new(config, client).run_paired(&job.dir)
                .with_context(|| batch_failed(&job.dir))?
        }
    };
    Ok(summary)
}

fn batch_failed(dir: &Path) -> String {
    format!("No jobs submitted for {}", dir.display())
}

/// Skips and failures were logged as they happened, only job ids and totals remain
fn report(summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
    for (label, job_id) in &summary.submitted {
        writeln!(out, "{label}\t{job_id}")?;
    }
    info!("{} submitted, {} failed, {} skipped, {} rendered only",
        summary.submitted.len(), summary.failed.len(), summary.skipped.len(), summary.rendered.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use alignsub::error::{JobError, RunError, TemplateError};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_paired() {
        let cli = Cli::try_parse_from([
            "alignsub", "paired", "-w", "2:00:00", "-m", "8", "-t", "Scaled Rotation", "stacks",
        ]).unwrap();
        match cli.mode {
            Mode::Paired { job, transformation } => {
                assert_eq!(transformation, TransformationType::ScaledRotation);
                let config = job.config();
                assert_eq!(config.walltime, "2:00:00");
                assert_eq!(config.mem_gb, 8);
                assert_eq!(config.vmem_gb, DEFAULT_VMEM_GB);
                assert_eq!(job.dir, PathBuf::from("stacks"));
            }
            Mode::Single { .. } => panic!("expected paired mode"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let code = |args: &[&str]| parse_failure_code(&Cli::try_parse_from(args).err().unwrap());
        assert_eq!(code(&["alignsub", "single"]), 1);
        assert_eq!(code(&["alignsub", "paired", "-t", "Shear", "stacks"]), 1);
        assert_eq!(code(&["alignsub", "single", "--bogus", "stacks"]), 2);
        assert_eq!(code(&["alignsub", "--help"]), 0);
    }

    #[test]
    fn test_report_prints_only_job_ids() {
        let summary = RunSummary {
            submitted: vec![("K1".to_string(), "17.pbs-server".to_string())],
            failed: vec![("K2".to_string(), JobError::Template(TemplateError::MissingToken("HEAP".to_string())))],
            skipped: vec![PathBuf::from("K3_B.tif")],
            rendered: vec![],
        };
        let mut out = Vec::new();
        report(&summary, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "K1\t17.pbs-server\n");
    }

    #[test]
    fn test_run_error_kind() {
        let err = RunError::InvalidArgument("stacks is not a directory".to_string());
        let err = anyhow::Error::new(err).context(batch_failed(Path::new("stacks")));
        assert!(err.downcast_ref::<RunError>().is_some());
        assert_eq!(format!("{err:#}"), "No jobs submitted for stacks: stacks is not a directory");
    }
}
