use std::path::PathBuf;

use crate::template::script::FijiSetup;
use crate::transform::TransformationType;

pub const DEFAULT_WALLTIME: &str = "4:00:00";
pub const DEFAULT_MEM_GB: u32 = 14;
pub const DEFAULT_VMEM_GB: u32 = 25;
pub const DEFAULT_FIJI_HOME: &str = "/opt/compsci/Fiji/Fiji.app";
pub const DEFAULT_SINGLE_MACRO: &str = "/opt/compsci/Fiji/macros/kidneyalign.ijm";
pub const DEFAULT_PAIRED_MACRO: &str = "/opt/compsci/Fiji/macros/multi_channel.ijm";
pub const DEFAULT_NODES: &str = "1:ppn=8";
/// Mail on abort and on end
pub const DEFAULT_MAIL_OPTIONS: &str = "ae";
pub const FIRST_DISPLAY: u32 = 1000;

/// Share of the job's physical memory given to the Java heap
const HEAP_FRACTION: f64 = 0.93;

/// Settings for one batch run, filled in from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub walltime: String,
    pub mem_gb: u32,
    pub vmem_gb: u32,
    pub fiji_home: PathBuf,
    pub single_macro: PathBuf,
    pub paired_macro: PathBuf,
    pub nodes: String,
    pub mail_options: String,
    pub transformation: TransformationType,
    /// Xvfb display number of the first paired job
    pub first_display: u32,
    /// Render scripts without submitting them
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            walltime: DEFAULT_WALLTIME.to_string(),
            mem_gb: DEFAULT_MEM_GB,
            vmem_gb: DEFAULT_VMEM_GB,
            fiji_home: PathBuf::from(DEFAULT_FIJI_HOME),
            single_macro: PathBuf::from(DEFAULT_SINGLE_MACRO),
            paired_macro: PathBuf::from(DEFAULT_PAIRED_MACRO),
            nodes: DEFAULT_NODES.to_string(),
            mail_options: DEFAULT_MAIL_OPTIONS.to_string(),
            transformation: TransformationType::default(),
            first_display: FIRST_DISPLAY,
            dry_run: false,
        }
    }
}

impl RunConfig {
    /// Java max heap in megabytes, slightly below the physical memory limit
    pub fn heap_mb(&self) -> u32 {
        heap_megabytes(self.mem_gb)
    }

    /// `mem` resource value
    pub fn mem(&self) -> String {
        format!("{}gb", self.mem_gb)
    }

    /// `vmem` resource value
    pub fn vmem(&self) -> String {
        format!("{}gb", self.vmem_gb)
    }

    pub fn single_fiji(&self) -> FijiSetup {
        FijiSetup { home: self.fiji_home.clone(), align_macro: self.single_macro.clone() }
    }

    pub fn paired_fiji(&self) -> FijiSetup {
        FijiSetup { home: self.fiji_home.clone(), align_macro: self.paired_macro.clone() }
    }
}

pub fn heap_megabytes(mem_gb: u32) -> u32 {
    (f64::from(mem_gb) * 1024.0 * HEAP_FRACTION).floor() as u32
}
