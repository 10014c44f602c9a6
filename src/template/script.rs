use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;

use crate::error::TemplateError;
use crate::template::render::{render, TokenMap};
use crate::transform::TransformationType;

/// included single stack alignment template
static SINGLE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/single.sh"));

/// included channel pair alignment template
static PAIRED: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/paired.sh"));

/// Transformations file written by MultiStackReg when no name is given
pub const DEFAULT_TRANS_OUT: &str = "transformations.txt";

/// Fiji installation and macro used by a rendered script
#[derive(Debug, Clone)]
pub struct FijiSetup {
    pub home: PathBuf,
    pub align_macro: PathBuf,
}

/// Job script aligning one TIFF stack with a Fiji macro
pub struct SingleStackScript {
    pub stack_in: PathBuf,
    pub stack_out: Option<String>,
    pub fiji: FijiSetup,
    /// Java max heap in megabytes
    pub heap: u32,
}

impl SingleStackScript {
    pub fn new(stack_in: impl Into<PathBuf>, fiji: FijiSetup, heap: u32) -> Self {
        SingleStackScript { stack_in: stack_in.into(), stack_out: None, fiji, heap }
    }

    pub fn tokens(&self) -> TokenMap {
        let mut tokens = common_tokens(&self.fiji, self.heap);
        tokens.insert("STACK_IN", display(&self.stack_in));
        let out = self.stack_out.clone()
            .unwrap_or_else(|| derived_output(&self.stack_in, "-aligned"));
        tokens.insert("STACK_OUT", out);
        tokens
    }

    pub fn generate(&self) -> Result<String, TemplateError> {
        info!("Rendering alignment script for {}", self.stack_in.display());
        render(SINGLE, &self.tokens())
    }
}

/// Job script aligning the background channel and applying the same transformations to the
/// glomeruli channel
pub struct PairedStackScript {
    pub background_in: PathBuf,
    pub glomeruli_in: PathBuf,
    pub background_out: Option<String>,
    pub glomeruli_out: Option<String>,
    pub transformations_out: Option<String>,
    pub transformation: TransformationType,
    pub fiji: FijiSetup,
    pub heap: u32,
    /// Xvfb display number, must be unique among concurrently running jobs
    pub display: u32,
}

impl PairedStackScript {
    pub fn new(background_in: impl Into<PathBuf>, glomeruli_in: impl Into<PathBuf>,
               fiji: FijiSetup, heap: u32, display: u32) -> Self {
        PairedStackScript {
            background_in: background_in.into(),
            glomeruli_in: glomeruli_in.into(),
            background_out: None,
            glomeruli_out: None,
            transformations_out: None,
            transformation: TransformationType::default(),
            fiji,
            heap,
            display,
        }
    }

    pub fn tokens(&self) -> TokenMap {
        let mut tokens = common_tokens(&self.fiji, self.heap);
        tokens.insert("BACKGROUND_IN", display(&self.background_in));
        tokens.insert("GLOMERULI_IN", display(&self.glomeruli_in));
        tokens.insert("BACKGROUND_OUT", self.background_out.clone()
            .unwrap_or_else(|| derived_output(&self.background_in, "_aligned")));
        tokens.insert("GLOMERULI_OUT", self.glomeruli_out.clone()
            .unwrap_or_else(|| derived_output(&self.glomeruli_in, "_aligned")));
        tokens.insert("TRANS_OUT", self.transformations_out.clone()
            .unwrap_or_else(|| DEFAULT_TRANS_OUT.to_string()));
        tokens.insert("TRANS_TYPE", self.transformation.to_string());
        tokens.insert("DNUM", self.display.to_string());
        tokens
    }

    pub fn generate(&self) -> Result<String, TemplateError> {
        info!("Rendering multi-channel alignment script for {} and {}",
            self.background_in.display(), self.glomeruli_in.display());
        render(PAIRED, &self.tokens())
    }
}

fn common_tokens(fiji: &FijiSetup, heap: u32) -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.insert("FIJI_HOME_DIR", display(&fiji.home));
    tokens.insert("ALIGN_MACRO", display(&fiji.align_macro));
    tokens.insert("HEAP", format!("--heap {heap}"));
    tokens.insert("GENERATED_AT", Utc::now().to_rfc3339());
    tokens
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Output file name next to the job's working directory: `<stem><suffix><.ext>`
///
/// Only the base name of the input is kept.
pub fn derived_output(input: &Path, suffix: &str) -> String {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match input.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    }
}
