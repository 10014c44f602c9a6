use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::RunError;

/// Channel marker, the second `_` separated field of a stack's file name
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Channel {
    /// `B`
    Background,
    /// `G`
    Glomeruli,
}

impl Channel {
    pub fn from_marker(marker: &str) -> Option<Channel> {
        match marker {
            "B" => Some(Channel::Background),
            "G" => Some(Channel::Glomeruli),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Channel::Background => write!(f, "B"),
            Channel::Glomeruli => write!(f, "G"),
        }
    }
}

/// Background and glomeruli stacks of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPair {
    pub id: String,
    pub background: PathBuf,
    pub glomeruli: PathBuf,
}

/// Result of grouping stacks by sample id
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Pairing {
    /// Complete pairs, ordered by id
    pub pairs: Vec<StackPair>,
    /// Stacks whose other channel is missing
    pub unmatched: Vec<PathBuf>,
}

#[derive(Default)]
struct Group {
    background: Option<PathBuf>,
    glomeruli: Option<PathBuf>,
    entries: usize,
}

/// Split `ID_CHANNEL[_ANYTHING].tif` into id and channel
pub fn parse_stack_name(path: &Path) -> Result<(String, Channel), RunError> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let mut parts = stem.split('_');
    let id = parts.next().filter(|id| !id.is_empty());
    let marker = parts.next();
    match (id, marker.and_then(Channel::from_marker)) {
        (Some(id), Some(channel)) => Ok((id.to_string(), channel)),
        _ => Err(RunError::InvalidArgument(format!(
            "{} is not named ID_CHANNEL[_...] with channel B or G",
            path.display()
        ))),
    }
}

/// Group stacks into background/glomeruli pairs keyed by sample id
///
/// An id may have at most two stacks, one per channel. An id with a single stack is reported
/// as unmatched rather than failing the run.
pub fn pair_stacks(paths: &[PathBuf]) -> Result<Pairing, RunError> {
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for path in paths {
        let (id, channel) = parse_stack_name(path)?;
        let group = groups.entry(id.clone()).or_default();
        if group.entries == 2 {
            return Err(RunError::InvalidArgument(format!(
                "more than two stacks for id {id}: {}",
                path.display()
            )));
        }
        let slot = match channel {
            Channel::Background => &mut group.background,
            Channel::Glomeruli => &mut group.glomeruli,
        };
        if let Some(existing) = slot.as_ref() {
            return Err(RunError::InvalidArgument(format!(
                "{} and {} are both channel {channel} of id {id}",
                existing.display(),
                path.display()
            )));
        }
        debug!("{} is channel {channel} of {id}", path.display());
        *slot = Some(path.clone());
        group.entries += 1;
    }

    let mut pairing = Pairing::default();
    for (id, group) in groups {
        match (group.background, group.glomeruli) {
            (Some(background), Some(glomeruli)) => {
                pairing.pairs.push(StackPair { id, background, glomeruli })
            }
            (Some(lone), None) | (None, Some(lone)) => {
                warn!("Unable to match {} with another stack. Skipping...", lone.display());
                pairing.unmatched.push(lone);
            }
            (None, None) => {}
        }
    }
    Ok(pairing)
}
