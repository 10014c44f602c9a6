use std::ops::Deref;

use crate::error::SubmitError;
use crate::pbs::job::JobAttribute;

/// Environment variables exported to the job
pub const ATTR_V: &str = "Variable_List";
pub const ATTR_N: &str = "Job_Name";
pub const ATTR_L: &str = "Resource_List";
pub const ATTR_O: &str = "Output_Path";
pub const ATTR_E: &str = "Error_Path";
pub const ATTR_DEPEND: &str = "depend";
pub const ATTR_M: &str = "Mail_Points";

/// One entry of the attribute list handed to the resource manager (TORQUE's `attropl`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    /// Only set for `Resource_List` entries
    pub resource: Option<&'static str>,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Attribute { name, resource: None, value: value.into() }
    }

    pub fn resource(resource: &'static str, value: impl Into<String>) -> Self {
        Attribute { name: ATTR_L, resource: Some(resource), value: value.into() }
    }

    /// Protocol attribute for an optional job attribute
    pub fn for_job(attr: JobAttribute, value: impl Into<String>) -> Self {
        match attr {
            JobAttribute::Name => Attribute::new(ATTR_N, value),
            JobAttribute::Walltime => Attribute::resource("walltime", value),
            JobAttribute::Nodes => Attribute::resource("nodes", value),
            JobAttribute::StdoutPath => Attribute::new(ATTR_O, value),
            JobAttribute::StderrPath => Attribute::new(ATTR_E, value),
            JobAttribute::DependencyList => Attribute::new(ATTR_DEPEND, value),
            JobAttribute::MailOptions => Attribute::new(ATTR_M, value),
            JobAttribute::Mem => Attribute::resource("mem", value),
            JobAttribute::Vmem => Attribute::resource("vmem", value),
        }
    }
}

/// Attribute list with a capacity fixed at construction
///
/// Pushing past the capacity is an error rather than a reallocation, the list is sized from
/// the job descriptor and must never need more room than that.
#[derive(Debug, Clone)]
pub struct AttributeList {
    capacity: usize,
    attributes: Vec<Attribute>,
}

impl AttributeList {
    pub fn with_capacity(capacity: usize) -> Self {
        AttributeList { capacity, attributes: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, attribute: Attribute) -> Result<(), SubmitError> {
        if self.attributes.len() == self.capacity {
            return Err(SubmitError::AttributeOverflow { capacity: self.capacity });
        }
        self.attributes.push(attribute);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Deref for AttributeList {
    type Target = [Attribute];

    fn deref(&self) -> &[Attribute] {
        &self.attributes
    }
}
