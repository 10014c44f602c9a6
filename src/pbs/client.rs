use log::{debug, info, warn};

use crate::error::SubmitError;
use crate::pbs::attribute::{Attribute, AttributeList, ATTR_V};
use crate::pbs::env::HostEnvironment;
use crate::pbs::job::JobDescriptor;
use crate::pbs::manager::ResourceManager;

/// Submits job descriptors to a resource manager
///
/// Every submission opens its own connection and closes it before returning, whatever the
/// outcome. Failures are reported, never retried.
pub struct SubmissionClient<M: ResourceManager> {
    manager: M,
    host: HostEnvironment,
}

impl<M: ResourceManager> SubmissionClient<M> {
    pub fn new(manager: M) -> Self {
        SubmissionClient::with_environment(manager, HostEnvironment::capture())
    }

    pub fn with_environment(manager: M, host: HostEnvironment) -> Self {
        SubmissionClient { manager, host }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Build the attribute list for a job: the environment first, then whatever is set
    ///
    /// The list holds exactly `attribute_count() + 1` entries.
    pub fn attributes(&self, job: &mut JobDescriptor) -> Result<AttributeList, SubmitError> {
        let mut list = AttributeList::with_capacity(job.attribute_count() + 1);
        let workdir = job.working_directory().map_err(SubmitError::WorkingDirectory)?;
        list.push(Attribute::new(ATTR_V, self.host.variable_list(workdir)))?;
        for (attr, value) in job.attributes() {
            debug!("Adding {attr} = {value}");
            list.push(Attribute::for_job(attr, value))?;
        }
        Ok(list)
    }

    /// Submit the job, storing the returned identifier on the descriptor
    pub fn submit(&mut self, job: &mut JobDescriptor) -> Result<String, SubmitError> {
        let attributes = self.attributes(job)?;

        let server = self.manager.default_server();
        let connection = self.manager.connect(&server);
        if !connection.is_open() {
            let status = self.manager.error();
            warn!("Can't connect to resource manager '{}': {}", server, status.message);
            return Err(SubmitError::SubmissionFailed { code: status.code, message: status.message });
        }

        let job_id = self.manager.submit(&connection, &attributes, job.script(), None, None);
        let status = self.manager.error();
        self.manager.disconnect(connection);

        if status.is_error() {
            warn!("Resource manager rejected {}: {} {}", job.script().display(), status.code, status.message);
            return Err(SubmitError::SubmissionFailed { code: status.code, message: status.message });
        }

        match job_id {
            Some(job_id) => {
                info!("Submitted {} as {}", job.script().display(), job_id);
                job.set_job_id(job_id.clone());
                Ok(job_id)
            }
            None => Err(SubmitError::SubmissionFailed {
                code: -1,
                message: "resource manager returned no job identifier".to_string(),
            }),
        }
    }
}
