use std::collections::BTreeMap;
use std::future::Future;

use anyhow::Result;

pub mod cloud_run;

/// One deployed backend as reported by the directory, fresh every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: String,
    /// also the identity-token audience
    pub url: String,
    pub project_id: String,
    pub region: String,
    pub labels: BTreeMap<String, String>,
}

/// Where backends are listed, per project and region.
pub trait ServiceDirectory: Send + Sync {
    fn list_backends(&self, project_id: &str, region: &str) -> impl Future<Output = Result<Vec<BackendDescriptor>>> + Send;
}
