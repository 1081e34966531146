//! Task records handed to the external build runner.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::hash::Hash32;

/// One unit of work, its dependencies, its targets and how to tell whether
/// it is up to date.
///
/// A record without a `name` is a "base" record: it groups the variants of
/// a notebook so the runner can list notebooks without picking a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub basename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub doc: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub targets: Vec<Utf8PathBuf>,
    #[serde(default)]
    pub file_dep: Vec<Utf8PathBuf>,
    #[serde(default)]
    pub clean: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uptodate: Vec<ConfigChanged>,
}

impl TaskSpec {
    /// A grouping record with no work attached.
    pub fn base(basename: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            name: None,
            doc: doc.into(),
            actions: Vec::new(),
            targets: Vec::new(),
            file_dep: Vec::new(),
            clean: false,
            uptodate: Vec::new(),
        }
    }

    /// `basename:name`, the way build runners address a sub-task.
    pub fn full_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{}:{}", self.basename, name),
            None => self.basename.clone(),
        }
    }

    pub fn is_base(&self) -> bool {
        self.name.is_none()
    }
}

/// Change-detection predicate: the task is up to date while the digest of
/// the serialized configuration matches the one stored by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChanged {
    pub config: String,
    pub config_digest: String,
}

impl ConfigChanged {
    pub fn new(config: impl Into<String>) -> Self {
        let config = config.into();
        let config_digest = Hash32::hash(&config).to_hex();
        Self {
            config,
            config_digest,
        }
    }

    pub fn is_up_to_date(&self, stored_digest: Option<&str>) -> bool {
        stored_digest == Some(self.config_digest.as_str())
    }
}
