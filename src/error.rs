use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbflowError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("Step '{step}', step_config_id '{step_config_id}':\n{source}")]
    Configure {
        step: String,
        step_config_id: String,
        source: anyhow::Error,
    },

    #[error("Couldn't generate the bundle tasks.\n{0}")]
    BundleTasks(anyhow::Error),

    #[error("{0} is not a directory")]
    NotADirectory(Utf8PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

/// The configuration graph does not have the shape an operation expects.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("`{record}` has no field `{field}`")]
    MissingField { record: String, field: String },

    #[error("`{record}` can't be rebuilt with unknown field `{field}`")]
    UnknownField { record: String, field: String },

    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{field}`: {source}")]
    InField {
        field: String,
        source: Box<SchemaError>,
    },

    #[error("{item} is missing a `step_config_id` field")]
    MissingStepConfigId { item: String },

    #[error("an array of shape {shape:?} can't hold {len} elements")]
    Shape { shape: Vec<usize>, len: usize },

    #[error("more than one key becomes `{key}` once prefixed")]
    KeyCollision { key: Utf8PathBuf },
}

impl SchemaError {
    pub(crate) fn mismatch(expected: &'static str, found: &crate::Value) -> Self {
        SchemaError::Mismatch {
            expected,
            found: found.kind(),
        }
    }

    pub(crate) fn in_field(self, field: impl Into<String>) -> Self {
        SchemaError::InField {
            field: field.into(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "Couldn't find step_config_id='{step_config_id}' for step='{step}'. Available step config IDs: {available:?}"
)]
pub struct NotFoundError {
    pub step: String,
    pub step_config_id: String,
    pub available: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error(
        "``step_config_id`` must be unique. The following ``step_config_id`` are duplicated: {0:?}"
    )]
    DuplicateIds(Vec<String>),

    #[error("{0} does not exist")]
    PathMissing(Utf8PathBuf),

    #[error("{0} is not absolute")]
    NotAbsolute(Utf8PathBuf),

    #[error("``{field}`` is not a sub-directory of {root}. {field}={path}")]
    NotSubdirectory {
        field: String,
        path: Utf8PathBuf,
        root: Utf8PathBuf,
    },

    #[error("``{field}``: {source}")]
    InField {
        field: String,
        source: Box<ValidationError>,
    },

    #[error("configuration already contains paths beneath {prefix}, refusing to hydrate twice: {paths:?}")]
    AlreadyHydrated {
        prefix: Utf8PathBuf,
        paths: Vec<Utf8PathBuf>,
    },
}

impl ValidationError {
    pub(crate) fn in_field(self, field: impl Into<String>) -> Self {
        ValidationError::InField {
            field: field.into(),
            source: Box::new(self),
        }
    }
}

/// Caller misuse of the API. Never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error("If `self.configuration is not None` then `converter` must be supplied")]
    MissingSerializer,

    #[error(
        "The number of unconfigured and configured notebooks is not the same. \
         We haven't yet thought through this use case. \
         Step '{step}', step_config_id '{step_config_id}': {unconfigured} unconfigured, {configured} configured."
    )]
    CardinalityMismatch {
        step: String,
        step_config_id: String,
        unconfigured: usize,
        configured: usize,
    },

    #[error(
        "{0} is absolute. Files to copy must not be absolute paths (all paths are relative to the repository root)."
    )]
    AbsoluteCopyPath(Utf8PathBuf),

    #[error("``config_file_raw`` must be a relative path, received: {0}")]
    AbsoluteRawConfig(Utf8PathBuf),

    #[error(
        "Could not find expected run instructions in README. The injected run instructions probably won't be correct. Expected run instruction: {0}"
    )]
    MissingRunInstruction(String),

    #[error("{0} has no `metadata` object")]
    ZenodoMetadata(Utf8PathBuf),

    #[error("raw notebooks directory {notebooks} is not inside the repository root {repo}")]
    NotebooksOutsideRepo {
        notebooks: Utf8PathBuf,
        repo: Utf8PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{path} could not be rewritten. Original error: {source}")]
    Rewrite {
        path: Utf8PathBuf,
        source: anyhow::Error,
    },

    #[error("{path} failed to execute. Original error: {source}")]
    Execute {
        path: Utf8PathBuf,
        source: anyhow::Error,
    },
}

impl ExecutionError {
    /// Path of the notebook which failed.
    pub fn path(&self) -> &camino::Utf8Path {
        match self {
            ExecutionError::Rewrite { path, .. } | ExecutionError::Execute { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("YAML:\n{0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON:\n{0}")]
    Json(#[from] serde_json::Error),
}
