//! Notebooks before and after they are bound to a configuration.

use camino::{Utf8Path, Utf8PathBuf};

use crate::action::Action;
use crate::error::{NbflowError, UsageError};
use crate::run::NotebookParameters;
use crate::serialize::Converter;
use crate::task::{ConfigChanged, TaskSpec};
use crate::value::{Field, Value};

/// A notebook without any configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnconfiguredNotebook {
    /// Path to the notebook, relative to the raw notebook directory.
    pub notebook_path: Utf8PathBuf,
    /// Extension of the raw notebook, e.g. `.py`.
    pub raw_notebook_ext: String,
    /// One line summary.
    pub summary: String,
    /// Documentation, may span several lines.
    pub doc: String,
}

impl UnconfiguredNotebook {
    pub fn new(
        notebook_path: impl Into<Utf8PathBuf>,
        raw_notebook_ext: impl Into<String>,
        summary: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self {
            notebook_path: notebook_path.into(),
            raw_notebook_ext: raw_notebook_ext.into(),
            summary: summary.into(),
            doc: doc.into(),
        }
    }

    /// The grouping record every configured variant of this notebook hangs
    /// off.
    pub fn base_task(&self) -> TaskSpec {
        TaskSpec::base(
            format!("({}) {}", self.notebook_path, self.summary),
            self.doc.clone(),
        )
    }

    /// Location of the raw notebook beneath `root_dir_raw_notebooks`.
    pub fn raw_path(&self, root_dir_raw_notebooks: &Utf8Path) -> Utf8PathBuf {
        let ext = self.raw_notebook_ext.trim_start_matches('.');
        root_dir_raw_notebooks.join(self.notebook_path.with_extension(ext))
    }

    fn stem(&self) -> &str {
        self.notebook_path.file_stem().unwrap_or_default()
    }
}

/// A notebook bound to one run of one step configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredNotebook {
    pub unconfigured_notebook: UnconfiguredNotebook,
    /// Paths the notebook reads.
    pub dependencies: Vec<Utf8PathBuf>,
    /// Paths the notebook writes.
    pub targets: Vec<Utf8PathBuf>,
    /// Configuration file handed to the notebook.
    pub config_file: Utf8PathBuf,
    pub step_config_id: String,
    /// Values fingerprinted for change detection. When absent, any change
    /// to `config_file` re-runs the notebook.
    pub configuration: Option<Vec<Value>>,
}

impl ConfiguredNotebook {
    pub fn new(
        unconfigured_notebook: UnconfiguredNotebook,
        config_file: impl Into<Utf8PathBuf>,
        step_config_id: impl Into<String>,
    ) -> Self {
        Self {
            unconfigured_notebook,
            dependencies: Vec::new(),
            targets: Vec::new(),
            config_file: config_file.into(),
            step_config_id: step_config_id.into(),
            configuration: None,
        }
    }

    pub fn dependencies<I, P>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn targets<I, P>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn configuration(mut self, configuration: Vec<Value>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Add one value to the change-detection fingerprint.
    pub fn with_config_value(mut self, value: &impl Field) -> Self {
        self.configuration
            .get_or_insert_with(Vec::new)
            .push(value.to_value());
        self
    }

    /// Build the task record which runs this notebook.
    ///
    /// Dependencies are the declared ones followed by the raw notebook.
    /// Without a configuration fingerprint the whole configuration file is
    /// a dependency too; with one, an `uptodate` predicate is attached and
    /// `converter` is required.
    pub fn to_task(
        &self,
        root_dir_raw_notebooks: &Utf8Path,
        notebook_output_dir: &Utf8Path,
        base_task: &TaskSpec,
        converter: Option<&dyn Converter>,
        clean: bool,
    ) -> Result<TaskSpec, NbflowError> {
        let notebook = &self.unconfigured_notebook;
        let raw_notebook = notebook.raw_path(root_dir_raw_notebooks);
        let stem = notebook.stem();
        let unexecuted_notebook = notebook_output_dir.join(format!("{stem}_unexecuted.ipynb"));
        let executed_notebook = notebook_output_dir.join(format!("{stem}.ipynb"));

        let mut file_dep = self.dependencies.clone();
        file_dep.push(raw_notebook.clone());

        let notebook_parameters = NotebookParameters::from([
            ("config_file".to_string(), self.config_file.to_string()),
            ("step_config_id".to_string(), self.step_config_id.clone()),
        ]);

        let mut uptodate = Vec::new();
        match &self.configuration {
            None => file_dep.push(self.config_file.clone()),
            Some(configuration) => {
                let converter = converter.ok_or(UsageError::MissingSerializer)?;
                let text = converter.dumps(&Value::Seq(configuration.clone()), true)?;
                uptodate.push(ConfigChanged::new(text));
            }
        }

        Ok(TaskSpec {
            basename: base_task.basename.clone(),
            name: Some(self.step_config_id.clone()),
            doc: format!("{}. step_config_id='{}'", base_task.doc, self.step_config_id),
            actions: vec![Action::RunNotebook {
                raw_notebook,
                unexecuted_notebook,
                executed_notebook,
                notebook_parameters,
            }],
            targets: self.targets.clone(),
            file_dep,
            clean,
            uptodate,
        })
    }
}
