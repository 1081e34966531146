//! The units of work attached to task records.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::copy;
use crate::display::print_config;
use crate::error::NbflowError;
use crate::run::{Jupytext, NotebookExecutor, NotebookParameters, NotebookRewriter, Papermill, run_notebook};

/// A unit of work plus its arguments.
///
/// Actions are plain data so that task records can be handed to a runner as
/// JSON. [`Action::execute`] performs one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    RunNotebook {
        raw_notebook: Utf8PathBuf,
        unexecuted_notebook: Utf8PathBuf,
        executed_notebook: Utf8PathBuf,
        notebook_parameters: NotebookParameters,
    },
    ShowConfiguration {
        settings: Vec<(String, String)>,
    },
    CopyReadme {
        in_path: Utf8PathBuf,
        out_path: Utf8PathBuf,
        run_id: String,
        config_file_raw: Utf8PathBuf,
        raw_run_instruction: String,
        run_command: String,
    },
    CopyZenodo {
        in_path: Utf8PathBuf,
        out_path: Utf8PathBuf,
        version: String,
    },
    CopyFile {
        in_path: Utf8PathBuf,
        out_path: Utf8PathBuf,
    },
    CopyTree {
        in_path: Utf8PathBuf,
        out_path: Utf8PathBuf,
        ignore: Vec<String>,
    },
}

/// The capabilities actions need while they run.
pub struct Toolbox {
    pub rewriter: Box<dyn NotebookRewriter>,
    pub executor: Box<dyn NotebookExecutor>,
}

impl Toolbox {
    pub fn new(
        rewriter: impl NotebookRewriter + 'static,
        executor: impl NotebookExecutor + 'static,
    ) -> Self {
        Self {
            rewriter: Box::new(rewriter),
            executor: Box::new(executor),
        }
    }
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::new(Jupytext::default(), Papermill::default())
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox").finish_non_exhaustive()
    }
}

impl Action {
    pub fn execute(&self, toolbox: &Toolbox) -> Result<(), NbflowError> {
        match self {
            Action::RunNotebook {
                raw_notebook,
                unexecuted_notebook,
                executed_notebook,
                notebook_parameters,
            } => run_notebook(
                raw_notebook,
                unexecuted_notebook,
                executed_notebook,
                notebook_parameters,
                toolbox.rewriter.as_ref(),
                toolbox.executor.as_ref(),
            )?,
            Action::ShowConfiguration { settings } => {
                print_config(settings);
            }
            Action::CopyReadme {
                in_path,
                out_path,
                run_id,
                config_file_raw,
                raw_run_instruction,
                run_command,
            } => copy::copy_readme_default(
                in_path,
                out_path,
                run_id,
                config_file_raw,
                raw_run_instruction,
                run_command,
            )?,
            Action::CopyZenodo {
                in_path,
                out_path,
                version,
            } => copy::copy_zenodo_default(in_path, out_path, version)?,
            Action::CopyFile { in_path, out_path } => copy::copy_file_default(in_path, out_path)?,
            Action::CopyTree {
                in_path,
                out_path,
                ignore,
            } => copy::copy_tree_default(in_path, out_path, ignore)?,
        }

        Ok(())
    }
}
