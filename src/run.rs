//! Running a single notebook: rewrite the raw source into a notebook, then
//! execute it with parameters injected.

use std::collections::BTreeMap;
use std::fs;
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, bail};
use camino::Utf8Path;

use crate::error::ExecutionError;
use crate::io::as_overhead;

/// Parameters injected into a notebook's "parameters" cell.
pub type NotebookParameters = BTreeMap<String, String>;

/// Rewrites a raw notebook (e.g. a percent-format script) into an
/// unexecuted notebook.
pub trait NotebookRewriter {
    fn rewrite(&self, raw_notebook: &Utf8Path, unexecuted_notebook: &Utf8Path) -> anyhow::Result<()>;
}

impl<F> NotebookRewriter for F
where
    F: Fn(&Utf8Path, &Utf8Path) -> anyhow::Result<()>,
{
    fn rewrite(&self, raw_notebook: &Utf8Path, unexecuted_notebook: &Utf8Path) -> anyhow::Result<()> {
        self(raw_notebook, unexecuted_notebook)
    }
}

/// Executes an unexecuted notebook, writing the executed copy.
pub trait NotebookExecutor {
    fn execute(
        &self,
        unexecuted_notebook: &Utf8Path,
        executed_notebook: &Utf8Path,
        parameters: &NotebookParameters,
    ) -> anyhow::Result<()>;
}

impl<F> NotebookExecutor for F
where
    F: Fn(&Utf8Path, &Utf8Path, &NotebookParameters) -> anyhow::Result<()>,
{
    fn execute(
        &self,
        unexecuted_notebook: &Utf8Path,
        executed_notebook: &Utf8Path,
        parameters: &NotebookParameters,
    ) -> anyhow::Result<()> {
        self(unexecuted_notebook, executed_notebook, parameters)
    }
}

/// Run a notebook.
///
/// The raw notebook is rewritten to `unexecuted_notebook`, the parent of
/// `executed_notebook` is created if missing, and the notebook is executed.
/// Any failure is wrapped in [`ExecutionError`] carrying the notebook path.
pub fn run_notebook(
    raw_notebook: &Utf8Path,
    unexecuted_notebook: &Utf8Path,
    executed_notebook: &Utf8Path,
    parameters: &NotebookParameters,
    rewriter: &dyn NotebookRewriter,
    executor: &dyn NotebookExecutor,
) -> Result<(), ExecutionError> {
    let s = Instant::now();

    rewriter
        .rewrite(raw_notebook, unexecuted_notebook)
        .map_err(|source| ExecutionError::Rewrite {
            path: raw_notebook.to_owned(),
            source,
        })?;

    execute(unexecuted_notebook, executed_notebook, parameters, executor).map_err(|source| {
        ExecutionError::Execute {
            path: unexecuted_notebook.to_owned(),
            source,
        }
    })?;

    tracing::info!("Executed {} {}", executed_notebook, as_overhead(s));

    Ok(())
}

fn execute(
    unexecuted_notebook: &Utf8Path,
    executed_notebook: &Utf8Path,
    parameters: &NotebookParameters,
    executor: &dyn NotebookExecutor,
) -> anyhow::Result<()> {
    if let Some(parent) = executed_notebook.parent() {
        if !parent.exists() {
            tracing::info!(
                "Creating directory (and any required parent directories): {}",
                parent
            );
            fs::create_dir_all(parent)?;
        }
    }

    tracing::info!("Executing notebook: {}", unexecuted_notebook);
    executor.execute(unexecuted_notebook, executed_notebook, parameters)
}

fn run_command(command: &mut Command) -> anyhow::Result<()> {
    let output = command
        .output()
        .with_context(|| format!("Couldn't spawn {:?}", command.get_program()))?;

    if !output.status.success() {
        bail!(
            "{:?} exited with {}\n{}",
            command.get_program(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(())
}

/// Rewrites raw notebooks with the `jupytext` command line tool.
#[derive(Debug, Clone)]
pub struct Jupytext {
    pub program: String,
    /// Format of the unexecuted notebook.
    pub fmt: String,
}

impl Default for Jupytext {
    fn default() -> Self {
        Self {
            program: "jupytext".into(),
            fmt: "ipynb".into(),
        }
    }
}

impl NotebookRewriter for Jupytext {
    fn rewrite(&self, raw_notebook: &Utf8Path, unexecuted_notebook: &Utf8Path) -> anyhow::Result<()> {
        tracing::info!("Reading raw notebook with jupytext: {}", raw_notebook);
        if let Some(parent) = unexecuted_notebook.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!("Writing unexecuted notebook: {}", unexecuted_notebook);
        run_command(
            Command::new(&self.program)
                .arg("--to")
                .arg(&self.fmt)
                .arg("--output")
                .arg(unexecuted_notebook)
                .arg(raw_notebook),
        )
    }
}

/// Executes notebooks with the `papermill` command line tool.
#[derive(Debug, Clone)]
pub struct Papermill {
    pub program: String,
}

impl Default for Papermill {
    fn default() -> Self {
        Self {
            program: "papermill".into(),
        }
    }
}

impl NotebookExecutor for Papermill {
    fn execute(
        &self,
        unexecuted_notebook: &Utf8Path,
        executed_notebook: &Utf8Path,
        parameters: &NotebookParameters,
    ) -> anyhow::Result<()> {
        let mut command = Command::new(&self.program);
        command.arg(unexecuted_notebook).arg(executed_notebook);
        for (key, value) in parameters {
            command.arg("-p").arg(key).arg(value);
        }
        run_command(&mut command)
    }
}
