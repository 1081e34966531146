//! Notebook-based workflow steps and the tasks they generate.

use std::iter::FusedIterator;

use camino::{Utf8Path, Utf8PathBuf};

use crate::bundle::ConfigBundleLike;
use crate::error::{NbflowError, UsageError};
use crate::lookup::get_step_config_ids_for;
use crate::notebook::{ConfiguredNotebook, UnconfiguredNotebook};
use crate::serialize::Converter;
use crate::task::TaskSpec;

/// Binds the notebooks of a step to one variant of its configuration. Must
/// return one configured notebook per unconfigured notebook, in order.
pub type ConfigureNotebooks<B> = dyn Fn(&[UnconfiguredNotebook], &B, &str, &str) -> anyhow::Result<Vec<ConfiguredNotebook>>;

/// A named phase of the workflow backed by one or more notebooks.
///
/// The variants of the step are read from the field `step_name` of the
/// hydrated configuration, which must be a list of records with a
/// `step_config_id`.
pub struct NotebookStep<B> {
    pub step_name: String,
    pub unconfigured_notebooks: Vec<UnconfiguredNotebook>,
    configure_notebooks: Box<ConfigureNotebooks<B>>,
}

impl<B> std::fmt::Debug for NotebookStep<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotebookStep")
            .field("step_name", &self.step_name)
            .field("unconfigured_notebooks", &self.unconfigured_notebooks)
            .finish_non_exhaustive()
    }
}

impl<B: ConfigBundleLike> NotebookStep<B> {
    pub fn new<F>(
        step_name: impl Into<String>,
        unconfigured_notebooks: Vec<UnconfiguredNotebook>,
        configure_notebooks: F,
    ) -> Self
    where
        F: Fn(&[UnconfiguredNotebook], &B, &str, &str) -> anyhow::Result<Vec<ConfiguredNotebook>>
            + 'static,
    {
        Self {
            step_name: step_name.into(),
            unconfigured_notebooks,
            configure_notebooks: Box::new(configure_notebooks),
        }
    }

    /// Distinct `step_config_id`s of this step, in encounter order.
    pub fn step_config_ids(&self, config_bundle: &B) -> Result<Vec<String>, NbflowError> {
        let mut ids = get_step_config_ids_for(config_bundle.config_hydrated(), &self.step_name)?;
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        Ok(ids)
    }

    /// Directory the notebooks of one variant are executed into.
    pub fn notebook_output_dir(&self, config_bundle: &B, step_config_id: &str) -> Utf8PathBuf {
        config_bundle
            .root_dir_output_run()
            .join("notebooks-executed")
            .join(&self.step_name)
            .join(step_config_id)
    }

    /// Generate the tasks of this step.
    ///
    /// One base task per notebook comes first, then for every variant one
    /// task per notebook in the original order. The sequence stops after
    /// the first error.
    pub fn gen_notebook_tasks<'a>(
        &'a self,
        config_bundle: &'a B,
        root_dir_raw_notebooks: &'a Utf8Path,
        converter: Option<&'a dyn Converter>,
        clean: bool,
    ) -> StepTasks<'a, B> {
        StepTasks {
            step: self,
            config_bundle,
            root_dir_raw_notebooks,
            converter,
            clean,
            state: State::Base(0),
        }
    }

    fn configured_tasks(
        &self,
        config_bundle: &B,
        root_dir_raw_notebooks: &Utf8Path,
        converter: Option<&dyn Converter>,
        clean: bool,
        step_config_id: &str,
    ) -> Result<Vec<TaskSpec>, NbflowError> {
        let configured = (self.configure_notebooks)(
            &self.unconfigured_notebooks,
            config_bundle,
            &self.step_name,
            step_config_id,
        )
        .map_err(|source| NbflowError::Configure {
            step: self.step_name.clone(),
            step_config_id: step_config_id.to_owned(),
            source,
        })?;

        if configured.len() != self.unconfigured_notebooks.len() {
            return Err(UsageError::CardinalityMismatch {
                step: self.step_name.clone(),
                step_config_id: step_config_id.to_owned(),
                unconfigured: self.unconfigured_notebooks.len(),
                configured: configured.len(),
            }
            .into());
        }

        let notebook_output_dir = self.notebook_output_dir(config_bundle, step_config_id);

        configured
            .iter()
            .zip(&self.unconfigured_notebooks)
            .map(|(nb, fallback)| {
                let unconfigured = self
                    .unconfigured_notebooks
                    .iter()
                    .find(|uc| **uc == nb.unconfigured_notebook)
                    .unwrap_or(fallback);

                let task = nb.to_task(
                    root_dir_raw_notebooks,
                    &notebook_output_dir,
                    &unconfigured.base_task(),
                    converter,
                    clean,
                )?;
                tracing::debug!("Generated task {}", task.full_name());
                Ok(task)
            })
            .collect()
    }
}

enum State {
    Base(usize),
    Configured {
        ids: std::vec::IntoIter<String>,
        pending: std::vec::IntoIter<TaskSpec>,
    },
    Done,
}

/// Single-pass sequence of the tasks of one step.
pub struct StepTasks<'a, B> {
    step: &'a NotebookStep<B>,
    config_bundle: &'a B,
    root_dir_raw_notebooks: &'a Utf8Path,
    converter: Option<&'a dyn Converter>,
    clean: bool,
    state: State,
}

impl<B: ConfigBundleLike> Iterator for StepTasks<'_, B> {
    type Item = Result<TaskSpec, NbflowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Base(index) => {
                    if let Some(nb) = self.step.unconfigured_notebooks.get(*index) {
                        *index += 1;
                        let task = nb.base_task();
                        tracing::debug!("Generated task {}", task.full_name());
                        return Some(Ok(task));
                    }

                    match self.step.step_config_ids(self.config_bundle) {
                        Ok(ids) => {
                            self.state = State::Configured {
                                ids: ids.into_iter(),
                                pending: Vec::new().into_iter(),
                            }
                        }
                        Err(e) => {
                            self.state = State::Done;
                            return Some(Err(e));
                        }
                    }
                }
                State::Configured { ids, pending } => {
                    if let Some(task) = pending.next() {
                        return Some(Ok(task));
                    }

                    let Some(step_config_id) = ids.next() else {
                        self.state = State::Done;
                        continue;
                    };

                    match self.step.configured_tasks(
                        self.config_bundle,
                        self.root_dir_raw_notebooks,
                        self.converter,
                        self.clean,
                        &step_config_id,
                    ) {
                        Ok(tasks) => *pending = tasks.into_iter(),
                        Err(e) => {
                            self.state = State::Done;
                            return Some(Err(e));
                        }
                    }
                }
                State::Done => return None,
            }
        }
    }
}

impl<B: ConfigBundleLike> FusedIterator for StepTasks<'_, B> {}
