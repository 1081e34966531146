//! Run-level settings read from the environment.

use std::env;

use camino::{Utf8Path, Utf8PathBuf};

use crate::display::gen_show_configuration_task;
use crate::error::NbflowError;
use crate::task::TaskSpec;

/// Current local time as `YYYYMMDDHHMMSS`, the default run id.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Where a run reads its inputs and writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub run_id: String,
    pub configuration_file: Utf8PathBuf,
    pub root_dir_output: Utf8PathBuf,
    pub root_dir_raw_notebooks: Utf8PathBuf,
}

impl RunSettings {
    /// Read `{PREFIX}_RUN_ID`, `{PREFIX}_CONFIGURATION_FILE`,
    /// `{PREFIX}_ROOT_DIR_OUTPUT` and `{PREFIX}_ROOT_DIR_RAW_NOTEBOOKS`.
    /// Relative paths are resolved against the current directory.
    pub fn from_env(prefix: &str) -> Result<Self, NbflowError> {
        let cwd = Utf8PathBuf::try_from(env::current_dir()?)?;
        Ok(Self::from_vars(prefix, |key| env::var(key).ok(), &cwd))
    }

    /// [`RunSettings::from_env`] over any variable source.
    pub fn from_vars(
        prefix: &str,
        var: impl Fn(&str) -> Option<String>,
        cwd: &Utf8Path,
    ) -> Self {
        let prefix = prefix.to_uppercase();
        let get = |name: &str| var(&format!("{prefix}_{name}"));
        let path = |name: &str, default: String| {
            let path = Utf8PathBuf::from(get(name).unwrap_or(default));
            match path.is_absolute() {
                true => path,
                false => cwd.join(path),
            }
        };

        let default_config = format!("{}-config.yaml", prefix.to_lowercase().replace('_', "-"));

        Self {
            run_id: get("RUN_ID").unwrap_or_else(timestamp),
            configuration_file: path("CONFIGURATION_FILE", default_config),
            root_dir_output: path("ROOT_DIR_OUTPUT", "output-bundles".into()),
            root_dir_raw_notebooks: path("ROOT_DIR_RAW_NOTEBOOKS", "notebooks".into()),
        }
    }

    pub fn root_dir_output_run(&self) -> Utf8PathBuf {
        self.root_dir_output.join(&self.run_id)
    }

    /// Create the output directory for this run.
    pub fn create_run_dir(&self) -> Result<Utf8PathBuf, NbflowError> {
        let dir = self.root_dir_output_run();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Created run directory {}", dir);
        Ok(dir)
    }

    pub fn show_configuration_task(&self) -> TaskSpec {
        gen_show_configuration_task(
            &self.configuration_file,
            &self.run_id,
            &self.root_dir_output,
            &self.root_dir_raw_notebooks,
        )
    }
}
