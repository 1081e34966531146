//! Copying the project source into a run's output directory, so that the
//! bundle can be archived and re-run on its own.

use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};

use crate::action::Action;
use crate::error::{NbflowError, SerializeError, UsageError};
use crate::io::{as_overhead, compile_patterns, copy_rec, create_parent};
use crate::task::TaskSpec;

const BASENAME: &str = "copy_source_into_output";

const DOC: &str = "Copy required source files into the output directory, making it easy to create a neat bundle for uploading to Zenodo";

/// Default command written into the bundled README.
pub fn get_run_command_default(config_file_raw: &Utf8Path, raw_run_instruction: &str) -> String {
    format!("DOIT_CONFIGURATION_FILE={config_file_raw} {raw_run_instruction}")
}

/// What to copy into the output bundle and from where.
#[derive(Debug, Clone)]
pub struct CopySource {
    /// Everything except `config_file_raw` and `root_dir_raw_notebooks` is
    /// copied from here.
    pub repo_root_dir: Utf8PathBuf,
    pub root_dir_output_run: Utf8PathBuf,
    pub run_id: String,
    pub root_dir_raw_notebooks: Utf8PathBuf,
    pub config_file_raw: Utf8PathBuf,
    pub readme: String,
    pub zenodo: String,
    /// Relative to `repo_root_dir`.
    pub other_files_to_copy: Vec<Utf8PathBuf>,
    pub src_dir: String,
    /// The run instruction the README is expected to contain.
    pub raw_run_instruction: String,
    pub run_command: fn(&Utf8Path, &str) -> String,
    /// File name patterns skipped when copying trees.
    pub ignore: Vec<String>,
}

impl CopySource {
    pub fn new(
        repo_root_dir: impl Into<Utf8PathBuf>,
        root_dir_output_run: impl Into<Utf8PathBuf>,
        run_id: impl Into<String>,
        root_dir_raw_notebooks: impl Into<Utf8PathBuf>,
        config_file_raw: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            repo_root_dir: repo_root_dir.into(),
            root_dir_output_run: root_dir_output_run.into(),
            run_id: run_id.into(),
            root_dir_raw_notebooks: root_dir_raw_notebooks.into(),
            config_file_raw: config_file_raw.into(),
            readme: "README.md".into(),
            zenodo: "zenodo.json".into(),
            other_files_to_copy: vec!["Cargo.toml".into(), "Cargo.lock".into()],
            src_dir: "src".into(),
            raw_run_instruction: "cargo run --release -- tasks".into(),
            run_command: get_run_command_default,
            ignore: vec![
                "__pycache__".into(),
                "*.pyc".into(),
                ".ipynb_checkpoints".into(),
            ],
        }
    }

    pub fn other_files_to_copy<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.other_files_to_copy = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn src_dir(mut self, src_dir: impl Into<String>) -> Self {
        self.src_dir = src_dir.into();
        self
    }

    pub fn raw_run_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.raw_run_instruction = instruction.into();
        self
    }

    pub fn run_command(mut self, run_command: fn(&Utf8Path, &str) -> String) -> Self {
        self.run_command = run_command;
        self
    }

    /// Where the raw configuration file lands: `<stem>-raw.<ext>`, so it
    /// can't clash with the hydrated one.
    pub fn config_file_raw_output(&self) -> Utf8PathBuf {
        let stem = self.config_file_raw.file_stem().unwrap_or("config");
        let name = match self.config_file_raw.extension() {
            Some(ext) => format!("{stem}-raw.{ext}"),
            None => format!("{stem}-raw"),
        };
        self.root_dir_output_run.join(name)
    }

    fn output_dir_raw_notebooks(&self) -> Result<Utf8PathBuf, UsageError> {
        let relative = self
            .root_dir_raw_notebooks
            .strip_prefix(&self.repo_root_dir)
            .map_err(|_| UsageError::NotebooksOutsideRepo {
                notebooks: self.root_dir_raw_notebooks.clone(),
                repo: self.repo_root_dir.clone(),
            })?;
        Ok(self.root_dir_output_run.join(relative))
    }
}

struct ActionDef {
    name: String,
    action: Action,
    targets: Vec<Utf8PathBuf>,
}

fn short_targets(targets: &[Utf8PathBuf]) -> String {
    let names: Vec<String> = targets
        .iter()
        .map(|t| format!("'.../{}'", t.file_name().unwrap_or_default()))
        .collect();

    match names.len() {
        1 => format!("({},)", names[0]),
        _ => format!("({})", names.join(", ")),
    }
}

/// Tasks which copy the project source into the run output. Each depends on
/// the targets of every preceding task, so the copy runs last.
pub fn gen_copy_source_into_output_tasks(
    all_preceding_tasks: &[TaskSpec],
    settings: &CopySource,
) -> Result<Vec<TaskSpec>, NbflowError> {
    let all_targets: Vec<Utf8PathBuf> = all_preceding_tasks
        .iter()
        .flat_map(|task| task.targets.iter().cloned())
        .collect();

    let run = &settings.root_dir_output_run;
    let config_file_raw_output = settings.config_file_raw_output();
    let config_file_raw_relative = config_file_raw_output
        .strip_prefix(run)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| config_file_raw_output.clone());
    let output_dir_raw_notebooks = settings.output_dir_raw_notebooks()?;

    let mut defs = vec![
        ActionDef {
            name: "copy README".into(),
            action: Action::CopyReadme {
                in_path: settings.repo_root_dir.join(&settings.readme),
                out_path: run.join(&settings.readme),
                run_id: settings.run_id.clone(),
                config_file_raw: config_file_raw_relative.clone(),
                raw_run_instruction: settings.raw_run_instruction.clone(),
                run_command: (settings.run_command)(
                    &config_file_raw_relative,
                    &settings.raw_run_instruction,
                ),
            },
            targets: vec![run.join(&settings.readme)],
        },
        ActionDef {
            name: "copy Zenodo".into(),
            action: Action::CopyZenodo {
                in_path: settings.repo_root_dir.join(&settings.zenodo),
                out_path: run.join(&settings.zenodo),
                version: settings.run_id.clone(),
            },
            targets: vec![run.join(&settings.zenodo)],
        },
    ];

    for file in &settings.other_files_to_copy {
        if file.is_absolute() {
            return Err(UsageError::AbsoluteCopyPath(file.clone()).into());
        }
        defs.push(ActionDef {
            name: format!("copy {file}"),
            action: Action::CopyFile {
                in_path: settings.repo_root_dir.join(file),
                out_path: run.join(file),
            },
            targets: vec![run.join(file)],
        });
    }

    defs.extend([
        ActionDef {
            name: "copy raw config".into(),
            action: Action::CopyFile {
                in_path: settings.config_file_raw.clone(),
                out_path: config_file_raw_output.clone(),
            },
            targets: vec![config_file_raw_output],
        },
        ActionDef {
            name: "copy raw notebooks".into(),
            action: Action::CopyTree {
                in_path: settings.root_dir_raw_notebooks.clone(),
                out_path: output_dir_raw_notebooks.clone(),
                ignore: settings.ignore.clone(),
            },
            targets: vec![output_dir_raw_notebooks],
        },
        ActionDef {
            name: "copy source".into(),
            action: Action::CopyTree {
                in_path: settings.repo_root_dir.join(&settings.src_dir),
                out_path: run.join(&settings.src_dir),
                ignore: settings.ignore.clone(),
            },
            targets: vec![run.join(&settings.src_dir)],
        },
    ]);

    let tasks = defs
        .into_iter()
        .map(|def| TaskSpec {
            name: Some(def.name),
            doc: format!("{DOC}. Copying in {}", short_targets(&def.targets)),
            actions: vec![def.action],
            targets: def.targets,
            file_dep: all_targets.clone(),
            ..TaskSpec::base(BASENAME, "")
        })
        .collect();

    Ok(tasks)
}

/// Copy the README into the bundle, appending a footer which explains how
/// to re-run the bundle.
pub fn copy_readme_default(
    in_path: &Utf8Path,
    out_path: &Utf8Path,
    run_id: &str,
    config_file_raw: &Utf8Path,
    raw_run_instruction: &str,
    run_command: &str,
) -> Result<(), NbflowError> {
    if config_file_raw.is_absolute() {
        return Err(UsageError::AbsoluteRawConfig(config_file_raw.to_owned()).into());
    }

    let raw = fs::read_to_string(in_path)?;
    if !raw.contains(raw_run_instruction) {
        return Err(UsageError::MissingRunInstruction(raw_run_instruction.to_owned()).into());
    }

    let name = in_path.file_name().unwrap_or_default();
    let footer = format!(
        r#"
## Run info

This README was created from the raw {name} file as part of the '{run_id}' run.
The bundle should contain everything required to reproduce the outputs.

If you are looking to re-run the analysis, then you should run the below

```sh
{run_command}
```

The configuration file included in this output bundle contains absolute
paths, which keeps the run traceable but is not portable. The command above
uses the raw configuration file, with relative paths, exactly as it was used
in the original run.

If you have any issues running the analysis, please make an issue in our code
repository or reach out via email.
"#
    );

    create_parent(out_path)?;
    fs::write(out_path, raw + &footer)?;
    tracing::info!("Copied {} to {}", in_path, out_path);
    Ok(())
}

/// Copy the Zenodo metadata into the bundle with `metadata.version` set.
pub fn copy_zenodo_default(
    in_path: &Utf8Path,
    out_path: &Utf8Path,
    version: &str,
) -> Result<(), NbflowError> {
    let text = fs::read_to_string(in_path)?;
    let mut zenodo: serde_json::Value = serde_json::from_str(&text).map_err(SerializeError::from)?;

    let metadata = zenodo
        .get_mut("metadata")
        .and_then(serde_json::Value::as_object_mut)
        .ok_or_else(|| UsageError::ZenodoMetadata(in_path.to_owned()))?;
    metadata.insert("version".into(), serde_json::Value::String(version.to_owned()));

    let out = serde_json::to_string_pretty(&zenodo).map_err(SerializeError::from)?;
    create_parent(out_path)?;
    fs::write(out_path, out)?;
    tracing::info!("Copied {} to {}", in_path, out_path);
    Ok(())
}

pub fn copy_file_default(in_path: &Utf8Path, out_path: &Utf8Path) -> Result<(), NbflowError> {
    create_parent(out_path)?;
    fs::copy(in_path, out_path)?;
    tracing::info!("Copied {} to {}", in_path, out_path);
    Ok(())
}

/// Copy a tree, merging into `out_path` if it exists.
pub fn copy_tree_default(
    in_path: &Utf8Path,
    out_path: &Utf8Path,
    ignore: &[String],
) -> Result<(), NbflowError> {
    let s = Instant::now();
    let patterns = compile_patterns(ignore)?;
    let count = copy_rec(in_path, out_path, &patterns)?;
    tracing::info!("Copied {} files from {} to {} {}", count, in_path, out_path, as_overhead(s));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn settings() -> CopySource {
        CopySource::new(
            "/repo",
            "/repo/output-bundles/run-1",
            "run-1",
            "/repo/notebooks",
            "/repo/dev-config.yaml",
        )
    }

    #[test]
    fn test_tasks() {
        let mut preceding = TaskSpec::base("nb", "doc");
        preceding.targets = vec!["/repo/output-bundles/run-1/plot.pdf".into()];

        let tasks = gen_copy_source_into_output_tasks(&[preceding], &settings()).unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.name.clone().unwrap()).collect();
        assert_eq!(
            names,
            [
                "copy README",
                "copy Zenodo",
                "copy Cargo.toml",
                "copy Cargo.lock",
                "copy raw config",
                "copy raw notebooks",
                "copy source",
            ]
        );

        for task in &tasks {
            assert_eq!(task.basename, "copy_source_into_output");
            assert_eq!(task.file_dep, [Utf8PathBuf::from("/repo/output-bundles/run-1/plot.pdf")]);
        }

        assert_eq!(
            tasks[4].targets,
            [Utf8PathBuf::from("/repo/output-bundles/run-1/dev-config-raw.yaml")]
        );
        assert_eq!(
            tasks[5].targets,
            [Utf8PathBuf::from("/repo/output-bundles/run-1/notebooks")]
        );
        assert!(tasks[0].doc.ends_with("Copying in ('.../README.md',)"));
    }

    #[test]
    fn test_readme_run_command() {
        let tasks = gen_copy_source_into_output_tasks(&[], &settings()).unwrap();
        match &tasks[0].actions[..] {
            [Action::CopyReadme {
                config_file_raw,
                run_command,
                ..
            }] => {
                assert_eq!(config_file_raw, Utf8Path::new("dev-config-raw.yaml"));
                assert_eq!(
                    run_command,
                    "DOIT_CONFIGURATION_FILE=dev-config-raw.yaml cargo run --release -- tasks"
                );
            }
            other => panic!("unexpected actions {other:?}"),
        }
    }

    #[test]
    fn test_notebooks_outside_repo() {
        let settings = CopySource::new(
            "/repo",
            "/repo/output-bundles/run-1",
            "run-1",
            "/elsewhere/notebooks",
            "/repo/dev-config.yaml",
        );
        let err = gen_copy_source_into_output_tasks(&[], &settings).unwrap_err();
        assert!(matches!(
            err,
            NbflowError::Usage(UsageError::NotebooksOutsideRepo { .. })
        ));
    }

    #[test]
    fn test_absolute_other_file() {
        let settings = settings().other_files_to_copy(["/etc/passwd"]);
        let err = gen_copy_source_into_output_tasks(&[], &settings).unwrap_err();
        assert!(matches!(err, NbflowError::Usage(UsageError::AbsoluteCopyPath(_))));
    }

    #[test]
    fn test_copy_readme() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("README.md"), "# Project\n\nRun with `make run`\n").unwrap();

        copy_readme_default(
            &root.join("README.md"),
            &root.join("out/README.md"),
            "run-1",
            Utf8Path::new("config-raw.yaml"),
            "make run",
            "CONFIG=config-raw.yaml make run",
        )
        .unwrap();

        let out = fs::read_to_string(root.join("out/README.md")).unwrap();
        assert!(out.starts_with("# Project\n"));
        assert!(out.contains("'run-1' run"));
        assert!(out.contains("```sh\nCONFIG=config-raw.yaml make run\n```"));
    }

    #[test]
    fn test_copy_readme_errors() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("README.md"), "# Project\n").unwrap();

        let err = copy_readme_default(
            &root.join("README.md"),
            &root.join("out.md"),
            "run-1",
            Utf8Path::new("/abs/config.yaml"),
            "make run",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, NbflowError::Usage(UsageError::AbsoluteRawConfig(_))));

        let err = copy_readme_default(
            &root.join("README.md"),
            &root.join("out.md"),
            "run-1",
            Utf8Path::new("config.yaml"),
            "make run",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, NbflowError::Usage(UsageError::MissingRunInstruction(_))));
    }

    #[test]
    fn test_copy_zenodo() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            root.join("zenodo.json"),
            r#"{"metadata": {"title": "Demo", "version": "0.0.0"}}"#,
        )
        .unwrap();

        copy_zenodo_default(&root.join("zenodo.json"), &root.join("out/zenodo.json"), "run-9")
            .unwrap();

        let out: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join("out/zenodo.json")).unwrap())
                .unwrap();
        assert_eq!(out["metadata"]["version"], "run-9");
        assert_eq!(out["metadata"]["title"], "Demo");
    }
}
