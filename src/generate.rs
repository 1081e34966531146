use std::time::Instant;

use camino::Utf8Path;

use crate::bundle::ConfigBundleLike;
use crate::error::NbflowError;
use crate::io::as_overhead;
use crate::serialize::Converter;
use crate::step::NotebookStep;
use crate::task::TaskSpec;

/// Generate every task of a workflow.
///
/// The tasks of each step are emitted in step order, then the bundle tasks,
/// which are built from all the notebook tasks that precede them.
pub fn generate_all_tasks<'a, B, F>(
    config_bundle: &B,
    root_dir_raw_notebooks: &Utf8Path,
    converter: &dyn Converter,
    steps: impl IntoIterator<Item = &'a NotebookStep<B>>,
    gen_bundle_tasks: F,
) -> Result<Vec<TaskSpec>, NbflowError>
where
    B: ConfigBundleLike + 'a,
    F: FnOnce(&[TaskSpec]) -> anyhow::Result<Vec<TaskSpec>>,
{
    let s = Instant::now();
    let mut tasks = Vec::new();

    for step in steps {
        let before = tasks.len();
        for task in step.gen_notebook_tasks(config_bundle, root_dir_raw_notebooks, Some(converter), true) {
            tasks.push(task?);
        }
        tracing::debug!("Step {} generated {} tasks", step.step_name, tasks.len() - before);
    }

    let bundle_tasks = gen_bundle_tasks(&tasks).map_err(NbflowError::BundleTasks)?;
    tasks.extend(bundle_tasks);

    tracing::info!("Generated {} tasks {}", tasks.len(), as_overhead(s));
    Ok(tasks)
}

#[cfg(test)]
mod test {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::bundle::ConfigBundle;
    use crate::lookup::get_config_for_step_id;
    use crate::notebook::{ConfiguredNotebook, UnconfiguredNotebook};
    use crate::serialize::YamlConverter;

    crate::config_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct SeedConfig {
            step_config_id: String,
            seed: i64,
            file_seed: Utf8PathBuf,
        }
    }

    crate::config_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Config {
            set_seed: Vec<SeedConfig>,
            plot: Vec<SeedConfig>,
        }
    }

    type Bundle = ConfigBundle<Config>;

    fn bundle() -> Bundle {
        let seed = |id: &str, n: i64| SeedConfig {
            step_config_id: id.into(),
            seed: n,
            file_seed: format!("/out/run/{id}.txt").into(),
        };

        ConfigBundle {
            run_id: "run".into(),
            config_hydrated: Config {
                set_seed: vec![seed("only", 1)],
                plot: vec![seed("a", 2), seed("b", 3)],
            },
            config_hydrated_path: "/out/run/config.yaml".into(),
            root_dir_output: "/out".into(),
            root_dir_output_run: "/out/run".into(),
        }
    }

    fn configure(
        notebooks: &[UnconfiguredNotebook],
        bundle: &Bundle,
        step_name: &str,
        step_config_id: &str,
    ) -> anyhow::Result<Vec<ConfiguredNotebook>> {
        let config: SeedConfig =
            get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;

        Ok(notebooks
            .iter()
            .map(|nb| {
                ConfiguredNotebook::new(nb.clone(), &bundle.config_hydrated_path, step_config_id)
                    .targets([config.file_seed.clone()])
                    .with_config_value(&config.seed)
            })
            .collect())
    }

    fn steps() -> Vec<NotebookStep<Bundle>> {
        vec![
            NotebookStep::new(
                "set_seed",
                vec![UnconfiguredNotebook::new("000_set-seed", ".py", "set seed", "Set the seed")],
                configure,
            ),
            NotebookStep::new(
                "plot",
                vec![UnconfiguredNotebook::new("100_plot", ".py", "plot", "Plot")],
                configure,
            ),
        ]
    }

    #[test]
    fn test_generate_all_tasks() {
        let b = bundle();
        let steps = steps();

        let tasks = generate_all_tasks(
            &b,
            Utf8Path::new("/nb"),
            &YamlConverter,
            &steps,
            |preceding: &[TaskSpec]| -> anyhow::Result<Vec<TaskSpec>> {
                let mut task = TaskSpec::base("bundle", "Bundle everything");
                task.name = Some("zip".into());
                task.file_dep = preceding.iter().flat_map(|t| t.targets.clone()).collect();
                Ok(vec![task])
            },
        )
        .unwrap();

        let names: Vec<_> = tasks.iter().map(|t| t.full_name()).collect();
        assert_eq!(
            names,
            [
                "(000_set-seed) set seed",
                "(000_set-seed) set seed:only",
                "(100_plot) plot",
                "(100_plot) plot:a",
                "(100_plot) plot:b",
                "bundle:zip",
            ]
        );
        assert_eq!(
            tasks[5].file_dep,
            [
                Utf8PathBuf::from("/out/run/only.txt"),
                Utf8PathBuf::from("/out/run/a.txt"),
                Utf8PathBuf::from("/out/run/b.txt"),
            ]
        );
        assert!(tasks[1].clean);
        assert_eq!(tasks[1].uptodate.len(), 1);
    }

    #[test]
    fn test_bundle_task_error() {
        let b = bundle();
        let steps = steps();

        let err = generate_all_tasks(
            &b,
            Utf8Path::new("/nb"),
            &YamlConverter,
            &steps,
            |_: &[TaskSpec]| -> anyhow::Result<Vec<TaskSpec>> { anyhow::bail!("no zenodo.json") },
        )
        .unwrap_err();

        assert!(matches!(err, NbflowError::BundleTasks(_)));
        assert!(err.to_string().ends_with("no zenodo.json"));
    }

    #[test]
    fn test_step_error_stops_generation() {
        let b = bundle();
        let steps = vec![NotebookStep::new(
            "missing",
            vec![UnconfiguredNotebook::new("x", ".py", "x", "x")],
            configure,
        )];

        let err = generate_all_tasks(
            &b,
            Utf8Path::new("/nb"),
            &YamlConverter,
            &steps,
            |_: &[TaskSpec]| -> anyhow::Result<Vec<TaskSpec>> { Ok(vec![]) },
        )
        .unwrap_err();

        assert!(matches!(err, NbflowError::Schema(_)));
    }
}
