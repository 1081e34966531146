use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use nbflow::{
    Action, ConfigBundle, ConfiguredNotebook, CopySource, NbflowError, NotebookParameters,
    NotebookStep, RunSettings, TaskSpec, Toolbox, UnconfiguredNotebook, YamlConverter,
    gen_copy_source_into_output_tasks, generate_all_tasks, generate_directory_checklist,
    get_config_for_step_id, load_config_from_file, load_hydrate_write_config_bundle,
    write_complete_file,
};

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct SeedConfig {
        pub step_config_id: String,
        pub seed: i64,
        pub file_seed: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct PlotConfig {
        pub step_config_id: String,
        pub colours: Vec<String>,
        pub file_plot: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Config {
        pub name: String,
        pub set_seed: Vec<SeedConfig>,
        pub plot: Vec<PlotConfig>,
    }
}

type Bundle = ConfigBundle<Config>;

const CONFIG: &str = "\
name: integration
set_seed:
  - step_config_id: only
    seed: 2847
    file_seed: seed.txt
plot:
  - step_config_id: light
    colours: [yellow, white]
    file_plot: plots/light.pdf
  - step_config_id: dark
    colours: [black]
    file_plot: plots/dark.pdf
";

const RUN_INSTRUCTION: &str = "cargo run -- tasks";

struct Project {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
    settings: RunSettings,
}

fn project() -> Project {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    fs::write(root.join("demo-config.yaml"), CONFIG).unwrap();
    fs::write(
        root.join("README.md"),
        format!("# Integration\n\nRun with `{RUN_INSTRUCTION}`\n"),
    )
    .unwrap();
    fs::write(root.join("zenodo.json"), r#"{"metadata": {"title": "Integration"}}"#).unwrap();
    fs::write(root.join("Cargo.toml"), "[package]\nname = \"integration\"\n").unwrap();
    fs::write(root.join("Cargo.lock"), "version = 4\n").unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::create_dir_all(root.join("notebooks/.ipynb_checkpoints")).unwrap();
    fs::write(root.join("notebooks/.ipynb_checkpoints/junk.py"), "").unwrap();
    fs::write(root.join("notebooks/000_set-seed.py"), "# seed\n").unwrap();
    fs::write(root.join("notebooks/100_plot.py"), "# plot\n").unwrap();

    let vars = HashMap::from([("DEMO_RUN_ID", "run-1")]);
    let settings = RunSettings::from_vars("demo", |k| vars.get(k).map(|v| v.to_string()), &root);

    Project {
        _dir: dir,
        root,
        settings,
    }
}

fn load(path: &Utf8Path) -> Result<Config, NbflowError> {
    load_config_from_file(path, &YamlConverter)
}

fn bundle(project: &Project) -> Bundle {
    let run = project.settings.create_run_dir().unwrap();
    let root_dir_output = project.settings.root_dir_output.clone();
    let run_id = project.settings.run_id.clone();

    load_hydrate_write_config_bundle(
        &project.settings.configuration_file,
        load,
        |config: Config, path: Utf8PathBuf, run_dir: &Utf8Path| -> Result<Bundle, NbflowError> {
            Ok(ConfigBundle::new(run_id, config, path, root_dir_output, run_dir)?)
        },
        &run,
        &YamlConverter,
    )
    .unwrap()
}

fn configure_seed(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: SeedConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;

    Ok(vec![
        ConfiguredNotebook::new(notebooks[0].clone(), &bundle.config_hydrated_path, step_config_id)
            .targets([config.file_seed.clone()])
            .with_config_value(&config),
    ])
}

fn configure_plot(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: PlotConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;
    let seed: SeedConfig = get_config_for_step_id(&bundle.config_hydrated, "set_seed", "only")?;

    Ok(vec![
        ConfiguredNotebook::new(notebooks[0].clone(), &bundle.config_hydrated_path, step_config_id)
            .dependencies([seed.file_seed])
            .targets([config.file_plot.clone()])
            .with_config_value(&config),
    ])
}

fn steps() -> Vec<NotebookStep<Bundle>> {
    vec![
        NotebookStep::new(
            "set_seed",
            vec![UnconfiguredNotebook::new(
                "000_set-seed",
                ".py",
                "set seed",
                "Set the seed for the run",
            )],
            configure_seed,
        ),
        NotebookStep::new(
            "plot",
            vec![UnconfiguredNotebook::new("100_plot", ".py", "plot", "Plot the draws")],
            configure_plot,
        ),
    ]
}

fn copy_source(project: &Project, bundle: &Bundle) -> CopySource {
    CopySource::new(
        &project.root,
        &bundle.root_dir_output_run,
        &bundle.run_id,
        &project.settings.root_dir_raw_notebooks,
        &project.settings.configuration_file,
    )
    .raw_run_instruction(RUN_INSTRUCTION)
}

fn all_tasks(project: &Project, bundle: &Bundle) -> Vec<TaskSpec> {
    let steps = steps();
    let copy = copy_source(project, bundle);

    generate_all_tasks(
        bundle,
        &project.settings.root_dir_raw_notebooks,
        &YamlConverter,
        &steps,
        |preceding: &[TaskSpec]| -> anyhow::Result<Vec<TaskSpec>> {
            Ok(gen_copy_source_into_output_tasks(preceding, &copy)?)
        },
    )
    .unwrap()
}

#[test]
fn test_hydrated_bundle_on_disk() {
    let project = project();
    let bundle = bundle(&project);
    let run = project.root.join("output-bundles/run-1");

    assert_eq!(bundle.config_hydrated_path, run.join("demo-config.yaml"));
    assert_eq!(bundle.config_hydrated.set_seed[0].file_seed, run.join("seed.txt"));
    assert_eq!(bundle.config_hydrated.plot[1].file_plot, run.join("plots/dark.pdf"));
    assert_eq!(bundle.config_hydrated.plot[0].colours, ["yellow", "white"]);

    let written = load(&bundle.config_hydrated_path).unwrap();
    assert_eq!(written, bundle.config_hydrated);
}

#[test]
fn test_generate_all_tasks() {
    let project = project();
    let bundle = bundle(&project);
    let tasks = all_tasks(&project, &bundle);

    let names: Vec<_> = tasks.iter().map(TaskSpec::full_name).collect();
    assert_eq!(
        names,
        [
            "(000_set-seed) set seed",
            "(000_set-seed) set seed:only",
            "(100_plot) plot",
            "(100_plot) plot:light",
            "(100_plot) plot:dark",
            "copy_source_into_output:copy README",
            "copy_source_into_output:copy Zenodo",
            "copy_source_into_output:copy Cargo.toml",
            "copy_source_into_output:copy Cargo.lock",
            "copy_source_into_output:copy raw config",
            "copy_source_into_output:copy raw notebooks",
            "copy_source_into_output:copy source",
        ]
    );

    let run = &bundle.root_dir_output_run;
    let plot_dark = &tasks[4];
    assert_eq!(
        plot_dark.file_dep,
        [
            run.join("seed.txt"),
            project.root.join("notebooks/100_plot.py"),
        ]
    );
    assert_eq!(plot_dark.targets, [run.join("plots/dark.pdf")]);
    assert_eq!(plot_dark.uptodate.len(), 1);
    assert_ne!(tasks[3].uptodate, plot_dark.uptodate);

    let copy_readme = &tasks[5];
    assert_eq!(
        copy_readme.file_dep,
        [
            run.join("seed.txt"),
            run.join("plots/light.pdf"),
            run.join("plots/dark.pdf"),
        ]
    );
}

#[test]
fn test_tasks_as_json() {
    let project = project();
    let bundle = bundle(&project);
    let tasks = all_tasks(&project, &bundle);

    let json = serde_json::to_string(&tasks).unwrap();
    let back: Vec<TaskSpec> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tasks);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[1]["actions"][0]["action"], "run_notebook");
    assert_eq!(
        value[1]["actions"][0]["notebook_parameters"]["step_config_id"],
        "only"
    );
    assert!(value[0].get("name").is_none());
}

#[test]
fn test_run_everything() {
    let project = project();
    let bundle = bundle(&project);
    let tasks = all_tasks(&project, &bundle);

    let toolbox = Toolbox::new(
        |raw: &Utf8Path, unexecuted: &Utf8Path| -> anyhow::Result<()> {
            fs::create_dir_all(unexecuted.parent().unwrap())?;
            fs::copy(raw, unexecuted)?;
            Ok(())
        },
        |_: &Utf8Path, executed: &Utf8Path, parameters: &NotebookParameters| -> anyhow::Result<()> {
            fs::write(executed, &parameters["step_config_id"])?;
            Ok(())
        },
    );

    for task in &tasks {
        for action in &task.actions {
            action.execute(&toolbox).unwrap();
        }
    }

    let run = &bundle.root_dir_output_run;
    let executed = run.join("notebooks-executed/plot/dark/100_plot.ipynb");
    assert_eq!(fs::read_to_string(executed).unwrap(), "dark");
    assert!(run.join("notebooks-executed/plot/dark/100_plot_unexecuted.ipynb").is_file());

    let readme = fs::read_to_string(run.join("README.md")).unwrap();
    assert!(readme.contains("DOIT_CONFIGURATION_FILE=demo-config-raw.yaml cargo run -- tasks"));

    let zenodo: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run.join("zenodo.json")).unwrap()).unwrap();
    assert_eq!(zenodo["metadata"]["version"], "run-1");

    assert_eq!(fs::read_to_string(run.join("demo-config-raw.yaml")).unwrap(), CONFIG);
    assert!(run.join("notebooks/000_set-seed.py").is_file());
    assert!(!run.join("notebooks/.ipynb_checkpoints").exists());
    assert!(run.join("src/main.rs").is_file());

    let checklist = generate_directory_checklist(run, None, &[]).unwrap();
    let listing = fs::read_to_string(checklist).unwrap();
    assert!(listing.contains("  README.md\n"));
    assert!(listing.contains("  notebooks-executed/plot/dark/100_plot.ipynb\n"));
    assert!(!listing.contains("checklist.chk"));

    write_complete_file(&run.join("complete.txt"), Some("done")).unwrap();
    assert_eq!(fs::read_to_string(run.join("complete.txt")).unwrap(), "done");
}

#[test]
fn test_show_configuration_task() {
    let project = project();
    let task = project.settings.show_configuration_task();

    assert_eq!(task.basename, "show_configuration");
    match &task.actions[..] {
        [Action::ShowConfiguration { settings }] => {
            assert!(settings.contains(&("run_id".to_string(), "run-1".to_string())));
        }
        other => panic!("unexpected actions {other:?}"),
    }
}
