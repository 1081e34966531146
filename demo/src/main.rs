mod config;
mod steps;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use nbflow::{
    ConfigBundle, CopySource, NbflowError, RunSettings, TaskSpec, Toolbox, YamlConverter,
    gen_copy_source_into_output_tasks, generate_all_tasks, generate_directory_checklist,
    load_hydrate_write_config_bundle, write_complete_file,
};

use crate::config::{Bundle, Config};

const RUN_INSTRUCTION: &str = "cargo run -- run";

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print every task of the workflow as JSON.
    Tasks,
    /// Print the settings of the run.
    Show,
    /// Run every task in order, then write a checklist of the outputs.
    Run,
}

#[derive(Parser, Debug, Clone)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

fn bundle(settings: &RunSettings) -> anyhow::Result<Bundle> {
    let run = settings.create_run_dir()?;
    let root_dir_output = settings.root_dir_output.clone();
    let run_id = settings.run_id.clone();

    let bundle = load_hydrate_write_config_bundle(
        &settings.configuration_file,
        config::load,
        |config: Config, path: Utf8PathBuf, run_dir: &Utf8Path| -> Result<Bundle, NbflowError> {
            Ok(ConfigBundle::new(run_id, config, path, root_dir_output, run_dir)?)
        },
        &run,
        &YamlConverter,
    )?;

    Ok(bundle)
}

fn tasks(settings: &RunSettings, bundle: &Bundle) -> anyhow::Result<Vec<TaskSpec>> {
    let repo_root = Utf8PathBuf::try_from(std::env::current_dir()?)?;
    let copy = CopySource::new(
        repo_root,
        &bundle.root_dir_output_run,
        &bundle.run_id,
        &settings.root_dir_raw_notebooks,
        &settings.configuration_file,
    )
    .other_files_to_copy(["Cargo.toml"])
    .raw_run_instruction(RUN_INSTRUCTION)
    .run_command(|config_file_raw, instruction| {
        format!("DEMO_CONFIGURATION_FILE={config_file_raw} {instruction}")
    });

    let steps = steps::steps();
    let mut tasks = vec![settings.show_configuration_task()];
    tasks.extend(generate_all_tasks(
        bundle,
        &settings.root_dir_raw_notebooks,
        &YamlConverter,
        &steps,
        |preceding: &[TaskSpec]| -> anyhow::Result<Vec<TaskSpec>> {
            Ok(gen_copy_source_into_output_tasks(preceding, &copy)?)
        },
    )?);

    Ok(tasks)
}

fn main() -> anyhow::Result<()> {
    nbflow::init_logging();
    let args = Args::parse();
    let settings = RunSettings::from_env("DEMO")?;

    match args.command {
        Command::Show => {
            let toolbox = Toolbox::default();
            for action in &settings.show_configuration_task().actions {
                action.execute(&toolbox)?;
            }
        }
        Command::Tasks => {
            let bundle = bundle(&settings)?;
            let tasks = tasks(&settings, &bundle)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        Command::Run => {
            let bundle = bundle(&settings)?;
            let toolbox = Toolbox::default();

            for task in tasks(&settings, &bundle)? {
                if !task.actions.is_empty() {
                    tracing::info!("Running {}", task.full_name());
                }
                for action in &task.actions {
                    action.execute(&toolbox)?;
                }
            }

            let run = &bundle.root_dir_output_run;
            generate_directory_checklist(run, None, &[])?;
            write_complete_file(&run.join("complete.txt"), None)?;
        }
    }

    Ok(())
}
