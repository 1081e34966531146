use camino::Utf8Path;
use console::style;

use crate::action::Action;
use crate::task::TaskSpec;

/// Text shown by the "show configuration" task.
pub fn format_config(settings: &[(String, String)]) -> String {
    let lines: Vec<String> = settings
        .iter()
        .map(|(k, v)| format!("\t{k}: {v}"))
        .collect();

    format!("Will run with the following config:\n{}\n", lines.join("\n"))
}

pub fn print_config(settings: &[(String, String)]) {
    let lines: Vec<String> = settings
        .iter()
        .map(|(k, v)| format!("\t{}: {v}", style(k).cyan()))
        .collect();

    println!(
        "{}\n{}\n",
        style("Will run with the following config:").bold(),
        lines.join("\n")
    );
}

/// A task which prints the settings used for the run.
pub fn gen_show_configuration_task(
    configuration_file: &Utf8Path,
    run_id: &str,
    root_dir_output: &Utf8Path,
    root_dir_raw_notebooks: &Utf8Path,
) -> TaskSpec {
    let settings = vec![
        ("configuration_file".to_string(), configuration_file.to_string()),
        ("run_id".to_string(), run_id.to_string()),
        ("root_dir_output".to_string(), root_dir_output.to_string()),
        (
            "root_dir_raw_notebooks".to_string(),
            root_dir_raw_notebooks.to_string(),
        ),
    ];

    TaskSpec {
        name: Some("Show configuration".into()),
        actions: vec![Action::ShowConfiguration { settings }],
        ..TaskSpec::base(
            "show_configuration",
            "Show the configuration being used for the run",
        )
    }
}
