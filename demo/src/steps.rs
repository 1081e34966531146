use camino::Utf8PathBuf;
use nbflow::{ConfiguredNotebook, NotebookStep, UnconfiguredNotebook, get_config_for_step_id};

use crate::config::{Bundle, MakeDrawsConfig, PlotConfig, RetrieveDataConfig, SetSeedConfig};

fn notebook(path: &str, summary: &str, doc: &str) -> Vec<UnconfiguredNotebook> {
    vec![UnconfiguredNotebook::new(path, ".py", summary, doc)]
}

fn bind(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_config_id: &str,
    configure: impl Fn(ConfiguredNotebook) -> ConfiguredNotebook,
) -> Vec<ConfiguredNotebook> {
    notebooks
        .iter()
        .map(|nb| {
            configure(ConfiguredNotebook::new(
                nb.clone(),
                &bundle.config_hydrated_path,
                step_config_id,
            ))
        })
        .collect()
}

fn configure_set_seed(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: SetSeedConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;

    Ok(bind(notebooks, bundle, step_config_id, |nb| {
        nb.targets([config.file_seed.clone()])
            .with_config_value(&config)
    }))
}

fn configure_make_draws(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: MakeDrawsConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;
    let seed: SetSeedConfig = get_config_for_step_id(&bundle.config_hydrated, "set_seed", "only")?;

    Ok(bind(notebooks, bundle, step_config_id, |nb| {
        nb.dependencies([seed.file_seed.clone()])
            .targets([config.file_draws.clone()])
            .with_config_value(&config)
    }))
}

fn configure_retrieve_data(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: RetrieveDataConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;

    // the whole configuration file is a dependency here
    Ok(bind(notebooks, bundle, step_config_id, |nb| {
        nb.targets([config.file_raw_data.clone()])
    }))
}

fn configure_plot(
    notebooks: &[UnconfiguredNotebook],
    bundle: &Bundle,
    step_name: &str,
    step_config_id: &str,
) -> anyhow::Result<Vec<ConfiguredNotebook>> {
    let config: PlotConfig =
        get_config_for_step_id(&bundle.config_hydrated, step_name, step_config_id)?;

    let draws = bundle.config_hydrated.make_draws.iter().map(|c| &c.file_draws);
    let data = bundle.config_hydrated.retrieve_data.iter().map(|c| &c.file_raw_data);
    let dependencies: Vec<Utf8PathBuf> = draws.chain(data).cloned().collect();

    Ok(bind(notebooks, bundle, step_config_id, |nb| {
        nb.dependencies(dependencies.clone())
            .targets([config.file_plot.clone()])
            .with_config_value(&config)
    }))
}

/// The steps of the workflow, in the order they run.
pub fn steps() -> Vec<NotebookStep<Bundle>> {
    vec![
        NotebookStep::new(
            "set_seed",
            notebook("000_set-seed", "set seed", "Write the seed for the run"),
            configure_set_seed,
        ),
        NotebookStep::new(
            "make_draws",
            notebook("100_make-draws", "make draws", "Draw random numbers"),
            configure_make_draws,
        ),
        NotebookStep::new(
            "retrieve_data",
            notebook("200_retrieve-data", "retrieve data", "Fetch the observations"),
            configure_retrieve_data,
        ),
        NotebookStep::new(
            "plot",
            notebook("300_plot", "plot", "Plot the draws against the observations"),
            configure_plot,
        ),
    ]
}
