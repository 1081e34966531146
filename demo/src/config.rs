use camino::{Utf8Path, Utf8PathBuf};
use nbflow::{
    ConfigBundle, NbflowError, NumArray, Quantity, YamlConverter, assert_step_configs_are_unique,
    load_config_from_file,
};

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct SetSeedConfig {
        pub step_config_id: String,
        pub seed: i64,
        pub file_seed: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct MakeDrawsConfig {
        pub step_config_id: String,
        pub n_draws: i64,
        /// One mean per dimension of the draws.
        pub means: NumArray,
        pub file_draws: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct RetrieveDataConfig {
        pub step_config_id: String,
        pub source: String,
        pub offset: Quantity,
        pub file_raw_data: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct PlotConfig {
        pub step_config_id: String,
        pub colour: String,
        pub file_plot: Utf8PathBuf,
    }
}

nbflow::config_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Config {
        pub name: String,
        pub set_seed: Vec<SetSeedConfig>,
        pub make_draws: Vec<MakeDrawsConfig>,
        pub retrieve_data: Vec<RetrieveDataConfig>,
        pub plot: Vec<PlotConfig>,
    }
}

pub type Bundle = ConfigBundle<Config>;

/// Load the configuration and check that the variants of every step can be
/// told apart.
pub fn load(path: &Utf8Path) -> Result<Config, NbflowError> {
    let config: Config = load_config_from_file(path, &YamlConverter)?;

    assert_step_configs_are_unique("set_seed", &config.set_seed)?;
    assert_step_configs_are_unique("make_draws", &config.make_draws)?;
    assert_step_configs_are_unique("retrieve_data", &config.retrieve_data)?;
    assert_step_configs_are_unique("plot", &config.plot)?;

    Ok(config)
}
