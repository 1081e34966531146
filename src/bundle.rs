//! Run-scoped configuration bundles.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{NbflowError, ValidationError};
use crate::hydrate::{hydrated_paths_under, insert_path_prefix};
use crate::io::create_parent;
use crate::record::Record;
use crate::serialize::Converter;
use crate::validate::{assert_path_exists, assert_path_is_absolute, assert_path_is_subdirectory_of};
use crate::value::Value;

/// Everything task generation needs to know about one run.
pub trait ConfigBundleLike {
    type Config: Record;

    fn run_id(&self) -> &str;

    /// The configuration with every path made absolute.
    fn config_hydrated(&self) -> &Self::Config;

    /// Where [`ConfigBundleLike::config_hydrated`] is written.
    fn config_hydrated_path(&self) -> &Utf8Path;

    /// Output directory of this run.
    fn root_dir_output_run(&self) -> &Utf8Path;
}

/// Ready-made bundle. Construction checks that both output directories are
/// absolute and exist and that the run directory sits beneath the output
/// root.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBundle<C> {
    pub run_id: String,
    pub config_hydrated: C,
    pub config_hydrated_path: Utf8PathBuf,
    pub root_dir_output: Utf8PathBuf,
    pub root_dir_output_run: Utf8PathBuf,
}

impl<C: Record> ConfigBundle<C> {
    pub fn new(
        run_id: impl Into<String>,
        config_hydrated: C,
        config_hydrated_path: impl Into<Utf8PathBuf>,
        root_dir_output: impl Into<Utf8PathBuf>,
        root_dir_output_run: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ValidationError> {
        let root_dir_output = root_dir_output.into();
        let root_dir_output_run = root_dir_output_run.into();

        for (field, path) in [
            ("root_dir_output", &root_dir_output),
            ("root_dir_output_run", &root_dir_output_run),
        ] {
            assert_path_is_absolute(path).map_err(|e| e.in_field(field))?;
            assert_path_exists(path).map_err(|e| e.in_field(field))?;
        }
        assert_path_is_subdirectory_of("root_dir_output_run", &root_dir_output_run, &root_dir_output)?;

        Ok(Self {
            run_id: run_id.into(),
            config_hydrated,
            config_hydrated_path: config_hydrated_path.into(),
            root_dir_output,
            root_dir_output_run,
        })
    }
}

impl<C: Record> ConfigBundleLike for ConfigBundle<C> {
    type Config = C;

    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn config_hydrated(&self) -> &C {
        &self.config_hydrated
    }

    fn config_hydrated_path(&self) -> &Utf8Path {
        &self.config_hydrated_path
    }

    fn root_dir_output_run(&self) -> &Utf8Path {
        &self.root_dir_output_run
    }
}

/// Load the configuration, hydrate it with `root_dir_output_run`, create the
/// bundle and write the hydrated configuration to disk.
///
/// The hydrated file keeps the name of `configuration_file` and is placed in
/// `root_dir_output_run`. A configuration which already holds paths beneath
/// `root_dir_output_run` is refused, since hydrating it again would prefix
/// those paths twice.
pub fn load_hydrate_write_config_bundle<C, B>(
    configuration_file: &Utf8Path,
    load_configuration_file: impl FnOnce(&Utf8Path) -> Result<C, NbflowError>,
    create_config_bundle: impl FnOnce(C, Utf8PathBuf, &Utf8Path) -> Result<B, NbflowError>,
    root_dir_output_run: &Utf8Path,
    converter: &dyn Converter,
) -> Result<B, NbflowError>
where
    C: Record,
    B: ConfigBundleLike<Config = C>,
{
    let config = load_configuration_file(configuration_file)?;

    let paths = hydrated_paths_under(&config, root_dir_output_run);
    if !paths.is_empty() {
        return Err(ValidationError::AlreadyHydrated {
            prefix: root_dir_output_run.to_owned(),
            paths,
        }
        .into());
    }

    tracing::info!("Hydrating {} with {}", configuration_file, root_dir_output_run);
    let config_hydrated = insert_path_prefix(&config, root_dir_output_run)?;

    let file_name = configuration_file.file_name().unwrap_or("config.yaml");
    let config_hydrated_path = root_dir_output_run.join(file_name);

    let bundle = create_config_bundle(config_hydrated, config_hydrated_path, root_dir_output_run)?;
    write_config_in_config_bundle_to_disk(&bundle, converter)?;

    Ok(bundle)
}

/// Write the hydrated configuration of a bundle to its path.
pub fn write_config_in_config_bundle_to_disk<B: ConfigBundleLike>(
    bundle: &B,
    converter: &dyn Converter,
) -> Result<Utf8PathBuf, NbflowError> {
    let path = bundle.config_hydrated_path();
    let value = Value::Record(bundle.config_hydrated().to_record_value());
    let text = converter.dumps(&value, false)?;

    create_parent(path)?;
    fs::write(path, text)?;
    tracing::info!("Wrote hydrated configuration to {}", path);

    Ok(path.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::serialize::{YamlConverter, load_config_from_file};

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
            name: String,
            set_seed: Vec<SeedConfig>,
        }
    }

    const CONFIG: &str = "\
name: test
set_seed:
  - step_config_id: only
    seed: 2847
    file_seed: seed.txt
";

    fn setup() -> (tempfile::TempDir, Utf8PathBuf, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let configuration_file = root.join("dev-config.yaml");
        fs::write(&configuration_file, CONFIG).unwrap();
        let run = root.join("output-bundles").join("run-1");
        fs::create_dir_all(&run).unwrap();
        (dir, configuration_file, run)
    }

    fn load(path: &Utf8Path) -> Result<Config, NbflowError> {
        load_config_from_file(path, &YamlConverter)
    }

    #[test]
    fn test_load_hydrate_write() {
        let (_dir, configuration_file, run) = setup();
        let root_dir_output = run.parent().unwrap().to_owned();

        let bundle = load_hydrate_write_config_bundle(
            &configuration_file,
            load,
            |config: Config, path: Utf8PathBuf, run_dir: &Utf8Path| -> Result<_, NbflowError> {
                Ok(ConfigBundle::new("run-1", config, path, &root_dir_output, run_dir)?)
            },
            &run,
            &YamlConverter,
        )
        .unwrap();

        assert_eq!(bundle.config_hydrated_path, run.join("dev-config.yaml"));
        assert_eq!(bundle.config_hydrated.set_seed[0].file_seed, run.join("seed.txt"));

        let written: Config = load(&bundle.config_hydrated_path).unwrap();
        assert_eq!(written, bundle.config_hydrated);
    }

    #[test]
    fn test_refuses_second_hydration() {
        let (_dir, configuration_file, run) = setup();
        let root_dir_output = run.parent().unwrap().to_owned();
        let create = |config: Config,
                      path: Utf8PathBuf,
                      run_dir: &Utf8Path|
         -> Result<ConfigBundle<Config>, NbflowError> {
            Ok(ConfigBundle::new("run-1", config, path, &root_dir_output, run_dir)?)
        };

        let first = load_hydrate_write_config_bundle(&configuration_file, load, create, &run, &YamlConverter)
            .unwrap();

        let err = load_hydrate_write_config_bundle(
            &first.config_hydrated_path,
            load,
            create,
            &run,
            &YamlConverter,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            NbflowError::Validation(ValidationError::AlreadyHydrated { .. })
        ));
    }

    #[test]
    fn test_bundle_validation() {
        let (_dir, _, run) = setup();
        let config = Config {
            name: "x".into(),
            set_seed: vec![],
        };

        let err = ConfigBundle::new("run-1", config.clone(), "c.yaml", "relative", &run).unwrap_err();
        assert!(matches!(err, ValidationError::InField { .. }));

        let elsewhere = run.parent().unwrap().parent().unwrap().to_owned();
        let err = ConfigBundle::new("run-1", config, "c.yaml", &run, &elsewhere).unwrap_err();
        assert!(matches!(err, ValidationError::NotSubdirectory { .. }));
    }
}
