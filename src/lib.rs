#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod action;
mod bundle;
mod checklist;
mod complete;
mod copy;
mod display;
mod error;
mod generate;
mod hash;
mod hydrate;
mod io;
mod lookup;
mod notebook;
mod record;
mod run;
mod serialize;
mod settings;
mod step;
mod task;
mod validate;
mod value;

#[cfg(feature = "logging")]
mod logging;

pub use crate::action::{Action, Toolbox};
pub use crate::bundle::{
    ConfigBundle, ConfigBundleLike, load_hydrate_write_config_bundle,
    write_config_in_config_bundle_to_disk,
};
pub use crate::checklist::{
    CHECKLIST_FILE, Exclusion, create_digest_map, generate_directory_checklist, get_file_digest,
};
pub use crate::complete::write_complete_file;
pub use crate::copy::{
    CopySource, copy_file_default, copy_readme_default, copy_tree_default, copy_zenodo_default,
    gen_copy_source_into_output_tasks, get_run_command_default,
};
pub use crate::display::{format_config, gen_show_configuration_task, print_config};
pub use crate::error::*;
pub use crate::generate::generate_all_tasks;
pub use crate::hash::Hash32;
pub use crate::hydrate::{
    hydrate_record, hydrated_paths_under, insert_path_prefix, prefix_path, update_value,
};
pub use crate::lookup::{
    STEP_CONFIG_ID, get_config_for_step_id, get_step_config_ids, get_step_config_ids_for,
};
pub use crate::notebook::{ConfiguredNotebook, UnconfiguredNotebook};
pub use crate::record::{Fields, Record, RecordValue, record_from_value};
pub use crate::run::{
    Jupytext, NotebookExecutor, NotebookParameters, NotebookRewriter, Papermill, run_notebook,
};
pub use crate::serialize::{
    Converter, JsonConverter, Ser, YamlConverter, dumps, load_config_from_file, structure,
};
pub use crate::settings::{RunSettings, timestamp};
pub use crate::step::{ConfigureNotebooks, NotebookStep, StepTasks};
pub use crate::task::{ConfigChanged, TaskSpec};
pub use crate::validate::{
    assert_path_exists, assert_path_is_absolute, assert_path_is_subdirectory_of,
    assert_step_config_ids_are_unique, assert_step_configs_are_unique,
};
#[cfg(feature = "units")]
pub use crate::value::{Magnitude, Quantity};
pub use crate::value::{Field, NumArray, NumData, Value};

#[cfg(feature = "logging")]
pub use crate::logging::init_logging;
