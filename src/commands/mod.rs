//! CLI command implementations

pub mod command_traits;
pub mod plan_command;
pub mod run_command;

pub use command_traits::{Command, CommandFactory};
pub use plan_command::PlanCommand;
pub use run_command::RunCommand;

use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use log::info;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::utils::date_utils::parse_date;

fn value_arg(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name(value_name).help(help).required(false)
}

/// Command-line interface definition
pub fn cli() -> ClapCommand {
    ClapCommand::new("cropmask")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mode composite of land-cover labels, cropland mask and GeoTIFF exports for one region")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .required(false),
        )
        .arg(value_arg("region", "NAME", "Region name to select (default: Arunachal Pradesh)"))
        .arg(value_arg("attribute", "FIELD", "Boundary attribute holding region names (default: NAME_1)"))
        .arg(value_arg("start", "DATE", "First acquisition date, inclusive (YYYY-MM-DD)"))
        .arg(value_arg("end", "DATE", "Last acquisition date, exclusive (YYYY-MM-DD)"))
        .arg(value_arg("class", "CODE", "Land-cover class to mask (default: 4, crops)"))
        .arg(value_arg("boundaries", "FILE", "GeoJSON FeatureCollection of boundaries"))
        .arg(value_arg("collection", "DIR", "Directory of label GeoTIFFs"))
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory receiving the exports")
                .required(false),
        )
        .arg(value_arg("preview", "FILE", "Write a PNG preview of the map view"))
        .arg(value_arg("compression", "NAME", "Export compression (none, deflate, zstd)"))
        .arg(
            Arg::new("show-composite")
                .long("show-composite")
                .help("Show the classified composite on the map preview")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-stats")
                .long("no-stats")
                .help("Skip the per-class statistics files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Resolve the region, list the images and plan the exports without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Log file")
                .default_value("cropmask.log"),
        )
}

/// Builds the configuration from `--config` and the override flags
pub fn config_from_args(args: &ArgMatches) -> PipelineResult<PipelineConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => PipelineConfig::load(&PathBuf::from(path))?,
        None => PipelineConfig::default(),
    };

    if let Some(region) = args.get_one::<String>("region") {
        config.region = region.clone();
    }
    if let Some(attribute) = args.get_one::<String>("attribute") {
        config.name_attribute = attribute.clone();
    }
    if let Some(start) = args.get_one::<String>("start") {
        config.start = parse_date(start)?;
    }
    if let Some(end) = args.get_one::<String>("end") {
        config.end = parse_date(end)?;
    }
    if let Some(class) = args.get_one::<String>("class") {
        config.target_class = class
            .parse::<u8>()
            .map_err(|_| PipelineError::InvalidParameter(format!("Invalid class code: {}", class)))?;
    }
    if let Some(path) = args.get_one::<String>("boundaries") {
        config.boundaries = PathBuf::from(path);
    }
    if let Some(path) = args.get_one::<String>("collection") {
        config.collection = PathBuf::from(path);
    }
    if let Some(path) = args.get_one::<String>("output-dir") {
        config.output_dir = PathBuf::from(path);
    }
    if let Some(path) = args.get_one::<String>("preview") {
        config.preview = Some(PathBuf::from(path));
    }
    if let Some(compression) = args.get_one::<String>("compression") {
        config.set_compression(compression);
    }
    if args.get_flag("show-composite") {
        config.show_composite = true;
    }
    if args.get_flag("no-stats") {
        config.write_stats = false;
    }

    config.validate()?;
    info!(
        "Region '{}', {}..{}, class {}, {} export(s)",
        config.region,
        config.start,
        config.end,
        config.target_class,
        config.exports.len()
    );
    Ok(config)
}

/// Picks the run or the dry-run command
pub struct CropMaskCommandFactory;

impl CropMaskCommandFactory {
    pub fn new() -> Self {
        CropMaskCommandFactory
    }
}

impl Default for CropMaskCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for CropMaskCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> PipelineResult<Box<dyn Command>> {
        let config = config_from_args(args)?;
        if args.get_flag("dry-run") {
            Ok(Box::new(PlanCommand::new(config)))
        } else {
            Ok(Box::new(RunCommand::new(config)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn defaults_without_flags() {
        let args = cli().try_get_matches_from(["cropmask"]).unwrap();
        let config = config_from_args(&args).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn flags_override_the_configuration() {
        let args = cli()
            .try_get_matches_from([
                "cropmask", "--region", "Assam", "--start", "2021-01-01", "--end", "20220101",
                "--class", "6", "--compression", "zstd", "--no-stats", "-o", "out",
            ])
            .unwrap();
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.region, "Assam");
        assert_eq!(config.end, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(config.target_class, 6);
        assert!(config.exports.iter().all(|e| e.compression == "zstd"));
        assert!(!config.write_stats);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let args = cli().try_get_matches_from(["cropmask", "--class", "crops"]).unwrap();
        assert!(matches!(config_from_args(&args), Err(PipelineError::InvalidParameter(_))));

        let args = cli().try_get_matches_from(["cropmask", "--start", "2021-06-01", "--end", "2021-01-01"]).unwrap();
        assert!(matches!(config_from_args(&args), Err(PipelineError::InvalidDate(_))));

        let args = cli().try_get_matches_from(["cropmask", "--compression", "lzw"]).unwrap();
        assert!(config_from_args(&args).is_err());
    }

    #[test]
    fn dry_run_is_selected_by_flag() {
        let args = cli().try_get_matches_from(["cropmask", "--dry-run"]).unwrap();
        assert!(CropMaskCommandFactory::new().create_command(&args).is_ok());
    }
}
