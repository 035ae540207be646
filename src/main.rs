use log::{error, LevelFilter};
use std::path::PathBuf;
use std::process;

use cropmask::commands::{cli, CommandFactory, CropMaskCommandFactory};

fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") { LevelFilter::Debug } else { LevelFilter::Info };
    let log_file = matches
        .get_one::<String>("log-file")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("cropmask.log"));
    if let Err(e) = cropmask::utils::logger::Logger::init_global_logger(&log_file, level) {
        eprintln!("Error setting up logger: {}", e);
        process::exit(1);
    }

    let factory = CropMaskCommandFactory::new();
    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
