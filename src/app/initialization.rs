//! Application initialization and configuration

use anyhow::Result;
use log::{debug, LevelFilter};
use crate::{cli, config, logging};

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = match &args.config_file {
        Some(config_file) => config::ConfigManager::load_from_file(config_file.clone())?,
        None => config::ConfigManager::load()?,
    };
    
    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }
    
    Ok(manager)
}

/// Build the logger configuration. CLI flags win over the `[base]` section.
pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Info,
            Err(e) => {
                debug!("Invalid console-level in config, using default: {}", e);
                LevelFilter::Info
            }
        }
    };
    
    let format = match args.log_format.as_deref().or_else(|| config.get_value("base", "log-format").map(String::as_str)) {
        Some(format) => format.parse::<logging::LogFormat>().map_err(|e| anyhow::anyhow!(e))?,
        None => logging::LogFormat::Text,
    };
    
    let log_file_path = args.log_file.clone()
        .or_else(|| config.get_path("base", "log-file"));
    
    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => config.get_log_level("base", "file-log-level").unwrap_or_else(|e| {
            debug!("Invalid file-log-level in config, ignoring: {}", e);
            None
        }),
    };
    
    let (destination, file_level) = match log_file_path {
        Some(path) => (logging::LogDestination::Both(path), Some(file_log_level.unwrap_or(console_level))),
        None => (logging::LogDestination::Console, None),
    };
    
    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}
