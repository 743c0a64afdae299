use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

/// Extension manager: activate, install and maintain extensions
#[derive(Parser, Debug)]
#[command(name = "extman")]
#[command(about = "Discover, activate, install and uninstall extensions and keep inference backends up to date")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    
    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
    
    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,
    
    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", global = true)]
    pub log_format: Option<String>,
    
    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
    
    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,
    
    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,
    
    /// Configuration section name
    #[arg(long, value_name = "SECTION", global = true)]
    pub config_name: Option<String>,

    /// Extensions directory (overrides host.extensions-dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub extensions_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the extensions the host reports as active
    List,

    /// Activate every active extension, run load and unload hooks
    Activate,

    /// Install unpacked extension directories
    Install {
        #[arg(value_name = "DIR", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Uninstall extensions by name
    Uninstall {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// Do not relaunch after uninstalling
        #[arg(long)]
        no_reload: bool,
    },

    /// Inference backend maintenance
    #[command(subcommand)]
    Backend(BackendCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Check whether a newer backend release exists
    Check,

    /// Check, then install the newer backend release if there is one
    Update,

    /// Install a backend archive from disk
    Install {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();
    
    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }
    
    if let Some(format) = &args.log_format {
        format.parse::<crate::logging::LogFormat>().map_err(|e| anyhow::anyhow!(e))?;
    }
    
    if let Some(level) = &args.log_file_level {
        crate::logging::parse_log_level(level)?;
    }
    
    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }
    
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["extman", "list"]).command, Command::List);
        assert_eq!(
            parse(&["extman", "install", "/tmp/a", "/tmp/b"]).command,
            Command::Install { paths: vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")] }
        );
        assert_eq!(
            parse(&["extman", "uninstall", "rag", "--no-reload"]).command,
            Command::Uninstall { names: vec!["rag".to_string()], no_reload: true }
        );
        assert_eq!(
            parse(&["extman", "backend", "install", "llama.tar.gz"]).command,
            Command::Backend(BackendCommand::Install { file: PathBuf::from("llama.tar.gz") })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["extman", "activate", "--json", "--verbose"]);
        assert!(args.json);
        assert!(args.verbose);
    }

    #[test]
    fn test_missing_operands_rejected() {
        assert!(Args::try_parse_from(["extman", "install"]).is_err());
        assert!(Args::try_parse_from(["extman", "uninstall"]).is_err());
        assert!(Args::try_parse_from(["extman"]).is_err());
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&parse(&["extman", "list", "--log-format", "json"])).is_ok());
        assert!(validate_args(&parse(&["extman", "list", "-v", "-q"])).is_err());
        assert!(validate_args(&parse(&["extman", "list", "--log-format", "xml"])).is_err());
        assert!(validate_args(&parse(&["extman", "list", "--log-file-level", "debug"])).is_err());
        assert!(validate_args(&parse(&[
            "extman", "list", "--log-file", "/tmp/x.log", "--log-file-level", "loud"
        ])).is_err());
    }
}
