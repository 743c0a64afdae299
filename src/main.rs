use anyhow::Result;
use std::process;
use log::error;

use extman::extension::StaticModuleLoader;
use extman::{app, cli, logging};

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Panic: {}", panic_info);
        process::exit(101);
    }));

    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::args::parse_args();
    cli::args::validate_args(&args)?;
    
    let config_manager = app::load_configuration(&args)?;
    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;
    
    // Activations and host calls interleave on one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    
    runtime.block_on(async {
        let ctx = app::build_context(&args, &config_manager, StaticModuleLoader::new()).await?;
        app::run_command(&ctx, &args.command).await
    })
}
