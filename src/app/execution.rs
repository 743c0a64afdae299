//! Command execution

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use uuid::Uuid;

use crate::backend::{BackendUpdateStore, BackendUpdater};
use crate::cli::output::{self, Palette};
use crate::cli::{Args, BackendCommand, Command};
use crate::config::ConfigManager;
use crate::extension::{
    CapabilityQuery, ExtensionManager, FileHost, HttpResolver, InstallOutcome, LocationResolver,
    NativeResolver, StaticModuleLoader,
};
use crate::notifications::{
    AsyncNotificationManager, CallbackSubscriber, ExtensionEvent, NotificationEvent, NotificationManager,
};

/// Everything a command needs, wired from configuration
pub struct AppContext {
    pub manager: Arc<ExtensionManager>,
    pub host: Arc<FileHost>,
    pub events: AsyncNotificationManager<ExtensionEvent>,
    pub updater: BackendUpdater,
    pub palette: Palette,
    pub json: bool,
}

/// Wire host, resolver, loader, event bus and backend updater.
pub async fn build_context(args: &Args, config: &ConfigManager, loader: StaticModuleLoader) -> Result<AppContext> {
    let extensions_dir = match &args.extensions_dir {
        Some(dir) => dir.clone(),
        None => config.get_extensions_dir()?,
    };
    fs::create_dir_all(&extensions_dir)
        .with_context(|| format!("Failed to create extensions directory: {}", extensions_dir.display()))?;
    debug!("Using extensions directory {}", extensions_dir.display());

    let resolver: Arc<dyn LocationResolver> = match config.get_base_url() {
        Some(base_url) => {
            info!("Resolving extension locations against {}", base_url);
            Arc::new(HttpResolver::new(base_url).with_extensions_dir(extensions_dir.clone()))
        }
        None => Arc::new(NativeResolver),
    };

    let events = AsyncNotificationManager::<ExtensionEvent>::new();
    let trace_id = format!("cli-{}", Uuid::now_v7());
    events
        .subscribe(Arc::new(CallbackSubscriber::new(trace_id, |event: ExtensionEvent| {
            debug!("{}: {:?}", event.event_name(), event);
        })))
        .await
        .context("Failed to subscribe event trace")?;

    let host = Arc::new(FileHost::new(&extensions_dir));
    let manager = Arc::new(
        ExtensionManager::new(Arc::new(loader))
            .with_host(host.clone())
            .with_resolver(resolver)
            .with_events(events.clone()),
    );

    let store = BackendUpdateStore::new().with_events(events.clone());
    let query: Arc<dyn CapabilityQuery> = manager.clone();
    let updater = BackendUpdater::new(query, store).with_engine_name(config.get_engine_name());

    Ok(AppContext {
        manager,
        host,
        events,
        updater,
        palette: Palette::new(args.no_color),
        json: args.json,
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to render JSON")?);
    Ok(())
}

pub async fn run_command(ctx: &AppContext, command: &Command) -> Result<()> {
    match command {
        Command::List => {
            let descriptors = ctx.manager.get_active().await;
            if ctx.json {
                print_json(&output::descriptors_json(&descriptors))?;
            } else {
                println!("{}", output::format_descriptors(&descriptors, ctx.palette));
            }
        }

        Command::Activate => {
            let report = ctx.manager.register_active().await;
            let loaded = ctx.manager.load().await;
            let unloaded = ctx.manager.unload().await;
            if ctx.json {
                print_json(&output::activation_report_json(&report))?;
            } else {
                println!("{}", output::format_activation_report(&report, ctx.palette));
                println!("{}", output::format_lifecycle_report(&loaded, ctx.palette));
                println!("{}", output::format_lifecycle_report(&unloaded, ctx.palette));
            }
        }

        Command::Install { paths } => {
            let specs: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
            match ctx.manager.install(&specs).await {
                InstallOutcome::Cancelled => println!("{}", ctx.palette.warning("Install cancelled")),
                InstallOutcome::Unavailable => bail!("Extension install failed, see log for details"),
                InstallOutcome::Installed(descriptors) => {
                    if ctx.json {
                        print_json(&output::descriptors_json(&descriptors))?;
                    } else {
                        println!("{}", output::format_descriptors(&descriptors, ctx.palette));
                    }
                }
            }
        }

        Command::Uninstall { names, no_reload } => {
            if !ctx.manager.uninstall(names, !no_reload).await {
                bail!("Failed to uninstall {}", names.join(", "));
            }
            println!("{} {}", ctx.palette.success("Uninstalled"), names.join(", "));
            if ctx.host.relaunch_requested() {
                println!("Relaunch requested");
            }
        }

        Command::Backend(backend) => {
            ctx.manager.register_active().await;
            ctx.manager.load().await;
            let result = run_backend_command(ctx, backend).await;
            ctx.manager.unload().await;
            result?;
        }
    }

    ctx.events.shutdown().await.ok();
    Ok(())
}

async fn run_backend_command(ctx: &AppContext, command: &BackendCommand) -> Result<()> {
    let updater = &ctx.updater;
    updater.refresh_auto_update_setting().await;

    match command {
        BackendCommand::Check => {
            updater.check_for_update(true).await;
        }
        BackendCommand::Update => {
            if updater.check_for_update(true).await.is_some() {
                updater.update_backend().await.context("Backend update failed")?;
            }
        }
        BackendCommand::Install { file } => {
            let path: PathBuf = file.canonicalize()
                .with_context(|| format!("Backend archive not found: {}", file.display()))?;
            updater.install_backend(&path.to_string_lossy()).await
                .context("Backend install failed")?;
            println!("{} {}", ctx.palette.success("Installed backend from"), path.display());
            return Ok(());
        }
    }

    let state = updater.state();
    if ctx.json {
        print_json(&serde_json::to_value(&state).context("Failed to render backend state")?)?;
    } else {
        println!("{}", output::format_backend_state(&state, ctx.palette));
    }
    Ok(())
}
