mod desk;
mod display;
mod operator;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tokio::io::BufReader;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use totem_core::{
    command_channel, create_session_log, load_config, validate_config, Config, HoursRule,
    HttpConnectivity, HttpHealthProbe, HttpJobServer, JobPipeline, KioskEvent, KioskRuntime,
    MaintenanceMonitor, MaintenanceTrigger, Navigator, ScreenController, SessionLogHandle,
    SessionStore, TracingSink, UdpCommandReceiver, UdpCommandSender, DEFAULT_UDP_PORT,
};

use desk::PhotoDesk;
use display::{headless_registry, LoggingProcessUi};
use operator::Operator;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for the session log channel
const SESSION_LOG_BUFFER_SIZE: usize = 256;

/// Enter/exit animation time of headless screens
const SCREEN_ANIMATION: Duration = Duration::from_millis(250);

/// How long shutdown waits for the session log to flush
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const USAGE: &str = "usage:
  totem                        run the kiosk (config from TOTEM_CONFIG, default totem.toml)
  totem send <command> [addr]  send a UDP command (default 127.0.0.1:8000)
  totem submit <image.png>     submit one image to the job server and wait for the result

console keys while running:
  m  toggle maintenance hold     h  toggle operating-hours override   s  status
  p <image.png>  present photo   a  accept   r  reject   c  cancel submission";

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("run") => run().await,
        Some("send") => send(&args[1..]),
        Some("submit") => submit(&args[1..]).await,
        Some("-h") | Some("--help") | Some("help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => Err(anyhow::anyhow!("unknown command '{}'\n{}", other, USAGE)),
    };

    // Exit here rather than dropping the runtime, which would wait on the
    // blocking stdin read of the operator console.
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn config_path() -> PathBuf {
    std::env::var("TOTEM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("totem.toml"))
}

fn load(path: &Path) -> Result<Config> {
    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!(server = %config.server.url, "Configuration loaded successfully");
    Ok(config)
}

/// First 16 hex chars of the config's SHA-256, for the start event.
fn config_hash(config: &Config) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    digest[..16].to_string()
}

async fn build_controller(
    config: &Config,
    log: &SessionLogHandle,
    store: &SessionStore,
) -> Result<Arc<ScreenController>> {
    let names = config.screens.all_screens();
    let registry = headless_registry(&names, SCREEN_ANIMATION);
    let controller = ScreenController::new(registry, config.screens.main.clone())
        .context("Failed to create screen controller")?
        .with_session_store(store.clone())
        .with_session_log(log.clone());
    info!(screens = names.len(), main = %config.screens.main, "Screens registered");

    controller.initialize().await;
    Ok(Arc::new(controller))
}

fn build_monitor(
    config: &Config,
    navigator: Arc<dyn Navigator>,
    log: &SessionLogHandle,
) -> Result<Arc<MaintenanceMonitor>> {
    let probe = HttpHealthProbe::new(config.server.url.clone(), &config.maintenance)
        .context("Failed to create health probe")?;
    Ok(Arc::new(
        MaintenanceMonitor::new(
            config.maintenance.clone(),
            Arc::new(probe),
            navigator,
            config.screens.cta.clone(),
            config.screens.maintenance.clone(),
        )
        .with_session_log(log.clone()),
    ))
}

fn build_pipeline(
    config: &Config,
    navigator: Arc<dyn Navigator>,
    monitor: Arc<MaintenanceMonitor>,
    store: &SessionStore,
    log: &SessionLogHandle,
) -> Result<JobPipeline> {
    let server = HttpJobServer::new(config.server.url.clone(), &config.jobs)
        .context("Failed to create job server client")?;
    let connectivity =
        HttpConnectivity::new(&config.jobs).context("Failed to create connectivity check")?;

    Ok(JobPipeline::new(
        config.jobs.clone(),
        Arc::new(server),
        Arc::new(connectivity),
        navigator,
        monitor as Arc<dyn MaintenanceTrigger>,
        Arc::new(LoggingProcessUi),
    )
    .with_screens(config.screens.capture.clone(), config.screens.thank_you.clone())
    .with_processing_screen(config.screens.processing.clone())
    .with_session_store(store.clone())
    .with_session_log(log.clone()))
}

fn build_runtime(
    config: &Config,
    navigator: Arc<dyn Navigator>,
    monitor: Arc<MaintenanceMonitor>,
    log: &SessionLogHandle,
) -> KioskRuntime {
    let mut runtime = KioskRuntime::new(
        &config.runtime,
        navigator,
        monitor,
        config.screens.main.clone(),
    )
    .with_session_log(log.clone());

    for screen in config.screens.timeouts.keys() {
        if let Some(timeout) = config.screens.timeout_for(screen) {
            runtime = runtime.with_screen_timeout(screen.clone(), timeout);
        }
    }

    if let Some(hours_config) = &config.operating_hours {
        match hours_config.hours() {
            Some(hours) => {
                info!(open = %hours.open(), close = %hours.close(), "Operating hours enabled");
                runtime = runtime.with_hours(HoursRule {
                    hours,
                    closed_screen: hours_config.closed_screen.clone(),
                    check_interval: hours_config.check_interval(),
                });
            }
            None => warn!("Operating hours out of range, rule disabled"),
        }
    }

    runtime
}

async fn run() -> Result<()> {
    let config = load(&config_path())?;

    let (session_log, writer) =
        create_session_log(Arc::new(TracingSink), SESSION_LOG_BUFFER_SIZE);
    let writer_handle = tokio::spawn(writer.run());

    session_log
        .emit(KioskEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash(&config),
        })
        .await;

    let store = SessionStore::new();
    let controller = build_controller(&config, &session_log, &store).await?;
    let navigator = Arc::clone(&controller) as Arc<dyn Navigator>;

    let monitor = build_monitor(&config, Arc::clone(&navigator), &session_log)?;
    monitor.start();

    let (command_tx, command_queue) = command_channel();
    let mut receiver = UdpCommandReceiver::spawn(config.udp.bind_addr(), command_tx)
        .context("Failed to start UDP command receiver")?;
    info!(addr = %receiver.local_addr(), "Listening for UDP commands");

    let runtime = Arc::new(build_runtime(
        &config,
        Arc::clone(&navigator),
        Arc::clone(&monitor),
        &session_log,
    ));
    runtime.start(command_queue);

    let pipeline = Arc::new(build_pipeline(
        &config,
        Arc::clone(&navigator),
        Arc::clone(&monitor),
        &store,
        &session_log,
    )?);
    let desk = Arc::new(PhotoDesk::new(
        Arc::clone(&pipeline),
        Arc::clone(&navigator),
        config.screens.validation.clone(),
    ));

    let console = tokio::spawn(operator::run_console(
        BufReader::new(tokio::io::stdin()),
        Operator {
            monitor: Arc::clone(&monitor),
            runtime: Arc::clone(&runtime),
            desk: Arc::clone(&desk),
        },
    ));

    info!("Kiosk running");
    shutdown_signal().await;
    info!("Kiosk shutting down...");

    console.abort();
    let _ = console.await;
    pipeline.cancel();
    runtime.stop().await;
    monitor.stop().await;
    receiver.stop();

    session_log
        .emit(KioskEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer ends once every handle clone is gone
    drop(desk);
    drop(pipeline);
    drop(runtime);
    drop(monitor);
    drop(navigator);
    drop(controller);
    drop(session_log);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle)
        .await
        .is_err()
    {
        warn!("Session log writer did not drain in time");
    }
    info!("Kiosk stopped");

    Ok(())
}

fn send(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        bail!("missing command\n{}", USAGE);
    };
    let target = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| format!("127.0.0.1:{}", DEFAULT_UDP_PORT));
    let target: SocketAddr = target
        .parse()
        .with_context(|| format!("Invalid address '{}'", target))?;

    let sender = UdpCommandSender::new(target).context("Failed to open UDP socket")?;
    sender
        .send(command)
        .with_context(|| format!("Failed to send command to {}", target))?;
    info!(command = %command, %target, "Command sent");
    Ok(())
}

async fn submit(args: &[String]) -> Result<()> {
    let Some(image_path) = args.first() else {
        bail!("missing image path\n{}", USAGE);
    };
    let png = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read image {:?}", image_path))?;

    let config = load(&config_path())?;
    let (session_log, writer) =
        create_session_log(Arc::new(TracingSink), SESSION_LOG_BUFFER_SIZE);
    let writer_handle = tokio::spawn(writer.run());

    let store = SessionStore::new();
    let controller = build_controller(&config, &session_log, &store).await?;
    let navigator = Arc::clone(&controller) as Arc<dyn Navigator>;
    let monitor = build_monitor(&config, Arc::clone(&navigator), &session_log)?;

    let pipeline = build_pipeline(
        &config,
        Arc::clone(&navigator),
        Arc::clone(&monitor),
        &store,
        &session_log,
    )?;

    let outcome = pipeline.submit(png).await.context("Submission failed")?;
    info!(?outcome, screen = ?controller.current_screen(), "Submission finished");

    drop(pipeline);
    drop(monitor);
    drop(navigator);
    drop(controller);
    drop(session_log);
    let _ = tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle).await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
