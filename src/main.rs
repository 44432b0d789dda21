use std::fs::OpenOptions;
use std::path::PathBuf;

use redrelay::Error;
use redrelay::Orchestrator;
use redrelay::Result;
use redrelay::Settings;
use redrelay::TokioLifecycle;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let settings = Settings::load(config_path.as_deref())?;

    // Initializing Logs
    let _guard = init_observability(settings.log.dir.clone())?;

    let mut orchestrator = Orchestrator::new(TokioLifecycle);

    // First startup: a failure here terminates the process with a non-zero
    // exit status.
    orchestrator.reconfigure(&settings)?;
    info!("relay started, send SIGHUP to reload the configuration");

    let mut sighup = signal(SignalKind::hangup()).map_err(|e| Error::Fatal(e.to_string()))?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(e.to_string()))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(e.to_string()))?;

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                info!("SIGHUP detected, reloading configuration");
                reload(&mut orchestrator, config_path.as_deref());
            }
            _ = sigint.recv() => {
                info!("SIGINT detected.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM detected.");
                break;
            }
        }
    }

    println!("Exiting program.");
    Ok(())
}

/// A reload failure is reported and leaves the previous configuration
/// actively serving.
fn reload(
    orchestrator: &mut Orchestrator<TokioLifecycle>,
    config_path: Option<&str>,
) {
    let settings = match Settings::load(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("reload aborted, configuration did not load: {:?}", e);
            return;
        }
    };

    if let Err(e) = orchestrator.reconfigure(&settings) {
        error!("reload failed, previous instance keeps serving: {:?}", e);
    }
}

fn init_observability(log_dir: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(env_filter);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir).map_err(|e| Error::Fatal(e.to_string()))?;
            let log_file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(dir.join("relay.log"))
                .map_err(|e| Error::Fatal(e.to_string()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking);

            tracing_subscriber::registry().with(stdout_layer).with(file_layer).init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(stdout_layer).init();
            Ok(None)
        }
    }
}
