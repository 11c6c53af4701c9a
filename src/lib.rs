pub mod api;
pub mod models;
pub mod services;

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "authenex_";
const DEFAULT_LOG_KEEP: usize = 30;

fn startup_elapsed_ms() -> u128 {
    PROCESS_START
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

/// Logging knobs, read from `AUTHENEX_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
struct LogSettings {
    file_enabled: bool,
    cleanup_enabled: bool,
    dir: PathBuf,
    keep: usize,
}

impl LogSettings {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };
        let dir = lookup("AUTHENEX_LOG_DIR")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_logs_dir);
        let keep = lookup("AUTHENEX_LOG_KEEP")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOG_KEEP);

        Self {
            file_enabled: !flag("AUTHENEX_DISABLE_FILE_LOG"),
            cleanup_enabled: !flag("AUTHENEX_DISABLE_LOG_CLEANUP"),
            dir,
            keep,
        }
    }
}

/// Debug builds log next to the manifest; release builds under the user's data dir.
fn default_logs_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("logs");
    }
    dirs::data_local_dir()
        .map(|d| d.join("authenex").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Open this session's log file, returning its writer and path.
fn open_session_log(dir: &Path) -> std::io::Result<(NonBlocking, PathBuf)> {
    fs::create_dir_all(dir)?;
    let file_name = format!("{}{}.log", LOG_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let (writer, guard) = tracing_appender::non_blocking(rolling::never(dir, &file_name));
    let _ = LOG_GUARD.set(guard);
    Ok((writer, dir.join(file_name)))
}

/// Install the global subscriber: console always, plus a per-session file unless disabled.
pub fn init_logging() {
    let settings = LogSettings::from_lookup(|name| std::env::var(name).ok());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let session = if settings.file_enabled {
        match open_session_log(&settings.dir) {
            Ok(session) => Some(session),
            Err(e) => {
                eprintln!("[LOG] cannot write to {}: {}", settings.dir.display(), e);
                None
            }
        }
    } else {
        None
    };

    let (file_writer, log_path) = match session {
        Some((writer, path)) => (Some(writer), Some(path)),
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
    });
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "=== Authenex Started ===");
    match &log_path {
        Some(path) => info!("[LOG] session file: {}", path.display()),
        None => info!("[LOG] console only"),
    }

    if log_path.is_some() && settings.cleanup_enabled {
        let LogSettings { dir, keep, .. } = settings;
        std::thread::spawn(move || {
            let removed = cleanup_old_logs(&dir, keep);
            if removed > 0 {
                info!("[LOG] removed {} old session logs", removed);
            }
        });
    }
}

/// Delete all but the newest `keep` session logs. Session names embed a sortable
/// timestamp, so name order is age order. Returns how many files were removed.
fn cleanup_old_logs(logs_dir: &Path, keep: usize) -> usize {
    let Ok(read_dir) = fs::read_dir(logs_dir) else {
        return 0;
    };
    let mut sessions: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_PREFIX) && n.ends_with(".log"))
        })
        .collect();
    if sessions.len() <= keep {
        return 0;
    }

    sessions.sort();
    let excess = sessions.len() - keep;
    sessions
        .iter()
        .take(excess)
        .filter(|p| fs::remove_file(p).is_ok())
        .count()
}

/// Start the HTTP gateway and serve until ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    PROCESS_START.get_or_init(Instant::now);
    let _ = dotenvy::dotenv();

    let logging_t0 = Instant::now();
    init_logging();
    info!(startup_ms = startup_elapsed_ms(), logging_ms = logging_t0.elapsed().as_millis(), "logging.initialized");

    let config = services::load_config();
    let addr = config.server.bind_addr();
    let state = Arc::new(api::AppState::from_config(config));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(startup_ms = startup_elapsed_ms(), "[API] Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    info!("=== Authenex Exited ===");
    Ok(())
}
