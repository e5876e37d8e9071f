//! Preview server for a built site: serves the output directory and tells
//! connected browsers to reload when it changes.

use anyhow::Result;
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

/// Websocket route pages connect to for reload signals.
pub const LIVERELOAD_PATH: &str = "/__livereload";

const RELOAD_MESSAGE: &str = "reload";
const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub host: String,
    pub port: u16,
    /// Directory to serve and watch
    pub root: PathBuf,
    /// Auto-open browser
    pub open: bool,
    /// Path fragments ignored by the watcher. A leading `*` matches any prefix.
    pub ignore: Vec<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("./build"),
            open: false,
            ignore: vec![],
        }
    }
}

impl PreviewConfig {
    pub fn address(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.ignore.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => path.ends_with(suffix),
            None => path.contains(pattern.as_str()),
        })
    }
}

pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let (reload_tx, _) = broadcast::channel::<String>(100);

        if !self.config.root.exists() {
            return Err(anyhow::anyhow!(
                "Root directory does not exist: {}",
                self.config.root.display()
            ));
        }

        let addr = self.config.address()?;
        // Bind first so a busy port fails before anything else starts
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("serving {} at http://{}", self.config.root.display(), addr);

        let state = AppState {
            reload_tx: reload_tx.clone(),
        };

        let watcher_config = self.config.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_output(watcher_config, reload_tx).await {
                tracing::error!("output watcher error: {}", e);
            }
        });

        let app = Router::new()
            .route(LIVERELOAD_PATH, get(websocket_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .with_state(state);

        if self.config.open
            && let Err(e) = open::that(format!("http://{}", addr))
        {
            tracing::warn!("failed to open browser: {}", e);
        }

        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_connection(socket, state.reload_tx))
}

async fn websocket_connection(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    if socket.send(Message::Text("connected".into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Ok(reload_msg) = msg else { break };
                if socket.send(Message::Text(reload_msg.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

async fn watch_output(config: PreviewConfig, reload_tx: broadcast::Sender<String>) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let filter = config.clone();
    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        if let Ok(events) = res {
            for event in events {
                if !filter.is_ignored(&event.path) {
                    let _ = tx.blocking_send(event.path);
                }
            }
        }
    })?;

    debouncer
        .watcher()
        .watch(&config.root, RecursiveMode::Recursive)?;
    tracing::debug!("watching output: {}", config.root.display());

    // A rebuild touches several files; collapse them into one reload
    let mut throttle = ReloadThrottle::new(MIN_RELOAD_INTERVAL);
    loop {
        let trailing = throttle.trailing_delay(Instant::now());
        tokio::select! {
            changed = rx.recv() => {
                let Some(path) = changed else { break };
                tracing::debug!("output changed: {}", path.display());
                if throttle.on_change(Instant::now()) {
                    send_reload(&reload_tx);
                }
            }
            _ = tokio::time::sleep(trailing.unwrap_or_default()), if trailing.is_some() => {
                throttle.fire_trailing(Instant::now());
                send_reload(&reload_tx);
            }
        }
    }

    Ok(())
}

fn send_reload(reload_tx: &broadcast::Sender<String>) {
    let _ = reload_tx.send(RELOAD_MESSAGE.to_string());
    tracing::info!("reloading browsers");
}

/// Limits reloads to one per interval. A change landing inside the interval
/// is not dropped: it owes one more reload once the interval has passed.
#[derive(Debug)]
struct ReloadThrottle {
    interval: Duration,
    last_reload: Option<Instant>,
    pending: bool,
}

impl ReloadThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_reload: None,
            pending: false,
        }
    }

    /// Records a change. Returns true when a reload should go out now.
    fn on_change(&mut self, now: Instant) -> bool {
        match self.last_reload {
            Some(last) if now.duration_since(last) < self.interval => {
                self.pending = true;
                false
            }
            _ => {
                self.last_reload = Some(now);
                self.pending = false;
                true
            }
        }
    }

    /// Time left before the owed reload, if one is owed.
    fn trailing_delay(&self, now: Instant) -> Option<Duration> {
        let last = self.last_reload?;
        self.pending
            .then(|| (last + self.interval).saturating_duration_since(now))
    }

    fn fire_trailing(&mut self, now: Instant) {
        self.last_reload = Some(now);
        self.pending = false;
    }
}
