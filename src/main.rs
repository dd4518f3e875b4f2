mod app;
mod autocomplete;
mod bridge;
mod components;
mod config;
mod error;
mod event;
mod handler;
mod host;
mod logging;
mod session;
mod terminal;
#[cfg(test)]
mod test_support;
mod theme;
mod tui;
mod ui;
mod viewport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::app::App;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::event::{Event, EventHandler};
use crate::host::pty::PtyHost;
use crate::host::HostBridge;
use crate::logging::{LogConfig, LogLevel};
use crate::session::ServerRef;
use crate::tui::{install_panic_hook, Tui};

/// A terminal client for interactive remote shell sessions.
#[derive(Parser, Debug)]
#[command(name = "rterm", version, about)]
struct Cli {
    /// Configured server to open at startup (defaults to the config's
    /// default server, falling back to a local shell)
    server: Option<String>,

    /// Alternate config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Log destination (defaults to the cache directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), None);
    init_logging(&cli, &config)?;

    let server = resolve_server(&cli, &config)?;
    info!(server = %server.name, "starting");

    let host: Arc<dyn HostBridge> = Arc::new(PtyHost::new(
        config.shell_command(),
        config.history_max_entries(),
    ));

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;

    let mut events = EventHandler::new(Duration::from_millis(16));
    let mut app = App::new(config, host, events.sender(), server);

    let result = run(&mut app, &mut events, &mut tui).await;
    let restored = tui.restore();
    result.and(restored)
}

async fn run(app: &mut App, events: &mut EventHandler, tui: &mut Tui) -> error::Result<()> {
    while !app.should_quit {
        tui.terminal_mut().draw(|frame| {
            ui::render(app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(app, mouse),
            Event::Resize(_, _) => {}
            event => app.dispatch(event),
        }
    }
    Ok(())
}

fn init_logging(cli: &Cli, config: &AppConfig) -> error::Result<()> {
    let level = cli
        .log_level
        .or_else(|| config.log_level().and_then(LogLevel::parse))
        .unwrap_or_default();
    // stderr is the TUI's screen, so logs always go to a file
    let file = cli
        .log_file
        .clone()
        .or_else(|| config.log_file())
        .or_else(logging::default_log_path);
    logging::init(&LogConfig { level, file })
}

fn resolve_server(cli: &Cli, config: &AppConfig) -> error::Result<ServerRef> {
    let name = cli.server.as_deref().or_else(|| config.default_server());
    match name {
        Some(name) => config
            .find_server(name)
            .map(ServerRef::from_config)
            .ok_or_else(|| AppError::UnknownServer(name.to_string())),
        None => Ok(ServerRef::local()),
    }
}
