mod api;
mod app;
mod auth;
mod components;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod routes;
mod tui;
mod validation;

use anyhow::{Context, Result};
use api::{ApiClient, HttpTransport};
use app::App;
use auth::{Session, TokenStore};
use config::Config;
use crossterm::{
    event::DisableMouseCapture,
    terminal::{self, LeaveAlternateScreen},
};
use ratatui::prelude::{CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tui::Tui;

fn main() -> Result<()> {
    let _guard = CleanupGuard;

    let config = Config::load().context("Invalid configuration")?;
    logging::init(&config.log_path(), &config.log_filter)?;
    tracing::info!(version = config::APP_VERSION, "starting {}", config::APP_NAME);

    let base_url = config.base_url();
    if base_url.is_none() {
        tracing::warn!("HOSPUS_API_URL is not set; every request will fail");
    }

    let tokens = TokenStore::open(&config.session_db_path())
        .with_context(|| format!("Failed to open {}", config.session_db_path().display()))?;
    let transport = HttpTransport::new(config.request_timeout_secs)?;
    let client = ApiClient::new(base_url, Arc::new(transport), tokens);

    // Restoring the session may hit the network, so it happens before the
    // terminal switches to the alternate screen.
    let mut app = App::new(Session::new(client));

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut tui = Tui::new(terminal, config.tick_rate);
    tui.init()?;

    let res = app.run(&mut tui);

    tui.exit()?;

    if let Err(e) = res {
        tracing::error!(error = %e, "application error");
        eprintln!("Application Error: {e}");
    }
    Ok(())
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}
