mod auth;
mod backup;
mod config;
mod db;
mod gpa;
mod ipc;
mod model;
mod reports;
mod repo;
mod store;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

fn init_tracing() {
    // stdout carries protocol replies; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() {
    init_tracing();

    let mut state = ipc::AppState::new();
    if let Ok(ws) = std::env::var("GRADEBOOK_WORKSPACE") {
        let path = PathBuf::from(ws);
        match state.open_workspace(&path) {
            Ok(()) => info!(workspace = %path.display(), "workspace opened at start-up"),
            Err(e) => warn!(workspace = %path.display(), error = %format!("{e:#}"), "start-up workspace not opened"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                ipc::bad_json(e.to_string())
            }
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.shutdown();
}
