//! watchlog RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"history.view", "params":{"item":{"service_id":0,"url":"..."}}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Usage: `watchlog [settings.json]`. Logs go to stderr; filter with `RUST_LOG`.

use std::io::{self, Write};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use watchlog::app::App;
use watchlog::rpc_handler::handle_method;

fn respond(response: &Value) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response)?;
    stdout.flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let config_path = std::env::args().nth(1);
    let app = match App::new(config_path) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialize watchlog");
            return Err(e);
        }
    };

    respond(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))?;
    info!("watchlog ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                respond(&json!({"id": null, "error": format!("parse error: {}", e)}))?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => {
                warn!(method, error = %err, "request failed");
                json!({"id": id, "error": err})
            }
        };
        respond(&response)?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
