use std::io::{self, BufRead, Write};

use skemaklient::collaborator;
use skemaklient::config::Config;
use skemaklient::runtime::Runtime;
use slog::{error, info, o};
use sloggers::Build;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};

/// Reads one JSON `{"tool": "...", "args": {...}}` request per line from
/// stdin and writes the collaborator's `{success, result|error}` response as
/// one JSON line to stdout — the thin demo binary around the library the
/// voice-assistant collaborator actually embeds (spec §1, §6).
#[tokio::main]
async fn main() -> eyre::Result<()> {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(Severity::Info);
    builder.format(Format::Full);
    builder.destination(Destination::Stderr);
    let logger = builder.build()?;

    let _scope_guard = slog_scope::set_global_logger(logger.clone());
    slog_stdlog::init()?;

    info!(logger, "boot");

    let config = Config::load("config.toml")?;
    let runtime = Runtime::new(&config, logger.new(o!()))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(request) => {
                let tool = request.get("tool").and_then(|v| v.as_str()).unwrap_or_default();
                let args = request.get("args").cloned().unwrap_or(serde_json::Value::Null);
                collaborator::call_tool(&runtime, tool, args).await
            }
            Err(err) => {
                error!(logger, "malformed request line"; "error" => %err);
                serde_json::json!({ "success": false, "error": format!("malformed request: {err}") })
            }
        };

        writeln!(stdout, "{response}")?;
    }

    Ok(())
}
