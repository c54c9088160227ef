//! Console transport: one conversation on stdin/stdout, driven by the same
//! engine as the HTTP server. Accepted exports are written as JSON recap files.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cotation_core::flows::messages;
use cotation_core::recap::RecapRecord;
use cotation_core::{QuoteEngine, Session};
use uuid::Uuid;

use crate::commands::{load_runtime, CommandResult, EXIT_IO};

pub const CONSOLE_SESSION_ID: &str = "console";

#[derive(Debug, Default)]
pub struct ConsoleSummary {
    pub turns: u32,
    pub exports: Vec<PathBuf>,
}

pub fn run(export_dir: &Path) -> CommandResult {
    let (config, tables) = match load_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let engine = QuoteEngine::new(Arc::new(tables), config.clock());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    match converse(&engine, stdin.lock(), &mut output, export_dir) {
        Ok(summary) => CommandResult::success(
            "chat",
            format!(
                "session ended after {} turns, {} recap(s) exported",
                summary.turns,
                summary.exports.len()
            ),
        ),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), EXIT_IO),
    }
}

/// Runs turns until `input` is exhausted. Blank lines are ignored.
pub fn converse<R, W>(
    engine: &QuoteEngine,
    input: R,
    output: &mut W,
    export_dir: &Path,
) -> Result<ConsoleSummary>
where
    R: BufRead,
    W: Write,
{
    let mut session = Session::new(CONSOLE_SESSION_ID);
    let mut summary = ConsoleSummary::default();
    writeln!(output, "{}\n", messages::WELCOME).context("failed to write to console")?;

    for line in input.lines() {
        let line = line.context("failed to read console input")?;
        if line.trim().is_empty() {
            continue;
        }

        let turn = engine.handle_turn(&mut session, &line);
        summary.turns += 1;
        for message in &turn.messages {
            writeln!(output, "{message}\n").context("failed to write to console")?;
        }

        if let Some(recap) = turn.export {
            let path = write_recap(&recap, export_dir)?;
            writeln!(output, "Récapitulatif exporté : {}\n", path.display())
                .context("failed to write to console")?;
            summary.exports.push(path);
        }
    }

    output.flush().context("failed to flush console")?;
    Ok(summary)
}

fn write_recap(recap: &RecapRecord, export_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(export_dir)
        .with_context(|| format!("failed to create export directory `{}`", export_dir.display()))?;

    let file_name = format!("cotation_{}_{}.json", recap.product.id(), Uuid::new_v4().simple());
    let path = export_dir.join(file_name);
    let body = serde_json::to_string_pretty(recap).context("failed to serialize recap")?;
    fs::write(&path, body).with_context(|| format!("failed to write `{}`", path.display()))?;
    Ok(path)
}
