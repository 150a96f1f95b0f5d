use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Platform clipboard tools, tried in order until one accepts the text
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
];

/// Copy `text` to the system clipboard. Returns the name of the tool used.
pub fn copy_to_clipboard(text: &str) -> Result<&'static str> {
    let mut tried = Vec::new();

    for &(program, args) in CLIPBOARD_COMMANDS {
        match pipe_into(program, args, text) {
            Ok(()) => {
                debug!(program, bytes = text.len(), "Copied to clipboard");
                return Ok(program);
            }
            Err(e) => {
                debug!(program, error = %e, "Clipboard tool unavailable");
                tried.push(program);
            }
        }
    }

    anyhow::bail!(
        "No clipboard tool worked (tried {}). Use 'export' to save the HTML instead.",
        tried.join(", ")
    )
}

fn pipe_into(program: &str, args: &[&str], text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start {}", program))?;

    child
        .stdin
        .take()
        .context("Clipboard tool has no stdin")?
        .write_all(text.as_bytes())
        .with_context(|| format!("Failed to write to {}", program))?;

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for {}", program))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}
