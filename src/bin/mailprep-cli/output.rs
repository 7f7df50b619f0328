use std::path::Path;

#[cfg(feature = "with-serde")]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::{Cli, OutputFormat};

/// Something a subcommand reports.
pub trait Report {
    /// Whether the checked thing is valid; drives the exit code.
    fn ok(&self) -> bool;
    fn human_lines(&self) -> Vec<String>;
}

#[cfg(feature = "with-serde")]
pub trait Printable: Report + serde::Serialize {}
#[cfg(feature = "with-serde")]
impl<T: Report + serde::Serialize> Printable for T {}

#[cfg(not(feature = "with-serde"))]
pub trait Printable: Report {}
#[cfg(not(feature = "with-serde"))]
impl<T: Report> Printable for T {}

pub fn write_report<T: Printable>(report: &T, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Human => write_human(report, cli.out.as_deref()),
        OutputFormat::Json => write_json(report, cli.out.as_deref()),
    }
}

fn write_human<T: Printable>(report: &T, out: Option<&Path>) -> Result<()> {
    let mut text = report.human_lines().join("\n");
    text.push('\n');
    match out {
        Some(path) => write_all_atomically(path, text.as_bytes()),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

#[cfg(feature = "with-serde")]
fn write_json<T: Printable>(report: &T, out: Option<&Path>) -> Result<()> {
    let s = serde_json::to_string_pretty(report).context("serialize report")?;
    match out {
        Some(path) => write_all_atomically(path, s.as_bytes()),
        None => {
            println!("{s}");
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_json<T: Printable>(_: &T, _: Option<&Path>) -> Result<()> {
    bail!("--format json requires the 'with-serde' feature")
}

pub fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    let Some(name) = path.file_name() else {
        bail!("not a file path: {}", path.display());
    };
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// `[OK]` / `[INVALID]` prefix of the first human line.
pub fn status_tag(ok: bool) -> &'static str {
    if ok { "[OK]     " } else { "[INVALID]" }
}
