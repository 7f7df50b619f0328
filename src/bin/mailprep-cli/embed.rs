use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mailprep_lib::{
    EmbedMode, EmbedOptions, Embedder, InlineParts, MarkerCounts, count_markers,
    html_to_plain_text,
};

use crate::output::{Report, write_all_atomically};

pub struct EmbedRequest<'a> {
    pub input: &'a Path,
    pub mode: EmbedMode,
    pub parts_dir: Option<&'a Path>,
    pub base_dir: Option<&'a Path>,
    pub timeout_ms: u64,
    pub user_agent: Option<&'a str>,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct PartSummary {
    pub content_id: String,
    pub content_type: String,
    pub size: usize,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub file: Option<PathBuf>,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct EmbedReport {
    pub mode: EmbedMode,
    pub html: String,
    pub parts: Vec<PartSummary>,
    pub markers: MarkerCounts,
}

pub fn run(request: &EmbedRequest<'_>) -> Result<EmbedReport> {
    let html = read_input(request.input)?;

    let mut options = EmbedOptions::new().with_fetch_timeout(Duration::from_millis(request.timeout_ms));
    if let Some(agent) = request.user_agent {
        options = options.with_user_agent(agent);
    }
    let base_dir = request
        .base_dir
        .map(Path::to_path_buf)
        .or_else(|| input_dir(request.input));
    if let Some(dir) = base_dir {
        options = options.with_base_dir(dir);
    }

    let embedder = Embedder::from_options(&options).context("HTTP client")?;
    let mut collected = InlineParts::new();
    let rewritten = embedder
        .embed(&html, request.mode, &mut collected)
        .context("embedding images")?;

    let mut parts = Vec::new();
    for part in collected.into_parts() {
        let file = match request.parts_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create {}", dir.display()))?;
                let path = dir.join(format!("{}.{}", part.content_id, part.subtype));
                write_all_atomically(&path, &part.bytes)?;
                Some(path)
            }
            None => None,
        };
        parts.push(PartSummary {
            content_type: part.content_type(),
            size: part.bytes.len(),
            content_id: part.content_id,
            file,
        });
    }

    Ok(EmbedReport {
        mode: request.mode,
        markers: count_markers(&rewritten).context("counting markers")?,
        html: rewritten,
        parts,
    })
}

impl Report for EmbedReport {
    fn ok(&self) -> bool {
        true
    }

    /// The rewritten document itself.
    fn human_lines(&self) -> Vec<String> {
        vec![self.html.trim_end_matches('\n').to_string()]
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[cfg_attr(feature = "with-serde", serde(transparent))]
pub struct MarkerReport {
    pub counts: MarkerCounts,
}

impl MarkerReport {
    pub fn new(input: &Path) -> Result<Self> {
        Ok(Self {
            counts: count_markers(&read_input(input)?).context("counting markers")?,
        })
    }
}

impl Report for MarkerReport {
    fn ok(&self) -> bool {
        true
    }

    fn human_lines(&self) -> Vec<String> {
        vec![format!(
            "base64={} cid={} marked={}",
            self.counts.base64, self.counts.cid, self.counts.marked
        )]
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct TextReport {
    pub text: String,
}

impl TextReport {
    pub fn new(input: &Path) -> Result<Self> {
        Ok(Self {
            text: html_to_plain_text(&read_input(input)?),
        })
    }
}

impl Report for TextReport {
    fn ok(&self) -> bool {
        true
    }

    fn human_lines(&self) -> Vec<String> {
        vec![self.text.clone()]
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("read stdin")?;
        return Ok(html);
    }
    std::fs::read_to_string(input).with_context(|| format!("read {}", input.display()))
}

fn input_dir(input: &Path) -> Option<PathBuf> {
    if input == Path::new("-") {
        return None;
    }
    input
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
