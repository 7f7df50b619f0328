use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mailprep_lib::{EmbedMode, ValidationMode};

#[derive(Parser)]
#[command(name = "mailprep-cli", version, about = "SPF/DKIM/DMARC checks and inline images for HTML e-mail")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub format: OutputFormat,

    /// write the report to a file instead of stdout
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Strict,
    Relaxed,
}

impl From<ModeArg> for ValidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => ValidationMode::Strict,
            ModeArg::Relaxed => ValidationMode::Relaxed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbedModeArg {
    Base64,
    Cid,
}

impl From<EmbedModeArg> for EmbedMode {
    fn from(mode: EmbedModeArg) -> Self {
        match mode {
            EmbedModeArg::Base64 => EmbedMode::Base64,
            EmbedModeArg::Cid => EmbedMode::Cid,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate e-mail addresses
    Email {
        emails: Vec<String>,
        /// read addresses from stdin (one per line)
        #[arg(long)]
        stdin: bool,
        #[arg(long, value_enum, default_value_t = ModeArg::Strict)]
        mode: ModeArg,
    },
    /// Tell whether a string is an IPv4 or IPv6 literal or a domain
    Classify { input: String },
    /// Evaluate an SPF record for sender addresses or a domain
    Spf {
        record: String,
        /// sender address (repeatable)
        #[arg(long = "ip")]
        ips: Vec<IpAddr>,
        /// domain being checked; its A/AAAA records are used without --ip
        #[arg(long)]
        domain: Option<String>,
        #[arg(long = "max-depth", default_value_t = mailprep_lib::auth::DEFAULT_MAX_INCLUDE_DEPTH)]
        max_depth: usize,
        /// includes only count on an explicit match
        #[arg(long = "strict-includes")]
        strict_includes: bool,
    },
    /// Validate a DKIM key record
    Dkim { record: String },
    /// Validate a DMARC policy record
    Dmarc { record: String },
    /// Look up and validate the SPF, DMARC and DKIM records of a domain
    Auth {
        domain: String,
        /// DKIM selector to look up (repeatable)
        #[arg(long = "dkim-selector")]
        dkim_selectors: Vec<String>,
        /// sender address the SPF verdict is computed for (repeatable)
        #[arg(long = "sender-ip")]
        sender_ips: Vec<IpAddr>,
        #[arg(long = "max-depth", default_value_t = mailprep_lib::auth::DEFAULT_MAX_INCLUDE_DEPTH)]
        max_depth: usize,
    },
    /// Embed the images of an HTML file as data URIs or CID parts
    Embed {
        /// HTML file, `-` for stdin
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = EmbedModeArg::Cid)]
        mode: EmbedModeArg,
        /// directory the CID parts are written to
        #[arg(long = "parts-dir")]
        parts_dir: Option<PathBuf>,
        /// directory relative image paths are resolved against (default: the input's directory)
        #[arg(long = "base-dir")]
        base_dir: Option<PathBuf>,
        /// per-image fetch timeout (ms), 0 = none
        #[arg(long = "timeout", default_value_t = 10_000)]
        timeout_ms: u64,
        #[arg(long = "user-agent")]
        user_agent: Option<String>,
    },
    /// Count embedded and marked images of an HTML file
    Markers {
        /// HTML file, `-` for stdin
        input: PathBuf,
    },
    /// Plain-text alternative of an HTML file
    Text {
        /// HTML file, `-` for stdin
        input: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}
