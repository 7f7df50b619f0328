mod args;
mod auth;
mod embed;
mod output;
mod records;

use anyhow::Result;
use mailprep_lib::{SpfOptions, SpfQuery};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::output::{Printable, write_report};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let Some(cmd) = &cli.cmd else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    };

    let ok = match cmd {
        Commands::Email {
            emails,
            stdin,
            mode,
        } => emit(
            &records::EmailReport::collect(emails, *stdin, (*mode).into())?,
            &cli,
        )?,
        Commands::Classify { input } => emit(&records::ClassifyReport::new(input), &cli)?,
        Commands::Spf {
            record,
            ips,
            domain,
            max_depth,
            strict_includes,
        } => {
            let mut query = ips
                .iter()
                .fold(SpfQuery::new(), |query, ip| query.with_ip(*ip));
            if let Some(domain) = domain {
                query = query.with_domain(domain.trim().to_ascii_lowercase());
            }
            let options = SpfOptions::new()
                .with_max_include_depth(*max_depth)
                .with_implicit_include_pass(!strict_includes);
            emit(&records::SpfReport::evaluate(record, &query, options)?, &cli)?
        }
        Commands::Dkim { record } => emit(&records::DkimReport::new(record), &cli)?,
        Commands::Dmarc { record } => emit(&records::DmarcReport::new(record), &cli)?,
        Commands::Auth {
            domain,
            dkim_selectors,
            sender_ips,
            max_depth,
        } => emit(
            &auth::resolve(domain, dkim_selectors, sender_ips, *max_depth)?,
            &cli,
        )?,
        Commands::Embed {
            input,
            mode,
            parts_dir,
            base_dir,
            timeout_ms,
            user_agent,
        } => {
            let request = embed::EmbedRequest {
                input,
                mode: (*mode).into(),
                parts_dir: parts_dir.as_deref(),
                base_dir: base_dir.as_deref(),
                timeout_ms: *timeout_ms,
                user_agent: user_agent.as_deref(),
            };
            emit(&embed::run(&request)?, &cli)?
        }
        Commands::Markers { input } => emit(&embed::MarkerReport::new(input)?, &cli)?,
        Commands::Text { input } => emit(&embed::TextReport::new(input)?, &cli)?,
    };

    // exit codes: 0 ok, 2 invalid, 1 fatal
    if !ok {
        std::process::exit(2);
    }
    Ok(())
}

fn emit<T: Printable>(report: &T, cli: &Cli) -> Result<bool> {
    write_report(report, cli)?;
    Ok(report.ok())
}
