use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use replicheck::{verify, Credential, ExtensionFilter, SshSession, Verdicts, VerifyOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replicheck")]
#[command(
    about = "Checks whether run directories under BASE_DIR are byte-complete replicas in REMOTE_HOST:REMOTE_DIR"
)]
struct Cli {
    /// Local base directory containing the run directories
    base_dir: PathBuf,

    /// Remote host to verify against
    remote_host: String,

    /// Base directory on the remote host
    remote_dir: PathBuf,

    /// Run directory name pattern
    #[arg(short, long, default_value = "*")]
    pattern: String,

    /// Number of concurrent hashing workers
    #[arg(short = 'n', long = "connections", default_value_t = 10)]
    connections: usize,

    /// Comma-separated directory names to exclude from discovery
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Comma-separated filename suffixes to hash, applied to both sides
    #[arg(long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Remote user name (ssh configuration default when omitted)
    #[arg(long)]
    user: Option<String>,

    /// Private key file for authentication
    #[arg(short = 'i', long)]
    identity_file: Option<PathBuf>,

    /// Print the verdicts as JSON instead of the sectioned report
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let filter = if cli.extensions.is_empty() {
        ExtensionFilter::default()
    } else {
        ExtensionFilter::new(cli.extensions.clone())
    };

    let options = VerifyOptions {
        local_base: cli.base_dir.clone(),
        remote_base: cli.remote_dir.clone(),
        pattern: cli.pattern.clone(),
        ignore: cli.ignore.iter().cloned().collect::<BTreeSet<_>>(),
        filter,
        concurrency: cli.connections,
    };

    let credential = Credential {
        user: cli.user.clone(),
        identity_file: cli.identity_file.clone(),
    };

    info!(host = %cli.remote_host, "connecting");
    let session = SshSession::connect(&cli.remote_host, &credential)
        .await
        .with_context(|| format!("failed to connect to '{}'", cli.remote_host))?;
    let session = Arc::new(session);

    let verdicts = verify(Arc::clone(&session), &options).await.with_context(|| {
        format!(
            "failed to verify '{}' against '{}:{}'",
            cli.base_dir.display(),
            cli.remote_host,
            cli.remote_dir.display()
        )
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        print_report(&verdicts);
    }

    if let Ok(session) = Arc::try_unwrap(session) {
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close session cleanly");
        }
    }

    Ok(())
}

fn print_report(verdicts: &Verdicts) {
    print_section("Not found remotely", &verdicts.local_only);
    print_section("Safe to delete (matching)", &verdicts.matching);
    print_section("Incomplete on remote (divergent)", &verdicts.divergent);
    print_section("Inconclusive (task failed)", &verdicts.inconclusive);

    if verdicts.total() == 0 {
        println!("No candidate directories found.");
    } else if verdicts.fully_replicated() {
        println!("All {} local directories are complete on the remote.", verdicts.total());
    }
}

fn print_section(title: &str, names: &[String]) {
    println!("{title} ({}):", names.len());
    for name in names {
        println!("  {name}");
    }
    println!();
}
