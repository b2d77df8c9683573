//! redirector: CLI for editing blocked websites and syncing redirect rules.

use clap::{Parser, Subcommand};
use redirector::{
    ConfigWatcher, Editor, FileEngine, FileStore, RuleSynchronizer, SyncConfig, WatcherHandle,
    BATCH_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "redirector")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Redirect navigations to blocked websites", long_about = None)]
struct Cli {
    /// Configuration store file
    #[arg(long, env = "REDIRECTOR_STORE", default_value = "redirector.json")]
    store: PathBuf,

    /// Active rules file
    #[arg(long, env = "REDIRECTOR_RULES", default_value = "rules.json")]
    rules: PathBuf,

    /// Rules per install call
    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed default configuration and install rules
    Install,

    /// Recompute and reinstall rules from the stored configuration
    Sync,

    /// Show the stored configuration
    List,

    /// Block a website
    Add {
        /// Website, e.g. example.com or https://www.example.com/
        site: String,
    },

    /// Unblock a website
    Remove {
        /// Website to unblock
        site: String,
    },

    /// Unblock every website
    Clear,

    /// Set where blocked navigations are sent
    SetUrl {
        /// Redirect URL; https:// is added when no scheme is given
        url: String,
    },

    /// Enable or disable redirects
    Toggle,

    /// Print the rules the stored configuration produces
    Rules,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::new(&cli.store));

    match cli.command {
        Commands::List => return list(&store),
        Commands::Rules => return print_rules(&store),
        _ => {}
    }

    let synchronizer =
        RuleSynchronizer::new(FileEngine::new(&cli.rules)).with_batch_size(cli.batch_size);
    let watcher = ConfigWatcher::new(store.clone(), synchronizer);
    let (handle, thread) = watcher.spawn();

    let outcome = execute(cli.command, store, &handle);

    handle.shutdown()?;
    thread.join().map_err(|_| "watcher thread panicked")?;
    outcome
}

fn execute(
    command: Commands,
    store: Arc<FileStore>,
    handle: &WatcherHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    let editor = Editor::new(store.clone(), handle.clone());

    match command {
        Commands::Install => {
            handle.installed()?;
        }
        Commands::Sync => {
            let config = SyncConfig::load(&*store)?;
            let report = handle.request_sync(config)?;
            println!(
                "Removed {} rules, installed {} rules in {} batches",
                report.removed, report.installed, report.batches
            );
        }
        Commands::Add { site } => {
            let (domain, report) = editor.add_domain(&site)?;
            println!("Blocked {} ({} rules active)", domain, report.installed);
        }
        Commands::Remove { site } => {
            let report = editor.remove_domain(&site)?;
            println!("Unblocked {} ({} rules active)", site.trim(), report.installed);
        }
        Commands::Clear => {
            editor.clear_domains()?;
            println!("All websites cleared");
        }
        Commands::SetUrl { url } => {
            let (target, _) = editor.set_redirect_url(&url)?;
            println!("Redirecting to {}", target);
        }
        Commands::Toggle => {
            let (enabled, _) = editor.toggle()?;
            println!("Redirector {}", if enabled { "enabled" } else { "disabled" });
        }
        Commands::List | Commands::Rules => {}
    }

    Ok(())
}

fn list(store: &FileStore) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::load(store)?;

    println!("Redirect URL: {}", config.redirect_target);
    println!("Enabled: {}", config.enabled);
    if config.domains.is_empty() {
        println!("No websites blocked");
    } else {
        for domain in &config.domains {
            println!("  {}", domain);
        }
    }
    Ok(())
}

fn print_rules(store: &FileStore) -> Result<(), Box<dyn std::error::Error>> {
    let rules = SyncConfig::load(store)?.rule_set();
    println!("{}", serde_json::to_string_pretty(rules.rules())?);
    Ok(())
}
