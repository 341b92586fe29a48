use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueHint};

use crate::app::{load_records, AppState, Importer, Notice, NoticeLevel};
use crate::config::{load_config, Config, StoreConfig, DEFAULT_CONFIG_PATH};
use crate::mapper::SessionMapper;
use crate::preview::Preview;
use crate::records::{format_permissions, missing_permissions, REQUIRED_PERMISSIONS};
use crate::store::HealthStore;
use crate::telemetry;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import .fit activity files into a health store", long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,

    /// Write batches into this directory instead of the configured store
    #[arg(long, global = true, value_hint = ValueHint::DirPath, conflicts_with = "store_url")]
    pub store_dir: Option<PathBuf>,

    /// Send batches to this HTTP health store instead of the configured store
    #[arg(long, global = true)]
    pub store_url: Option<String>,

    /// Print counters in Prometheus text format when done
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a file and print what would be imported
    Preview {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Decode a file and print the record batch as JSON
    Dump {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Decode a file and write it into the health store
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show granted and required store permissions
    Permissions,
}

/// Leser konfigfilen og legger deretter på miljø- og flaggoverstyringer.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.apply_env();
    if let Some(dir) = &cli.store_dir {
        config.store = StoreConfig::Dir { path: dir.clone() };
    }
    if let Some(url) = &cli.store_url {
        config.set_store_url(url.clone());
    }
    config.validate()?;
    Ok(config)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    telemetry::init_logging(config.log_level.as_deref());
    let mapper = SessionMapper::with_metadata(config.metadata());

    match &cli.command {
        Command::Preview { file } => {
            let records = load_records(file, &mapper)
                .with_context(|| format!("failed to load {}", file.display()))?;
            print!("{}", Preview::from_records(&records));
        }
        Command::Dump { file, pretty } => {
            let records = load_records(file, &mapper)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let batch = records.records();
            let json = if *pretty {
                serde_json::to_string_pretty(&batch)?
            } else {
                serde_json::to_string(&batch)?
            };
            println!("{json}");
        }
        Command::Import { file, yes } => {
            let store = config.store.open();
            let mut importer = Importer::new(store, mapper, Some(file.clone()));
            let mut confirm = |preview: &Preview| *yes || ask_confirmation(preview);
            run_import(&mut importer, &mut confirm)?;
        }
        Command::Permissions => {
            let store = config.store.open();
            print_permissions(store.as_ref())?;
        }
    }

    if cli.metrics {
        print!("{}", telemetry::gather_text());
    }
    Ok(())
}

/// Går gjennom tilstandsmaskinen fra `Checking` til en sendt (eller avvist) batch.
pub fn run_import<S: HealthStore>(
    importer: &mut Importer<S>,
    confirm: &mut dyn FnMut(&Preview) -> bool,
) -> anyhow::Result<()> {
    report(importer.check());
    if *importer.state() == AppState::RequiresPermission {
        println!("Requesting: {}", format_permissions(&REQUIRED_PERMISSIONS));
        report(importer.request_permissions());
    }

    match importer.state() {
        AppState::Missing => bail!("❌ No health store found"),
        AppState::RequiresPermission => bail!("❌ Health store permissions were not granted"),
        _ => {}
    }

    let notice = importer.load();
    let preview = match importer.loaded() {
        Some(loaded) => loaded.preview.clone(),
        None => {
            let msg = notice.map(|n| n.message).unwrap_or_else(|| "nothing loaded".into());
            bail!(msg);
        }
    };
    print!("{preview}");

    if !confirm(&preview) {
        importer.back();
        println!("Import cancelled");
        return Ok(());
    }

    match importer.send() {
        Some(n) if n.level == NoticeLevel::Info => {
            println!("{}", n.message);
            Ok(())
        }
        Some(n) => bail!(n.message),
        None => bail!("nothing to send"),
    }
}

fn report(notice: Option<Notice>) {
    if let Some(n) = notice {
        match n.level {
            NoticeLevel::Info => println!("{}", n.message),
            NoticeLevel::Error => eprintln!("{}", n.message),
        }
    }
}

fn ask_confirmation(_preview: &Preview) -> bool {
    print!("Send to the health store? [y/N] ");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_permissions(store: &dyn HealthStore) -> anyhow::Result<()> {
    let granted = store.granted_permissions()?;
    let missing = missing_permissions(&granted);
    println!("Availability: {:?}", store.availability());
    println!("Granted: {}", format_permissions(&granted));
    if missing.is_empty() {
        println!("✅ All required permissions granted");
    } else {
        println!("⚠️ Missing: {}", format_permissions(&missing));
    }
    Ok(())
}
