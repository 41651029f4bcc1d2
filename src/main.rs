#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use plugin_settings::config::{ConfigStore, JsonFileStorage, load_defaults};
use plugin_settings::constants::{config as paths, window::DEFAULT_PLUGIN_NAME};
use plugin_settings::gui::{self, EguiToolkit};
use plugin_settings::layout::infer;
use plugin_settings::session::PluginSession;
use plugin_settings::toolkit::HeadlessToolkit;

#[derive(Parser, Debug)]
#[command(name = "plugin-settings", version, about = "Inspect and edit a plugin's JSON config")]
struct Cli {
    /// Shipped defaults [default: config.defaults.json next to the config file]
    #[arg(long, value_name = "FILE", global = true)]
    defaults: Option<PathBuf>,

    /// Config file [default: <config dir>/plugin-settings/config.json]
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Plugin name shown in the window title
    #[arg(long, default_value = DEFAULT_PLUGIN_NAME, global = true)]
    name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the config file's document (defaults not merged in)
    Show {
        /// Print the shipped defaults instead
        #[arg(long)]
        shipped: bool,
    },
    /// Print the value at KEY, falling back to the defaults
    Get { key: String },
    /// Set KEY to VALUE and save. VALUE is parsed as JSON, or taken as a
    /// plain string when it is not valid JSON.
    Set { key: String, value: String },
    /// Remove KEY from the config file and save
    Delete { key: String },
    /// Print the settings window inferred from the defaults
    Layout {
        /// Print as JSON instead of an outline
        #[arg(long)]
        json: bool,
    },
    /// Open the settings window
    Edit,
}

struct Paths {
    defaults: PathBuf,
    config: PathBuf,
}

impl Paths {
    fn resolve(cli: &Cli) -> Self {
        let config = cli.config.clone().unwrap_or_else(default_config_path);
        let defaults = cli
            .defaults
            .clone()
            .unwrap_or_else(|| config.with_file_name(paths::DEFAULTS_FILENAME));
        Self { defaults, config }
    }
}

fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(paths::APP_DIR);
    path.push(paths::FILENAME);
    path
}

fn open_store(paths: &Paths) -> Result<ConfigStore> {
    let defaults = load_defaults(&paths.defaults)
        .with_context(|| format!("Failed to load defaults from {}", paths.defaults.display()))?;
    let storage = Rc::new(JsonFileStorage::new(paths.config.clone()));
    ConfigStore::new(defaults, storage)
        .with_context(|| format!("Failed to load config from {}", paths.config.display()))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(&cli);

    match cli.command {
        Command::Show { shipped } => {
            let store = open_store(&paths)?;
            if shipped {
                print_json(store.defaults())
            } else {
                print_json(&store.to_document())
            }
        }
        Command::Get { key } => {
            let store = open_store(&paths)?;
            print_json(&store.get(&key)?)
        }
        Command::Set { key, value } => {
            let store = open_store(&paths)?;
            let value = parse_value(&value);
            store.set(&key, value.clone())?;
            store.save()?;
            info!(key = %key, value = %value, path = %paths.config.display(), "Saved config value");
            Ok(())
        }
        Command::Delete { key } => {
            let store = open_store(&paths)?;
            store.delete(&key)?;
            store.save()?;
            info!(key = %key, path = %paths.config.display(), "Removed config value");
            Ok(())
        }
        Command::Layout { json } => print_layout(&cli.name, &paths, json),
        Command::Edit => {
            let toolkit = Rc::new(EguiToolkit::new());
            let session = inferred_session(&cli.name, &paths, toolkit)?;
            info!(plugin = %cli.name, path = %paths.config.display(), "Opening settings window");
            gui::run_settings_window(session)
        }
    }
}

fn print_layout(name: &str, paths: &Paths, json: bool) -> Result<()> {
    let toolkit = Rc::new(HeadlessToolkit::new());
    let mut session = inferred_session(name, paths, Rc::clone(&toolkit))?;
    session
        .open_window()
        .context("Failed to build settings window")?;

    if json {
        let snapshot = toolkit.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", toolkit.outline());
    }
    session.discard()?;
    Ok(())
}

fn inferred_session<T: plugin_settings::toolkit::Toolkit>(
    name: &str,
    paths: &Paths,
    toolkit: Rc<T>,
) -> Result<PluginSession<T>> {
    let store = open_store(paths)?;
    let layout = infer::from_defaults(store.defaults())?;
    let mut session = PluginSession::new(name, store, toolkit);
    session.set_layout(layout);
    Ok(session)
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    run(Cli::parse())
}
