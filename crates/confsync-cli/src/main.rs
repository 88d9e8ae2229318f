//! `confsync`: drive the configuration engine against a live backend

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use confsync_core::{ConsoleSession, EngineConfig, Outcome, PanelId, WriteThrough};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn command() -> Command {
    Command::new("confsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Client-side configuration synchronization for the console backend")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration file (.toml, .yaml or .yml)"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Backend base URL (overrides the config file)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("show").about("Print the full working configuration"))
        .subcommand(
            Command::new("get")
                .about("Print one value by JSON pointer")
                .arg(Arg::new("pointer").required(true).help("e.g. /api/ProviderA/model")),
        )
        .subcommand(
            Command::new("set")
                .about("Apply a single-field update on behalf of a panel")
                .arg(Arg::new("panel").required(true))
                .arg(Arg::new("pointer").required(true))
                .arg(Arg::new("value").required(true).help("JSON value"))
                .arg(
                    Arg::new("save")
                        .long("save")
                        .action(ArgAction::SetTrue)
                        .help("Persist right after applying"),
                ),
        )
        .subcommand(
            Command::new("save")
                .about("Persist the backend's working configuration")
                .arg(Arg::new("panel").required(true)),
        )
        .subcommand(
            Command::new("reset")
                .about("Reset the working configuration to backend defaults")
                .arg(Arg::new("panel").required(true)),
        )
        .subcommand(
            Command::new("prefs")
                .about("Show or change UI preferences")
                .arg(Arg::new("theme").long("theme"))
                .arg(Arg::new("window-mode").long("window-mode")),
        )
        .subcommand(
            Command::new("options")
                .about("List option values for panel controls")
                .subcommand_required(true)
                .subcommand(Command::new("platforms"))
                .subcommand(Command::new("categories"))
                .subcommand(Command::new("templates").arg(Arg::new("category").required(true))),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::new(),
    };
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(base_url.clone());
    }
    Ok(config)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .with_context(|| format!("missing <{name}>"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(outcome: &Outcome) -> Result<()> {
    print_json(outcome)?;
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

fn warn_if_local_only(written: &WriteThrough) {
    if let Err(e) = &written.cache {
        tracing::warn!(error = %e, "preference not cached");
    }
    if let Err(e) = &written.remote {
        tracing::warn!(error = %e, "preference kept locally only");
    }
}

async fn run(matches: ArgMatches) -> Result<()> {
    let config = load_config(&matches)?;
    let session = ConsoleSession::connect(&config)
        .await
        .context("could not start a session")?;
    let engine = session.engine();

    match matches.subcommand() {
        Some(("show", _)) => print_json(&engine.document()?)?,
        Some(("get", args)) => {
            let pointer = required(args, "pointer")?;
            match engine.get(pointer)? {
                Some(value) => print_json(&value)?,
                None => bail!("no value at {pointer}"),
            }
        }
        Some(("set", args)) => {
            let panel = PanelId::new(required(args, "panel")?.as_str());
            let pointer = required(args, "pointer")?;
            let raw = required(args, "value")?;
            let value: JsonValue =
                serde_json::from_str(raw).with_context(|| format!("value {raw:?} is not JSON"))?;

            let applied = engine.set_field(&panel, pointer, value).await;
            report(&Outcome::from_result(&applied, format!("{pointer} updated")))?;
            if args.get_flag("save") {
                let saved = engine.save(&panel).await;
                report(&Outcome::from_result(&saved, "configuration saved"))?;
            }
        }
        Some(("save", args)) => {
            let panel = PanelId::new(required(args, "panel")?.as_str());
            let saved = engine.save(&panel).await;
            report(&Outcome::from_result(&saved, "configuration saved"))?;
        }
        Some(("reset", args)) => {
            let panel = PanelId::new(required(args, "panel")?.as_str());
            let reset = engine.reset_to_defaults(&panel).await;
            report(&Outcome::from_result(
                &reset,
                "configuration reset to defaults (not yet saved)",
            ))?;
        }
        Some(("prefs", args)) => {
            let prefs = session.preferences();
            if let Some(theme) = args.get_one::<String>("theme") {
                warn_if_local_only(&prefs.set_theme(theme.clone()).await?);
            }
            if let Some(mode) = args.get_one::<String>("window-mode") {
                warn_if_local_only(&prefs.set_window_mode(mode.clone()).await?);
            }
            print_json(&prefs.get())?;
        }
        Some(("options", args)) => {
            let catalog = session.catalog();
            let list = match args.subcommand() {
                Some(("platforms", _)) => catalog.platforms().await?,
                Some(("categories", _)) => catalog.template_categories().await?,
                Some(("templates", sub)) => catalog.templates(required(sub, "category")?).await?,
                _ => bail!("unknown options list"),
            };
            print_json(list.as_slice())?;
        }
        _ => bail!("unknown command"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = command().get_matches();
    init_tracing(matches.get_flag("log-json"));
    run(matches).await
}
