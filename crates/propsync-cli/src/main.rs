use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use propsync_core::{
    BannerBoard, FormPage, FormSync, LoadReport, PropertyData, PropertyRecords, StateKey,
    SyncConfig,
};
use propsync_store::{FirebaseStore, MemoryStore, RemoteStore};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Records = PropertyRecords<Arc<dyn RemoteStore>>;

fn cli() -> Command {
    Command::new("propsync")
        .version(propsync_core::VERSION)
        .about("Sync property contact forms with the remote property store")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Use an in-process store instead of the remote database"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .requires("memory")
                .value_parser(value_parser!(PathBuf))
                .help("JSON tree to seed the in-process store with"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("load")
                .about("Populate a page from stored data")
                .arg(page_arg())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the populated page here instead of over the input"),
                )
                .arg(
                    Arg::new("watch")
                        .long("watch")
                        .action(ArgAction::SetTrue)
                        .help("Keep the page in step with every stored change"),
                ),
        )
        .subcommand(
            Command::new("submit")
                .about("Save every card of a page")
                .arg(page_arg()),
        )
        .subcommand(
            Command::new("dump")
                .about("Print stored property data as JSON")
                .arg(
                    Arg::new("state")
                        .long("state")
                        .help("Only this state"),
                ),
        )
        .subcommand(
            Command::new("put")
                .about("Replace the stored record of one property")
                .arg(Arg::new("state").long("state").required(true))
                .arg(Arg::new("property").long("property").required(true))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON object of role → value"),
                ),
        )
}

fn page_arg() -> Arg {
    Arg::new("page")
        .long("page")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Page document (.json, .yaml or .yml)")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<SyncConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    }
    .with_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open_store(config: &SyncConfig, matches: &ArgMatches) -> Result<Arc<dyn RemoteStore>> {
    if !matches.get_flag("memory") {
        let store = FirebaseStore::new(&config.store).context(
            "cannot open the remote store; set store.database_url, PROPSYNC_DATABASE_URL or pass --memory",
        )?;
        return Ok(Arc::new(store));
    }
    let store = match matches.get_one::<PathBuf>("seed") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading seed {}", path.display()))?;
            let tree = serde_json::from_str(&text)
                .with_context(|| format!("parsing seed {}", path.display()))?;
            MemoryStore::with_value(tree)
        }
        None => MemoryStore::new(),
    };
    tracing::info!("Using in-process store");
    Ok(Arc::new(store))
}

async fn load(records: Records, config: &SyncConfig, args: &ArgMatches) -> Result<()> {
    let input = args.get_one::<PathBuf>("page").context("--page is required")?;
    let out = args.get_one::<PathBuf>("out").unwrap_or(input).clone();
    let mut page = FormPage::load(input)?;
    let sync = FormSync::new(records, Arc::new(config.banner_board()))
        .with_roles(config.role_table());

    if !args.get_flag("watch") {
        let report = sync.load_once(&mut page).await?;
        page.save(&out)?;
        report_skipped(&report);
        println!(
            "Populated {} properties ({} fields) into {}",
            report.matched.len(),
            report.fields_written,
            out.display()
        );
        return Ok(());
    }

    let watching = sync.watch(&mut page, |page, outcome| {
        match outcome {
            Ok(report) => match page.save(&out) {
                Ok(()) => {
                    report_skipped(&report);
                    println!(
                        "Re-rendered {} properties into {}",
                        report.matched.len(),
                        out.display()
                    );
                }
                Err(e) => {
                    tracing::error!("Cannot save {}: {}", out.display(), e);
                    return ControlFlow::Break(());
                }
            },
            Err(e) => eprintln!("{e}"),
        }
        ControlFlow::Continue(())
    });
    tokio::select! {
        result = watching => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Stopped watching"),
    }
    Ok(())
}

fn report_skipped(report: &LoadReport) {
    for issue in &report.issues {
        eprintln!("skipped {}: {}", issue.path, issue.reason);
    }
    for entry in &report.mismatched {
        eprintln!("skipped {entry}: stored shape does not fit the role");
    }
}

async fn submit(records: Records, config: &SyncConfig, args: &ArgMatches) -> Result<bool> {
    let path = args.get_one::<PathBuf>("page").context("--page is required")?;
    let page = FormPage::load(path)?;
    let board = BannerBoard::persistent();
    let sync = FormSync::new(records, Arc::new(board.clone())).with_roles(config.role_table());

    let report = sync.submit(&page).await?;
    if let Some(banner) = board.current() {
        println!("{}", banner.message);
    }
    Ok(report.all_saved())
}

async fn dump(records: Records, args: &ArgMatches) -> Result<()> {
    let (json, issues) = match args.get_one::<String>("state") {
        Some(state) => {
            let snapshot = records
                .property_data_by_state(&StateKey::new(state.as_str())?)
                .await?;
            (serde_json::to_string_pretty(&snapshot.data)?, snapshot.issues)
        }
        None => {
            let snapshot = records.all_property_data().await?;
            (serde_json::to_string_pretty(&snapshot.data)?, snapshot.issues)
        }
    };
    for issue in issues {
        eprintln!("skipped {}: {}", issue.path, issue.reason);
    }
    println!("{json}");
    Ok(())
}

async fn put(records: Records, args: &ArgMatches) -> Result<()> {
    let state = args.get_one::<String>("state").context("--state is required")?;
    let property = args
        .get_one::<String>("property")
        .context("--property is required")?;
    let file = args.get_one::<PathBuf>("file").context("--file is required")?;

    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let data: PropertyData = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a role → value object", file.display()))?;

    records
        .write_property_data(&StateKey::new(state.as_str())?, property, &data)
        .await?;
    println!("Wrote {} roles to {}/{}", data.len(), state, property);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let store = open_store(&config, &matches)?;
    let records = PropertyRecords::with_root(store, &config.store.root)
        .with_context(|| format!("invalid store root '{}'", config.store.root))?;

    match matches.subcommand() {
        Some(("load", args)) => load(records, &config, args).await,
        Some(("submit", args)) => {
            let saved = submit(records, &config, args).await?;
            std::process::exit(if saved { 0 } else { 1 });
        }
        Some(("dump", args)) => dump(records, args).await,
        Some(("put", args)) => put(records, args).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["propsync", "submit", "--page", "p.yaml", "--memory"])
            .unwrap();
        assert!(matches.get_flag("memory"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "submit");
        assert_eq!(
            args.get_one::<PathBuf>("page"),
            Some(&PathBuf::from("p.yaml"))
        );
    }

    #[test]
    fn seed_requires_memory() {
        let err = cli()
            .try_get_matches_from(["propsync", "--seed", "tree.json", "dump"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn put_requires_all_arguments() {
        assert!(cli()
            .try_get_matches_from(["propsync", "put", "--state", "Delaware"])
            .is_err());
    }

    #[tokio::test]
    async fn put_then_dump_against_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("westover.json");
        std::fs::write(&file, r#"{"unit-101": "101", "accountant": {"name": "Jane Doe"}}"#)
            .unwrap();

        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let records = PropertyRecords::new(Arc::clone(&store));
        let matches = cli()
            .try_get_matches_from([
                "propsync",
                "put",
                "--state",
                "Delaware",
                "--property",
                "Westover Pointe",
                "--file",
                file.to_str().unwrap(),
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        put(records, args).await.unwrap();

        let records = PropertyRecords::new(store);
        let snapshot = records
            .property_data_by_state(&StateKey::new("Delaware").unwrap())
            .await
            .unwrap();
        assert_eq!(snapshot.data["Westover Pointe"].len(), 2);
    }
}
