//! CLI front end:
//!   statement-viewer search --by accountName "Jane Roe"
//!   statement-viewer statement 1234567 --from 2024-01-01 --to 2024-01-31 > jan.csv
//!   statement-viewer test

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Arg, ArgAction, ArgMatches, Command};
use statement_viewer::cache::{self, Stamped};
use statement_viewer::config::{Config, load_config};
use statement_viewer::render;
use statement_viewer::validation::{CustomerQuery, SearchCriteria, search_value};
use statement_viewer::workflow::{self, Outcome};
use statement_viewer::{SearchType, Session, StatementClient};
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn cli() -> Command {
    Command::new("statement-viewer")
        .about("Customer lookup and bank statements from a spreadsheet-backed script endpoint")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML config file (defaults to ./statement-viewer.toml if present)"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .global(true)
                .help("Backend script URL, overrides backend.base_url"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging on stderr"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("search")
                .about("Find a customer")
                .arg(
                    Arg::new("by")
                        .long("by")
                        .value_parser(["accountName", "accountNumber", "customerId"])
                        .default_value("accountName"),
                )
                .arg(Arg::new("value").required(true).value_name("VALUE")),
        )
        .subcommand(
            Command::new("autocomplete")
                .about("Suggest account names starting with a prefix")
                .arg(Arg::new("prefix").required(true).value_name("PREFIX")),
        )
        .subcommand(
            Command::new("statement")
                .about("Generate a reconciled statement as CSV")
                .arg(Arg::new("account").required(true).value_name("ACCOUNT"))
                .arg(Arg::new("from").long("from").value_name("YYYY-MM-DD"))
                .arg(Arg::new("to").long("to").value_name("YYYY-MM-DD"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Output CSV (defaults to stdout)"),
                ),
        )
        .subcommand(Command::new("test").about("Check that the backend answers"))
        .subcommand(Command::new("last").about("Show the cached customer and statement, if fresh"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = cli().get_matches();

    // ---------------------------------------------------------------- logging
    // tracing output goes to STDERR, keeping STDOUT clean for CSV / JSON
    let level = if matches.get_flag("verbose") { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&matches).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let mut cfg = load_config(matches.get_one::<String>("config").map(PathBuf::from).as_deref())?;
    if let Some(url) = matches.get_one::<String>("url") {
        cfg.backend.base_url = url.clone();
    }

    match matches.subcommand() {
        Some(("last", _)) => show_cached(&cfg),
        Some((name, sub)) => {
            cfg.backend.validate()?;
            info!(script_id = cfg.backend.script_id().unwrap_or("-"), "using backend");
            let client = StatementClient::new(&cfg.backend)?;
            let session = RefCell::new(Session::new());
            match name {
                "search" => search(&cfg, &client, &session, sub).await,
                "autocomplete" => autocomplete(&client, sub).await,
                "statement" => statement(&cfg, &client, &session, sub).await,
                "test" => test_connection(&client).await,
                other => bail!("unknown command {other}"),
            }
        }
        None => bail!("no command given"),
    }
}

async fn search(
    cfg: &Config,
    client: &StatementClient,
    session: &RefCell<Session>,
    sub: &ArgMatches,
) -> Result<()> {
    let by: SearchType = sub
        .get_one::<String>("by")
        .map(String::as_str)
        .unwrap_or("accountName")
        .parse()
        .map_err(anyhow::Error::msg)?;
    let raw = sub.get_one::<String>("value").map(String::as_str).unwrap_or_default();
    let query = CustomerQuery::new(by, raw)?;

    let outcome = workflow::search_customer(session, client, &query).await?;
    match outcome {
        Outcome::Applied(Some(customer)) => {
            render::write_customer(io::stdout().lock(), &customer)?;
            info!("Customer found successfully");
            remember(cfg, |snap| {
                snap.customer = Some(Stamped::new(customer.as_ref().clone(), Utc::now()));
            });
        }
        Outcome::Applied(None) => warn!("No matching record found"),
        Outcome::Stale => {}
    }
    Ok(())
}

async fn autocomplete(client: &StatementClient, sub: &ArgMatches) -> Result<()> {
    let prefix = sub.get_one::<String>("prefix").map(String::as_str).unwrap_or_default();
    let prefix = search_value(prefix)?;
    let suggestions = client.autocomplete_names(prefix).await?;
    info!(count = suggestions.len(), "autocomplete");
    render::write_suggestions(io::stdout().lock(), &suggestions)
}

async fn statement(
    cfg: &Config,
    client: &StatementClient,
    session: &RefCell<Session>,
    sub: &ArgMatches,
) -> Result<()> {
    let account = sub.get_one::<String>("account").map(String::as_str).unwrap_or_default();
    let criteria = SearchCriteria::new(
        account,
        sub.get_one::<String>("from").map(String::as_str),
        sub.get_one::<String>("to").map(String::as_str),
    )?;

    let outcome = workflow::generate_statement(session, client, &criteria).await?;
    let Outcome::Applied(result) = outcome else {
        return Ok(());
    };
    if result.is_empty() {
        info!("No transactions found for the selected period");
    }

    // ---------------------------------------------------------------- emit
    let sink: Box<dyn Write> = match sub.get_one::<String>("output") {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout()),
    };
    render::write_statement(sink, &result)?;
    info!("Statement generated successfully");

    remember(cfg, |snap| {
        snap.statement = Some(Stamped::new(
            (criteria.account_number().to_string(), result.as_ref().clone()),
            Utc::now(),
        ));
    });
    Ok(())
}

async fn test_connection(client: &StatementClient) -> Result<()> {
    let status = client.test_connection().await;
    if !status.success {
        bail!("Connection test failed: {}", status.message);
    }
    println!("{}", status.message);
    Ok(())
}

fn show_cached(cfg: &Config) -> Result<()> {
    let Some(path) = cfg.cache.path.as_deref() else {
        bail!("cache is disabled (cache.path is not set)");
    };
    let snap = cache::load(path, Utc::now(), cfg.cache.freshness());
    if snap.customer.is_none() && snap.statement.is_none() {
        warn!("nothing cached, or the cached data has expired");
        return Ok(());
    }

    let mut session = Session::new();
    let statement = snap.statement.map(|s| s.value);
    let account = statement.as_ref().map(|(a, _)| a.clone());
    session.restore(snap.customer.map(|c| c.value), statement.map(|(_, st)| st));

    if let Some(customer) = session.customer.current() {
        render::write_customer(io::stdout().lock(), &customer)?;
    }
    if let Some(st) = session.statement.current() {
        info!(account = account.as_deref().unwrap_or("-"), "cached statement");
        render::write_statement(io::stdout().lock(), &st)?;
    }
    Ok(())
}

/// Best-effort cache write; a failure is logged, never fatal.
fn remember(cfg: &Config, edit: impl FnOnce(&mut cache::Snapshot)) {
    let Some(path) = cfg.cache.path.as_deref() else {
        return;
    };
    if let Err(e) = cache::update(path, Utc::now(), cfg.cache.freshness(), edit) {
        warn!(error = %e, "could not update cache");
    }
}
