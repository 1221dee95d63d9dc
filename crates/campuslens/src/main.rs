//! `campuslens` - CLI and server for the campus dashboard
//!
//! This binary runs the HTTP API, imports CSV files, and answers dashboard
//! queries from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use campuslens::cli::{
    Cli, Command, ConfigCommand, ImportCommand, OutputFormat, SearchCommand, ServeCommand,
    TimelineCommand,
};
use campuslens::storage::import::ImportRecord;
use campuslens::views::{DashboardSummary, ResolvedEntity, TimelineEntry};
use campuslens::{init_logging, Config, Store, TimelineQuery};

/// Imports listed by `stats`.
const RECENT_IMPORTS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands must work even when the configuration is broken
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(cli.config, config_cmd);
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Import(import_cmd) => handle_import(&config, import_cmd).await,
        Command::Stats(stats_cmd) => handle_stats(&config, stats_cmd.json).await,
        Command::Search(search_cmd) => handle_search(&config, search_cmd).await,
        Command::Timeline(timeline_cmd) => handle_timeline(&config, timeline_cmd).await,
        Command::Config(_) => Ok(()),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::from_config(config).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path().display()
        )
    })
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let store = open_store(&config)?;
    campuslens::server::serve(&config, store).await?;
    Ok(())
}

async fn handle_import(config: &Config, cmd: ImportCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let dataset = cmd.dataset.into();
    let summary = store
        .import(dataset, cmd.file.clone())
        .await
        .with_context(|| format!("failed to import {} into {dataset}", cmd.file.display()))?;

    println!(
        "Imported {} rows into {} ({} columns)",
        summary.rows,
        summary.table,
        summary.columns.len()
    );
    Ok(())
}

async fn handle_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;

    // Each figure is independent; one missing table must not hide the rest
    let active_entities = store.count_unique_persons().await.ok();
    let wifi_connections = store.count_unique_device_hashes().await.ok();
    let locations = store.top_locations().await.unwrap_or_default();
    let top_persons = store.top_persons().await.unwrap_or_default();
    let imports = store.recent_imports(RECENT_IMPORTS).await?;

    let summary = DashboardSummary::new(active_entities, wifi_connections, &locations, top_persons);

    if json {
        let output = serde_json::json!({
            "summary": summary,
            "recent_imports": imports,
            "database_path": store.path(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("campuslens stats");
    println!("----------------");
    println!("Database:         {}", store.path().display());
    println!("Active entities:  {}", summary.active_entities_label());
    println!("Wi-Fi devices:    {}", summary.wifi_connections_label());
    println!();
    println!("Top locations:");
    if summary.top_sources.is_empty() {
        println!("  (none)");
    }
    for (i, source) in summary.top_sources.iter().enumerate() {
        println!(
            "  {}. {:<20} {:>6} visits  {:>5.1}%",
            i + 1,
            source.name,
            source.visits,
            source.confidence
        );
    }
    println!();
    println!("First persons seen:");
    if summary.top_persons.is_empty() {
        println!("  (none)");
    }
    for person in &summary.top_persons {
        println!(
            "  {:<20} {}",
            person.person_id,
            person.first_seen.as_deref().unwrap_or("")
        );
    }
    println!();
    print_imports(&imports);
    Ok(())
}

fn print_imports(imports: &[ImportRecord]) {
    println!("Recent imports:");
    if imports.is_empty() {
        println!("  (none)");
    }
    for record in imports {
        let when = record
            .imported_at
            .map_or_else(|| "?".to_string(), |at| at.format("%Y-%m-%d %H:%M:%S").to_string());
        println!(
            "  {when}  {:<8} {:>8} rows  {}",
            record.table_name, record.row_count, record.source_path
        );
    }
}

async fn handle_search(config: &Config, cmd: SearchCommand) -> anyhow::Result<()> {
    let term = cmd.query.trim().to_string();
    anyhow::ensure!(!term.is_empty(), "search query must not be empty");

    let store = open_store(config)?;
    let profiles = store.search_profiles(term).await.context("search failed")?;
    let entities: Vec<ResolvedEntity> = profiles.iter().map(ResolvedEntity::from).collect();

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entities)?),
        OutputFormat::Table => {
            println!(
                "{:<12} {:<24} {:<10} {:<16} IDENTIFIERS",
                "ID", "NAME", "KIND", "LOCATION"
            );
            for entity in &entities {
                let identifiers = entity
                    .identifiers
                    .iter()
                    .map(|id| format!("{}={}", id.label, id.value))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{:<12} {:<24} {:<10} {:<16} {identifiers}",
                    entity.id,
                    entity.name,
                    entity.kind,
                    entity.location.as_deref().unwrap_or("-"),
                );
            }
        }
        OutputFormat::Plain => {
            for entity in &entities {
                println!("{} ({}, {})", entity.name, entity.kind, entity.id);
                for id in &entity.identifiers {
                    println!("  {}: {}", id.label, id.value);
                }
            }
        }
    }

    if cmd.format != OutputFormat::Json {
        println!("{} match(es)", entities.len());
    }
    Ok(())
}

async fn handle_timeline(config: &Config, cmd: TimelineCommand) -> anyhow::Result<()> {
    let query = TimelineQuery::new(
        Some(cmd.person_id.as_str()),
        cmd.start.as_deref(),
        cmd.end.as_deref(),
    )
    .context("person id must not be empty")?;

    let store = open_store(config)?;
    let events = store
        .activity_timeline(query)
        .await
        .context("failed to fetch activity timeline")?;
    let entries = TimelineEntry::from_events(&events);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            println!(
                "{:<20} {:<6} {:<16} DESCRIPTION",
                "TIMESTAMP", "KIND", "LOCATION"
            );
            for entry in &entries {
                println!(
                    "{:<20} {:<6} {:<16} {}",
                    entry.timestamp, entry.kind, entry.location, entry.description
                );
            }
        }
        OutputFormat::Plain => {
            for entry in &entries {
                println!(
                    "{}  {}  {}",
                    entry.timestamp, entry.location, entry.description
                );
            }
        }
    }
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_address());
                println!("  CORS origin:        {}", config.server.cors_origin);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Pool size:          {}", config.storage.pool_size);
                println!("  Acquire timeout:    {}ms", config.storage.acquire_timeout_ms);
                println!();
                println!("[Faces]");
                println!("  Image directory:    {}", config.face_image_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
