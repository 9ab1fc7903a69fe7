//! Space Runtime
//!
//! Command-line front end for scene documents:
//!
//! ```bash
//! # Metadata, node count and validation findings
//! space inspect lobby.json
//!
//! # Which resolver tier each node's asset comes from
//! space resolve https://spaces.example.com/lobby.json
//!
//! # Import into the in-memory scene graph, print it, re-export it
//! space import lobby.json --export lobby.out.json
//! ```
//!
//! Logging follows `SPACE_LOG` (or `RUST_LOG`), default `info`.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use space_asset::{AssetLoader, AssetResolver};
use space_document::{ComponentSpec, Document};
use space_event::{
    AssetLoadCompleted, AssetLoadFailed, AssetLoadStarted, EventBus, SceneLoadCompleted,
    SceneLoadFailed, SkyboxLoadCompleted, SkyboxLoadFailed,
};
use space_scene::{ReplacePolicy, SceneError, SceneGraph, Session};

use crate::config::{Overrides, RuntimeConfig};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "space")]
#[command(about = "Inspect, resolve and import portable scene documents")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, global = true, env = "SPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum concurrent asset loads (0 = unbounded)
    #[arg(long, global = true)]
    max_loads: Option<usize>,

    /// What happens to the previous scene on reload
    #[arg(long, global = true)]
    replace_policy: Option<ReplacePolicy>,

    /// Timeout for remote requests in seconds (0 = none)
    #[arg(long, global = true)]
    http_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show document metadata, node count and validation findings
    Inspect {
        /// File path or absolute URL
        document: String,
    },
    /// Show where each node's external asset would be loaded from
    Resolve {
        /// File path or absolute URL
        document: String,
    },
    /// Import into an in-memory scene and print the hierarchy
    Import {
        /// File path or absolute URL
        document: String,

        /// Re-export the imported scene to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Treat this script identifier as trusted (repeatable)
        #[arg(long = "allow-script")]
        allow_script: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::from_file_or_default(args.config.as_deref())?;
    let rejected = config.apply_process_env();
    let allow_script = match &args.command {
        Command::Import { allow_script, .. } => allow_script.clone(),
        _ => Vec::new(),
    };
    config.apply_overrides(&Overrides {
        max_concurrent_loads: args.max_loads,
        replace_policy: args.replace_policy,
        http_timeout_secs: args.http_timeout,
        debug: args.debug,
        script_allow_list: allow_script,
    });

    init_logging(config.debug);
    for message in rejected {
        log::warn!("Ignoring environment override: {}", message);
    }
    config.print_summary();

    let events = Arc::new(EventBus::new());
    log_events(&events);
    let loader = AssetLoader::new(config.loader_config(), events)?;

    match args.command {
        Command::Inspect { document } => inspect(&loader, &document).await,
        Command::Resolve { document } => resolve(&loader, &document).await,
        Command::Import { document, export, .. } => import(loader, &config, &document, export).await,
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env = if std::env::var_os("SPACE_LOG").is_some() {
        env_logger::Env::new().filter("SPACE_LOG")
    } else {
        env_logger::Env::default().default_filter_or(default_level)
    };
    env_logger::Builder::from_env(env).init();
}

/// Mirror lifecycle events into the log
fn log_events(events: &EventBus) {
    events.subscribe(|e: &AssetLoadStarted| log::debug!("Events: asset {} started ({})", e.asset_id, e.path_or_url));
    events.subscribe(|e: &AssetLoadCompleted| {
        log::debug!("Events: asset {} completed as '{}'", e.asset_id, e.root_name)
    });
    events.subscribe(|e: &AssetLoadFailed| log::debug!("Events: asset {} failed: {}", e.asset_id, e.error));
    events.subscribe(|e: &SkyboxLoadCompleted| {
        log::debug!("Events: skybox {} ({}x{})", e.path_or_url, e.width, e.height)
    });
    events.subscribe(|e: &SkyboxLoadFailed| log::debug!("Events: skybox {} failed: {}", e.path_or_url, e.error));
    events.subscribe(|e: &SceneLoadCompleted| {
        log::info!("Events: scene '{}' ready with {} nodes", e.scene_name, e.node_count)
    });
    events.subscribe(|e: &SceneLoadFailed| log::error!("Events: scene {} failed: {}", e.path_or_url, e.error));
}

async fn read_document(loader: &AssetLoader, path_or_url: &str) -> CliResult<Document> {
    let location = loader
        .classify(path_or_url)
        .ok_or_else(|| SceneError::Unlocatable(path_or_url.to_string()))?;
    let bytes = loader.fetch(&location).await?;
    Ok(Document::from_slice(&bytes)?)
}

async fn inspect(loader: &AssetLoader, path_or_url: &str) -> CliResult<()> {
    let document = read_document(loader, path_or_url).await?;
    let metadata = &document.metadata;

    println!("Name:        {}", metadata.name);
    if !metadata.description.is_empty() {
        println!("Description: {}", metadata.description);
    }
    if !metadata.author.is_empty() {
        println!("Author:      {}", metadata.author);
    }
    println!(
        "Rating:      {}{}",
        metadata.content_rating,
        if metadata.adult_content { " (adult content)" } else { "" }
    );
    println!("Language:    {}", metadata.primary_language);
    println!("Local base:  {}", metadata.local_base_dir.as_deref().unwrap_or("-"));
    println!("Remote base: {}", metadata.remote_base_url.as_deref().unwrap_or("-"));
    println!("Skybox:      {}", metadata.skybox.as_deref().unwrap_or("-"));
    println!("Nodes:       {}", document.nodes.len());

    let components: usize = document.nodes.iter().map(|n| n.components.len()).sum();
    let unknown = document
        .nodes
        .iter()
        .flat_map(|n| &n.components)
        .filter(|c| matches!(c, ComponentSpec::Unknown(_)))
        .count();
    let scripts: usize = document.nodes.iter().map(|n| n.scripts.len()).sum();
    println!("Components:  {} ({} unsupported)", components, unknown);
    println!("Scripts:     {}", scripts);

    let issues = document.validate();
    if issues.is_empty() {
        println!("Validation:  ok");
    } else {
        println!("Validation:  {} issue(s)", issues.len());
        for issue in issues {
            println!("  - {}", issue);
        }
    }
    Ok(())
}

async fn resolve(loader: &AssetLoader, path_or_url: &str) -> CliResult<()> {
    let document = read_document(loader, path_or_url).await?;
    let resolver = AssetResolver::new(Arc::clone(loader.probe()));

    for node in &document.nodes {
        match resolver.resolve(&document.metadata, node) {
            Some(resolved) => println!("{:<32} {} -> {}", node.name, resolved.tier, resolved.location),
            None => match &node.primitive {
                Some(kind) if kind.is_recognised() => println!("{:<32} primitive {}", node.name, kind),
                _ => println!("{:<32} unresolved", node.name),
            },
        }
    }
    Ok(())
}

async fn import(
    loader: AssetLoader,
    config: &RuntimeConfig,
    path_or_url: &str,
    export: Option<PathBuf>,
) -> CliResult<()> {
    let mut session = Session::new(SceneGraph::new(), loader, config.import_config());
    let report = session.load(path_or_url).await?;

    if let Some(root) = session.root() {
        print!("{}", session.host().outline(root));
    }
    println!();
    println!("{}", report);

    if let Some(path) = export {
        let document = session.export()?;
        document.write_to(&path)?;
        println!("Exported {} nodes to {}", document.nodes.len(), path.display());
    }
    Ok(())
}
