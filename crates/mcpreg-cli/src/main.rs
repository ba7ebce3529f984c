//! mcpreg - MCP server registry lookup
//!
//! Usage:
//!   mcpreg search [NAME]        # Search every configured registry
//!   mcpreg resolve NAME         # Resolve one server
//!   mcpreg registries           # List configured registries
//!   mcpreg clear-cache          # Delete cached manifests

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpreg_core::cache;
use mcpreg_core::filter::{Filters, keys};
use mcpreg_core::packages::Server;
use mcpreg_core::registry::options::default_cache_dir;
use mcpreg_core::registry::{
    Aggregator, BuildOptions, PackageProvider, RegistryConfig, RegistryType, ResolveOptions,
    SearchOptions,
};
use mcpreg_core::runtime::{Runtime, default_supported_runtimes, parse_runtimes};

#[derive(Parser)]
#[command(name = "mcpreg")]
#[command(about = "Discover MCP servers across registries", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Registry configuration file (default: <config dir>/mcpreg/registries.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for cached registry manifests
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Maximum age of a cached manifest, in seconds
    #[arg(long, global = true)]
    cache_ttl_secs: Option<u64>,

    /// Always fetch manifests and never write the cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Ignore cached manifests and overwrite them
    #[arg(long, global = true)]
    refresh_cache: bool,

    /// Comma separated runtimes this host can launch (e.g. uvx,npx)
    #[arg(long, global = true)]
    runtimes: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search servers by name and filters
    Search {
        /// Name to match; omit or use '*' for every server
        name: Option<String>,

        /// Only servers installable with this runtime
        #[arg(long)]
        runtime: Option<Runtime>,

        /// Required tool (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Required tag substring (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Required category substring (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// License substring
        #[arg(long)]
        license: Option<String>,

        /// Only official servers
        #[arg(long)]
        official: bool,

        /// Query only this registry
        #[arg(long)]
        source: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Resolve a single server
    Resolve {
        /// Server ID
        name: String,

        /// Required runtime
        #[arg(long)]
        runtime: Option<Runtime>,

        /// Required version
        #[arg(long)]
        version: Option<String>,

        /// Query only this registry
        #[arg(long)]
        source: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// List configured registries
    Registries,

    /// Delete every cached registry manifest
    ClearCache,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpreg_cli=info,mcpreg_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run_cli(cli.global, cli.command)
}

fn run_cli(global: GlobalArgs, command: Commands) -> Result<()> {
    match command {
        Commands::Search {
            name,
            runtime,
            tools,
            tags,
            categories,
            license,
            official,
            source,
            format,
        } => {
            let mut filters = Filters::new();
            if let Some(runtime) = runtime {
                filters.insert(keys::RUNTIME.to_string(), runtime.as_str().to_string());
            }
            insert_list(&mut filters, keys::TOOLS, &tools);
            insert_list(&mut filters, keys::TAGS, &tags);
            insert_list(&mut filters, keys::CATEGORIES, &categories);
            if let Some(license) = license {
                filters.insert(keys::LICENSE.to_string(), license);
            }
            if official {
                filters.insert(keys::IS_OFFICIAL.to_string(), "true".to_string());
            }

            let mut options = SearchOptions::new();
            if let Some(source) = source {
                options = options.with_source(source);
            }

            let aggregator = build_aggregator(&global)?;
            let name = name.unwrap_or_else(|| "*".to_string());
            let servers = aggregator.search(&name, Some(&filters), &options)?;
            match format {
                OutputFormat::Table => print_server_table(&servers),
                OutputFormat::Json => print_json(&servers)?,
            }
        }
        Commands::Resolve {
            name,
            runtime,
            version,
            source,
            format,
        } => {
            let mut options = ResolveOptions::new();
            if let Some(runtime) = runtime {
                options = options.with_runtime(runtime);
            }
            if let Some(version) = version {
                options = options.with_version(version);
            }
            if let Some(source) = source {
                options = options.with_source(source);
            }

            let aggregator = build_aggregator(&global)?;
            let server = aggregator.resolve(&name, &options)?;
            match format {
                OutputFormat::Table => print_server_details(&server),
                OutputFormat::Json => print_json(&server)?,
            }
        }
        Commands::Registries => {
            let config = load_config(&global)?;
            print_registry_table(&config);
        }
        Commands::ClearCache => {
            let dir = global.cache_dir.clone().unwrap_or_else(default_cache_dir);
            let removed = cache::clear(&dir)
                .with_context(|| format!("Failed to clear cache at {}", dir.display()))?;
            println!("Removed {} cached manifest(s) from {}", removed, dir.display());
        }
    }

    Ok(())
}

fn insert_list(filters: &mut Filters, key: &str, values: &[String]) {
    if !values.is_empty() {
        filters.insert(key.to_string(), values.join(","));
    }
}

fn config_path(global: &GlobalArgs) -> Option<PathBuf> {
    global.config.clone().or_else(|| {
        dirs::config_dir().map(|dir| dir.join("mcpreg").join("registries.toml"))
    })
}

fn load_config(global: &GlobalArgs) -> Result<RegistryConfig> {
    match config_path(global) {
        Some(path) => RegistryConfig::load(&path),
        None => Ok(RegistryConfig::default()),
    }
}

fn build_options(global: &GlobalArgs) -> BuildOptions {
    let mut options = BuildOptions::new()
        .with_use_cache(!global.no_cache)
        .with_refresh_cache(global.refresh_cache);
    if let Some(dir) = &global.cache_dir {
        options = options.with_cache_dir(dir.clone());
    }
    if let Some(secs) = global.cache_ttl_secs {
        options = options.with_cache_ttl(Duration::from_secs(secs));
    }
    options
}

fn build_aggregator(global: &GlobalArgs) -> Result<Aggregator> {
    let config = load_config(global)?;
    let runtimes = match &global.runtimes {
        Some(value) => parse_runtimes(value)?,
        None => default_supported_runtimes(),
    };
    let options = build_options(global);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(config.build(&options, &runtimes))
}

fn print_server_table(servers: &[Server]) {
    if servers.is_empty() {
        println!("No servers found.");
        return;
    }

    println!(
        "{:<24} {:<12} {:<24} {:<20} Description",
        "ID", "Source", "Runtimes", "License"
    );
    println!("{}", "-".repeat(100));

    for server in servers {
        let mut description = server.description.replace('\n', " ");
        if description.chars().count() > 40 {
            description = description.chars().take(37).collect::<String>() + "...";
        }
        let id = if server.deprecated {
            format!("{} (deprecated)", server.id)
        } else {
            server.id.clone()
        };
        println!(
            "{:<24} {:<12} {:<24} {:<20} {}",
            id,
            server.source,
            server.runtime_names().join(","),
            server.license,
            description
        );
    }
}

fn print_server_details(server: &Server) {
    println!("{} ({})", server.display_name, server.id);
    println!("  Source:      {}", server.source);
    println!("  Name:        {}", server.name);
    if !server.description.is_empty() {
        println!("  Description: {}", server.description);
    }
    if !server.license.is_empty() {
        println!("  License:     {}", server.license);
    }
    if server.deprecated {
        println!("  Deprecated:  yes");
    }

    println!("  Installations:");
    for install in server.installations.iter() {
        println!(
            "    {:<8} {} @ {} [{}]",
            install.runtime.as_str(),
            install.package,
            install.version,
            install.transports.to_strings().join(", ")
        );
    }

    if !server.tools.is_empty() {
        println!("  Tools:       {}", server.tool_names().join(", "));
    }

    if !server.arguments.is_empty() {
        println!("  Arguments:");
        for arg in server.arguments.ordered() {
            let required = if arg.required { "required" } else { "optional" };
            let name = match arg.position {
                Some(position) => format!("#{} {}", position, arg.name),
                None => arg.name.clone(),
            };
            println!(
                "    {:<32} {:<20} {:<9} {}",
                name,
                arg.variable_type.as_str(),
                required,
                arg.description
            );
        }
    }
}

fn print_registry_table(config: &RegistryConfig) {
    println!("{:<20} {:<12} URL", "ID", "Type");
    println!("{}", "-".repeat(70));

    for entry in &config.registries {
        let type_str = match entry.kind {
            RegistryType::Mcpm => "mcpm",
            RegistryType::MozillaAi => "mozilla-ai",
        };
        let url = entry
            .url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "(embedded)".to_string());
        println!("{:<20} {:<12} {}", entry.provider_id(), type_str, url);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
