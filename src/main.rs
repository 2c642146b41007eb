use clap::{Args, Parser, Subcommand};
use dialoguer::Select;
use embed_resolver::{
    Availability, Catalog, Config, ContentLookup, ContentRef, ContentSummary, ContentType,
    FallbackReason, Page, PlaybackSelection, ProgressEvent, Resolver, UnknownProviderPolicy,
    load_catalog, open_content, open_metadata_provider,
};
use std::error::Error;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embed-resolver", version, about = "Resolve movies and tv episodes to embed URLs")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider catalog JSON file replacing the built-in catalog
    #[arg(long, global = true, env = "EMBED_RESOLVER_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an embed URL from ids given on the command line
    Resolve(ResolveArgs),

    /// List the providers of the catalog
    Providers {
        /// Only show availability for this content type
        #[arg(long = "type")]
        content_type: Option<ContentType>,
    },

    /// Look up content on TMDB and resolve its embed URL
    Open(OpenArgs),

    /// Search movies and series by title
    Search {
        /// Title to search for (at least 3 characters)
        query: String,

        /// Only search this content type
        #[arg(long = "type")]
        content_type: Option<ContentType>,
    },

    /// List popular movies or series
    Popular {
        #[arg(long = "type", default_value = "movie")]
        content_type: ContentType,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// List the seasons of a series
    Seasons { series_id: u64 },

    /// List the episodes of a season
    Episodes { series_id: u64, season: u32 },

    /// Show the configuration, optionally writing a default config file
    Config {
        /// Create the config file with default values if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Embed provider id (see `providers`)
    #[arg(short, long)]
    provider: Option<String>,

    /// Language code for providers that support one
    #[arg(short, long)]
    language: Option<String>,

    /// Do not ask providers to start playback automatically
    #[arg(long)]
    no_autoplay: bool,

    /// Do not ask providers to suppress ads
    #[arg(long)]
    allow_ads: bool,

    /// Fail instead of falling back when the provider is unknown
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ResolveArgs {
    /// Numeric TMDB id
    id: u64,

    #[arg(long = "type", default_value = "movie")]
    content_type: ContentType,

    #[arg(short, long)]
    season: Option<u32>,

    #[arg(short, long)]
    episode: Option<u32>,

    /// IMDb id (tt...), if known
    #[arg(long)]
    external_id: Option<String>,

    /// Title, used by providers with readable URLs
    #[arg(long)]
    title: Option<String>,

    #[command(flatten)]
    selection: SelectionArgs,
}

#[derive(Args)]
struct OpenArgs {
    /// Numeric TMDB id, IMDb id (tt...) or title
    id: ContentLookup,

    #[arg(long = "type", default_value = "movie")]
    content_type: ContentType,

    #[arg(short, long)]
    season: Option<u32>,

    #[arg(short, long)]
    episode: Option<u32>,

    #[command(flatten)]
    selection: SelectionArgs,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "embed_resolver=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Handles progress events and prints formatted output to stderr
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::LookingUpExternalId { external_id } => {
            eprintln!("Looking up {}...", external_id);
        }
        ProgressEvent::SearchingTitle {
            title,
            content_type,
        } => {
            eprintln!("Searching {} '{}'...", content_type, title);
        }
        ProgressEvent::FetchingDetails {
            content_id,
            content_type,
        } => {
            eprintln!("Fetching details for {} {}...", content_type, content_id);
        }
        ProgressEvent::DetailsFetched { title, external_id } => match external_id {
            Some(id) => eprintln!("Found '{}' ({})", title, id),
            None => eprintln!("Found '{}' (no external id)", title),
        },
        ProgressEvent::Resolving { provider } => {
            eprintln!("Resolving with provider '{}'...", provider);
        }
        ProgressEvent::FellBack {
            requested,
            used,
            reason,
        } => {
            eprintln!(
                "Note: '{}' cannot serve this request ({}), using '{}'",
                requested,
                describe_fallback(reason),
                used
            );
        }
        ProgressEvent::Resolved { .. } => {}
    }
}

fn describe_fallback(reason: FallbackReason) -> &'static str {
    match reason {
        FallbackReason::UnknownProvider => "unknown provider",
        FallbackReason::UnsupportedContentType => "content type not supported",
        FallbackReason::MissingExternalId => "no external id known",
        FallbackReason::MissingTitle => "no title known",
    }
}

/// Builds the playback selection from flags and config
///
/// Without `--provider` the configured provider is used; on an interactive
/// terminal `prompt` lets the user pick one from the catalog instead.
fn build_selection(
    args: &SelectionArgs,
    config: &Config,
    catalog: &Catalog,
    prompt: bool,
) -> Result<PlaybackSelection, Box<dyn Error>> {
    let provider = match (&args.provider, &config.default_provider) {
        (Some(provider), _) => provider.clone(),
        (None, _) if prompt && io::stdin().is_terminal() => pick_provider(catalog)?,
        (None, Some(provider)) => provider.clone(),
        (None, None) => catalog.default_provider().id.clone(),
    };

    Ok(PlaybackSelection {
        provider,
        language: args
            .language
            .clone()
            .unwrap_or_else(|| config.language.clone()),
        autoplay: config.autoplay && !args.no_autoplay,
        ad_free: config.ad_free && !args.allow_ads,
    })
}

fn pick_provider(catalog: &Catalog) -> Result<String, Box<dyn Error>> {
    let providers = catalog.providers();
    let labels: Vec<String> = providers
        .iter()
        .map(|p| format!("{} ({})", p.name, p.id))
        .collect();
    let default_index = providers
        .iter()
        .position(|p| p.id == catalog.default_provider().id)
        .unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Embed provider")
        .items(&labels)
        .default(default_index)
        .interact_opt()?;

    match choice {
        Some(index) => Ok(providers[index].id.clone()),
        None => Err("no provider selected".into()),
    }
}

fn policy(args: &SelectionArgs, config: &Config) -> UnknownProviderPolicy {
    if args.strict {
        UnknownProviderPolicy::Reject
    } else {
        config.unknown_provider
    }
}

fn availability_label(availability: Option<Availability>) -> &'static str {
    match availability {
        Some(Availability::Always) => "always",
        Some(Availability::RequiresExternalId) => "needs external id",
        None => "-",
    }
}

fn print_providers(catalog: &Catalog, only: Option<ContentType>) {
    let types: Vec<ContentType> = match only {
        Some(content_type) => vec![content_type],
        None => ContentType::ALL.to_vec(),
    };

    print!("  {:<14} {:<14}", "ID", "NAME");
    for content_type in &types {
        print!(" {:<18}", content_type.to_string().to_uppercase());
    }
    println!();

    for provider in catalog.providers() {
        let marker = if provider.id == catalog.default_provider().id {
            '*'
        } else {
            ' '
        };
        print!("{} {:<14} {:<14}", marker, provider.id, provider.name);
        for content_type in &types {
            let availability = provider.templates(*content_type).map(|t| t.availability);
            print!(" {:<18}", availability_label(availability));
        }
        println!();
    }

    println!("\n* default provider");
}

fn print_page(heading: &str, page: &Page<ContentSummary>) {
    println!("=== {} (page {}/{}) ===", heading, page.page, page.total_pages.max(1));
    if page.results.is_empty() {
        println!("No results.");
    }
    for item in &page.results {
        let year = item
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .unwrap_or("????");
        println!("{:>8}  {} ({})", item.content_id, item.title, year);
    }
    println!();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog;
    }

    match cli.command {
        Command::Resolve(args) => {
            let catalog = load_catalog(&config)?;
            let selection = build_selection(&args.selection, &config, &catalog, false)?;
            let resolver = Resolver::new(&catalog, policy(&args.selection, &config));

            let content = ContentRef {
                content_id: args.id,
                external_id: None,
                content_type: args.content_type,
                season: args.season,
                episode: args.episode,
                title: args.title,
            }
            .with_external_id(args.external_id);

            let resolution = resolver.resolve(&content, &selection)?;
            if let Some(reason) = resolution.fallback {
                handle_progress_event(ProgressEvent::FellBack {
                    requested: selection.provider.clone(),
                    used: resolution.provider.clone(),
                    reason,
                });
            }
            println!("{}", resolution.url);
        }

        Command::Providers { content_type } => {
            let catalog = load_catalog(&config)?;
            print_providers(&catalog, content_type);
        }

        Command::Open(args) => {
            let catalog = load_catalog(&config)?;
            let selection = build_selection(&args.selection, &config, &catalog, true)?;
            let resolver = Resolver::new(&catalog, policy(&args.selection, &config));
            let metadata = open_metadata_provider(&config)?;

            let link = open_content(
                metadata.as_ref(),
                &resolver,
                &args.id,
                args.content_type,
                args.season,
                args.episode,
                &selection,
                handle_progress_event,
            )?;

            if let Some(trailer) = link.details.trailer.as_ref().and_then(|t| t.url.as_ref()) {
                eprintln!("Trailer: {}", trailer);
            }
            println!("{}", link.resolution.url);
        }

        Command::Search {
            query,
            content_type,
        } => {
            let metadata = open_metadata_provider(&config)?;
            match content_type {
                Some(content_type) => {
                    let page = metadata.search(content_type, &query)?;
                    print_page(&format!("{} results for '{}'", content_type, query), &page);
                }
                None => {
                    let results = metadata.search_all(&query)?;
                    print_page(&format!("Movies matching '{}'", query), &results.movies);
                    print_page(&format!("Series matching '{}'", query), &results.series);
                }
            }
        }

        Command::Popular { content_type, page } => {
            let metadata = open_metadata_provider(&config)?;
            let page = metadata.popular(content_type, page)?;
            print_page(&format!("Popular {}", content_type), &page);
        }

        Command::Seasons { series_id } => {
            let metadata = open_metadata_provider(&config)?;
            let seasons = metadata.seasons(series_id)?;
            if seasons.is_empty() {
                println!("No seasons found.");
            }
            for season in seasons {
                println!(
                    "Season {:>2}: {} ({} episodes)",
                    season.season_number, season.name, season.episode_count
                );
            }
        }

        Command::Episodes { series_id, season } => {
            let metadata = open_metadata_provider(&config)?;
            let episodes = metadata.episodes(series_id, season)?;
            if episodes.is_empty() {
                println!("No episodes found.");
            }
            for episode in episodes {
                println!(
                    "S{:02}E{:02} - {}",
                    episode.season_number, episode.episode_number, episode.name
                );
                if !episode.overview.is_empty() {
                    println!("  {}", episode.overview);
                }
            }
        }

        Command::Config { init } => {
            let path = Config::path()?;
            if init && !path.exists() {
                Config::default().save_to(&path)?;
                println!("Created {}", path.display());
            }

            let mut shown = config.clone();
            if shown.tmdb_api_key.is_some() {
                shown.tmdb_api_key = Some("********".to_string());
            }
            println!("Config file: {}", path.display());
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
