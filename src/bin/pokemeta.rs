use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use pokemeta::app::{App, ProgressSink};
use pokemeta::config::{ConfigLoader, ResolvedConfig, normalize_extension};
use pokemeta::domain::{CollisionPolicy, ContentId, PokemonKey};
use pokemeta::error::MetaError;
use pokemeta::output::{ConsoleOutput, JsonOutput, OutputMode};
use pokemeta::pokeapi::{PokeApiClient, PokeApiHttpClient};
use pokemeta::store::Store;

#[derive(Parser)]
#[command(name = "pokemeta")]
#[command(about = "Prepare numbered images and NFT metadata for a Pokémon collection")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON instead of a console summary.
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Config file (defaults to ./pokemeta.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory for cached PokeAPI responses.
    #[arg(long, global = true)]
    cache_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Copy images to 1.ext, 2.ext, ... in file-name order")]
    Sequence(SequenceArgs),
    #[command(about = "Write <n>.json metadata for each image using PokeAPI")]
    Generate(GenerateArgs),
    #[command(about = "Point the image field of every <n>.json at ipfs://<cid>/<n>.<ext>")]
    PatchLinks(PatchArgs),
    #[command(about = "Check that numbered images and metadata files line up")]
    Verify(VerifyArgs),
    #[command(about = "Sequence, generate, patch links and verify in one go")]
    Run(RunArgs),
    #[command(about = "Manage the PokeAPI response cache")]
    Cache(CacheArgs),
}

#[derive(Args, Clone)]
struct LimitArgs {
    /// Maximum number of items to process.
    #[arg(long, conflicts_with = "all")]
    limit: Option<usize>,

    /// Process every item, ignoring the configured limit.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Clone)]
struct SequenceArgs {
    #[arg(long)]
    source: Option<Utf8PathBuf>,

    #[arg(long)]
    dest: Option<Utf8PathBuf>,

    #[command(flatten)]
    limit: LimitArgs,

    #[arg(long, value_enum)]
    on_collision: Option<CollisionPolicy>,
}

#[derive(Args, Clone)]
struct GenerateArgs {
    #[arg(long)]
    source: Option<Utf8PathBuf>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[command(flatten)]
    limit: LimitArgs,

    /// Language of the description text.
    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args, Clone)]
struct PatchArgs {
    #[arg(long)]
    dir: Option<Utf8PathBuf>,

    #[arg(long)]
    cid: Option<ContentId>,

    /// Image extension used in the link.
    #[arg(long)]
    ext: Option<String>,
}

#[derive(Args, Clone)]
struct VerifyArgs {
    #[arg(long)]
    images: Option<Utf8PathBuf>,

    #[arg(long)]
    metadata: Option<Utf8PathBuf>,
}

#[derive(Args, Clone)]
struct RunArgs {
    #[command(flatten)]
    limit: LimitArgs,

    #[arg(long, value_enum)]
    on_collision: Option<CollisionPolicy>,

    #[arg(long)]
    cid: Option<ContentId>,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Delete every cached response")]
    Clear,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MetaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetaError) -> u8 {
    match error {
        MetaError::MissingSourceDir(_)
        | MetaError::Collision(_)
        | MetaError::ConfigRead(_)
        | MetaError::ConfigParse(_)
        | MetaError::InvalidCid(_) => 2,
        MetaError::PokeApiHttp(_)
        | MetaError::PokeApiStatus { .. }
        | MetaError::PokemonNotFound(_)
        | MetaError::MalformedResponse(_) => 3,
        MetaError::Misaligned { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = match cli.cache_dir {
        Some(dir) => Store::new_with_path(dir),
        None => Store::new()?,
    };

    match cli.command {
        Commands::Sequence(args) => {
            override_path(&mut config.source_images, args.source);
            override_path(&mut config.numbered_images, args.dest);
            apply_limit(&mut config, &args.limit);
            if let Some(policy) = args.on_collision {
                config.on_collision = policy;
            }
            let app = App::new(config, store, NopPokeApi);
            let result = app.sequence(sink(output_mode))?;
            emit(output_mode, &result, ConsoleOutput::print_sequence)
        }
        Commands::Generate(args) => {
            override_path(&mut config.source_images, args.source);
            override_path(&mut config.metadata_dir, args.output);
            apply_limit(&mut config, &args.limit);
            if let Some(language) = args.language {
                config.language = language;
            }
            if args.no_cache {
                config.cache = false;
            }
            let app = http_app(config, store)?;
            let result = app.generate(sink(output_mode))?;
            emit(output_mode, &result, ConsoleOutput::print_generate)
        }
        Commands::PatchLinks(args) => {
            override_path(&mut config.metadata_dir, args.dir);
            if let Some(cid) = args.cid {
                config.cid = cid;
            }
            if let Some(ext) = args.ext {
                config.image_extension = normalize_extension(&ext)?;
            }
            let app = App::new(config, store, NopPokeApi);
            let result = app.patch_links(sink(output_mode))?;
            emit(output_mode, &result, ConsoleOutput::print_patch)
        }
        Commands::Verify(args) => {
            override_path(&mut config.numbered_images, args.images);
            override_path(&mut config.metadata_dir, args.metadata);
            let app = App::new(config, store, NopPokeApi);
            let report = app.verify(sink(output_mode))?;
            emit(output_mode, &report, ConsoleOutput::print_alignment)?;
            report.into_result()?;
            Ok(())
        }
        Commands::Run(args) => {
            apply_limit(&mut config, &args.limit);
            if let Some(policy) = args.on_collision {
                config.on_collision = policy;
            }
            if let Some(cid) = args.cid {
                config.cid = cid;
            }
            if args.no_cache {
                config.cache = false;
            }
            let app = http_app(config, store)?;
            let result = app.run_all(sink(output_mode))?;
            emit(output_mode, &result, ConsoleOutput::print_run)?;
            result.alignment.into_result()?;
            Ok(())
        }
        Commands::Cache(args) => match args.command {
            CacheCommand::Clear => {
                let app = App::new(config, store, NopPokeApi);
                let result = app.clear_cache(sink(output_mode))?;
                emit(output_mode, &result, ConsoleOutput::print_clear)
            }
        },
    }
}

fn http_app(config: ResolvedConfig, store: Store) -> miette::Result<App<PokeApiHttpClient>> {
    let client = PokeApiHttpClient::new(config.http.clone())?;
    Ok(App::new(config, store, client))
}

fn sink(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Interactive => &ConsoleOutput,
        OutputMode::NonInteractive => &JsonOutput,
    }
}

fn emit<T: Serialize>(output_mode: OutputMode, value: &T, print: fn(&T)) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print(value).into_diagnostic(),
        OutputMode::Interactive => {
            print(value);
            Ok(())
        }
    }
}

fn override_path(target: &mut Utf8PathBuf, value: Option<Utf8PathBuf>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_limit(config: &mut ResolvedConfig, args: &LimitArgs) {
    if args.all {
        config.max_items = None;
    } else if let Some(limit) = args.limit {
        config.max_items = Some(limit);
    }
}

struct NopPokeApi;

impl PokeApiClient for NopPokeApi {
    fn fetch_pokemon(&self, _key: &PokemonKey) -> Result<Value, MetaError> {
        Err(MetaError::PokeApiHttp(
            "PokeAPI client not configured".to_string(),
        ))
    }

    fn fetch_species(&self, _url: &str) -> Result<Value, MetaError> {
        Err(MetaError::PokeApiHttp(
            "PokeAPI client not configured".to_string(),
        ))
    }
}
