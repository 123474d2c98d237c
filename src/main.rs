//! CLI entry point for document-vector grep.
//!
//! Provides direct search, index build/search/ls and a settings dump.
//! Main components: Cli parser, Commands enum, and a tokio runtime that only
//! listens for interrupts while the search runs on a blocking thread.

use anyhow::Result;
use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

use dvg::display::ProgressReporter;
use dvg::index::{self, IndexedMtimes, build_index, check_file_args, index_file_path};
use dvg::io::{ExitCode, OutputFormat, OutputManager};
use dvg::paths::{FileMatcher, STDIN_ARG, expand_inputs};
use dvg::search::direct;
use dvg::{
    DvgError, DvgResult, ModelSpec, ScdvModel, SearchConfig, SearchOverrides, SearchSession,
    Settings, TextScanner, Tokenizer, WorkerPool, find_model_spec, load_model, tokenizer_for,
};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Document-vector grep
#[derive(Parser)]
#[command(
    name = "dvg",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rank paragraphs of documents by semantic similarity to a query",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show progress and debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Search documents directly
    #[command(
        about = "Search paragraphs similar to a query",
        after_help = "Examples:\n  dvg search -m en \"memory allocator\" 'docs/**/*.txt'\n  find . -name '*.md' | dvg search -m en -p \"error handling\" -"
    )]
    Search(SearchArgs),

    /// Index commands
    #[command(about = "Build, query and inspect the cluster index")]
    Index {
        #[command(subcommand)]
        action: IndexCommand,
    },

    /// Show current configuration settings
    #[command(about = "Display the effective settings as TOML")]
    Config,
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Build (or rebuild) the index of the given documents
    Build(BuildArgs),

    /// Search indexed documents
    Search(SearchArgs),

    /// Show whether documents are indexed and up to date
    Ls(LsArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Model name or packed model file
    #[arg(short, long)]
    model: Option<String>,

    /// Number of results to show
    #[arg(short = 'n', long)]
    top_k: Option<usize>,

    /// Report several paragraphs per document
    #[arg(short, long)]
    paragraph_search: bool,

    /// Lines per paragraph window
    #[arg(short, long)]
    window: Option<usize>,

    /// Paragraph must contain TEXT (repeatable)
    #[arg(short, long = "include", value_name = "TEXT")]
    include: Vec<String>,

    /// Paragraph must not contain TEXT (repeatable)
    #[arg(short, long = "exclude", value_name = "TEXT")]
    exclude: Vec<String>,

    /// Paragraphs shorter than this many characters get a penalty
    #[arg(short = 'l', long, value_name = "CHARS")]
    min_length: Option<usize>,

    /// Length of the excerpt in characters
    #[arg(short = 't', long, value_name = "CHARS")]
    excerpt_length: Option<usize>,

    /// Print the header line
    #[arg(short = 'H', long)]
    header: bool,

    /// Worker threads
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Index search only: skip paragraphs whose expected contribution is below RATIO
    #[arg(short = 'P', long, value_name = "RATIO")]
    over_pruning: Option<f32>,

    /// Print the paragraph lines instead of an excerpt
    #[arg(short, long, conflicts_with = "json")]
    quote: bool,

    /// Print one JSON object per result
    #[arg(long)]
    json: bool,

    /// Query text
    query: String,

    /// Documents: paths, patterns (`*`, `**`, `?`) or `-` for stdin
    #[arg(required = true)]
    files: Vec<String>,
}

impl SearchArgs {
    fn overrides(&self) -> SearchOverrides {
        SearchOverrides {
            top_k: self.top_k,
            window: self.window,
            min_length: self.min_length,
            excerpt_length: self.excerpt_length,
            paragraph_search: self.paragraph_search,
            over_pruning: self.over_pruning,
            includes: self.include.clone(),
            excludes: self.exclude.clone(),
            workers: self.workers,
        }
    }

    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.quote {
            OutputFormat::Quote
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Args)]
struct BuildArgs {
    /// Model name or packed model file
    #[arg(short, long)]
    model: Option<String>,

    /// Lines per paragraph window
    #[arg(short, long)]
    window: Option<usize>,

    /// Worker threads
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Documents as normalized relative paths or patterns, or `-` for stdin
    #[arg(required = true)]
    files: Vec<String>,
}

#[derive(Args)]
struct LsArgs {
    /// Model name or packed model file
    #[arg(short, long)]
    model: Option<String>,

    /// Lines per paragraph window
    #[arg(short, long)]
    window: Option<usize>,

    /// Print the header line
    #[arg(short = 'H', long)]
    header: bool,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,

    /// Documents as normalized relative paths or patterns, or `-` for stdin
    #[arg(required = true)]
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, finishing dispatched chunks");
            flag.store(true, Ordering::Relaxed);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let code = match tokio::task::spawn_blocking(move || run(cli, cancel)).await {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => report(&e),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::BlockingError
        }
    };
    std::process::ExitCode::from(code as u8)
}

fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_env("DVG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        if let Ok(directive) = "dvg=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn report(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<DvgError>() {
        Some(e) => OutputManager::new(OutputFormat::Text)
            .error(e)
            .unwrap_or_else(|_| ExitCode::from_error(e)),
        None => {
            eprintln!("Error: {error:#}");
            ExitCode::from_anyhow(error)
        }
    }
}

fn run(cli: Cli, cancel: Arc<AtomicBool>) -> Result<ExitCode> {
    let settings = load_settings(cli.config.as_deref())?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Config => {
            print!("{}", settings.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Search(args) => run_search(&settings, args, false, cancel, verbose),
        Commands::Index { action } => match action {
            IndexCommand::Build(args) => run_build(&settings, args, cancel, verbose),
            IndexCommand::Search(args) => run_search(&settings, args, true, cancel, verbose),
            IndexCommand::Ls(args) => run_ls(&settings, args),
        },
    }
}

fn load_settings(path: Option<&Path>) -> DvgResult<Settings> {
    let loaded = match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    loaded.map_err(|e| DvgError::Config {
        reason: e.to_string(),
    })
}

fn resolve_spec(settings: &Settings, name: Option<&str>) -> DvgResult<ModelSpec> {
    let name = name
        .or(settings.model.name.as_deref())
        .ok_or_else(|| DvgError::Config {
            reason: "no model given; pass --model or set model.name".to_string(),
        })?;
    find_model_spec(&settings.model.dir, name)
}

fn open_model(
    settings: &Settings,
    name: Option<&str>,
) -> DvgResult<(ModelSpec, ScdvModel, Arc<dyn Tokenizer>)> {
    let spec = resolve_spec(settings, name)?;
    let tokenizer = tokenizer_for(&spec.tokenizer)?;
    let model = load_model(&spec.file)?;
    tracing::debug!(
        model = %spec.name,
        file = %spec.file.display(),
        words = model.vocabulary_size(),
        "model loaded"
    );
    Ok((spec, model, tokenizer))
}

/// Index keys are plain file arguments; only `-` is expanded here.
fn index_file_args(files: Vec<String>) -> DvgResult<Vec<String>> {
    let mut expanded = Vec::with_capacity(files.len());
    for arg in files {
        if arg == STDIN_ARG {
            for line in BufReader::new(std::io::stdin()).lines() {
                let line = line?;
                let line = line.trim_end();
                if !line.is_empty() {
                    expanded.push(line.to_string());
                }
            }
        } else {
            expanded.push(arg);
        }
    }
    check_file_args(&expanded)?;
    Ok(expanded)
}

fn run_search(
    settings: &Settings,
    args: SearchArgs,
    indexed: bool,
    cancel: Arc<AtomicBool>,
    verbose: bool,
) -> Result<ExitCode> {
    let config = SearchConfig::new(settings, args.overrides())?;
    let format = args.format();
    let files = if indexed {
        index_file_args(args.files)?
    } else {
        args.files
    };

    let (spec, model, tokenizer) = open_model(settings, args.model.as_deref())?;
    let weights = indexed.then(|| index::query_weights(&model, tokenizer.as_ref(), &args.query));
    let session = SearchSession::prepare(model, tokenizer, &args.query, config)?;
    let pool = WorkerPool::from_config(session.config(), cancel);
    let reporter = ProgressReporter::new(verbose);

    let outcome = match weights {
        Some(weights) => {
            let index_path =
                index_file_path(&settings.index_dir, &spec.file_name(), session.config().window());
            let matcher = FileMatcher::new(&files)?;
            index::search(
                &session,
                &weights,
                &index_path,
                &matcher,
                &TextScanner,
                &pool,
                |p| reporter.search(p),
            )?
        }
        None => direct::search(
            &session,
            &TextScanner,
            expand_inputs(files),
            &pool,
            |p| reporter.search(p),
        )?,
    };
    reporter.finish();

    let mut output = OutputManager::new(format);
    if outcome.cancelled {
        output.progress("Interrupted. Shows the search results up to now.")?;
    }
    if verbose || outcome.cancelled {
        output.progress(&format!("number of document files: {}", outcome.documents))?;
    }
    if args.header {
        output.result_header()?;
    }
    Ok(output.results(&session, &outcome.results)?)
}

fn run_build(
    settings: &Settings,
    args: BuildArgs,
    cancel: Arc<AtomicBool>,
    verbose: bool,
) -> Result<ExitCode> {
    let config = SearchConfig::new(
        settings,
        SearchOverrides {
            window: args.window,
            workers: args.workers,
            ..Default::default()
        },
    )?;
    let files = index_file_args(args.files)?;
    let (spec, model, tokenizer) = open_model(settings, args.model.as_deref())?;
    let index_path = index_file_path(&settings.index_dir, &spec.file_name(), config.window());
    let pool = WorkerPool::from_config(&config, cancel);
    let reporter = ProgressReporter::new(verbose);

    let summary = build_index(
        model,
        tokenizer.as_ref(),
        &TextScanner,
        expand_inputs(files),
        config.window(),
        &index_path,
        &pool,
        |s| reporter.build(s),
    )?;
    reporter.finish();

    let mut output = OutputManager::new(OutputFormat::Text);
    if summary.cancelled {
        output.progress("Interrupted. The index was not updated.")?;
        return Ok(ExitCode::GeneralError);
    }
    if verbose {
        output.progress(&format!(
            "indexed {} documents, {} paragraphs into {}",
            summary.documents,
            summary.records,
            index_path.display()
        ))?;
    }
    if !summary.unindexed.is_empty() {
        output.progress(&format!(
            "{} documents without indexable paragraphs, listed in {}",
            summary.unindexed.len(),
            index::unindexed_path(&index_path).display()
        ))?;
    }
    Ok(ExitCode::Success)
}

fn run_ls(settings: &Settings, args: LsArgs) -> Result<ExitCode> {
    let files = index_file_args(args.files)?;
    let spec = resolve_spec(settings, args.model.as_deref())?;
    let window = args.window.unwrap_or(settings.search.window);
    let index_path = index_file_path(&settings.index_dir, &spec.file_name(), window);
    let table = IndexedMtimes::load(BufReader::new(index::require_index(&index_path)?))?;

    let statuses = expand_inputs(files)
        .map(|path| index::file_status(&table, &path?))
        .collect::<DvgResult<Vec<_>>>()?;

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    Ok(OutputManager::new(format).statuses(statuses, args.header)?)
}
