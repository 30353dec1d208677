//! Testinspect CLI - per-test resource profiling and static test features.

use std::io::stdout;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use testinspect::analyzers::churn::Analyzer as ChurnAnalyzer;
use testinspect::analyzers::statics::{Extractor, StaticRecord};
use testinspect::cli::{ChurnArgs, Cli, Command, OutputFormat, RunArgs, StaticsArgs, WorkerArgs};
use testinspect::config::Config;
use testinspect::core::{CallableId, TestItem, TestManifest};
use testinspect::coverage::SqliteStore;
use testinspect::git::{GitCli, GitRepo};
use testinspect::harness::worker;
use testinspect::host::{HostRunner, ShellRunner};
use testinspect::output::Format;
use testinspect::session::{OutputPaths, Session, SessionHooks};

fn main() -> ExitCode {
    // The worker protocol owns stdout; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> testinspect::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };

    let format = match cli.format {
        OutputFormat::Json => Format::Json,
        OutputFormat::Text => Format::Text,
    };

    match cli.command {
        Command::Run(args) => run_session(&cli.path, config, args),
        Command::Churn(args) => run_churn(&cli.path, &config, args, format),
        Command::Statics(args) => run_statics(&config, args, format),
        Command::Worker(args) => run_worker(args),
    }
}

fn run_session(path: &Path, mut config: Config, args: RunArgs) -> testinspect::Result<()> {
    // CLI flags override file and environment configuration.
    if let Some(output) = args.output {
        config.harness.output = Some(output);
    }
    if let Some(cmd) = args.cmd {
        config.harness.command = cmd;
    }
    config.harness.collect_only |= args.collect_only;
    config.harness.continue_on_collection_errors |= args.continue_on_collection_errors;

    let manifest = TestManifest::load(&args.manifest)?;

    match Session::configure(&config, path)? {
        Some(mut session) => {
            session.on_collect(&manifest)?;
            session.on_run(&manifest)?;
        }
        None => {
            // No output base: the harness stays inactive and tests run
            // through the host's default path.
            let runner = ShellRunner::new(config.harness.command).working_dir(path);
            for item in &manifest.items {
                let status = runner.run_single(item)?;
                tracing::info!(node_id = %item.node_id, ?status, "test finished");
            }
        }
    }
    Ok(())
}

fn run_churn(
    path: &Path,
    config: &Config,
    args: ChurnArgs,
    format: Format,
) -> testinspect::Result<()> {
    let mut churn_config = config.churn.clone();
    if let Some(window) = args.window {
        churn_config.commit_window = window;
    }

    let repo = GitRepo::open(path)?;
    tracing::debug!(head = %repo.head_sha()?, "churn window ends at HEAD");

    let provider = GitCli::new(repo.root());
    let churn = ChurnAnalyzer::new(&provider, repo.root(), &churn_config).analyze()?;
    format.format(&churn, &mut stdout())?;
    Ok(())
}

fn run_statics(config: &Config, args: StaticsArgs, format: Format) -> testinspect::Result<()> {
    let manifest = TestManifest::load(&args.manifest)?;
    let extractor = Extractor::new(&config.statics);

    let mut records: std::collections::BTreeMap<CallableId, StaticRecord> = Default::default();
    for item in &manifest.items {
        if records.contains_key(&item.callable) {
            continue;
        }
        if let Some(record) = extractor.extract(item) {
            records.insert(item.callable.clone(), record);
        }
    }

    format.format(&records, &mut stdout())?;
    Ok(())
}

fn run_worker(args: WorkerArgs) -> testinspect::Result<()> {
    let item = TestItem {
        node_id: args.node_id,
        callable: CallableId::new(args.callable),
        file: args.file,
        line: args.line,
    };

    let runner = ShellRunner::new(args.cmd);
    let paths = OutputPaths::from_base(&args.output);
    let mut coverage = SqliteStore::open(&paths.coverage, &std::env::current_dir()?)?;

    worker::run(&item, &runner, &mut coverage)
}
