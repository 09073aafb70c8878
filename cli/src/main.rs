//! CLI entrypoint for roundtable
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use roundtable_application::{
    DiscussionCoordinator, InvocationGateway, NoProgress, NoTelemetry, ProgressNotifier,
    SessionRepository, TelemetrySink,
};
use roundtable_domain::validation::{ConfigIssue, has_errors};
use roundtable_domain::{PersonaCatalog, ProviderKind, Session, SessionId, SessionStatus};
use roundtable_infrastructure::config::MAX_ROUNDS_LIMIT;
use roundtable_infrastructure::{
    ConfigLoader, FileConfig, JsonFileSessionStore, JsonlTelemetrySink, RoutingGateway,
    gateway_from_config,
};
use roundtable_presentation::{
    Cli, Command, ConsoleFormatter, MarkdownReport, OutputFormat, OutputFormatter,
    ProgressReporter, StartArgs,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on each provider's health-check call
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_deref())?;

    info!("Starting roundtable");

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };

    match &cli.command {
        Command::Start(args) => {
            apply_start_overrides(&mut config, args)?;
            check_config(&config, true)?;
            let coordinator = build_coordinator(&config, cli.quiet)?;
            let session = with_cancellation(&coordinator.token, async {
                coordinator
                    .inner
                    .run_discussion(args.topic.as_str(), args.org_context())
                    .await
            })
            .await?;
            finish(&config, &coordinator.catalog, &session, cli.quiet)
        }
        Command::Resume { id } => {
            check_config(&config, true)?;
            let id = parse_id(id)?;
            let coordinator = build_coordinator(&config, cli.quiet)?;
            let session =
                with_cancellation(&coordinator.token, coordinator.inner.resume(id)).await?;
            finish(&config, &coordinator.catalog, &session, cli.quiet)
        }
        Command::Status { id, format } => {
            check_config(&config, false)?;
            let session = store(&config).load(parse_id(id)?).await?;
            let output = match format {
                OutputFormat::Text => ConsoleFormatter::format(&session),
                OutputFormat::Json => ConsoleFormatter.format_json(&session),
            };
            println!("{}", output);
            Ok(())
        }
        Command::Report { id, output } => {
            check_config(&config, false)?;
            let session = store(&config).load(parse_id(id)?).await?;
            let (catalog, _) = config.build_catalog();
            let report = MarkdownReport::new(&catalog).render(&session);
            match output {
                Some(path) => {
                    write_file(path, &report)?;
                    println!("Report written to {}", path.display());
                }
                None => println!("{}", report),
            }
            Ok(())
        }
        Command::List => {
            check_config(&config, false)?;
            let sessions = store(&config).list().await?;
            print!("{}", ConsoleFormatter::format_list(&sessions));
            Ok(())
        }
        Command::Delete { id } => {
            check_config(&config, false)?;
            let id = parse_id(id)?;
            if store(&config).delete(id).await? {
                println!("Deleted session {}", id);
                Ok(())
            } else {
                bail!("Session {} not found", id)
            }
        }
        Command::Personas => {
            let (catalog, issues) = config.build_catalog();
            print_issues(&issues);
            print!("{}", ConsoleFormatter::format_personas(&catalog));
            Ok(())
        }
        Command::Health => {
            print_issues(&config.validate());
            run_health(&config).await
        }
        Command::ShowConfig => {
            for line in ConfigLoader::config_sources(cli.config.as_ref()) {
                println!("{}", line);
            }
            println!();
            print_issues(&config.validate());
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// `-v` count picks the level; `RUST_LOG` wins when set. With `--log-dir`
/// a daily-rotated file receives the same events.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "roundtable.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn apply_start_overrides(config: &mut FileConfig, args: &StartArgs) -> Result<()> {
    if let Some(max_rounds) = args.max_rounds {
        if !(1..=MAX_ROUNDS_LIMIT).contains(&max_rounds) {
            bail!("--max-rounds must be between 1 and {}", MAX_ROUNDS_LIMIT);
        }
        config.discussion.max_rounds = max_rounds;
    }
    if !args.participants.is_empty() {
        config.discussion.participants = args.participants.clone();
    }
    Ok(())
}

/// Print warnings and abort on errors. Credentials are only required by
/// commands that call providers.
fn check_config(config: &FileConfig, needs_providers: bool) -> Result<()> {
    let mut issues = config.validate();
    if needs_providers {
        issues.extend(config.credential_issues());
    }
    print_issues(&issues);
    if has_errors(&issues) {
        bail!("Invalid configuration (see errors above)");
    }
    Ok(())
}

fn print_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        if issue.is_error() {
            eprintln!("error: {}", issue.message);
        } else {
            eprintln!("warning: {}", issue.message);
        }
    }
}

struct Wiring {
    inner: DiscussionCoordinator<RoutingGateway>,
    catalog: Arc<PersonaCatalog>,
    token: CancellationToken,
}

fn build_coordinator(config: &FileConfig, quiet: bool) -> Result<Wiring> {
    let (catalog, _) = config.build_catalog();
    let catalog = Arc::new(catalog);
    let params = config.to_params();

    // === Dependency Injection ===
    let gateway = Arc::new(gateway_from_config(&config.providers)?);

    let telemetry: Arc<dyn TelemetrySink> = match config
        .logging
        .telemetry_file
        .as_ref()
        .and_then(|path| JsonlTelemetrySink::new(path))
    {
        Some(sink) => {
            info!(path = %sink.path().display(), "Writing call telemetry");
            Arc::new(sink)
        }
        None => Arc::new(NoTelemetry),
    };

    let token = CancellationToken::new();
    let invoker = InvocationGateway::for_params(gateway, &params)
        .with_telemetry(telemetry)
        .with_cancellation(token.clone());

    let progress: Arc<dyn ProgressNotifier> = if quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(ProgressReporter::new())
    };

    let inner = DiscussionCoordinator::new(invoker, Arc::clone(&catalog), store(config), params)?
        .with_progress(progress);

    Ok(Wiring {
        inner,
        catalog,
        token,
    })
}

fn store(config: &FileConfig) -> Arc<dyn SessionRepository> {
    Arc::new(JsonFileSessionStore::new(config.storage.path.clone()))
}

/// Run `work` while Ctrl-C cancels `token`. Calls already in flight finish;
/// the session then ends `Failed` with reason "cancelled".
async fn with_cancellation<F, T>(token: &CancellationToken, work: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling discussion");
                eprintln!("\nCancelling... waiting for in-flight calls to finish");
                token.cancel();
            }
        })
    };
    let result = work.await;
    watcher.abort();
    result
}

fn finish(
    config: &FileConfig,
    catalog: &PersonaCatalog,
    session: &Session,
    quiet: bool,
) -> Result<()> {
    let report = MarkdownReport::new(catalog).render(session);
    let path = config
        .storage
        .reports_dir
        .join(format!("report_{}.md", session.id()));
    write_file(&path, &report)?;

    if !quiet {
        println!("{}", ConsoleFormatter::format(session));
    }
    println!("Report written to {}", path.display());

    if session.status() == SessionStatus::Failed {
        bail!(
            "Discussion failed: {}",
            session.failure_reason().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

async fn run_health(config: &FileConfig) -> Result<()> {
    let gateway = gateway_from_config(&config.providers)?;
    let results = gateway.health_check(HEALTH_CHECK_TIMEOUT).await;
    let mut healthy = true;

    println!("Providers:");
    for kind in ProviderKind::ALL {
        match results.iter().find(|(k, _)| *k == kind) {
            Some((_, Ok(()))) => println!("  [ok]   {}", kind),
            Some((_, Err(e))) => {
                healthy = false;
                println!("  [fail] {}: {}", kind, e);
            }
            None => println!(
                "  [skip] {}: no API key (set {})",
                kind,
                config.providers.api_key_env(kind)
            ),
        }
    }

    let session_store = JsonFileSessionStore::new(config.storage.path.clone());
    let storage = session_store.health_check().await;
    println!("\nStorage: {}", session_store.dir().display());
    if storage.is_healthy() {
        println!("  [ok]   writable, {} stored session(s)", storage.session_files);
    } else {
        healthy = false;
        println!(
            "  [fail] {}",
            storage.error.as_deref().unwrap_or("unknown error")
        );
    }

    let default_provider = &config.default_llm.provider;
    println!("\nDefault model: {} / {}", default_provider, config.default_llm.model);
    let registered = default_provider
        .parse::<ProviderKind>()
        .is_ok_and(|kind| results.iter().any(|(k, _)| *k == kind));
    if !registered {
        println!("  [warn] default provider has no API key configured");
    }

    if !healthy {
        bail!("Health check failed");
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<SessionId> {
    id.parse()
        .map_err(|e| anyhow::anyhow!("'{}' is not a session id: {}", id, e))
}

fn write_file(path: &PathBuf, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
