//! NetPilot: natural-language Cisco IOS configuration over SSH.
//!
//! Wires the command generator, sanitizer, execution engine and history
//! store behind the `netpilot` command line. Logs go to stderr; stdout
//! carries only operator output.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use np_agent::cli::{self, Cli, Commands};
use np_agent::{AppConfig, ChatCompletionsSource, CommandSource, ExecutionEngine, HistoryStore};
use np_ios_tools::Sanitizer;
use np_protocol::CommandBatch;
use np_session::{Connector, SessionChannel, SshConnector};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "netpilot starting");

    match cli.command {
        Commands::History { limit } => {
            let config = AppConfig::from_file(&cli.config)?;
            let store = HistoryStore::from_config(&config.history);
            print!("{}", cli::render_history(&store.recent(limit).await));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Generate { request } => {
            let config = AppConfig::from_file(&cli.config)?;
            let sanitizer = config.safety.sanitizer()?;
            let batch = generate(&config, &sanitizer, &request.join(" ")).await?;
            print!("{}", cli::render_batch(&batch));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            yes,
            dry_run,
            json,
            request,
        } => {
            let config = AppConfig::from_file(&cli.config)?;
            let sanitizer = config.safety.sanitizer()?;
            let batch = generate(&config, &sanitizer, &request.join(" ")).await?;
            print!("{}", cli::render_batch(&batch));
            if dry_run {
                return Ok(ExitCode::SUCCESS);
            }
            execute(&config, &batch, yes, json).await
        }
        Commands::Exec { file, yes, json } => {
            let config = AppConfig::from_file(&cli.config)?;
            let sanitizer = config.safety.sanitizer()?;
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let batch = sanitizer.sanitize(&raw);
            print!("{}", cli::render_batch(&batch));
            execute(&config, &batch, yes, json).await
        }
        Commands::TestConnection => {
            let config = AppConfig::from_file(&cli.config)?;
            test_connection(&config).await
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn generate(
    config: &AppConfig,
    sanitizer: &Sanitizer,
    request: &str,
) -> anyhow::Result<CommandBatch> {
    let source = ChatCompletionsSource::from_env(config.generator.clone())?;
    tracing::info!(model = %source.config().model, "generating commands");
    let raw = source
        .generate(request)
        .await
        .context("command generation failed")?;
    Ok(sanitizer.sanitize(&raw))
}

async fn execute(
    config: &AppConfig,
    batch: &CommandBatch,
    yes: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    if batch.executable_count() == 0 {
        println!("nothing to execute");
        return Ok(ExitCode::SUCCESS);
    }

    if !yes && !confirm(&config.device.session.host).await? {
        println!("aborted");
        return Ok(ExitCode::FAILURE);
    }

    let secret = config.device.password()?;
    let matcher = config.safety.prompt_matcher()?;
    let connector = SshConnector::new();
    let engine = ExecutionEngine::new(&connector, &matcher);

    let transcript = engine.run(&config.device.session, &secret, batch).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        println!("{}", transcript.render());
        println!("{}", cli::render_summary(&transcript));
    }

    let store = HistoryStore::from_config(&config.history);
    if let Err(e) = store.append(&transcript).await {
        tracing::warn!(path = %store.path().display(), error = %e, "failed to record history");
    }

    Ok(if transcript.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn confirm(host: &str) -> anyhow::Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("Execute on {host}? [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(cli::is_affirmative(&answer))
}

async fn test_connection(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let session_config = &config.device.session;
    let secret = config.device.password()?;
    let matcher = config.safety.prompt_matcher()?;

    let mut session = match SshConnector::new().open(session_config, &secret).await {
        Ok(session) => session,
        Err(e) => {
            println!("connection to {} failed: {e}", session_config.host);
            return Ok(ExitCode::FAILURE);
        }
    };

    let result = session
        .drain_initial(&matcher, session_config.drain_timeout())
        .await;
    session.close().await;

    match result {
        Ok(banner) => {
            let prompt = banner.lines().last().unwrap_or_default().trim();
            println!("connected to {} as {}", session_config.host, session_config.username);
            if !prompt.is_empty() {
                println!("device prompt: {prompt}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("session to {} dropped: {e}", session_config.host);
            Ok(ExitCode::FAILURE)
        }
    }
}
