use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tool_caller::{
    Assistant, Dispatcher, GeneratorBackend, LlmGenerator, ProjectConfig, PromptMessages,
    RequestOutcome, Sandbox, ToolRegistry, register_default_tools, render_schema_block,
};

#[derive(Parser)]
#[command(name = "tool-caller", version)]
#[command(about = "Prompt-driven tool calling for text-generation models", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (default: ./tool-caller.toml, then ~/.config/tool-caller/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Generation backend to use (anthropic, openai, ollama)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory the file tools are confined to
    #[arg(long, global = true)]
    sandbox: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool list advertised to the model
    Schema,
    /// Print the system/user prompt for a message
    Prompt {
        /// The user message
        message: String,
    },
    /// Extract and dispatch a tool call from raw model output
    Dispatch {
        /// Model output (read from stdin when omitted)
        text: Option<String>,
    },
    /// Send a message to the model and dispatch any tool call it makes
    Run {
        /// The user message
        message: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    match &cli.config {
        Some(path) => ProjectConfig::load_from(path),
        None => ProjectConfig::load(),
    }
}

fn create_tool_registry(cli: &Cli, config: &ProjectConfig) -> Result<ToolRegistry> {
    let root = cli.sandbox.clone().unwrap_or_else(|| config.sandbox_root());
    let sandbox = Arc::new(Sandbox::new(&root)?);
    info!(root = %sandbox.root().display(), "sandbox ready");

    let mut registry = ToolRegistry::with_policy(config.duplicate_policy);
    register_default_tools(&mut registry, &sandbox)?;
    Ok(registry)
}

fn create_generator(cli: &Cli, config: &ProjectConfig) -> Result<LlmGenerator> {
    let provider = cli
        .provider
        .as_deref()
        .or(config.provider.as_deref())
        .unwrap_or("ollama");
    let backend: GeneratorBackend = provider.parse()?;
    let model = cli.model.as_deref().or(config.model.as_deref());

    let mut generator = LlmGenerator::new(backend, model)?;
    if let Some(base_url) = &config.base_url {
        generator = generator.with_base_url(base_url);
    }
    if let Some(max_tokens) = config.max_tokens {
        generator = generator.with_max_tokens(max_tokens);
    }
    if let Some(secs) = config.timeout_secs {
        generator = generator.with_timeout(Duration::from_secs(secs));
    }
    Ok(generator)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli).context("failed to load configuration")?;
    let registry = Arc::new(create_tool_registry(&cli, &config)?);

    match &cli.command {
        Commands::Schema => {
            println!("{}", render_schema_block(&registry));
        }
        Commands::Prompt { message } => {
            print_json(&PromptMessages::for_request(&registry, message.as_str()))?;
        }
        Commands::Dispatch { text } => {
            let text = match text {
                Some(text) => text.clone(),
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read model output from stdin")?;
                    buf
                }
            };

            let dispatcher = Dispatcher::new(Arc::clone(&registry));
            match dispatcher.dispatch_text(&text).await {
                None => println!("No tool call - model answered directly."),
                Some(Ok(value)) => print_json(&value)?,
                Some(Err(e)) => {
                    error!(kind = %e.kind, error = %e.message, "dispatch failed");
                    print_json(&e)?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Run { message } => {
            let generator =
                create_generator(&cli, &config).context("failed to create text generator")?;
            let assistant = Assistant::new(generator, Arc::clone(&registry))
                .with_strict_extraction(config.strict_extraction);

            match assistant.handle_request(message).await? {
                RequestOutcome::Answered { raw } => println!("{}", raw),
                RequestOutcome::ToolCalled {
                    call,
                    result: Ok(value),
                    ..
                } => {
                    info!(tool = %call.name, "tool call completed");
                    print_json(&value)?;
                }
                RequestOutcome::ToolCalled { result: Err(e), .. }
                | RequestOutcome::Malformed { error: e, .. } => {
                    error!(kind = %e.kind, error = %e.message, "tool call failed");
                    print_json(&e)?;
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
