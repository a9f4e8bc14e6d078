// ============================================================================
// chatqa — Terminal Q&A chat over a precomputed embedding store
// ============================================================================
// Usage:
//   chatqa chat [--model GPT-4] [--temperature 0.3]   Interactive session
//   chatqa ask "¿qué produce Arauco?"                  Single question
//   chatqa stats                                       Store and ban-list info
//
// Settings come from the environment (.env is loaded first); flags override.
// ============================================================================

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chatqa_core::security::load_ban_list;
use chatqa_core::{
    AppConfig, ChatModel, ChatSession, ConversationTurn, DataPaths, QaPipeline, Role,
    SessionConfig, VectorStore,
};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// Retrieval-augmented Q&A chat with security layers
#[derive(Parser)]
#[command(name = "chatqa", version, about = "Q&A chat over an embedding store, with security layers")]
struct Cli {
    /// Vector store file (.json or .jsonl); overrides VECTOR_STORE_PATH
    #[arg(long, global = true)]
    vector_store: Option<PathBuf>,

    /// Ban-list file, one term per line; overrides BAN_LIST_PATH
    #[arg(long, global = true)]
    ban_list: Option<PathBuf>,

    /// Ban-list matching: SIMPLE or REGEX; overrides FILTER_METHOD
    #[arg(long, global = true)]
    filter_method: Option<String>,

    /// Chunks retrieved per question; overrides TOP_K
    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Completion model: GPT-3.5, GPT-4 or GPT-4o
    #[arg(long, default_value = "GPT-3.5")]
    model: String,

    /// Response creativity, 0.0 to 1.0
    #[arg(long, default_value = "0.0")]
    temperature: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat {
        #[command(flatten)]
        settings: ModelArgs,
    },

    /// Answer a single question and exit
    Ask {
        question: String,

        #[command(flatten)]
        settings: ModelArgs,
    },

    /// Show vector store and ban-list statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatqa_cli=info,chatqa_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Stats => cmd_stats(&cli),
        Commands::Chat { settings } => {
            let pipeline = build_pipeline(&cli)?;
            cmd_chat(&pipeline, session_config(settings)?).await
        }
        Commands::Ask { question, settings } => {
            let pipeline = build_pipeline(&cli)?;
            cmd_ask(&pipeline, session_config(settings)?, question).await
        }
    }
}

fn build_pipeline(cli: &Cli) -> Result<QaPipeline> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;

    if let Some(path) = &cli.vector_store {
        config.vector_store_path = path.clone();
    }
    if let Some(path) = &cli.ban_list {
        config.ban_list_path = path.clone();
    }
    if let Some(method) = &cli.filter_method {
        config.filter_method = method.parse()?;
    }
    if let Some(k) = cli.top_k {
        config.top_k = k;
    }

    info!("Starting chatqa (store: {})", config.vector_store_path.display());
    Ok(QaPipeline::from_config(&config)?)
}

fn session_config(settings: &ModelArgs) -> Result<SessionConfig> {
    let model: ChatModel = settings.model.parse()?;
    Ok(SessionConfig::new(model, settings.temperature)?)
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_stats(cli: &Cli) -> Result<()> {
    let paths = DataPaths::from_env();
    let store_path = cli.vector_store.clone().unwrap_or(paths.vector_store);
    let ban_path = cli.ban_list.clone().unwrap_or(paths.ban_list);

    let store = VectorStore::load(&store_path)?;
    let banned = load_ban_list(&ban_path)?;

    println!("=== ChatQA Stats ===");
    println!("Vector store: {}", store_path.display());
    println!("  Chunks:     {}", store.len());
    match store.dimension() {
        Some(dim) => println!("  Dimension:  {}", dim),
        None => println!("  Dimension:  - (empty store)"),
    }
    println!("Ban-list:     {}", ban_path.display());
    println!("  Terms:      {}", banned.len());

    Ok(())
}

async fn cmd_ask(pipeline: &QaPipeline, config: SessionConfig, question: &str) -> Result<()> {
    let mut session = ChatSession::new(config);
    let outcome = session.submit(pipeline, question).await?;
    println!("{}", outcome.response());
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

async fn cmd_chat(pipeline: &QaPipeline, config: SessionConfig) -> Result<()> {
    let mut session = ChatSession::new(config);

    println!("=== CHAT Q&A [Capas de seguridad] ===");
    println!("Store: {} chunks | /help para ver los comandos", pipeline.store().len());
    print_config(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n¿Cuál es tu consulta? > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match handle_command(command, &mut session) {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        render(Role::User, input);
        match session.submit(pipeline, input).await {
            Ok(outcome) => render(Role::Assistant, outcome.response()),
            Err(e) => {
                error!("Turn failed: {}", e);
                println!("[error] No se pudo generar una respuesta: {}", e);
            }
        }
    }

    info!("Session {} closed after {} turns", session.id(), session.history().len());
    Ok(())
}

fn handle_command(command: &str, session: &mut ChatSession) -> Flow {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("quit" | "exit", _) => return Flow::Quit,
        ("help", _) => print_help(),
        ("config", _) => print_config(session),
        ("history", _) => print_history(session.history()),
        ("model", Some(value)) => match value.parse::<ChatModel>() {
            Ok(model) => {
                session.config_mut().model = model;
                print_config(session);
            }
            Err(e) => println!("{}", e),
        },
        ("temperature", Some(value)) => match value.parse::<f32>() {
            Ok(t) => match session.config_mut().set_temperature(t) {
                Ok(()) => print_config(session),
                Err(e) => println!("{}", e),
            },
            Err(_) => println!("Invalid temperature '{}'", value),
        },
        ("model" | "temperature", None) => println!("Usage: /{} <value>", name),
        _ => println!("Unknown command '/{}'. Try /help", name),
    }

    Flow::Continue
}

// ============================================================================
// Rendering
// ============================================================================

fn render(role: Role, content: &str) {
    println!("[{}] {}", role, content);
}

fn print_history(history: &[ConversationTurn]) {
    if history.is_empty() {
        println!("No messages yet.");
        return;
    }
    for turn in history {
        render(turn.role(), turn.content());
    }
}

fn print_config(session: &ChatSession) {
    let config = session.config();
    println!(
        "Modelo: {} ({}) | Temperatura: {:.1}",
        config.model,
        config.model.api_name(),
        config.temperature()
    );
}

fn print_help() {
    println!("Commands:");
    println!("  /model <GPT-3.5|GPT-4|GPT-4o>   Change the completion model");
    println!("  /temperature <0.0-1.0>          Change response creativity");
    println!("  /config                         Show current settings");
    println!("  /history                        Show the conversation so far");
    println!("  /quit                           Leave the session");
}
