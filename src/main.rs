use docsql_gateway::config::{DatabaseConfig, GatewayConfig};
use docsql_gateway::db::{init_pool, ConversationStore, PgConversationStore, SqliteConversationStore};
use docsql_gateway::execution::{PostgresEngine, QueryExecutor, SqlEngine, SqliteEngine};
use docsql_gateway::gateway::{Gateway, TurnOutcome};
use docsql_gateway::llm::OpenAiClient;
use docsql_gateway::prompt::PromptBuilder;
use docsql_gateway::session::Session;
use docsql_gateway::workflow::CANCELLATION_MESSAGE;
use docsql_gateway::ExecutionResult;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docsql")]
#[command(about = "Ask questions about extracted documents in plain English")]
#[command(version)]
struct Args {
    /// Use a local SQLite file for both queries and saved conversations
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,

    /// Completion model (or set OPENAI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat
    Chat,
    /// Answer a single question
    Ask {
        question: String,

        /// Run a modifying statement without asking
        #[arg(long)]
        yes: bool,
    },
    /// Manage saved conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Print the prompt that would be sent for a question
    Prompt { question: String },
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List saved conversations, newest first
    List,
    /// Print one conversation
    Show { id: i64 },
    /// Delete a conversation
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Commands::Prompt { question } = &args.command {
        println!("{}", PromptBuilder::default().build(question));
        return Ok(());
    }

    let mut config = GatewayConfig::from_env()?;
    if let Some(path) = args.sqlite {
        config = config.with_sqlite(path);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    match args.command {
        Commands::Chat => run_chat(&config).await,
        Commands::Ask { question, yes } => run_ask(&config, &question, yes).await,
        Commands::Conversations { action } => run_conversations(&config, action).await,
        Commands::Prompt { .. } => Ok(()),
    }
}

async fn open_backends(config: &GatewayConfig) -> Result<(Arc<dyn SqlEngine>, Arc<dyn ConversationStore>)> {
    match &config.database {
        DatabaseConfig::Sqlite(path) => {
            info!("Using SQLite database {:?}", path);
            let store = SqliteConversationStore::open(path)?;
            Ok((Arc::new(SqliteEngine::new(path.clone())), Arc::new(store)))
        }
        DatabaseConfig::Postgres(target) => {
            let options = target.connect_options()?;
            let pool = init_pool(options.clone())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to Postgres: {}", e))?;
            info!("Connected to Postgres");
            Ok((Arc::new(PostgresEngine::new(options)), Arc::new(PgConversationStore::new(pool))))
        }
    }
}

async fn build_gateway(config: &GatewayConfig) -> Result<Gateway> {
    let client = OpenAiClient::new(config.llm.require_api_key()?.to_string())
        .with_model(config.llm.model.clone())
        .with_base_url(config.llm.base_url.clone());
    let (engine, store) = open_backends(config).await?;

    Ok(Gateway::new(Arc::new(client), QueryExecutor::new(engine)).with_store(store))
}

fn print_result(result: &ExecutionResult) {
    match result.tabular() {
        Some(table) if table.is_empty() => println!("The query returned no results."),
        _ => println!("{}", result.to_text()),
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Executed { statement, result, .. } => {
            println!("SQL Query: `{}`", statement);
            print_result(result);
        }
        TurnOutcome::ConfirmationRequired { statement, prompt } => {
            println!("SQL Query: `{}`", statement);
            println!("{}", prompt);
        }
        TurnOutcome::Cancelled { .. } => println!("{}", CANCELLATION_MESSAGE),
        TurnOutcome::NothingPending => {}
    }
}

async fn run_ask(config: &GatewayConfig, question: &str, yes: bool) -> Result<()> {
    let gateway = build_gateway(config).await?;
    let mut session = Session::new();

    let outcome = gateway.ask(&mut session, question).await?;
    print_outcome(&outcome);

    if let TurnOutcome::ConfirmationRequired { .. } = outcome {
        let answer = if yes { "yes" } else { "no" };
        let outcome = gateway.confirm(&mut session, answer).await?;
        print_outcome(&outcome);
    }
    Ok(())
}

async fn run_chat(config: &GatewayConfig) -> Result<()> {
    let gateway = build_gateway(config).await?;
    let mut session = Session::new();

    println!("Ask a question about your documents. Commands: /ask QUESTION, /save [title], /list, /load ID, /new, /quit");
    println!("While a change awaits yes/no, /ask QUESTION drops it and asks the new question.");

    let stdin = io::stdin();
    loop {
        let marker = if session.state.is_awaiting() { "(yes/no)> " } else { "> " };
        print!("{}", marker);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            let rest = rest.trim();
            match name {
                "quit" | "exit" => break,
                "ask" if !rest.is_empty() => match gateway.ask(&mut session, rest).await {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => {
                        error!("Turn failed: {}", e);
                        println!("Error generating SQL query: {}", e);
                    }
                },
                "new" => {
                    session.reset();
                    println!("Started a new conversation.");
                }
                "save" => {
                    let title = if rest.is_empty() { None } else { Some(rest) };
                    match gateway.save(&mut session, title).await {
                        Ok(id) => println!("Conversation saved (id {}).", id),
                        Err(e) => println!("Error saving conversation: {}", e),
                    }
                }
                "list" => match gateway.store()?.list().await {
                    Ok(records) => {
                        for record in records {
                            println!("{:>5}  {}  {}", record.id, record.created_at.format("%Y-%m-%d %H:%M"), record.title);
                        }
                    }
                    Err(e) => println!("Error listing conversations: {}", e),
                },
                "load" => match rest.parse::<i64>() {
                    Ok(id) => match gateway.load(id).await {
                        Ok(loaded) => {
                            session = loaded;
                            for message in session.messages() {
                                println!("[{:?}] {}", message.role, message.content);
                            }
                        }
                        Err(e) => println!("Error loading conversation: {}", e),
                    },
                    Err(_) => println!("Usage: /load ID"),
                },
                other => println!("Unknown command: /{}", other),
            }
            continue;
        }

        match gateway.respond(&mut session, input).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                error!("Turn failed: {}", e);
                println!("Error generating SQL query: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_conversations(config: &GatewayConfig, action: ConversationAction) -> Result<()> {
    let (_, store) = open_backends(config).await?;

    match action {
        ConversationAction::List => {
            let records = store.list().await?;
            if records.is_empty() {
                println!("No saved conversations.");
            }
            for record in records {
                println!("{:>5}  {}  {}", record.id, record.created_at.format("%Y-%m-%d %H:%M"), record.title);
            }
        }
        ConversationAction::Show { id } => match store.get(id).await? {
            Some(record) => {
                println!("{} ({})", record.title, record.created_at.format("%Y-%m-%d %H:%M:%S"));
                for message in &record.conversation {
                    println!("\n[{:?}]\n{}", message.role, message.content);
                }
            }
            None => anyhow::bail!("Conversation {} not found", id),
        },
        ConversationAction::Delete { id } => {
            if store.delete(id).await? {
                println!("Deleted conversation {}.", id);
            } else {
                anyhow::bail!("Conversation {} not found", id);
            }
        }
    }
    Ok(())
}
