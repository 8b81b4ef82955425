use clap::Parser;
use eyre::{Result, WrapErr};
use log::{info, warn};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use researcher::agent::{Driver, DriverConfig, Supervisor, SupervisorConfig, TraceEvent};
use researcher::cli::{Cli, is_exit_command, transcript};
use researcher::config::{CONFIG_ENV_VAR, Config, Credentials, LlmProvider};
use researcher::llm::{AnthropicClient, AnthropicConfig, GeminiClient, GeminiConfig, LlmClient};
use researcher::retrieval::{GeminiEmbedder, PineconeIndex};
use researcher::session::JsonlSessionStore;
use researcher::tools::{AcademicSearchTool, DocumentSearchTool, ToolRegistry, WebSearchTool};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("researcher")
        .join("logs");

    fs::create_dir_all(&log_dir).wrap_err("Failed to create log directory")?;

    let log_file = log_dir.join("researcher.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .wrap_err("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn prompt_for_query() -> Result<String> {
    print!("Enter your research query (or 'quit' to exit): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).wrap_err("Failed to read query")?;
    Ok(line.trim().to_string())
}

fn build_llm(config: &Config, credentials: &Credentials) -> Result<Arc<dyn LlmClient>> {
    let llm = &config.llm;
    let client: Arc<dyn LlmClient> = match llm.provider {
        LlmProvider::Anthropic => {
            let anthropic = AnthropicConfig {
                model: llm.model().to_string(),
                max_tokens: llm.max_tokens,
                temperature: Some(llm.temperature),
                timeout: llm.timeout(),
            };
            Arc::new(
                AnthropicClient::with_api_key(credentials.llm_api_key.clone(), anthropic)
                    .wrap_err("Failed to create Anthropic client")?,
            )
        }
        LlmProvider::Gemini => {
            let gemini = GeminiConfig {
                model: llm.model().to_string(),
                max_tokens: llm.max_tokens,
                temperature: Some(llm.temperature),
                timeout: llm.timeout(),
            };
            Arc::new(
                GeminiClient::with_api_key(credentials.llm_api_key.clone(), gemini)
                    .wrap_err("Failed to create Gemini client")?,
            )
        }
    };

    info!("Using model {}", client.model());
    Ok(client)
}

fn build_tools(config: &Config, credentials: &Credentials) -> Result<ToolRegistry> {
    let search = &config.search;
    let index_name = credentials.index_name.clone().unwrap_or_else(|| config.index.name.clone());

    let embedder = GeminiEmbedder::new(
        credentials.gemini_api_key.clone(),
        config.index.embedding_model.clone(),
        search.timeout(),
    )
    .wrap_err("Failed to create embedding client")?;
    let index = PineconeIndex::new(credentials.pinecone_api_key.clone(), index_name, search.timeout())
        .wrap_err("Failed to create Pinecone client")?;

    let registry = ToolRegistry::new()
        .with_tool(Box::new(WebSearchTool::new(
            credentials.tavily_api_key.clone(),
            search.web_results,
            search.snippet_chars,
            search.timeout(),
        )?))
        .with_tool(Box::new(AcademicSearchTool::new(
            search.academic_results,
            search.academic_max_chars,
            search.timeout(),
        )?))
        .with_tool(Box::new(DocumentSearchTool::new(
            Arc::new(embedder),
            Arc::new(index),
            search.document_results,
        )));

    info!("Registered {} tools: {:?}", registry.len(), registry.tool_names());
    Ok(registry)
}

/// Run one research session; failures inside the loop are already on the
/// transcript, so they only turn into the exit code here.
async fn run_research(query: &str, config: &Config) -> Result<ExitCode> {
    let credentials = Credentials::from_env(config.llm.provider).wrap_err("Missing credentials")?;
    let llm = build_llm(config, &credentials)?;
    let tools = Arc::new(build_tools(config, &credentials)?);

    let supervisor = Supervisor::with_config(
        llm,
        SupervisorConfig {
            available_documents: config.agent.available_documents.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: Some(config.llm.temperature),
        },
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TraceEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = transcript::render(&event) {
                println!("{}", line);
            }
        }
    });

    let mut driver = Driver::new(supervisor, tools)
        .with_config(DriverConfig {
            max_turns: config.agent.max_turns,
            selected_documents: Vec::new(),
        })
        .with_events(tx);

    if let Some(thread_id) = &config.session.thread_id {
        let store = JsonlSessionStore::new(&config.session.store_dir).wrap_err("Failed to open session store")?;
        driver = driver.with_session(Arc::new(store), thread_id.clone());
    }

    let result = driver.run_query(query).await;

    // Dropping the driver closes the channel so the printer drains and exits
    drop(driver);
    printer.await.wrap_err("Transcript printer failed")?;

    match result {
        Ok(outcome) => {
            info!("Finished after {} turn(s), answer length {}", outcome.turns, outcome.answer.len());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!("Research failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine; the variables may already be set
    let _ = dotenv::dotenv();

    setup_logging().wrap_err("Failed to setup logging")?;

    let cli = Cli::parse();

    let config_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).wrap_err("Failed to load configuration")?;
    config.validate().wrap_err("Invalid configuration")?;

    info!("Starting with config from: {:?}", config_path);

    let query = match cli.query_text() {
        Some(query) => query,
        None => prompt_for_query()?,
    };

    if query.is_empty() || is_exit_command(&query) {
        info!("No query given, exiting");
        return Ok(ExitCode::SUCCESS);
    }

    run_research(&query, &config).await
}
