// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::api::{start_server, AppState};
use crate::config::{resolve_api_key, ChatbotConfig, FailureMode, IndexKind};
use crate::rag::Chatbot;
use crate::vector::IndexFile;

/// CAN 2025 chatbot: retrieval-augmented answers over a local index
#[derive(Parser, Debug)]
#[command(name = "can-chatbot")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Question answering about CAN 2025 backed by a local vector index", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP API
    Serve,

    /// Answer one question and print it
    Ask {
        question: String,
    },

    /// Print index size and dimensions
    Inspect,
}

/// Settings that override the configuration file
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, global = true, env = "CAN_CHATBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "CAN_CHATBOT_HOST")]
    pub host: Option<String>,

    #[arg(long, global = true, env = "CAN_CHATBOT_PORT")]
    pub port: Option<u16>,

    /// Directory holding index.json
    #[arg(long, global = true, env = "CAN_CHATBOT_INDEX")]
    pub index_path: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    pub index_kind: Option<IndexKind>,

    /// ONNX sentence embedding model
    #[arg(long, global = true, env = "EMBEDDING_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    #[arg(long, global = true, env = "EMBEDDING_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    #[arg(long, global = true, env = "GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    /// Gemini API key (otherwise GOOGLE_API_KEY, then api-key)
    #[arg(long, global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    #[arg(long, global = true, value_enum)]
    pub failure_mode: Option<FailureMode>,
}

impl ConfigArgs {
    /// Builds the effective configuration: file, then flags, then API key lookup
    pub fn load(&self) -> Result<ChatbotConfig> {
        let config = match &self.config {
            Some(path) => ChatbotConfig::from_file(path)?,
            None => ChatbotConfig::default(),
        };
        Ok(self.apply(config, |name| env::var(name).ok()))
    }

    pub fn apply<F>(&self, mut config: ChatbotConfig, lookup: F) -> ChatbotConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.index_path {
            config.index.path = path.clone();
        }
        if let Some(kind) = self.index_kind {
            config.index.kind = kind;
        }
        if let Some(path) = &self.model_path {
            config.embedding.model_path = path.clone();
        }
        if let Some(path) = &self.tokenizer_path {
            config.embedding.tokenizer_path = path.clone();
        }
        if let Some(model) = &self.gemini_model {
            config.generation.model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(mode) = self.failure_mode {
            config.failure_mode = mode;
        }

        if let Some(key) = resolve_api_key(self.api_key.as_deref(), lookup) {
            config.generation.api_key = Some(key);
        }
        config
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.config.load()?;
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ask { question } => ask(config, &question).await,
        Commands::Inspect => inspect(&config),
    }
}

async fn serve(config: ChatbotConfig) -> Result<()> {
    config.validate()?;
    info!("🚀 Starting CAN 2025 chatbot server...");
    let chatbot = Chatbot::load(&config)
        .await
        .context("Failed to initialise the chatbot")?;
    let state = AppState::new(chatbot, config.failure_mode);
    start_server(&config.socket_addr(), state).await
}

async fn ask(config: ChatbotConfig, question: &str) -> Result<()> {
    config.validate()?;
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "The question cannot be empty");

    let chatbot = Chatbot::load(&config).await?;
    let answer = chatbot.answer(question).await?;
    println!("{}", answer.text);
    Ok(())
}

fn inspect(config: &ChatbotConfig) -> Result<()> {
    let file = IndexFile::read(&config.index.path)?;
    println!("📚 Index: {}", config.index.path.display());
    println!("   Documents:  {}", file.documents.len());
    println!("   Dimensions: {}", file.dimensions);
    println!(
        "   Model:      {}",
        file.model.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
