//! Interactive chat REPL over the streaming responder.
//!
//! The real model provider lives behind the `TextGenerator` seam; this
//! binary ships a small offline generator so the session pipeline (identity,
//! store, streaming) can be exercised end to end from a terminal.

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use futures_util::{StreamExt, stream};
use lagoon_core::{
    ConversationEngine, FragmentStream, GenerateError, Message, SessionStore, StreamingResponder,
    TextGenerator,
};
use lagoon_protocol::{ChatRequest, RequestMessage, StreamEvent};
use log::info;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

/// Command-line options for the chat REPL.
#[derive(Parser)]
#[command(name = "lagoon", version)]
struct Cli {
    /// Optional path to a lagoon.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the session store file path
    #[arg(long)]
    store: Option<PathBuf>,
    /// Resume an existing session token
    #[arg(long)]
    session: Option<Uuid>,
}

/// Offline generator: acknowledges the latest user message word by word.
struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        let last = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        let reply = format!(
            "You said \"{last}\". This offline build has no model provider; \
             transcript length is now {}.",
            messages.len()
        );
        let words = reply
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect::<Vec<_>>();
        Ok(Box::pin(stream::iter(words).then(|fragment| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            fragment
        })))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = lagoon_config::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());
    info!(
        "starting REPL (store={}, resume={})",
        store_path.display(),
        cli.session.is_some()
    );

    let store = SessionStore::open(&store_path).context("failed to open session store")?;
    let engine = ConversationEngine::new(Arc::new(CannedGenerator), config.fragment_timeout());
    let responder = StreamingResponder::new(engine, store);

    let mut token = cli.session.map(|id| id.to_string());
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("User: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() || input == "exit" {
            break;
        }

        let request = ChatRequest {
            session_token: token.clone(),
            messages: vec![RequestMessage::user(input)],
        };
        let mut reply = responder.respond(request)?;
        token = Some(reply.token());

        print!("Assistant: ");
        std::io::stdout().flush()?;
        while let Some(event) = reply.events.next().await {
            match event {
                StreamEvent::Fragment { text } => {
                    print!("{text}");
                    std::io::stdout().flush()?;
                }
                StreamEvent::Done => {}
                StreamEvent::Error { message } => {
                    eprintln!("\n[turn failed: {message}]");
                }
            }
        }
        println!();
        // Surface persistence failures without ending the conversation.
        if let Err(err) = reply.finish().await {
            eprintln!("[{err}]");
        }
    }

    if let Some(token) = token {
        println!("Session token: {token}");
    }
    Ok(())
}
