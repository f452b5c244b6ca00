//! `rxpilot ask`: single-message or interactive chat.

use rxpilot_assistant::{ConversationSession, SessionError};
use rxpilot_config::AppConfig;
use rxpilot_core::DocumentStore;
use rxpilot_core::message::Message;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, email: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() && !rxpilot_providers::is_keyless(&config.default_provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...    (Gemini, the default provider)");
        eprintln!("    OPENAI_API_KEY=...    (OpenAI-compatible providers)");
        eprintln!("    RXPILOT_API_KEY=...   (generic)");
        eprintln!();
        eprintln!("  Or add it to {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let gateway = Arc::new(rxpilot_providers::build_gateway(&config)?);
    let store: Arc<dyn DocumentStore> = Arc::new(rxpilot_store::DocumentStoreClient::from_config(
        &config.document_store,
    ));
    let assistant = Arc::new(rxpilot_assistant::build_assistant(&config, gateway, Some(store)));
    let session = ConversationSession::new(assistant, email.clone());

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = session.submit(&msg).await?;
        eprint!("\r              \r");
        println!("{}", reply.content.replace("<br/>", "\n"));
        return Ok(());
    }

    println!();
    println!("  rxpilot: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.model());
    println!("  Patient:   {}", email.as_deref().unwrap_or("(anonymous)"));
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.submit(line).await {
            Ok(reply) => print_reply(&reply),
            Err(SessionError::EmptyUtterance) => {}
            Err(e) => eprintln!("  [Error] {e}"),
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_reply(reply: &Message) {
    println!();
    let tag = reply.intent.map(|i| format!(" [{i}]")).unwrap_or_default();
    for line in reply.content.split("<br/>") {
        println!("  Assistant{tag} > {line}");
    }
    println!();
}
