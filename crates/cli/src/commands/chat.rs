use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tablesafe_agent::classifier::{Thresholds, TopicClassifier};
use tablesafe_agent::embeddings::OllamaEmbeddingClient;
use tablesafe_agent::guardrails::GuardrailManager;
use tablesafe_agent::llm::OllamaChatClient;
use tablesafe_agent::runtime::ChatRuntime;
use tablesafe_core::audit::JsonlAuditSink;
use tablesafe_core::config::AppConfig;
use tablesafe_core::fixtures::sample_menu;
use tablesafe_core::menu::{Menu, MenuIndex};
use tokio::io::AsyncBufReadExt;
use tracing::info;

pub async fn run(config: &AppConfig, menu_path: Option<PathBuf>, baseline: bool) -> Result<()> {
    let menu = match &menu_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("could not read menu file `{}`", path.display()))?;
            Menu::from_toml_str(&raw)?
        }
        None => sample_menu(),
    };
    let index = MenuIndex::build(&menu).context("menu index construction failed")?;

    let audit = Arc::new(
        JsonlAuditSink::create(&config.guardrails.audit_log)
            .context("could not open the audit log")?,
    );
    let embedder = Arc::new(OllamaEmbeddingClient::new(&config.embedding)?);
    let thresholds = Thresholds::from_config(&config.guardrails)?;
    let classifier = TopicClassifier::new(embedder, thresholds)
        .await
        .context("topic classifier initialization failed (is the embedding backend running?)")?;
    let manager = GuardrailManager::new(index, classifier, audit);
    let client = OllamaChatClient::new(&config.llm)?;
    let mut runtime = ChatRuntime::new(manager, Box::new(client));

    info!(
        event_name = "cli.chat.started",
        session_id = %runtime.session_id(),
        baseline,
        "chat session started"
    );

    let mut guarded = !baseline;
    println!("Restaurant ordering assistant ({} mode)", mode_label(guarded));
    println!("Commands: quit, stats, reset, toggle\n");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush().context("could not flush stdout")?;

        let Some(line) = lines.next_line().await.context("could not read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                print_summary(&runtime);
                break;
            }
            "stats" => {
                print_summary(&runtime);
                continue;
            }
            "reset" => {
                runtime.reset();
                println!("Conversation reset.\n");
                continue;
            }
            "toggle" => {
                guarded = !guarded;
                println!("Switched to {} mode.\n", mode_label(guarded));
                continue;
            }
            _ => {}
        }

        if guarded {
            match runtime.handle_turn(input).await {
                Ok(outcome) => {
                    if let (Some(verdict), Some(score)) = (outcome.verdict, outcome.score) {
                        println!("[topic: {verdict}, score: {score:.3}]");
                    }
                    for error in &outcome.errors {
                        println!("[{}] {}", error.severity.as_str().to_uppercase(), error.message);
                    }
                    println!("\nAssistant: {}\n", outcome.reply);
                }
                Err(error) => println!("\nError processing request: {error:#}. Please try again.\n"),
            }
        } else {
            match runtime.handle_turn_baseline(input).await {
                Ok(reply) => println!("\nAssistant (unguarded): {reply}\n"),
                Err(error) => println!("\nError processing request: {error:#}. Please try again.\n"),
            }
        }
    }

    Ok(())
}

fn mode_label(guarded: bool) -> &'static str {
    if guarded {
        "guarded"
    } else {
        "baseline"
    }
}

fn print_summary(runtime: &ChatRuntime) {
    let summary = runtime.summary();
    println!("\nConversation summary:");
    println!("  Total turns: {}", summary.total_turns);
    if summary.total_turns > 0 {
        println!("  On-topic: {} ({:.1}%)", summary.on_topic, summary.on_topic_rate() * 100.0);
        println!("  Clarify: {} ({:.1}%)", summary.clarify, summary.clarify_rate() * 100.0);
        println!("  Off-topic: {} ({:.1}%)", summary.off_topic, summary.off_topic_rate() * 100.0);
    }
    println!();
}
