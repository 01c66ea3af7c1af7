//! Chat command - Interactive session routing requests by intent.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use tfagent_chat::{ChatAgent, Intent, IntentClassifier, KeywordClassifier, LlmAdapter};
use tfagent_core::{GenerationRequest, Orchestrator};

use super::generate::print_outcome;

#[derive(Args)]
pub struct ChatArgs {
    /// Stack that infrastructure requests are written to
    #[arg(short, long)]
    pub stack: Option<String>,

    /// Extra keywords that route a message to Terraform generation
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,
}

pub async fn execute(args: ChatArgs, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let client = Arc::new(LlmAdapter::from_settings(&config.llm).context("Model client is not configured")?);

    let orchestrator = Orchestrator::from_config(&config, client.clone())?;
    let agent = ChatAgent::new(client);
    let classifier = classifier(&args.keywords);

    println!("💬 Describe the infrastructure you need, or ask a question. Type 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(input) = next_input(&mut lines).await? else {
            break;
        };
        let input = input.as_str();
        if input.is_empty() {
            continue;
        }

        let intent = classifier.classify(input);
        debug!("Routing message as {:?}", intent);

        match intent {
            Intent::Terraform => {
                let mut request = GenerationRequest::new(input);
                if let Some(stack) = &args.stack {
                    request = request.with_stack(stack);
                }
                match orchestrator.generate_infrastructure(&request).await {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => eprintln!("❌ Error: {}", e),
                }
            }
            Intent::Chat => match agent.run(input).await {
                Ok(reply) => println!("Agent: {}", reply),
                Err(e) => eprintln!("❌ Error: {}", e),
            },
        }
    }

    println!("👋 Bye");
    Ok(())
}

fn classifier(extra: &[String]) -> KeywordClassifier {
    let default = KeywordClassifier::default();
    if extra.is_empty() {
        return default;
    }
    let mut keywords = default.keywords().to_vec();
    keywords.extend(extra.iter().map(|k| k.trim().to_string()).filter(|k| !k.is_empty()));
    KeywordClassifier::new(keywords)
}

/// Next trimmed line, or `None` at end of input or on an exit word.
async fn next_input<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> io::Result<Option<String>> {
    let line = lines.next_line().await?;
    Ok(line.map(|l| l.trim().to_string()).filter(|l| !is_exit(l)))
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit")
}
