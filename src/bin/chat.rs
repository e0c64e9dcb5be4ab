use clap::Parser;
use support_triage_agent::client::{RunClient, RunReply};
use support_triage_agent::config::{DEFAULT_ASSISTANT_ID, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal chat against the support run server
#[derive(Debug, Parser)]
#[command(name = "support-chat", version)]
struct Args {
    /// Run server base URL
    #[arg(long, env = "SUPPORT_BASE_URL", default_value_t = format!("http://127.0.0.1:{}", DEFAULT_PORT))]
    base_url: String,

    /// Graph id that must exist on the server
    #[arg(long, env = "ASSISTANT_ID", default_value = DEFAULT_ASSISTANT_ID)]
    assistant_id: String,
}

const HELP: &str = "Commands: /reset (new thread), /thread, /check (assistant exists), /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut client = RunClient::new(&args.base_url, args.assistant_id)?;

    println!("Support chat: {}", args.base_url);
    println!("{}", HELP);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match text {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/reset" => {
                client.reset_thread();
                println!("Chat reset; a new thread starts with the next message.");
            }
            "/thread" => println!(
                "Current thread_id: {}",
                client.thread_id().unwrap_or("(not created yet)")
            ),
            "/check" => match client.assistant_exists().await {
                Ok(true) => println!("Assistant '{}' found", client.assistant_id()),
                Ok(false) => println!("Assistant '{}' NOT found", client.assistant_id()),
                Err(e) => println!("Error! Backend call failed:\n\n{}", e),
            },
            _ => match client.send(text).await {
                Ok(RunReply::Assistant(reply)) => println!("assistant: {}", reply),
                Ok(RunReply::NeedsReview(reason)) => {
                    println!("[needs human review] {}", reason);
                    println!("A support agent will follow up on this thread.");
                }
                Ok(RunReply::Unparsed(raw)) => println!(
                    "Run completed, but I couldn't confidently parse the assistant message.\n\nRaw JSON:\n{}",
                    serde_json::to_string_pretty(&raw).unwrap_or_else(|_| raw.to_string())
                ),
                Err(e) => println!("Error! Backend call failed:\n\n{}", e),
            },
        }
    }

    Ok(())
}
