//! Submit a run and wait for its answer.
//!
//! SUBCONSCIOUS_API_KEY=... cargo run --example quickstart

use subconscious::{engines, PollOptions, RunInput, RunOptions, Subconscious, Tool};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("subconscious=debug")),
        )
        .init();

    let client = Subconscious::from_env()?;
    let input = RunInput::new("What changed in the latest stable Rust release?")
        .tool(Tool::platform("parallel_search"));

    let run = client
        .run(
            engines::TIM_GPT,
            &input,
            RunOptions::awaiting().with_poll(PollOptions::new(2000, 60)),
        )
        .await?;

    println!("status: {}", run.status);
    if let Some(answer) = run.answer() {
        println!("\n{}", answer);
    }
    if let Some(result) = &run.result {
        for node in result.reasoning.iter().flat_map(|root| root.walk()) {
            if !node.title.is_empty() {
                println!("- {}", node.title);
            }
        }
    }
    if let Some(usage) = &run.usage {
        println!("\ntokens: {}", usage.total_tokens());
    }
    Ok(())
}
