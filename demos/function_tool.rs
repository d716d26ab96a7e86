//! Expose a caller-hosted function with a hidden, caller-fixed argument.
//!
//! The model only sees `query`; `session_id` is filled in on every call.

use serde_json::json;
use subconscious::tools::normalize_tools;
use subconscious::{engines, FunctionTool, HttpMethod, RunInput, RunOptions, Subconscious};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let search = FunctionTool::new(
        "kb_search",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "What to look for"},
                "session_id": {"type": "string"}
            },
            "required": ["query"]
        }),
    )
    .description("Search the team knowledge base")
    .url("https://tools.example.com/kb/search")
    .method(HttpMethod::Post)
    .timeout_secs(20)
    .default_arg("session_id", json!("demo-session"));

    // What the model will see, and what the endpoint will receive.
    let normalized = normalize_tools(&[search.clone().into()])?;
    if let Some(f) = normalized[0].as_function() {
        println!("model schema: {}", f.model_parameters());
        println!(
            "invocation:   {}",
            f.invocation_body(&json!({"query": "deploy checklist"}))?
        );
    }

    let client = Subconscious::from_env()?;
    let run = client
        .run(
            engines::TIM_GPT,
            &RunInput::new("Find our deploy checklist and summarize it").tool(search),
            RunOptions::awaiting(),
        )
        .await?;
    println!("{}", run.answer().unwrap_or("(no answer)"));
    Ok(())
}
