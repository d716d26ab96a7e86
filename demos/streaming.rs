//! Stream a run's answer as it is produced. Ctrl-C stops reading and closes the stream.
//!
//! SUBCONSCIOUS_API_KEY=... cargo run --example streaming

use futures::StreamExt;
use std::io::Write;
use subconscious::{engines, RunInput, StreamEvent, Subconscious};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let client = Subconscious::from_env()?;
    let mut stream = client
        .stream(engines::TIM_EDGE, &RunInput::new("Write a haiku about borrow checking"))
        .await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\ninterrupted");
                stream.close();
                break;
            }
            event = stream.next() => match event {
                Some(Ok(StreamEvent::Delta { content })) => {
                    print!("{}", content);
                    std::io::stdout().flush()?;
                }
                Some(Ok(StreamEvent::Done { run_id })) => {
                    println!("\n[done: {}]", run_id);
                    break;
                }
                Some(Ok(StreamEvent::Error { message, code })) => {
                    eprintln!(
                        "\nstream error ({}): {}",
                        code.as_deref().unwrap_or("unknown"),
                        message
                    );
                    break;
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }
    }
    Ok(())
}
