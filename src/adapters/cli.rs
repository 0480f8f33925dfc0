//! CLI adapter: one-shot prompts and an interactive loop over stdin.
//!
//! CLI access implies direct machine access, so queries are trusted as
//! given; the adapter's job is transport only.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::pipeline::{Dispatcher, RequestContext};
use crate::stream::{ChannelSink, StreamUnit};

/// Run one query in streaming mode, printing each unit as it arrives.
pub async fn run_prompt(dispatcher: &Dispatcher, query: &str, ctx: &RequestContext) -> Result<()> {
    let (mut sink, mut rx) = ChannelSink::channel(2);

    // Drain concurrently so the classification prints while the branch
    // is still running.
    let printer = tokio::spawn(async move {
        while let Some(unit) = rx.recv().await {
            match unit {
                StreamUnit::Classification(classification) => println!("[{classification}]"),
                StreamUnit::Result(response) => println!("{response}"),
            }
        }
    });

    dispatcher.run_streaming(query, ctx, &mut sink).await;
    drop(sink);
    printer.await?;
    Ok(())
}

/// Interactive loop: one pipeline run per non-empty stdin line.
///
/// `exit` or `quit` (or end of input) ends the loop. Each line gets a
/// fresh request context so "now" stays per-request.
pub async fn run_repl(
    dispatcher: &Dispatcher,
    user_timezone: &str,
    temperature: f32,
) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }
        let ctx = RequestContext::new(user_timezone, temperature);
        run_prompt(dispatcher, query, &ctx).await?;
    }
    Ok(())
}
