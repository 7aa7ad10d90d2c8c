//! Server-sent-event relay for streaming generations.
//!
//! The tutor reports the accumulated text after every token; the browser only
//! needs what is new.  [`relay`] runs a generation in a background task and
//! turns its callbacks into `{"delta": …}` events, followed by one
//! `{"done": true, "content": …}` event (or `{"error": …}` on failure).

use std::convert::Infallible;
use std::future::Future;

use axum::response::sse::{Event, KeepAlive, Sse};
use cognify_llm::LlmError;
use futures::Stream;
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{Instrument, Span, warn};

/// Turns accumulated-text callbacks into delta events.
pub struct DeltaSink {
    tx: UnboundedSender<Value>,
    sent: String,
}

impl DeltaSink {
    fn new(tx: UnboundedSender<Value>) -> Self {
        Self { tx, sent: String::new() }
    }

    /// Forward the part of `accumulated` not yet sent.  Text that does not
    /// extend what was sent is a replacement and goes out whole.
    pub fn push(&mut self, accumulated: &str) {
        let delta = accumulated.strip_prefix(self.sent.as_str()).unwrap_or(accumulated);
        if delta.is_empty() {
            return;
        }
        // A closed channel means the client went away; the generation still
        // runs to completion so its result can be persisted.
        let _ = self.tx.send(json!({ "delta": delta }));
        self.sent.clear();
        self.sent.push_str(accumulated);
    }
}

/// Run `work` in the background and stream its progress as SSE.
pub fn relay<W, Fut>(work: W) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    W: FnOnce(DeltaSink) -> Fut,
    Fut: Future<Output = Result<String, LlmError>> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let generation = work(DeltaSink::new(tx.clone()));

    tokio::spawn(
        async move {
            let last = match generation.await {
                Ok(content) => json!({ "done": true, "content": content }),
                Err(e) => {
                    warn!(error = %e, "streamed generation failed");
                    json!({ "error": "Connection error, make sure your AI server is running" })
                }
            };
            let _ = tx.send(last);
        }
        .instrument(Span::current()),
    );

    let events = UnboundedReceiverStream::new(rx)
        .map(|payload| Ok::<_, Infallible>(Event::default().data(payload.to_string())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod test {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Value>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(v) = rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[test]
    fn sends_only_new_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = DeltaSink::new(tx);
        sink.push("Hel");
        sink.push("Hel");
        sink.push("Hello");
        sink.push("Hello wörld");
        let deltas: Vec<_> = drain(&mut rx).into_iter().map(|v| v["delta"].clone()).collect();
        assert_eq!(deltas, vec![json!("Hel"), json!("lo"), json!(" wörld")]);
    }

    #[test]
    fn replaced_text_is_resent_whole() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = DeltaSink::new(tx);
        sink.push("wörld");
        // Shorter than what was already sent.
        sink.push("wx");
        let events = drain(&mut rx);
        assert_eq!(events[1]["delta"], "wx");
    }

    #[test]
    fn longer_replacement_is_resent_whole() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = DeltaSink::new(tx);
        sink.push("Hello");
        sink.push("Help me out");
        sink.push("Help me out!");
        let deltas: Vec<_> = drain(&mut rx).into_iter().map(|v| v["delta"].clone()).collect();
        assert_eq!(deltas, vec![json!("Hello"), json!("Help me out"), json!("!")]);
    }
}
