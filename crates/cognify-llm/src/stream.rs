//! Token accumulation over streamed generation bodies.
//!
//! Model servers stream either NDJSON (`{"response": "...", "done": false}`
//! one object per line, as Ollama does) or SSE (`data: {...}` lines ending
//! with `data: [DONE]`, as OpenAI-compatible servers do).  Both arrive as
//! arbitrary byte chunks, so a line (or a multi-byte UTF-8 character) may be
//! split across two network reads.
//!
//! [`TokenAccumulator`] holds the partial tail between reads and keeps the
//! running text.  After every delta the caller's callback receives the
//! **whole** accumulated string as a borrow, so no per-token copy is made.

use std::pin::pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::trace;

/// Incremental decoder for NDJSON / SSE generation streams.
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    /// Bytes after the last `\n` seen so far.
    pending: Vec<u8>,
    text: String,
    finished: bool,
}

impl TokenAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `true` once a `done` marker has been seen; later input is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one network read.  `on_token` fires once per non-empty delta.
    pub fn push<F>(&mut self, chunk: &[u8], on_token: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        if self.finished {
            return;
        }
        self.pending.extend_from_slice(chunk);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            // `\n` never occurs inside a multi-byte sequence, so a complete
            // line is always a complete UTF-8 fragment.
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.consume_line(&line, on_token);
            if self.finished {
                self.pending.clear();
                return;
            }
        }
    }

    /// End of stream: parse whatever partial line is left and return the text.
    pub fn finish<F>(mut self, on_token: &mut F) -> String
    where
        F: FnMut(&str) + ?Sized,
    {
        if !self.finished && !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            let tail = String::from_utf8_lossy(&tail).into_owned();
            self.consume_line(&tail, on_token);
        }
        self.text
    }

    fn consume_line<F>(&mut self, raw: &str, on_token: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let payload = match sse_field(trimmed) {
            SseLine::Data(data) => data,
            SseLine::Ignored => return,
            SseLine::NotSse => trimmed,
        };

        if payload == "[DONE]" {
            self.finished = true;
            return;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                if let Some(delta) = delta_text(&value) {
                    self.append(delta, on_token);
                }
                if value.get("done").and_then(Value::as_bool) == Some(true) {
                    trace!(len = self.text.len(), "stream reported done");
                    self.finished = true;
                }
            }
            // Lenient: anything that is not JSON is model text.
            Err(_) => self.append(line, on_token),
        }
    }

    fn append<F>(&mut self, delta: &str, on_token: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        if delta.is_empty() {
            return;
        }
        self.text.push_str(delta);
        on_token(&self.text);
    }
}

enum SseLine<'a> {
    Data(&'a str),
    Ignored,
    NotSse,
}

fn sse_field(line: &str) -> SseLine<'_> {
    if let Some(data) = line.strip_prefix("data:") {
        return SseLine::Data(data.trim());
    }
    if line.starts_with(':')
        || line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
    {
        return SseLine::Ignored;
    }
    SseLine::NotSse
}

/// Pull the text delta out of one decoded stream object.
///
/// Ollama `generate` (`response`), Ollama `chat` (`message.content`) and the
/// OpenAI delta / full-message shapes are recognised, in that order.
pub fn delta_text(value: &Value) -> Option<&str> {
    value
        .get("response")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/message/content").and_then(Value::as_str))
        .or_else(|| value.pointer("/choices/0/delta/content").and_then(Value::as_str))
        .or_else(|| value.pointer("/choices/0/message/content").and_then(Value::as_str))
}

/// Drain a byte stream through a [`TokenAccumulator`], returning the full text.
///
/// Reading stops early once the stream reports `done`.
pub async fn accumulate<S, E, F>(body: S, mut on_token: F) -> Result<String, E>
where
    S: Stream<Item = Result<Bytes, E>>,
    F: FnMut(&str),
{
    let mut body = pin!(body);
    let mut acc = TokenAccumulator::new();
    while let Some(chunk) = body.next().await {
        acc.push(&chunk?, &mut on_token);
        if acc.is_finished() {
            break;
        }
    }
    Ok(acc.finish(&mut on_token))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::Infallible;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn ndjson_split_across_reads() {
        let body = chunks(&[
            "{\"response\":\"Hel\"}\n{\"resp",
            "onse\":\"lo\"}\n{\"done\":true}",
        ]);
        let mut seen = Vec::new();
        let text = accumulate(body, |t| seen.push(t.to_owned())).await.unwrap();
        assert_eq!(seen, vec!["Hel".to_owned(), "Hello".to_owned()]);
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn sse_deltas_until_done_marker() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            ": keep-alive\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
        ]);
        let mut calls = 0;
        let text = accumulate(body, |_| calls += 1).await.unwrap();
        assert_eq!(text, "Hi there");
        assert_eq!(calls, 2);
    }

    #[test]
    fn non_json_lines_are_appended_verbatim() {
        let mut acc = TokenAccumulator::new();
        let mut last = String::new();
        acc.push(b"plain words\n{\"response\":\"!\"}\n", &mut |t: &str| last = t.to_owned());
        assert_eq!(last, "plain words!");
        assert_eq!(acc.finish(&mut |_: &str| {}), "plain words!");
    }

    #[test]
    fn utf8_sequence_split_between_reads() {
        let line = "{\"response\":\"caf\u{e9}\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut acc = TokenAccumulator::new();
        let mut noop = |_: &str| {};
        acc.push(&line[..split], &mut noop);
        assert_eq!(acc.text(), "");
        acc.push(&line[split..], &mut noop);
        assert_eq!(acc.text(), "caf\u{e9}");
    }

    #[test]
    fn trailing_partial_line_parsed_at_end() {
        let mut acc = TokenAccumulator::new();
        let mut calls = Vec::new();
        acc.push(b"{\"response\":\"a\"}\n{\"response\":\"b\"}", &mut |t: &str| {
            calls.push(t.to_owned())
        });
        assert_eq!(calls, vec!["a"]);
        let text = acc.finish(&mut |t: &str| calls.push(t.to_owned()));
        assert_eq!(text, "ab");
        assert_eq!(calls, vec!["a", "ab"]);
    }

    #[test]
    fn empty_deltas_do_not_fire() {
        let mut acc = TokenAccumulator::new();
        let mut calls = 0;
        acc.push(b"{\"response\":\"\"}\n\n   \n{\"message\":{\"content\":\"x\"}}\n", &mut |_: &str| {
            calls += 1
        });
        assert_eq!(calls, 1);
        assert_eq!(acc.text(), "x");
    }

    #[test]
    fn delta_shapes() {
        let ollama: Value = serde_json::json!({ "response": "a" });
        let chat: Value = serde_json::json!({ "message": { "content": "b" } });
        let openai: Value = serde_json::json!({ "choices": [{ "message": { "content": "c" } }] });
        assert_eq!(delta_text(&ollama), Some("a"));
        assert_eq!(delta_text(&chat), Some("b"));
        assert_eq!(delta_text(&openai), Some("c"));
        assert_eq!(delta_text(&serde_json::json!({ "done": true })), None);
    }
}
