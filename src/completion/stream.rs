use futures::StreamExt;
use tokio::sync::mpsc;

use super::types::StreamEvent;
use super::wire::CompletionChunk;

/// Incremental parser for the `data:`-framed completion stream.
///
/// Network reads split lines at arbitrary byte offsets, so input is
/// buffered until a newline is seen. A completed line that fails to
/// decode is pushed back exactly once, in case the newline sat inside a
/// string value that the next read completes; when the identical line
/// fails a second time it is dropped so the rest of the stream still
/// gets through.
pub struct SseParser {
    buf: Vec<u8>,
    retried: Option<Vec<u8>>,
    done: bool,
}

enum LineOutcome {
    Content(String),
    Done,
    Skip,
    Malformed,
}

impl SseParser {
    pub fn new() -> Self {
        SseParser {
            buf: Vec::new(),
            retried: None,
            done: false,
        }
    }

    /// Feed one network read into the parser and collect the events it
    /// completes. After the `[DONE]` sentinel all further input is
    /// ignored.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buf.extend_from_slice(bytes);

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            match parse_line(&line) {
                LineOutcome::Content(text) => events.push(StreamEvent::Token(text)),
                LineOutcome::Done => {
                    self.done = true;
                    events.push(StreamEvent::Done);
                    return events;
                }
                LineOutcome::Skip => {}
                LineOutcome::Malformed => {
                    if self.retried.as_deref() == Some(line.as_slice()) {
                        tracing::warn!(
                            "Dropping undecodable stream line after retry ({} bytes)",
                            line.len()
                        );
                        self.retried = None;
                    } else {
                        // Put the line back and stop: the newline may have
                        // been payload, completed by the next read.
                        self.retried = Some(line.clone());
                        line.push(b'\n');
                        line.append(&mut self.buf);
                        self.buf = line;
                        break;
                    }
                }
            }
        }

        events
    }

    /// Signal end of input. Unterminated leftover bytes are dropped, and
    /// a stream that never sent `[DONE]` is closed out with one.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if !self.buf.is_empty() {
            tracing::warn!(
                "Discarding {} unterminated bytes at end of stream",
                self.buf.len()
            );
            self.buf.clear();
        }
        if self.done {
            Vec::new()
        } else {
            self.done = true;
            vec![StreamEvent::Done]
        }
    }
}

fn parse_line(line: &[u8]) -> LineOutcome {
    if line.is_empty() || line.first() == Some(&b':') {
        return LineOutcome::Skip;
    }
    let text = match std::str::from_utf8(line) {
        Ok(t) => t,
        Err(_) => return LineOutcome::Malformed,
    };
    let payload = match text.strip_prefix("data: ") {
        Some(p) => p.trim(),
        None => return LineOutcome::Skip,
    };
    if payload == "[DONE]" {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => match chunk.delta_content() {
            Some(content) => LineOutcome::Content(content.to_string()),
            None => LineOutcome::Skip,
        },
        Err(_) => LineOutcome::Malformed,
    }
}

/// Drive an upstream response body through the parser, forwarding events
/// until the stream closes or the receiver goes away.
pub async fn stream_completion(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("Stream error: {e}")))
                    .await;
                return;
            }
        };
        for event in parser.push(&bytes) {
            let is_done = matches!(event, StreamEvent::Done);
            if tx.send(event).await.is_err() {
                return;
            }
            if is_done {
                return;
            }
        }
    }

    for event in parser.finish() {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n"
        )
    }

    #[test]
    fn parses_tokens_split_across_reads() {
        let mut parser = SseParser::new();
        let line = delta_line("Hello");
        let (left, right) = line.split_at(25);

        assert!(parser.push(left.as_bytes()).is_empty());
        assert_eq!(
            parser.push(right.as_bytes()),
            vec![StreamEvent::Token("Hello".to_string())]
        );
    }

    #[test]
    fn fragments_arrive_in_order_until_done() {
        let mut parser = SseParser::new();
        let input = format!("{}{}data: [DONE]\n", delta_line("He"), delta_line("llo"));

        let events = parser.push(input.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Token("He".to_string()),
                StreamEvent::Token("llo".to_string()),
                StreamEvent::Done,
            ]
        );

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Token(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello");
    }

    #[test]
    fn done_sentinel_ends_the_stream() {
        let mut parser = SseParser::new();
        let input = format!("{}data: [DONE]\n{}", delta_line("a"), delta_line("b"));

        let events = parser.push(input.as_bytes());
        assert_eq!(
            events,
            vec![StreamEvent::Token("a".to_string()), StreamEvent::Done]
        );
        assert!(parser.push(delta_line("c").as_bytes()).is_empty());
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn comments_and_blank_lines_carry_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.push(b": keepalive\n\n:\nevent: ping\n").is_empty());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut parser = SseParser::new();
        let input = delta_line("ok").replace('\n', "\r\n");
        assert_eq!(
            parser.push(input.as_bytes()),
            vec![StreamEvent::Token("ok".to_string())]
        );
    }

    #[test]
    fn empty_and_missing_deltas_are_skipped() {
        let mut parser = SseParser::new();
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[]}\n",
        );
        assert!(parser.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn malformed_line_is_retried_once_then_dropped() {
        let mut parser = SseParser::new();

        assert!(parser.push(b"data: {\"choices\":[{\"bro\n").is_empty());
        // identical line fails again on the next read and is dropped;
        // the following line still parses
        let events = parser.push(delta_line("after").as_bytes());
        assert_eq!(events, vec![StreamEvent::Token("after".to_string())]);
    }

    #[test]
    fn invalid_utf8_is_dropped_after_retry() {
        let mut parser = SseParser::new();

        assert!(parser.push(b"data: \xff\xfe\n").is_empty());
        let events = parser.push(delta_line("ok").as_bytes());
        assert_eq!(events, vec![StreamEvent::Token("ok".to_string())]);
    }

    #[test]
    fn finish_closes_an_unfinished_stream() {
        let mut parser = SseParser::new();
        assert_eq!(
            parser.push(delta_line("tail").as_bytes()),
            vec![StreamEvent::Token("tail".to_string())]
        );
        // partial line without a terminator is dropped at end of input
        assert!(parser.push(b"data: {\"choi").is_empty());
        assert_eq!(parser.finish(), vec![StreamEvent::Done]);
    }

    #[test]
    fn multibyte_content_survives_arbitrary_splits() {
        let line = delta_line("日本語のテキスト");
        let bytes = line.as_bytes();

        for split in 1..bytes.len() {
            let mut parser = SseParser::new();
            let mut events = parser.push(&bytes[..split]);
            events.extend(parser.push(&bytes[split..]));
            assert_eq!(
                events,
                vec![StreamEvent::Token("日本語のテキスト".to_string())],
                "split at byte {split}"
            );
        }
    }
}
