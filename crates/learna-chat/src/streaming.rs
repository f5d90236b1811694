//! Chunked plain-text reply streams.
//!
//! Replies arrive as an unframed byte stream whose chunk boundaries are
//! arbitrary and may split a multi-byte character. This module turns
//! such a stream into text deltas and feeds them into one open message.

use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::log::LogHandle;
use crate::message::MessageId;
use crate::ChatError;

/// A reply body: raw chunks as delivered by the transport.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, ChatError>>;

const REPLACEMENT: char = '\u{FFFD}';

/// Incremental UTF-8 decoder.
///
/// Bytes of a character cut by a chunk boundary are held back until the
/// rest arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            rest = &tail[bad..];
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    /// Flush at end of stream. A dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT.to_string()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

struct DeltaState {
    chunks: ChunkStream,
    decoder: Utf8Decoder,
    idle: Duration,
    done: bool,
}

/// Lazily turn a chunk stream into text deltas.
///
/// The sequence ends after the transport ends or after the first error;
/// it cannot be restarted. Waiting longer than `idle` for a chunk yields
/// `ChatError::Timeout`.
pub fn text_deltas(
    chunks: ChunkStream,
    idle: Duration,
) -> BoxStream<'static, Result<String, ChatError>> {
    let state = DeltaState {
        chunks,
        decoder: Utf8Decoder::new(),
        idle,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            match tokio::time::timeout(st.idle, st.chunks.next()).await {
                Err(_) => {
                    st.done = true;
                    let err = ChatError::Timeout(format!(
                        "no chunk received within {}s",
                        st.idle.as_secs_f64()
                    ));
                    return Some((Err(err), st));
                }
                Ok(Some(Ok(bytes))) => {
                    let text = st.decoder.decode(&bytes);
                    if text.is_empty() {
                        continue;
                    }
                    return Some((Ok(text), st));
                }
                Ok(Some(Err(e))) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                Ok(None) => {
                    st.done = true;
                    let tail = st.decoder.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    warn!("reply ended inside a multi-byte character");
                    return Some((Ok(tail), st));
                }
            }
        }
    })
    .boxed()
}

/// What a finished (or truncated) stream left in its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub message: MessageId,
    pub deltas: usize,
    pub bytes: usize,
}

/// Feeds reply streams into open messages of one session's log.
#[derive(Clone)]
pub struct StreamConsumer {
    log: LogHandle,
    idle: Duration,
    cancel: CancellationToken,
}

impl StreamConsumer {
    pub fn new(log: LogHandle, idle: Duration, cancel: CancellationToken) -> Self {
        Self { log, idle, cancel }
    }

    /// Append every delta of `chunks` to the open message `target`, then
    /// close it.
    ///
    /// On a transport, decode or timeout error the content received so far
    /// is kept, the message is closed and the error is returned. If the
    /// session is torn down mid-stream this returns `SessionClosed`
    /// without touching the log again.
    pub async fn consume(
        &self,
        chunks: ChunkStream,
        target: MessageId,
    ) -> Result<StreamSummary, ChatError> {
        let mut deltas = text_deltas(chunks, self.idle);
        let mut summary = StreamSummary {
            message: target,
            deltas: 0,
            bytes: 0,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ChatError::SessionClosed),
                next = deltas.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    summary.deltas += 1;
                    summary.bytes += text.len();
                    self.log.append(target, text).await?;
                }
                Some(Err(e)) => {
                    warn!(message_id = %target, error = %e, bytes = summary.bytes, "reply stream interrupted");
                    self.log.close(target).await?;
                    return Err(e);
                }
                None => {
                    self.log.close(target).await?;
                    debug!(message_id = %target, deltas = summary.deltas, bytes = summary.bytes, "reply stream complete");
                    return Ok(summary);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn chunks(parts: &[&str]) -> ChunkStream {
        let owned: Vec<Result<Vec<u8>, ChatError>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned).boxed()
    }

    fn decode_all(parts: &[&[u8]]) -> String {
        let mut decoder = Utf8Decoder::new();
        let mut out: String = parts.iter().map(|p| decoder.decode(p)).collect();
        out.push_str(&decoder.finish());
        out
    }

    #[test]
    fn ascii_chunks_concatenate() {
        assert_eq!(
            decode_all(&[b"Recur".as_slice(), b"sion is".as_slice(), b" fun.".as_slice()]),
            "Recursion is fun."
        );
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        // "é" is C3 A9, "€" is E2 82 AC
        let text = "café costs 3€";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), text, "split at {split}");
        }
    }

    #[test]
    fn four_byte_character_in_single_byte_chunks() {
        let text = "ok 🦀!";
        let parts: Vec<&[u8]> = text.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(&parts), text);
    }

    #[test]
    fn decoder_holds_back_incomplete_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"caf\xC3"), "caf");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\xA9"), "é");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        assert_eq!(decode_all(&[b"a\xFFb".as_slice()]), "a\u{FFFD}b");
    }

    #[test]
    fn dangling_partial_character_is_flushed_as_replacement() {
        assert_eq!(decode_all(&[b"abc\xE2\x82".as_slice()]), "abc\u{FFFD}");
    }

    #[tokio::test]
    async fn deltas_skip_chunks_that_complete_nothing() {
        let parts: Vec<Result<Vec<u8>, ChatError>> =
            vec![Ok(vec![0xE2]), Ok(vec![0x82]), Ok(vec![0xAC, b'!'])];
        let deltas: Vec<_> = text_deltas(stream::iter(parts).boxed(), Duration::from_secs(5))
            .collect()
            .await;
        let deltas: Vec<String> = deltas.into_iter().map(Result::unwrap).collect();
        assert_eq!(deltas, vec!["€!".to_string()]);
    }

    #[tokio::test]
    async fn deltas_end_after_first_error() {
        let parts: Vec<Result<Vec<u8>, ChatError>> = vec![
            Ok(b"partial".to_vec()),
            Err(ChatError::Stream("connection reset".into())),
            Ok(b"never seen".to_vec()),
        ];
        let deltas: Vec<_> = text_deltas(stream::iter(parts).boxed(), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(deltas.len(), 2);
        assert!(matches!(&deltas[0], Ok(t) if t == "partial"));
        assert!(matches!(&deltas[1], Err(ChatError::Stream(_))));
    }

    async fn open_placeholder() -> (LogHandle, MessageId, CancellationToken) {
        let cancel = CancellationToken::new();
        let log = LogHandle::spawn(EventBus::new(64), cancel.clone());
        let turn = log.begin_turn().await.unwrap();
        let id = log.open_assistant(turn).await.unwrap();
        (log, id, cancel)
    }

    #[tokio::test]
    async fn consume_fills_and_closes_placeholder() {
        let (log, id, cancel) = open_placeholder().await;
        let consumer = StreamConsumer::new(log.clone(), Duration::from_secs(5), cancel);

        let summary = consumer
            .consume(chunks(&["Recur", "sion is", " fun."]), id)
            .await
            .unwrap();

        assert_eq!(summary.deltas, 3);
        assert_eq!(summary.bytes, "Recursion is fun.".len());
        let snapshot = log.snapshot().await.unwrap();
        assert_eq!(snapshot[0].content, "Recursion is fun.");
        assert!(!snapshot[0].open);
    }

    #[tokio::test]
    async fn consume_keeps_partial_content_on_error() {
        let (log, id, cancel) = open_placeholder().await;
        let consumer = StreamConsumer::new(log.clone(), Duration::from_secs(5), cancel);
        let parts: Vec<Result<Vec<u8>, ChatError>> = vec![
            Ok(b"Half an ans".to_vec()),
            Err(ChatError::Stream("reset".into())),
        ];

        let err = consumer
            .consume(stream::iter(parts).boxed(), id)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Stream(_)));
        let snapshot = log.snapshot().await.unwrap();
        assert_eq!(snapshot[0].content, "Half an ans");
        assert!(!snapshot[0].open);
    }

    #[tokio::test]
    async fn consume_times_out_on_stalled_stream() {
        let (log, id, cancel) = open_placeholder().await;
        let consumer = StreamConsumer::new(log.clone(), Duration::from_millis(50), cancel);
        let stalled: ChunkStream = stream::iter(vec![Ok(b"Hel".to_vec())])
            .chain(stream::pending())
            .boxed();

        let err = consumer.consume(stalled, id).await.unwrap_err();

        assert!(matches!(err, ChatError::Timeout(_)));
        let snapshot = log.snapshot().await.unwrap();
        assert_eq!(snapshot[0].content, "Hel");
        assert!(!snapshot[0].open);
    }

    #[tokio::test]
    async fn consume_stops_when_session_is_cancelled() {
        let (log, id, cancel) = open_placeholder().await;
        let consumer = StreamConsumer::new(log, Duration::from_secs(5), cancel.clone());
        cancel.cancel();

        let err = consumer
            .consume(stream::pending().boxed(), id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SessionClosed));
    }
}
