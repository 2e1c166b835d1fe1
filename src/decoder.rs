//! Incremental UTF-8 decoding for streamed response bodies.
//!
//! Response bodies arrive as arbitrary byte chunks, so a multi-byte character
//! may be split across two chunks. [`StreamDecoder`] carries the incomplete
//! tail of one chunk over to the next, and [`decode_stream`] wraps a byte
//! stream into a stream of text fragments.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{DECODER_REPLACEMENTS, DECODER_TRUNCATIONS};
use crate::{Error, Result};

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder fed one chunk at a time.
///
/// Invalid byte sequences become U+FFFD. Sequences that are merely incomplete
/// are held back until the next call to [`feed`](Self::feed).
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    /// Create a decoder with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, prefixed by whatever the previous call held back.
    ///
    /// Returns the text that is complete so far; it may be empty.
    pub fn feed(&mut self, bytes: &[u8]) -> String {
        let input = if self.pending.is_empty() {
            bytes.to_vec()
        } else {
            let mut input = std::mem::take(&mut self.pending);
            input.extend_from_slice(bytes);
            input
        };

        let mut output = String::with_capacity(input.len());
        let mut rest = &input[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    output.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    output.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid) => {
                            DECODER_REPLACEMENTS.click();
                            output.push(REPLACEMENT);
                            rest = &after[invalid..];
                        }
                        None => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        output
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Flush the decoder at end of input.
    ///
    /// The decoder is reset either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedEncoding`] if the input ended in the middle of
    /// a character; the incomplete bytes are discarded.
    pub fn finish(&mut self) -> Result<String> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            Ok(String::new())
        } else {
            DECODER_TRUNCATIONS.click();
            Err(Error::truncated_encoding(pending.len()))
        }
    }
}

/// Turn a stream of byte chunks into a stream of text fragments.
///
/// Read failures are passed through as [`Error::StreamRead`]. A stream that
/// ends mid-character is logged and treated as complete, dropping the trailing
/// bytes. Empty fragments are never yielded.
///
/// ```
/// use bytes::Bytes;
/// use futures::{StreamExt, stream};
/// use parley::decode_stream;
///
/// # tokio_test::block_on(async {
/// let euro = "€".as_bytes();
/// let chunks = vec![
///     Ok(Bytes::copy_from_slice(&euro[..1])),
///     Ok(Bytes::copy_from_slice(&euro[1..])),
/// ];
/// let text: Vec<String> = decode_stream(stream::iter(chunks))
///     .map(|fragment| fragment.unwrap())
///     .collect()
///     .await;
/// assert_eq!(text, vec!["€".to_string()]);
/// # });
/// ```
pub fn decode_stream<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(
        (byte_stream, StreamDecoder::new(), false),
        |(mut byte_stream, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        let text = decoder.feed(&bytes);
                        if !text.is_empty() {
                            return Some((Ok(text), (byte_stream, decoder, false)));
                        }
                    }
                    Some(Err(err)) => {
                        let err = if err.is_stream_read() {
                            err
                        } else {
                            Error::stream_read(err.to_string(), Some(Box::new(err)))
                        };
                        return Some((Err(err), (byte_stream, decoder, true)));
                    }
                    None => {
                        return match decoder.finish() {
                            Ok(text) if !text.is_empty() => {
                                Some((Ok(text), (byte_stream, decoder, true)))
                            }
                            Ok(_) => None,
                            Err(err) => {
                                tracing::warn!(error = %err, "response ended mid-character");
                                None
                            }
                        };
                    }
                }
            }
        },
    )
}
