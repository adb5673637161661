use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Incremental UTF-8 decoder for a chunked response body.
///
/// Bytes of a multi-byte character split across two reads are held back
/// until the rest arrives, so every returned piece is whole text.
pub struct ChunkDecoder {
    decoder: Decoder,
    finished: bool,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder(),
            finished: false,
        }
    }

    /// Decodes one read. May return an empty string when the read ended
    /// inside a character.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flushes any incomplete trailing sequence as U+FFFD. Later calls
    /// return an empty string.
    pub fn finish(&mut self) -> String {
        if self.finished {
            return String::new();
        }
        let tail = self.decode_inner(&[], true);
        self.finished = true;
        tail
    }

    fn decode_inner(&mut self, mut src: &[u8], last: bool) -> String {
        if self.finished {
            return String::new();
        }

        let mut out = String::new();
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 3 + 4);
            out.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(src, &mut out, last);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        out
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
