use std::str;

/// Accumulates the assistant reply from raw token bytes.
///
/// Tokens may split a multi-byte UTF-8 character, so trailing bytes of an
/// incomplete character are held back until the rest arrives. Bytes that can
/// never form valid UTF-8 are replaced with U+FFFD.
///
/// Trailing text that could still grow into a stop string is held back the
/// same way, so [`text`](Self::text) only ever grows until the buffer is
/// cleared.
#[derive(Debug, Default, Clone)]
pub struct MessageBuffer {
    text: String,
    pending: Vec<u8>,
    /// Bytes of `text` that are safe to show.
    shown: usize,
    stop_strings: Vec<String>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the message at the first occurrence of any of `stop_strings`.
    pub fn with_stop_strings(stop_strings: &[String]) -> Self {
        Self {
            stop_strings: stop_strings
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
            ..Self::default()
        }
    }

    /// Append the bytes of one token.
    ///
    /// Returns `true` when a stop string completed. The text is then cut
    /// where the stop string began and held-back bytes are dropped.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> bool {
        self.pending.extend_from_slice(bytes);
        self.decode_pending();

        if let Some(at) = self.find_stop() {
            self.text.truncate(at);
            self.pending.clear();
            self.shown = at;
            return true;
        }
        self.shown = self.text.len() - self.held_len();
        false
    }

    fn decode_pending(&mut self) {
        loop {
            match str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let good = e.valid_up_to();
                    if let Ok(valid) = str::from_utf8(&self.pending[..good]) {
                        self.text.push_str(valid);
                    }
                    match e.error_len() {
                        // Incomplete character at the end: wait for more.
                        None => {
                            self.pending.drain(..good);
                            return;
                        }
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..good + bad);
                        }
                    }
                }
            }
        }
    }

    /// Earliest stop string in the unshown tail. Shown text was already
    /// ruled out as the start of a match.
    fn find_stop(&self) -> Option<usize> {
        let tail = &self.text[self.shown..];
        self.stop_strings
            .iter()
            .filter_map(|s| tail.find(s.as_str()))
            .min()
            .map(|at| self.shown + at)
    }

    /// Length of the longest unshown suffix that is a proper prefix of a
    /// stop string.
    fn held_len(&self) -> usize {
        let tail = &self.text[self.shown..];
        tail.char_indices()
            .map(|(i, _)| &tail[i..])
            .find(|rest| {
                self.stop_strings
                    .iter()
                    .any(|s| s.len() > rest.len() && s.starts_with(rest))
            })
            .map_or(0, str::len)
    }

    /// Emit everything held back: incomplete bytes lossily, and any partial
    /// stop string as plain text. Called when generation stops.
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        self.shown = self.text.len();
    }

    /// Decoded text so far, excluding anything held back.
    pub fn text(&self) -> &str {
        &self.text[..self.shown]
    }

    /// Drop the message, keeping the stop strings.
    pub fn clear(&mut self) {
        self.text.clear();
        self.pending.clear();
        self.shown = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let mut buf = MessageBuffer::new();
        buf.push_bytes(b"Hi");
        buf.push_bytes(b" there");
        assert_eq!(buf.text(), "Hi there");
    }

    #[test]
    fn test_split_character_is_held_back() {
        let mut buf = MessageBuffer::new();
        buf.push_bytes(b"caf");
        buf.push_bytes(&[0xC3]);
        assert_eq!(buf.text(), "caf");
        assert!(!buf.is_empty());
        buf.push_bytes(&[0xA9]);
        assert_eq!(buf.text(), "caf\u{e9}");
    }

    #[test]
    fn test_four_byte_character_across_tokens() {
        let mut buf = MessageBuffer::new();
        let crab = "\u{1F980}".as_bytes();
        for b in crab {
            buf.push_bytes(&[*b]);
        }
        assert_eq!(buf.text(), "\u{1F980}");
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let mut buf = MessageBuffer::new();
        buf.push_bytes(&[b'a', 0xFF, b'b']);
        assert_eq!(buf.text(), "a\u{FFFD}b");
    }

    #[test]
    fn test_flush_pending() {
        let mut buf = MessageBuffer::new();
        buf.push_bytes(&[b'x', 0xE2, 0x82]);
        assert_eq!(buf.text(), "x");
        buf.flush();
        assert_eq!(buf.text(), "x\u{FFFD}");
    }

    fn stops() -> MessageBuffer {
        MessageBuffer::with_stop_strings(&["</s>".to_string(), "USER:".to_string(), String::new()])
    }

    #[test]
    fn test_stop_string_prefix_is_held_back() {
        let mut buf = stops();
        let mut seen = Vec::new();
        for piece in ["Hi", "<", "/", "s"] {
            assert!(!buf.push_bytes(piece.as_bytes()));
            seen.push(buf.text().to_string());
        }
        assert_eq!(seen, vec!["Hi", "Hi", "Hi", "Hi"]);

        assert!(buf.push_bytes(b">"));
        assert_eq!(buf.text(), "Hi");
    }

    #[test]
    fn test_ruled_out_prefix_is_released() {
        let mut buf = stops();
        buf.push_bytes(b"a<");
        assert_eq!(buf.text(), "a");
        buf.push_bytes(b"/b");
        assert_eq!(buf.text(), "a</b");

        // "US" could still become "USER:".
        buf.push_bytes(b" US");
        assert_eq!(buf.text(), "a</b ");
        buf.push_bytes(b"A");
        assert_eq!(buf.text(), "a</b USA");
    }

    #[test]
    fn test_stop_inside_one_token() {
        let mut buf = stops();
        buf.push_bytes(b"ok");
        assert!(buf.push_bytes(b" USER: more"));
        assert_eq!(buf.text(), "ok ");
    }

    #[test]
    fn test_flush_releases_partial_stop() {
        let mut buf = stops();
        buf.push_bytes(b"done</");
        assert_eq!(buf.text(), "done");
        buf.flush();
        assert_eq!(buf.text(), "done</");
    }

    #[test]
    fn test_clear_keeps_stop_strings() {
        let mut buf = stops();
        buf.push_bytes(b"x");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.text(), "");
        assert!(buf.push_bytes(b"</s>"));
        assert_eq!(buf.text(), "");
    }
}
