// src/chunk.rs

/// Iterator over fixed-size character windows of a text.
///
/// Windows are contiguous and non-overlapping; concatenating them in order
/// reproduces the input exactly. The last window may be shorter than the
/// configured size. Boundaries always fall on character boundaries, never
/// inside a multi-byte sequence.
pub struct Chunks<'a> {
    rest: &'a str,
    size: usize,
}

/// Splits `text` into windows of `chunk_size` characters, left to right.
///
/// Empty text yields no chunks; text shorter than `chunk_size` yields a
/// single chunk equal to the whole text.
pub fn chunks(text: &str, chunk_size: usize) -> Chunks<'_> {
    assert!(chunk_size > 0, "chunk size must be positive");
    Chunks {
        rest: text,
        size: chunk_size,
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let split = self
            .rest
            .char_indices()
            .nth(self.size)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(split);
        self.rest = tail;
        Some(head)
    }
}
