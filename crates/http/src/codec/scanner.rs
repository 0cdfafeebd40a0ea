//! Byte scanners for the two framing markers the request decoder has to find: the `CRLFCRLF`
//! that ends the header section, and the multipart boundary token inside a buffered body.

/// The blank line separating the header section from the body.
pub const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// Returns the offset one past the first `CRLFCRLF` in `buf`, or `None` when it is absent
/// (including when `buf` is shorter than the terminator).
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|offset| offset + HEADER_TERMINATOR.len())
}

/// Incremental form of [`find_header_end`] for a buffer that grows between calls.
///
/// Each call only rescans the bytes appended since the previous call, plus the last three bytes
/// already seen so a terminator split across two reads is still found.
#[derive(Debug, Default, Clone)]
pub struct HeaderScanner {
    scanned: usize,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `buf` must be the same buffer as on the previous call, possibly extended.
    pub fn scan(&mut self, buf: &[u8]) -> Option<usize> {
        let start = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1).min(buf.len());
        self.scanned = buf.len();
        find_header_end(&buf[start..]).map(|end| start + end)
    }
}

/// Start offsets of every non-overlapping occurrence of `boundary` in `buf`, in order.
///
/// Single pass with a partial-match counter; after a mismatch the scan resumes one byte past
/// where the failed candidate started, so a false start such as `BBOUND` still finds `BOUND`.
pub fn boundary_positions(buf: &[u8], boundary: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    if boundary.is_empty() {
        return positions;
    }

    let mut i = 0;
    let mut matched = 0;
    while i < buf.len() {
        if buf[i] == boundary[matched] {
            matched += 1;
            i += 1;
            if matched == boundary.len() {
                positions.push(i - matched);
                matched = 0;
            }
        } else {
            i = i - matched + 1;
            matched = 0;
        }
    }

    positions
}

/// Text lines of a byte buffer, split on `\n` with a trailing `\r` removed and decoded as lossy
/// UTF-8. A final line without a line ending is still yielded.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Lines<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf }
    }
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let (line, rest) = match self.rest.iter().position(|b| *b == b'\n') {
            Some(i) => (&self.rest[..i], &self.rest[i + 1..]),
            None => (self.rest, &b""[..]),
        };
        self.rest = rest;

        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(String::from_utf8_lossy(line).into_owned())
    }
}
