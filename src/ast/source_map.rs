use super::Span;

/// Maps byte offsets to line/column positions within source text.
pub struct SourceMap {
    line_starts: Vec<usize>,
    len: usize,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { line_starts, len: source.len() }
    }

    /// Returns (line, col), both 1-based.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = offset.saturating_sub(self.line_starts[line]);
        (line + 1, col + 1)
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.lookup(offset).0
    }

    /// Byte range of a 1-based line, newline excluded. Out-of-range lines map to `Span::UNKNOWN`.
    pub fn line_span(&self, source: &str, line: usize) -> Span {
        if line == 0 || line > self.line_starts.len() {
            return Span::UNKNOWN;
        }
        let start = self.line_starts[line - 1];
        let end = self.line_starts.get(line).map_or(self.len, |&next| next - 1);
        let text = source.get(start..end).unwrap_or("");
        Span { start, end: start + text.trim_end_matches('\r').len() }
    }

    /// Returns the full text of the given 1-based line number.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        let span = self.line_span(source, line);
        if span == Span::UNKNOWN {
            return "";
        }
        source.get(span.start..span.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let src = "  ret r1";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(2), (1, 3));
        assert_eq!(sm.lookup(8), (1, 9));
    }

    #[test]
    fn multi_line() {
        let src = "start main 0:\n.entry:\n  ret 0\nend main";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(14), (2, 1));
        assert_eq!(sm.lookup(22), (3, 1));
        assert_eq!(sm.line_of(30), 4);
    }

    #[test]
    fn line_text_per_instruction() {
        let src = ".loop:\n  r1 = decr r1 64\n  br r1 .loop .done";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), ".loop:");
        assert_eq!(sm.line_text(src, 2), "  r1 = decr r1 64");
        assert_eq!(sm.line_text(src, 3), "  br r1 .loop .done");
    }

    #[test]
    fn line_text_out_of_bounds() {
        let src = "ret 0";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 0), "");
        assert_eq!(sm.line_text(src, 99), "");
    }

    #[test]
    fn line_span_strips_carriage_return() {
        let src = "ab\r\ncd";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_span(src, 1), Span { start: 0, end: 2 });
        assert_eq!(sm.line_span(src, 2), Span { start: 4, end: 6 });
    }

    #[test]
    fn trailing_newline() {
        let src = "end main\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "end main");
        assert_eq!(sm.line_text(src, 2), "");
    }
}
