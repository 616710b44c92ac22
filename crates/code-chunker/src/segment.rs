use std::ops::Range;

/// 1-based inclusive line bounds of a declaration.
///
/// An unknown end line resolves to the start line: the smallest span that still
/// covers the declaration header. The segment extractor and the module-residual
/// computation both go through [`LineSpan::end_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: Option<usize>,
}

impl LineSpan {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self {
            start: start.max(1),
            end,
        }
    }

    pub fn end_line(self) -> usize {
        self.end.unwrap_or(self.start).max(self.start)
    }

    /// Zero-based half-open range of line indices
    pub fn line_indices(self) -> Range<usize> {
        (self.start - 1)..self.end_line()
    }

    pub fn contains_index(self, index: usize) -> bool {
        self.line_indices().contains(&index)
    }
}

/// Recover the exact source text of a declaration.
///
/// `bytes` is the precise range reported by the syntax tree. When it is absent,
/// out of bounds, or empty, the text is rebuilt from whole lines instead.
pub fn extract_segment(source: &str, bytes: Option<Range<usize>>, span: LineSpan) -> String {
    if let Some(text) = bytes.and_then(|range| source.get(range)) {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    slice_lines(source, span)
}

/// Naive line slicing: lines `[start - 1, end)` joined with `\n`
pub fn slice_lines(source: &str, span: LineSpan) -> String {
    let range = span.line_indices();
    source
        .lines()
        .skip(range.start)
        .take(range.len())
        .collect::<Vec<_>>()
        .join("\n")
}
