//! Character-level scanner for hole extraction.
//!
//! The scanner is a small finite automaton. [`transition`] is the whole
//! transition table: it maps the current [`ScanState`] and the next character
//! (plus one character of lookahead) to the following state and an [`Event`].
//! The driver in [`Scanner`] reacts to events: it tracks brackets, clause
//! terminators and hole markers, and slices the source into [`Unit`]s.

use super::ParseError;

/// Literal token opening a hole marker.
pub const HOLE_OPEN: &str = "langda(";

/// Literal token opening a network annotation marker.
pub const NETWORK_OPEN: &str = "lann(";

/// Literal token that makes a program executable on its own.
const QUERY_OPEN: &str = "query(";

/// Characters that form Prolog symbol atoms; a `.` touching one of these is
/// part of an operator (`=..`, `...`) rather than a clause terminator.
pub(super) const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

/// Lexical state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Ordinary program text.
    Code,
    /// After a backslash in program text.
    CodeEscape,
    /// Inside a double-quoted string.
    Quoted,
    /// After a backslash inside a double-quoted string.
    QuotedEscape,
    /// Inside a `%` comment, up to the end of the line.
    LineComment,
    /// Inside a `/* ... */` comment.
    BlockComment,
}

/// What the driver should do with the characters consumed by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A structural character of program text.
    Code,
    /// A character taken literally (escaped or inside a string).
    Literal,
    QuoteOpen,
    QuoteClose,
    /// The consumed characters open a comment.
    CommentOpen,
    CommentText,
    /// A line comment ended before the current character; nothing consumed.
    LineCommentClose,
    /// The consumed `*/` closes a block comment.
    BlockCommentClose,
}

/// One transition of the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: ScanState,
    pub event: Event,
    /// Number of characters consumed (0, 1 or 2).
    pub width: usize,
}

impl Step {
    const fn new(next: ScanState, event: Event, width: usize) -> Self {
        Self { next, event, width }
    }
}

/// The transition table.
pub fn transition(state: ScanState, ch: char, lookahead: Option<char>) -> Step {
    use ScanState::*;

    match (state, ch, lookahead) {
        (Code, '"', _) => Step::new(Quoted, Event::QuoteOpen, 1),
        (Code, '\\', _) => Step::new(CodeEscape, Event::Literal, 1),
        (Code, '%', _) => Step::new(LineComment, Event::CommentOpen, 1),
        (Code, '/', Some('*')) => Step::new(BlockComment, Event::CommentOpen, 2),
        (Code, _, _) => Step::new(Code, Event::Code, 1),

        (CodeEscape, _, _) => Step::new(Code, Event::Literal, 1),

        (Quoted, '\\', _) => Step::new(QuotedEscape, Event::Literal, 1),
        (Quoted, '"', _) => Step::new(Code, Event::QuoteClose, 1),
        (Quoted, _, _) => Step::new(Quoted, Event::Literal, 1),

        (QuotedEscape, _, _) => Step::new(Quoted, Event::Literal, 1),

        (LineComment, '\n', _) => Step::new(Code, Event::LineCommentClose, 0),
        (LineComment, _, _) => Step::new(LineComment, Event::CommentText, 1),

        (BlockComment, '*', Some('/')) => Step::new(Code, Event::BlockCommentClose, 2),
        (BlockComment, _, _) => Step::new(BlockComment, Event::CommentText, 1),
    }
}

/// Position of a unit relative to hole markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Outside any marker.
    None,
    /// Inside a marker that has not closed yet.
    Body,
    /// The unit that closes a marker.
    End,
}

/// A contiguous slice of the source: program text followed by the comment
/// that ends it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub code: String,
    pub comment: String,
    pub status: UnitStatus,
    /// Byte offset of `code` in the source.
    pub offset: usize,
    /// Head of the clause enclosing the marker; empty outside markers.
    pub head: String,
}

/// Output of a full scan.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub units: Vec<Unit>,
    pub has_query: bool,
}

/// Scan a source text into units.
pub fn scan(source: &str) -> Result<Scan, ParseError> {
    Scanner::new(source).run()
}

/// Opening bracket a closing bracket must match.
fn matching_open(close: char) -> char {
    match close {
        ']' => '[',
        _ => '(',
    }
}

/// Compute the 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

struct OpenMarker {
    base_depth: usize,
    start: usize,
    head: String,
}

struct Scanner<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    state: ScanState,
    depth: Vec<char>,
    marker: Option<OpenMarker>,
    /// Program text of the current clause, comments excluded.
    clause_code: String,
    head: String,
    unit_start: usize,
    comment_start: Option<usize>,
    units: Vec<Unit>,
    has_query: bool,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            state: ScanState::Code,
            depth: Vec::new(),
            marker: None,
            clause_code: String::new(),
            head: String::new(),
            unit_start: 0,
            comment_start: None,
            units: Vec::new(),
            has_query: false,
        }
    }

    fn run(mut self) -> Result<Scan, ParseError> {
        let mut i = 0;
        while i < self.chars.len() {
            let (pos, ch) = self.chars[i];
            let lookahead = self.chars.get(i + 1).map(|&(_, c)| c);
            let step = transition(self.state, ch, lookahead);

            match step.event {
                Event::Code => {
                    if let Some(resume) = self.on_code(i)? {
                        self.state = ScanState::Code;
                        i = resume;
                        continue;
                    }
                }
                Event::Literal | Event::QuoteOpen | Event::QuoteClose => {
                    if self.marker.is_none() {
                        self.clause_code.push(ch);
                    }
                }
                Event::CommentOpen => self.comment_start = Some(pos),
                Event::CommentText => {}
                Event::LineCommentClose => self.close_comment(pos),
                Event::BlockCommentClose => self.close_comment(pos + 2),
            }

            self.state = step.next;
            i += step.width;
        }

        if let Some(marker) = &self.marker {
            let (line, column) = line_col(self.src, marker.start);
            return Err(ParseError::UnterminatedMarker { line, column });
        }

        match self.state {
            ScanState::LineComment | ScanState::BlockComment => self.close_comment(self.src.len()),
            _ => self.flush(self.src.len(), UnitStatus::None),
        }

        Ok(Scan {
            units: self.units,
            has_query: self.has_query,
        })
    }

    /// Handle a structural character. Returns the index to resume from when
    /// the scanner jumps over a marker token or a captured trailing comment.
    fn on_code(&mut self, i: usize) -> Result<Option<usize>, ParseError> {
        let (pos, ch) = self.chars[i];

        if self.marker.is_none() {
            if let Some(len) = self.marker_open_at(i) {
                self.flush(pos, UnitStatus::None);
                self.marker = Some(OpenMarker {
                    base_depth: self.depth.len(),
                    start: pos,
                    head: self.head.clone(),
                });
                self.depth.push('(');
                return Ok(Some(i + len));
            }
            if self.token_at(i, QUERY_OPEN) {
                self.has_query = true;
            }
        }

        match ch {
            '(' | '[' => self.depth.push(ch),
            ')' | ']' => {
                let opener = self.depth.pop();
                if self.marker.is_some() && opener != Some(matching_open(ch)) {
                    let (line, column) = line_col(self.src, pos);
                    return Err(ParseError::MismatchedBracket {
                        found: ch,
                        line,
                        column,
                    });
                }
                if let Some(marker) = &self.marker
                    && self.depth.len() == marker.base_depth
                {
                    return Ok(Some(self.close_marker(i)));
                }
            }
            ':' if self.at_clause_level() && self.next_char(i) == Some('-') => {
                self.head = normalize_ws(&self.clause_code);
            }
            '.' if self.at_clause_level() && self.is_terminator(i) => {
                self.flush(pos + 1, UnitStatus::None);
                self.clause_code.clear();
                self.head.clear();
                return Ok(None);
            }
            _ => {}
        }

        if self.marker.is_none() {
            self.clause_code.push(ch);
        }
        Ok(None)
    }

    fn at_clause_level(&self) -> bool {
        self.marker.is_none() && self.depth.is_empty()
    }

    fn next_char(&self, i: usize) -> Option<char> {
        self.chars.get(i + 1).map(|&(_, c)| c)
    }

    fn prev_char(&self, i: usize) -> Option<char> {
        i.checked_sub(1).map(|j| self.chars[j].1)
    }

    /// A literal token at `i` that is not the tail of a longer identifier.
    fn token_at(&self, i: usize, token: &str) -> bool {
        let boundary = self
            .prev_char(i)
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        boundary && self.src[self.chars[i].0..].starts_with(token)
    }

    fn marker_open_at(&self, i: usize) -> Option<usize> {
        [HOLE_OPEN, NETWORK_OPEN]
            .into_iter()
            .find(|token| self.token_at(i, token))
            .map(str::len)
    }

    fn is_terminator(&self, i: usize) -> bool {
        let separate = |c: Option<char>| {
            c.is_none_or(|c| !c.is_ascii_digit() && !SYMBOL_CHARS.contains(c))
        };
        self.prev_char(i).is_some() && separate(self.prev_char(i)) && separate(self.next_char(i))
    }

    /// Close the open marker at the `)` with index `i`.
    fn close_marker(&mut self, i: usize) -> usize {
        let end = self.chars[i].0 + 1;
        let head = self.marker.take().map(|m| m.head).unwrap_or_default();

        let mut unit = Unit {
            code: self.src[self.unit_start..end].to_string(),
            comment: String::new(),
            status: UnitStatus::End,
            offset: self.unit_start,
            head,
        };

        // A `%` comment on the same line right after the marker belongs to it.
        let mut j = i + 1;
        while matches!(self.chars.get(j), Some(&(_, ' ' | '\t'))) {
            j += 1;
        }
        let resume = if matches!(self.chars.get(j), Some(&(_, '%'))) {
            let mut k = j;
            while k < self.chars.len() && self.chars[k].1 != '\n' {
                k += 1;
            }
            let stop = self.chars.get(k).map_or(self.src.len(), |&(p, _)| p);
            unit.comment = self.src[self.chars[j].0..stop].to_string();
            self.unit_start = stop;
            k
        } else {
            self.unit_start = end;
            i + 1
        };

        self.units.push(unit);
        resume
    }

    /// Emit program text up to `end` as a unit without comment.
    fn flush(&mut self, end: usize, status: UnitStatus) {
        if self.unit_start < end {
            self.units.push(Unit {
                code: self.src[self.unit_start..end].to_string(),
                comment: String::new(),
                status,
                offset: self.unit_start,
                head: String::new(),
            });
        }
        self.unit_start = end;
    }

    /// Emit the pending program text together with the comment ending at `end`.
    fn close_comment(&mut self, end: usize) {
        let start = self.comment_start.take().unwrap_or(self.unit_start);
        let (status, head) = match &self.marker {
            Some(marker) => (UnitStatus::Body, marker.head.clone()),
            None => (UnitStatus::None, String::new()),
        };
        self.units.push(Unit {
            code: self.src[self.unit_start..start].to_string(),
            comment: self.src[start..end].to_string(),
            status,
            offset: self.unit_start,
            head,
        });
        self.unit_start = end;
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_inside_code_opens_string() {
        let step = transition(ScanState::Code, '"', None);
        assert_eq!(step.next, ScanState::Quoted);
        assert_eq!(step.event, Event::QuoteOpen);
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let step = transition(ScanState::Quoted, '\\', Some('"'));
        assert_eq!(step.next, ScanState::QuotedEscape);
        let step = transition(step.next, '"', None);
        assert_eq!(step.next, ScanState::Quoted);
        assert_eq!(step.event, Event::Literal);
    }

    #[test]
    fn escaped_quote_in_code_does_not_open_string() {
        let step = transition(ScanState::Code, '\\', Some('"'));
        let step = transition(step.next, '"', None);
        assert_eq!(step.next, ScanState::Code);
    }

    #[test]
    fn quote_inside_comment_is_comment_text() {
        let step = transition(ScanState::LineComment, '"', None);
        assert_eq!(step.next, ScanState::LineComment);
        assert_eq!(step.event, Event::CommentText);

        let step = transition(ScanState::BlockComment, '"', None);
        assert_eq!(step.next, ScanState::BlockComment);
    }

    #[test]
    fn escaped_quote_inside_comment_stays_in_comment() {
        let step = transition(ScanState::LineComment, '\\', Some('"'));
        assert_eq!(step.next, ScanState::LineComment);
        let step = transition(step.next, '"', None);
        assert_eq!(step.next, ScanState::LineComment);
    }

    #[test]
    fn block_comment_tokens_are_two_wide() {
        let open = transition(ScanState::Code, '/', Some('*'));
        assert_eq!((open.next, open.width), (ScanState::BlockComment, 2));
        let close = transition(ScanState::BlockComment, '*', Some('/'));
        assert_eq!((close.next, close.width), (ScanState::Code, 2));
    }

    #[test]
    fn slash_without_star_is_code() {
        let step = transition(ScanState::Code, '/', Some('2'));
        assert_eq!((step.next, step.event), (ScanState::Code, Event::Code));
    }

    #[test]
    fn newline_ends_line_comment_without_consuming() {
        let step = transition(ScanState::LineComment, '\n', None);
        assert_eq!(step.next, ScanState::Code);
        assert_eq!(step.width, 0);
    }

    #[test]
    fn percent_inside_string_is_literal() {
        let step = transition(ScanState::Quoted, '%', None);
        assert_eq!((step.next, step.event), (ScanState::Quoted, Event::Literal));
    }

    #[test]
    fn units_reproduce_hole_free_source() {
        let src = "a(1). % first\n/* block\n comment */ b(X) :- a(X).\nc(0.5).";
        let scan = scan(src).unwrap();
        let joined: String = scan
            .units
            .iter()
            .map(|u| format!("{}{}", u.code, u.comment))
            .collect();
        assert_eq!(joined, src);
        assert!(scan.units.iter().all(|u| u.status == UnitStatus::None));
    }

    #[test]
    fn clause_terminator_splits_units() {
        let scan = scan("a. b.").unwrap();
        let codes: Vec<_> = scan.units.iter().map(|u| u.code.as_str()).collect();
        assert_eq!(codes, vec!["a.", " b."]);
    }

    #[test]
    fn decimal_point_is_not_a_terminator() {
        let scan = scan("0.3::a.").unwrap();
        assert_eq!(scan.units.len(), 1);
        assert_eq!(scan.units[0].code, "0.3::a.");
    }

    #[test]
    fn univ_operator_is_not_a_terminator() {
        let scan = scan("t(X, L) :- X =.. L.").unwrap();
        assert_eq!(scan.units.len(), 1);
    }

    #[test]
    fn nested_brackets_inside_marker_keep_it_open() {
        let scan = scan("langda(LLM:\"f(g(x))\", NET:[n(0,1)]). rest.").unwrap();
        let end = scan
            .units
            .iter()
            .find(|u| u.status == UnitStatus::End)
            .unwrap();
        assert_eq!(end.code, "langda(LLM:\"f(g(x))\", NET:[n(0,1)])");
    }

    #[test]
    fn parenthesis_in_string_inside_marker_is_ignored() {
        let scan = scan("langda(LLM:\"close ) here\").").unwrap();
        assert_eq!(scan.units[0].code, "langda(LLM:\"close ) here\")");
        assert_eq!(scan.units[0].status, UnitStatus::End);
    }

    #[test]
    fn marker_nested_in_clause_body_closes_at_its_own_depth() {
        let scan = scan("a :- once(langda(LLM:\"x\")).").unwrap();
        let end = scan
            .units
            .iter()
            .find(|u| u.status == UnitStatus::End)
            .unwrap();
        assert_eq!(end.code, "langda(LLM:\"x\")");
        assert_eq!(end.head, "a");
    }

    #[test]
    fn trailing_same_line_comment_is_attached_to_marker() {
        let scan = scan("langda(LLM:\"x\") % keep me\nnext.").unwrap();
        let end = &scan.units[0];
        assert_eq!(end.status, UnitStatus::End);
        assert_eq!(end.comment, "% keep me");
        assert_eq!(scan.units[1].code, "\nnext.");
    }

    #[test]
    fn comment_inside_marker_is_captured_as_body() {
        let scan = scan("langda(LLM:\"x\", % why\n FUP:\"false\")").unwrap();
        assert_eq!(scan.units[0].status, UnitStatus::Body);
        assert_eq!(scan.units[0].comment, "% why");
        assert_eq!(scan.units[1].status, UnitStatus::End);
    }

    #[test]
    fn marker_inside_string_is_not_recognized() {
        let scan = scan("say(\"langda(LLM:x)\").").unwrap();
        assert!(scan.units.iter().all(|u| u.status == UnitStatus::None));
    }

    #[test]
    fn marker_inside_comment_is_not_recognized() {
        let scan = scan("% langda(LLM:\"x\"\na.").unwrap();
        assert!(scan.units.iter().all(|u| u.status == UnitStatus::None));
    }

    #[test]
    fn identifier_suffix_is_not_a_marker() {
        let scan = scan("mylangda(x).").unwrap();
        assert!(scan.units.iter().all(|u| u.status == UnitStatus::None));
    }

    #[test]
    fn unterminated_marker_reports_position() {
        let err = scan("a.\n  langda(LLM:\"x\"").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedMarker { line: 2, column: 3 });
    }

    #[test]
    fn query_detection_requires_token_outside_marker() {
        assert!(scan("query(a).").unwrap().has_query);
        assert!(!scan("subquery(a).").unwrap().has_query);
        assert!(!scan("% query(a).").unwrap().has_query);
        assert!(!scan("langda(LLM:\"x\", query(a)).").unwrap().has_query);
    }

    #[test]
    fn head_is_tracked_per_clause() {
        let src = "p(X) :-\n  q(X),\n  langda(LLM:\"r\").\nlangda(LLM:\"s\").";
        let scan = scan(src).unwrap();
        let heads: Vec<_> = scan
            .units
            .iter()
            .filter(|u| u.status == UnitStatus::End)
            .map(|u| u.head.as_str())
            .collect();
        assert_eq!(heads, vec!["p(X)", ""]);
    }

    #[test]
    fn head_ignores_comments() {
        let src = "% helper\np(X) :- langda(LLM:\"r\").";
        let scan = scan(src).unwrap();
        let end = scan
            .units
            .iter()
            .find(|u| u.status == UnitStatus::End)
            .unwrap();
        assert_eq!(end.head, "p(X)");
    }

    #[test]
    fn line_col_counts_from_one() {
        assert_eq!(line_col("ab\ncd", 0), (1, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
    }
}
