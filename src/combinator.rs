//! Parser Combinators - the Ouro parsing engine.
//!
//! Every parser wraps a pure step function from one `ParseState` to the next.
//! A step either returns a fresh state (cursor advanced, result set) or a
//! `Failure`; the caller's state is never touched, which is what makes
//! backtracking safe: `one_of` simply retries the next alternative from the
//! original state.
//!
//! Descent is top-down with unlimited backtracking and no cut operator, which
//! is exponential in the worst case for deeply ambiguous grammars. Grammars in
//! scope here are small and unambiguous by convention.

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::errors::{parse_error, ErrorKind, OuroError, SourceContext};

pub mod tokens;

// ============================================================================
// PARSE STATE - The value threaded through every step
// ============================================================================

/// The result alphabet a parser step can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseValue {
    /// No result yet, or an optional element that did not match.
    Absent,
    /// Matched input text, or an emitted code fragment.
    Text(String),
    /// The ordered results of a sequence or repetition.
    List(Vec<ParseValue>),
}

impl ParseValue {
    pub fn text(&self) -> Option<&str> {
        match self {
            ParseValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[ParseValue]> {
        match self {
            ParseValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ParseValue::Absent)
    }
}

/// Immutable parsing state: the full input, a byte cursor into it, and the
/// most recent result. Every successful step produces a fresh state; the
/// cursor never moves backwards and never exceeds the input length.
#[derive(Debug, Clone)]
pub struct ParseState {
    target: Rc<str>,
    index: usize,
    result: ParseValue,
}

impl ParseState {
    fn new(target: &str) -> Self {
        Self {
            target: Rc::from(target),
            index: 0,
            result: ParseValue::Absent,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn result(&self) -> &ParseValue {
        &self.result
    }

    pub fn into_result(self) -> ParseValue {
        self.result
    }

    /// The unconsumed remainder of the input.
    pub fn rest(&self) -> &str {
        &self.target[self.index..]
    }

    /// Produces the successor state for a custom primitive: cursor advanced
    /// by `width` bytes into the remainder, result replaced. The cursor is
    /// clamped to the input length so the state invariant holds.
    pub fn advance_with(&self, width: usize, result: ParseValue) -> Self {
        let width = width.min(self.target.len() - self.index);
        Self {
            target: Rc::clone(&self.target),
            index: self.index + width,
            result,
        }
    }

    fn with_result(&self, result: ParseValue) -> Self {
        Self {
            target: Rc::clone(&self.target),
            index: self.index,
            result,
        }
    }

    /// Up to 30 characters of remaining input, for failure messages.
    pub(crate) fn excerpt(&self) -> String {
        let rest = self.rest();
        match rest.char_indices().nth(30) {
            Some((end, _)) => rest[..end].to_string(),
            None => rest.to_string(),
        }
    }
}

// ============================================================================
// FAILURE - Lightweight backtracking signal
// ============================================================================

/// Why a step failed. `Match` and `Eof` come from primitives; `Alternatives`
/// and `Repetition` are exhaustion failures from `one_of` and `one_or_more`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Match,
    Eof,
    Alternatives,
    Repetition,
}

/// The non-diagnostic failure value passed between combinators while
/// backtracking. It is promoted to an `OuroError` only when it escapes the
/// whole parse, so the hot path never allocates a miette report.
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: FailureKind,
    pub expected: String,
    pub found: String,
    pub at: usize,
}

impl Failure {
    pub(crate) fn mismatch(expected: &str, state: &ParseState) -> Self {
        Self {
            kind: FailureKind::Match,
            expected: expected.to_string(),
            found: state.excerpt(),
            at: state.index,
        }
    }

    pub(crate) fn eof(expected: &str, at: usize) -> Self {
        Self {
            kind: FailureKind::Eof,
            expected: expected.to_string(),
            found: String::new(),
            at,
        }
    }

    pub(crate) fn alternatives(state: &ParseState) -> Self {
        Self {
            kind: FailureKind::Alternatives,
            expected: "any alternative".to_string(),
            found: state.excerpt(),
            at: state.index,
        }
    }

    pub(crate) fn repetition(state: &ParseState) -> Self {
        Self {
            kind: FailureKind::Repetition,
            expected: "repeated element".to_string(),
            found: state.excerpt(),
            at: state.index,
        }
    }

    fn into_error(self, source: &SourceContext) -> OuroError {
        let kind = match self.kind {
            FailureKind::Match => ErrorKind::UnexpectedText {
                expected: self.expected,
                found: self.found.clone(),
            },
            FailureKind::Eof => ErrorKind::UnexpectedEof {
                expected: self.expected,
            },
            FailureKind::Alternatives => ErrorKind::NoAlternative {
                found: self.found.clone(),
            },
            FailureKind::Repetition => ErrorKind::EmptyRepetition {
                expected: self.expected,
            },
        };
        parse_error(kind, source, span_at(source.content.len(), self.at, self.found.len()))
    }
}

fn span_at(source_len: usize, at: usize, width: usize) -> miette::SourceSpan {
    let start = at.min(source_len);
    let width = width.max(1).min(source_len - start);
    miette::SourceSpan::from(start..start + width)
}

// ============================================================================
// PARSER - A shareable, composable step function
// ============================================================================

type StepFn = dyn Fn(&ParseState) -> Result<ParseState, Failure>;

/// Whether `parse_source` treats unconsumed trailing input as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailing {
    /// Tolerate a partial parse; the final state reports how far it got.
    Allow,
    /// Report `ErrorKind::TrailingInput` unless the input was fully consumed.
    Reject,
}

/// A composable parsing computation. Cloning is cheap; children are shared
/// between composites by reference, so a parser graph is a DAG with cycles
/// permitted only through `lazy`.
#[derive(Clone)]
pub struct Parser {
    step: Rc<StepFn>,
}

impl Parser {
    /// Wraps a raw step function. This is the escape hatch for bespoke
    /// primitives that `literal`/`pattern` cannot express.
    pub fn from_fn(step: impl Fn(&ParseState) -> Result<ParseState, Failure> + 'static) -> Self {
        Self {
            step: Rc::new(step),
        }
    }

    /// Applies one step to `state`. Combinator plumbing; most callers want
    /// `parse` or `parse_complete`.
    pub fn apply(&self, state: &ParseState) -> Result<ParseState, Failure> {
        (self.step)(state)
    }

    /// Runs the parser against `input` from the start. Trailing unconsumed
    /// input is tolerated; use `parse_complete` to reject it.
    pub fn parse(&self, input: &str) -> Result<ParseState, OuroError> {
        self.parse_source(&SourceContext::from_input(input), Trailing::Allow)
    }

    /// Runs the parser and requires the whole input to be consumed.
    pub fn parse_complete(&self, input: &str) -> Result<ParseState, OuroError> {
        self.parse_source(&SourceContext::from_input(input), Trailing::Reject)
    }

    /// The general entry point: parses `source.content` with an explicit
    /// trailing-input policy, reporting failures against `source`.
    pub fn parse_source(
        &self,
        source: &SourceContext,
        trailing: Trailing,
    ) -> Result<ParseState, OuroError> {
        let start = ParseState::new(&source.content);
        let end = self
            .apply(&start)
            .map_err(|failure| failure.into_error(source))?;
        if trailing == Trailing::Reject && end.index() < end.target().len() {
            let kind = ErrorKind::TrailingInput {
                consumed: end.index(),
                total: end.target().len(),
            };
            let span = span_at(source.content.len(), end.index(), end.excerpt().len());
            return Err(parse_error(kind, source, span));
        }
        Ok(end)
    }

    /// Replaces the result of a successful step with `transform(result)`.
    /// Cursor movement and failure behavior are untouched.
    pub fn map(&self, transform: impl Fn(ParseValue) -> ParseValue + 'static) -> Parser {
        let inner = self.clone();
        Parser::from_fn(move |state| {
            let next = inner.apply(state)?;
            let result = transform(next.result.clone());
            Ok(next.with_result(result))
        })
    }

    /// Names the parser for failure messages: a failing step reports
    /// `label` as the expected text instead of its internal description.
    pub fn named(&self, label: &str) -> Parser {
        let inner = self.clone();
        let label = label.to_string();
        Parser::from_fn(move |state| {
            inner.apply(state).map_err(|mut failure| {
                failure.expected = label.clone();
                failure
            })
        })
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Parser(..)")
    }
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Matches `expected` exactly at the cursor. Result is the matched text.
pub fn literal(expected: impl Into<String>) -> Parser {
    let expected = expected.into();
    Parser::from_fn(move |state| {
        let rest = state.rest();
        if rest.is_empty() {
            return Err(Failure::eof(&format!("'{}'", expected), state.index()));
        }
        if rest.starts_with(expected.as_str()) {
            Ok(state.advance_with(expected.len(), ParseValue::Text(expected.clone())))
        } else {
            Err(Failure::mismatch(&format!("'{}'", expected), state))
        }
    })
}

/// Matches `re` at the cursor. Anchoring is enforced by the engine: a match
/// that does not start exactly at the cursor is a failure, so callers never
/// need to write `^`. Result is the matched text.
pub fn pattern(re: Regex) -> Parser {
    Parser::from_fn(move |state| {
        let rest = state.rest();
        if rest.is_empty() {
            return Err(Failure::eof(&format!("pattern /{}/", re.as_str()), state.index()));
        }
        match re.find(rest) {
            Some(found) if found.start() == 0 => Ok(state.advance_with(
                found.end(),
                ParseValue::Text(found.as_str().to_string()),
            )),
            _ => Err(Failure::mismatch(&format!("pattern /{}/", re.as_str()), state)),
        }
    })
}

/// Applies each child in order, threading the state through. Result is the
/// list of child results. The first child failure aborts the whole sequence;
/// the caller discards any partial progress.
pub fn seq_of(parsers: Vec<Parser>) -> Parser {
    Parser::from_fn(move |state| {
        let mut results = Vec::with_capacity(parsers.len());
        let mut next = state.clone();
        for parser in &parsers {
            next = parser.apply(&next)?;
            results.push(next.result.clone());
        }
        Ok(next.with_result(ParseValue::List(results)))
    })
}

/// Tries each child against the original state in order and returns the first
/// success verbatim. First match wins; there is no longest-match rule and no
/// ambiguity detection.
pub fn one_of(parsers: Vec<Parser>) -> Parser {
    Parser::from_fn(move |state| {
        for parser in &parsers {
            if let Ok(next) = parser.apply(state) {
                return Ok(next);
            }
        }
        Err(Failure::alternatives(state))
    })
}

fn repeat_from(parser: &Parser, state: &ParseState) -> (ParseState, Vec<ParseValue>) {
    let mut results = Vec::new();
    let mut next = state.clone();
    while let Ok(stepped) = parser.apply(&next) {
        let stalled = stepped.index == next.index;
        results.push(stepped.result.clone());
        next = stepped;
        if stalled {
            // a zero-width success would repeat forever
            break;
        }
    }
    (next, results)
}

/// Applies `parser` repeatedly until it fails. Result is the (possibly empty)
/// list of results. Never fails.
pub fn zero_or_more(parser: Parser) -> Parser {
    Parser::from_fn(move |state| {
        let (next, results) = repeat_from(&parser, state);
        Ok(next.with_result(ParseValue::List(results)))
    })
}

/// Like `zero_or_more` but requires at least one successful application.
pub fn one_or_more(parser: Parser) -> Parser {
    Parser::from_fn(move |state| {
        let (next, results) = repeat_from(&parser, state);
        if results.is_empty() {
            return Err(Failure::repetition(state));
        }
        Ok(next.with_result(ParseValue::List(results)))
    })
}

/// Applies `parser` at most once. On failure, succeeds anyway with an
/// `Absent` result and an unchanged cursor. Never fails.
pub fn zero_or_one(parser: Parser) -> Parser {
    Parser::from_fn(move |state| match parser.apply(state) {
        Ok(next) => Ok(next),
        Err(_) => Ok(state.with_result(ParseValue::Absent)),
    })
}

/// Defers construction of the wrapped parser until its first use, so grammar
/// rules can refer to themselves or to rules defined later. The supplier runs
/// once; the built parser is cached for subsequent steps.
pub fn lazy(supplier: impl Fn() -> Parser + 'static) -> Parser {
    let cell: Rc<OnceCell<Parser>> = Rc::new(OnceCell::new());
    Parser::from_fn(move |state| cell.get_or_init(&supplier).apply(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(pat: &str) -> Regex {
        Regex::new(pat).unwrap()
    }

    #[test]
    fn literal_matches_prefix_and_advances() {
        let state = literal("hi").parse("hi there").unwrap();
        assert_eq!(state.index(), 2);
        assert_eq!(state.rest(), " there");
        assert_eq!(state.result(), &ParseValue::Text("hi".into()));
    }

    #[test]
    fn literal_reports_eof_on_empty_input() {
        let err = literal("hi").parse("").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedEof { .. }));
    }

    #[test]
    fn pattern_only_matches_at_cursor() {
        // the match exists later in the input but not at the cursor
        let err = pattern(re("[0-9]+")).parse("ab12").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedText { .. }));

        let state = pattern(re("[a-z]+")).parse("ab12").unwrap();
        assert_eq!(state.result(), &ParseValue::Text("ab".into()));
        assert_eq!(state.index(), 2);
    }

    #[test]
    fn sequence_threads_state_and_collects_results() {
        let parser = seq_of(vec![literal("a"), literal("b")]);
        let state = parser.parse("ab").unwrap();
        assert_eq!(
            state.result(),
            &ParseValue::List(vec![
                ParseValue::Text("a".into()),
                ParseValue::Text("b".into())
            ])
        );
        assert_eq!(state.index(), 2);
    }

    #[test]
    fn sequence_fails_atomically() {
        let parser = seq_of(vec![literal("a"), literal("b")]);
        assert!(parser.parse("ax").is_err());
    }

    #[test]
    fn one_of_takes_first_success() {
        let parser = one_of(vec![literal("x"), literal("y")]);
        let state = parser.parse("y").unwrap();
        assert_eq!(state.result(), &ParseValue::Text("y".into()));
    }

    #[test]
    fn one_of_backtracks_from_partial_consumption() {
        // first alternative consumes "a" before failing; second must still
        // see the original cursor
        let parser = one_of(vec![
            seq_of(vec![literal("a"), literal("x")]),
            seq_of(vec![literal("a"), literal("b")]),
        ]);
        let state = parser.parse("ab").unwrap();
        assert_eq!(state.index(), 2);
    }

    #[test]
    fn one_of_exhaustion_is_reported() {
        let err = one_of(vec![literal("x"), literal("y")]).parse("z").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoAlternative { .. }));
    }

    #[test]
    fn zero_or_more_never_fails() {
        let state = zero_or_more(literal("a")).parse("bbb").unwrap();
        assert_eq!(state.result(), &ParseValue::List(vec![]));
        assert_eq!(state.index(), 0);

        let state = zero_or_more(literal("a")).parse("aab").unwrap();
        assert_eq!(state.result().items().unwrap().len(), 2);
        assert_eq!(state.index(), 2);
    }

    #[test]
    fn one_or_more_fails_only_on_zero_matches() {
        assert!(one_or_more(literal("a")).parse("bbb").is_err());
        let state = one_or_more(literal("a")).parse("aaab").unwrap();
        assert_eq!(state.result().items().unwrap().len(), 3);
        assert_eq!(state.rest(), "b");
    }

    #[test]
    fn zero_or_one_miss_leaves_cursor_and_yields_absent() {
        let state = zero_or_one(literal("a")).parse("b").unwrap();
        assert!(state.result().is_absent());
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn zero_width_repetition_terminates() {
        let parser = zero_or_more(pattern(re("a*")));
        let state = parser.parse("b").unwrap();
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn lazy_supports_recursion() {
        // nested -> "(" nested ")" | "x"
        fn nested() -> Parser {
            lazy(|| {
                one_of(vec![
                    seq_of(vec![literal("("), nested(), literal(")")]),
                    literal("x"),
                ])
            })
        }
        assert!(nested().parse_complete("(((x)))").is_ok());
        assert!(nested().parse_complete("((x)").is_err());
    }

    #[test]
    fn map_transforms_result_only() {
        let parser = literal("hi").map(|value| match value {
            ParseValue::Text(text) => ParseValue::Text(text.to_uppercase()),
            other => other,
        });
        let state = parser.parse("hi").unwrap();
        assert_eq!(state.result(), &ParseValue::Text("HI".into()));
        assert_eq!(state.index(), 2);
    }

    #[test]
    fn named_replaces_expected_text() {
        let err = literal("->").named("arrow").parse("x").unwrap_err();
        match err.kind {
            ErrorKind::UnexpectedText { expected, .. } => assert_eq!(expected, "arrow"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn parse_is_deterministic() {
        let parser = seq_of(vec![literal("a"), one_of(vec![literal("b"), literal("c")])]);
        let first = parser.parse("ac rest").unwrap();
        let second = parser.parse("ac rest").unwrap();
        assert_eq!(first.index(), second.index());
        assert_eq!(first.result(), second.result());
    }

    #[test]
    fn trailing_input_policy() {
        let parser = literal("hi");
        assert!(parser.parse("hi there").is_ok());
        let err = parser.parse_complete("hi there").unwrap_err();
        match err.kind {
            ErrorKind::TrailingInput { consumed, total } => {
                assert_eq!(consumed, 2);
                assert_eq!(total, 8);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
