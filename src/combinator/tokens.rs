//! Token-level constructors with an explicit, overridable skip policy.
//!
//! Grammars never intersperse whitespace-skipping by hand: a `Lexicon` owns a
//! skip parser and derives token constructors from it, so skipping is a policy
//! of the lexicon rather than a concern of each rule. The free functions
//! `token` and `regex_token` use the default whitespace lexicon; they are the
//! vocabulary that generated grammar code references.

use std::rc::Rc;

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;

use super::{literal, pattern, seq_of, zero_or_one, Failure, ParseValue, Parser};

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// A skip policy plus the token constructors derived from it.
///
/// The default `whitespace` lexicon skips any run of Unicode whitespace.
/// Notations that ignore other text (comments, say) build a `Lexicon` around
/// their own skip parser; the skip parser must succeed on any input, which
/// `zero_or_one`/`zero_or_more` wrappers guarantee.
#[derive(Clone, Debug)]
pub struct Lexicon {
    skip: Parser,
}

impl Lexicon {
    /// The default policy: skip any run of whitespace before each token.
    pub fn whitespace() -> Self {
        Self::new(zero_or_one(pattern(WHITESPACE.clone())))
    }

    /// A lexicon with a custom skip parser.
    pub fn new(skip: Parser) -> Self {
        Self { skip }
    }

    /// The skip parser itself, for callers that need to consume insignificant
    /// text explicitly (say, at the very end of the input).
    pub fn skip(&self) -> Parser {
        self.skip.clone()
    }

    /// Runs the skip policy, then `parser`; the result is `parser`'s alone.
    pub fn lexeme(&self, parser: Parser) -> Parser {
        seq_of(vec![self.skip.clone(), parser]).map(keep_second)
    }

    /// A token that matches `expected` exactly, after skipping.
    pub fn token(&self, expected: &str) -> Parser {
        self.lexeme(literal(expected))
    }

    /// A token built from a pattern source, after skipping. The pattern is
    /// compiled on first use and cached; an invalid pattern makes the token
    /// fail every time, naming the offending source.
    pub fn pattern_token(&self, pat: &str) -> Parser {
        self.lexeme(deferred_pattern(pat))
    }
}

fn keep_second(value: ParseValue) -> ParseValue {
    match value {
        ParseValue::List(mut items) if items.len() == 2 => {
            items.pop().unwrap_or(ParseValue::Absent)
        }
        other => other,
    }
}

/// Compiles `pat` on first application. Generated code references tokens by
/// pattern source text, so compilation has to be deferred past construction.
fn deferred_pattern(pat: &str) -> Parser {
    let source = pat.to_string();
    let cell: Rc<OnceCell<Result<Parser, regex::Error>>> = Rc::new(OnceCell::new());
    Parser::from_fn(move |state| {
        match cell.get_or_init(|| Regex::new(&source).map(pattern)) {
            Ok(parser) => parser.apply(state),
            Err(error) => Err(Failure::mismatch(
                &format!("valid pattern /{}/ ({})", source, error),
                state,
            )),
        }
    })
}

/// A whitespace-skipping exact token.
pub fn token(expected: &str) -> Parser {
    Lexicon::whitespace().token(expected)
}

/// A whitespace-skipping pattern token.
pub fn regex_token(pat: &str) -> Parser {
    Lexicon::whitespace().pattern_token(pat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::{one_or_more, ParseValue};

    #[test]
    fn token_skips_leading_whitespace() {
        let state = token(",").parse("   ,x").unwrap();
        assert_eq!(state.result(), &ParseValue::Text(",".into()));
        assert_eq!(state.rest(), "x");
    }

    #[test]
    fn regex_token_skips_and_matches() {
        let state = regex_token("[A-Za-z]+").parse("  Bob!").unwrap();
        assert_eq!(state.result(), &ParseValue::Text("Bob".into()));
        assert_eq!(state.rest(), "!");
    }

    #[test]
    fn tokens_compose_under_repetition() {
        let words = one_or_more(regex_token("[a-z]+"));
        let state = words.parse("one two  three").unwrap();
        assert_eq!(state.result().items().unwrap().len(), 3);
    }

    #[test]
    fn invalid_pattern_fails_the_parse() {
        let err = regex_token("[unclosed").parse("anything").unwrap_err();
        assert!(err.to_string().contains("valid pattern"));
    }

    #[test]
    fn custom_skip_policy_is_honored() {
        // a lexicon that also skips line comments
        let skip = crate::combinator::zero_or_more(crate::combinator::one_of(vec![
            crate::combinator::pattern(regex::Regex::new(r"\s+").unwrap()),
            crate::combinator::pattern(regex::Regex::new(r"#[^\n]*").unwrap()),
        ]));
        let lexicon = Lexicon::new(skip);
        let state = lexicon.token("x").parse("# note\n  x").unwrap();
        assert_eq!(state.result(), &ParseValue::Text("x".into()));
    }
}
