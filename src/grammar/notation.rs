//! The grammar notation, defined in its own combinator vocabulary.
//!
//! Each rule below is a function returning a `lazy`-wrapped parser, which is
//! exactly the shape the compiler emits for syntax rules. That is the
//! self-hosting loop: compiling the notation's own definition reproduces this
//! module's vocabulary.
//!
//! Rule results are code fragments (`ParseValue::Text`) built bottom-up;
//! `syntax_rule` and `lexical_rule` produce a tagged list
//! `[kind, name, body-fragment, transform]` that `super` assembles into
//! `GeneratedRule` values.

use crate::combinator::tokens::{regex_token, token, Lexicon};
use crate::combinator::{
    lazy, one_of, one_or_more, seq_of, zero_or_more, zero_or_one, Failure, ParseValue, Parser,
};

// ============================================================================
// LEXEMES - The notation's concrete tokens
// ============================================================================

/// A fenced raw-code block: three backticks, anything, three backticks.
/// The fences are stripped; the contents pass through verbatim.
pub fn prologue() -> Parser {
    regex_token(r"(?s)```.*?```").map(strip_fences)
}

/// An uppercase token-rule name.
pub fn terminal() -> Parser {
    regex_token("[A-Z][A-Za-z_]*").named("terminal name")
}

/// A lowercase syntax-rule name.
pub fn non_terminal() -> Parser {
    regex_token("[a-z][A-Za-z_]*").named("rule name")
}

/// A double-quoted literal, no embedded escaping. Compiles to a `token(…)`
/// invocation carrying the quotes through.
fn quoted_literal() -> Parser {
    regex_token(r#""[^"]*""#)
        .named("string literal")
        .map(|value| match value {
            ParseValue::Text(text) => ParseValue::Text(format!("token({})", text)),
            other => other,
        })
}

/// A slash-delimited pattern literal. The closing slash is the one followed,
/// possibly after whitespace, by `;` or `.` - the pattern body itself may
/// contain slashes, so a bespoke scanner stands in for regex lookahead here.
fn pattern_literal() -> Parser {
    Lexicon::whitespace().lexeme(Parser::from_fn(|state| {
        let rest = state.rest();
        if rest.is_empty() {
            return Err(Failure::eof("pattern literal /…/", state.index()));
        }
        let bytes = rest.as_bytes();
        if bytes[0] != b'/' || bytes.len() < 3 {
            return Err(Failure::mismatch("pattern literal /…/", state));
        }
        // body stays on one line (the char right after the opening slash may
        // be anything, a newline included)
        let line_end = bytes[2..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|offset| offset + 2)
            .unwrap_or(bytes.len());
        let mut close = None;
        for i in 2..line_end {
            if bytes[i] == b'/' && rule_terminator_follows(&rest[i + 1..]) {
                close = Some(i);
            }
        }
        match close {
            Some(i) => Ok(state.advance_with(i + 1, ParseValue::Text(rest[..=i].to_string()))),
            None => Err(Failure::mismatch("pattern literal /…/", state)),
        }
    }))
}

/// A verbatim `.map(…)` transform suffix. The shortest closing paren whose
/// follow-set, after whitespace, is the rule terminator `;`.
fn transform() -> Parser {
    Lexicon::whitespace().lexeme(Parser::from_fn(|state| {
        let rest = state.rest();
        if rest.is_empty() {
            return Err(Failure::eof("transform .map(…)", state.index()));
        }
        if !rest.starts_with(".map(") {
            return Err(Failure::mismatch("transform .map(…)", state));
        }
        let bytes = rest.as_bytes();
        for i in 5..bytes.len() {
            if bytes[i] == b')' && rest[i + 1..].trim_start().starts_with(';') {
                return Ok(state.advance_with(i + 1, ParseValue::Text(rest[..=i].to_string())));
            }
        }
        Err(Failure::mismatch("transform .map(…)", state))
    }))
}

fn rule_terminator_follows(rest: &str) -> bool {
    matches!(rest.trim_start().as_bytes().first(), Some(b';' | b'.'))
}

// ============================================================================
// STRUCTURE - The notation's recursive rules
// ============================================================================

/// A terminal ref, non-terminal ref, quoted literal, or parenthesized choice.
pub fn primary() -> Parser {
    lazy(|| {
        one_of(vec![
            terminal().map(as_call),
            non_terminal().map(as_call),
            quoted_literal(),
            seq_of(vec![token("("), choice(), token(")")]),
        ])
    })
    .map(unwrap_group)
}

/// A primary with an optional `?`, `*`, or `+` quantifier suffix.
pub fn qualified() -> Parser {
    lazy(|| {
        one_of(vec![
            seq_of(vec![primary(), token("?")]),
            seq_of(vec![primary(), token("*")]),
            seq_of(vec![primary(), token("+")]),
            primary(),
        ])
    })
    .map(wrap_quantifier)
}

/// One or more qualified primaries in a row.
pub fn sequence() -> Parser {
    lazy(|| one_or_more(qualified())).map(join_sequence)
}

/// A sequence, then any number of `|`-separated alternatives.
pub fn choice() -> Parser {
    lazy(|| {
        seq_of(vec![
            sequence(),
            zero_or_more(seq_of(vec![token("|"), sequence()])),
        ])
    })
    .map(join_choice)
}

/// `name -> choice [.map(…)] ;`
pub fn syntax_rule() -> Parser {
    lazy(|| {
        seq_of(vec![
            non_terminal(),
            token("->"),
            choice(),
            zero_or_one(transform()),
            token(";"),
        ])
    })
    .map(|value| tag_rule(value, "syntax"))
}

/// `NAME : /pattern/ [.map(…)] ;`
pub fn lexical_rule() -> Parser {
    lazy(|| {
        seq_of(vec![
            terminal(),
            token(":"),
            pattern_literal(),
            zero_or_one(transform()),
            token(";"),
        ])
    })
    .map(|value| tag_rule(value, "lexical"))
}

/// An optional prologue, then syntax and lexical rules in any order.
pub fn grammar() -> Parser {
    lazy(|| {
        seq_of(vec![
            zero_or_one(prologue()),
            zero_or_more(one_of(vec![syntax_rule(), lexical_rule()])),
            Lexicon::whitespace().skip(),
        ])
    })
}

// ============================================================================
// FRAGMENT ASSEMBLY - Map helpers turning results into code text
// ============================================================================

fn as_call(value: ParseValue) -> ParseValue {
    // a name reference becomes a call of the generated rule function
    match value {
        ParseValue::Text(name) => ParseValue::Text(format!("{}()", name)),
        other => other,
    }
}

fn strip_fences(value: ParseValue) -> ParseValue {
    match value {
        ParseValue::Text(text) => ParseValue::Text(text[3..text.len() - 3].to_string()),
        other => other,
    }
}

fn unwrap_group(value: ParseValue) -> ParseValue {
    // a parenthesized choice arrives as ["(", inner, ")"]
    match value {
        ParseValue::List(mut items) if items.len() == 3 => items.swap_remove(1),
        other => other,
    }
}

fn wrap_quantifier(value: ParseValue) -> ParseValue {
    match value {
        ParseValue::List(items) => match items.as_slice() {
            [ParseValue::Text(inner), ParseValue::Text(quantifier)] => {
                let wrapper = match quantifier.as_str() {
                    "?" => "zero_or_one",
                    "*" => "zero_or_more",
                    _ => "one_or_more",
                };
                ParseValue::Text(format!("{}({})", wrapper, inner))
            }
            _ => ParseValue::List(items),
        },
        other => other,
    }
}

fn join_sequence(value: ParseValue) -> ParseValue {
    let items = match value {
        ParseValue::List(items) => items,
        other => return other,
    };
    let mut fragments: Vec<&str> = Vec::with_capacity(items.len());
    for item in &items {
        if let Some(text) = item.text() {
            fragments.push(text);
        }
    }
    if fragments.len() == 1 {
        ParseValue::Text(fragments[0].to_string())
    } else {
        ParseValue::Text(format!("seq_of(vec![{}])", fragments.join(", ")))
    }
}

fn join_choice(value: ParseValue) -> ParseValue {
    // [first, [["|", alt], ["|", alt], …]]
    let items = match value {
        ParseValue::List(items) => items,
        other => return other,
    };
    if items.len() != 2 {
        return ParseValue::List(items);
    }
    let (Some(first), Some(rest)) = (items[0].text(), items[1].items()) else {
        return ParseValue::List(items);
    };
    if rest.is_empty() {
        return ParseValue::Text(first.to_string());
    }
    let mut fragments = vec![first];
    for pair in rest {
        if let Some(alt) = pair.items().and_then(|p| p.get(1)).and_then(|v| v.text()) {
            fragments.push(alt);
        }
    }
    ParseValue::Text(format!("one_of(vec![{}])", fragments.join(", ")))
}

fn tag_rule(value: ParseValue, kind: &str) -> ParseValue {
    // [name, separator, body, transform?, ";"] -> [kind, name, body, transform]
    let mut items = match value {
        ParseValue::List(items) => items,
        other => return other,
    };
    if items.len() != 5 {
        return ParseValue::List(items);
    }
    let transform = items.remove(3);
    let raw_body = items.remove(2);
    let name = items.remove(0);
    let body = if kind == "lexical" {
        strip_pattern_delimiters(raw_body)
    } else {
        raw_body
    };
    ParseValue::List(vec![ParseValue::Text(kind.to_string()), name, body, transform])
}

fn strip_pattern_delimiters(value: ParseValue) -> ParseValue {
    match value {
        ParseValue::Text(text) => {
            ParseValue::Text(format!("regex_token(r#\"{}\"#)", &text[1..text.len() - 1]))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_non_terminal_names() {
        assert_eq!(
            terminal().parse("Greeting rest").unwrap().result().text(),
            Some("Greeting")
        );
        assert!(terminal().parse("greeting").is_err());
        assert_eq!(
            non_terminal().parse("greeting").unwrap().result().text(),
            Some("greeting")
        );
    }

    #[test]
    fn quoted_literal_compiles_to_token_call() {
        let state = quoted_literal().parse(r#" "," "#).unwrap();
        assert_eq!(state.result().text(), Some(r#"token(",")"#));
    }

    #[test]
    fn pattern_literal_allows_interior_slashes() {
        let state = pattern_literal().parse("/[a-z/]+/ ;").unwrap();
        assert_eq!(state.result().text(), Some("/[a-z/]+/"));
    }

    #[test]
    fn pattern_literal_requires_rule_terminator() {
        assert!(pattern_literal().parse("/abc/ x").is_err());
    }

    #[test]
    fn transform_captures_shortest_terminated_call() {
        let state = transform().parse(".map(|v| v);").unwrap();
        assert_eq!(state.result().text(), Some(".map(|v| v)"));
        assert_eq!(state.rest(), ";");
    }

    #[test]
    fn prologue_strips_fences() {
        let state = prologue().parse("```\nuse ouro::*;\n```").unwrap();
        assert_eq!(state.result().text(), Some("\nuse ouro::*;\n"));
    }

    #[test]
    fn qualified_wraps_quantifiers() {
        let state = qualified().parse(r#""a"?"#).unwrap();
        assert_eq!(state.result().text(), Some(r#"zero_or_one(token("a"))"#));
        let state = qualified().parse("name*").unwrap();
        assert_eq!(state.result().text(), Some("zero_or_more(name())"));
    }

    #[test]
    fn sequence_and_choice_join_fragments() {
        let state = sequence().parse("A b").unwrap();
        assert_eq!(state.result().text(), Some("seq_of(vec![A(), b()])"));

        let state = choice().parse(r#""x" | "y""#).unwrap();
        assert_eq!(
            state.result().text(),
            Some(r#"one_of(vec![token("x"), token("y")])"#)
        );
    }

    #[test]
    fn grouped_choice_unwraps() {
        let state = qualified().parse(r#"("x" | "y")+"#).unwrap();
        assert_eq!(
            state.result().text(),
            Some(r#"one_or_more(one_of(vec![token("x"), token("y")]))"#)
        );
    }
}
