//! Grammar Compiler - translates the grammar notation into Rust declarations.
//!
//! The compiler is itself a parser built from this crate's combinators (see
//! `notation`); its result is a `CompiledGrammar` whose `render` produces a
//! single source blob: the prologue verbatim, then one declaration per rule.
//! Evaluating that blob against the combinator vocabulary reconstructs
//! parsers for the compiled grammar, which closes the bootstrapping loop.
//!
//! No validation happens beyond what the notation's structure enforces:
//! undefined rule references, duplicate names, and left recursion all pass
//! through to the generated code.

use serde::Serialize;

use crate::combinator::{ParseValue, Trailing};
use crate::errors::{internal_error, OuroError, SourceContext};

pub mod notation;

// ============================================================================
// OUTPUT UNITS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// A token-level rule built from a pattern, no internal structure.
    Lexical,
    /// A structural rule: a choice of sequences of symbol references.
    Syntax,
}

/// One compiled rule: its declaration head paired with the combinator
/// fragment its body compiles to. Constructed during one compiler pass,
/// concatenated into the output, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedRule {
    pub kind: RuleKind,
    pub name: String,
    pub body: String,
    pub transform: Option<String>,
}

impl GeneratedRule {
    /// Renders the rule as a Rust function declaration. Syntax rules wrap
    /// their body in `lazy` so rules may reference themselves and rules
    /// declared later; lexical rules are plain `regex_token` constructions.
    pub fn declaration(&self) -> String {
        let transform = self.transform.as_deref().unwrap_or("");
        match self.kind {
            RuleKind::Syntax => format!(
                "pub fn {}() -> Parser {{\n    lazy(|| {}){}\n}}\n",
                self.name, self.body, transform
            ),
            RuleKind::Lexical => format!(
                "#[allow(non_snake_case)]\npub fn {}() -> Parser {{\n    {}{}\n}}\n",
                self.name, self.body, transform
            ),
        }
    }
}

/// The whole compiled grammar: optional verbatim prologue plus the rules in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledGrammar {
    pub prologue: Option<String>,
    pub rules: Vec<GeneratedRule>,
}

impl CompiledGrammar {
    /// The final output blob: prologue text (if any) followed by every
    /// declaration, blank-line separated.
    pub fn render(&self) -> String {
        let declarations: Vec<String> = self.rules.iter().map(GeneratedRule::declaration).collect();
        format!(
            "{}{}",
            self.prologue.as_deref().unwrap_or(""),
            declarations.join("\n")
        )
    }
}

// ============================================================================
// COMPILER ENTRY POINTS
// ============================================================================

/// Compiles grammar source text to the generated declarations blob.
pub fn compile(source: &str) -> Result<String, OuroError> {
    Ok(compile_rules(source)?.render())
}

/// Compiles grammar source text to its structured rule inventory.
pub fn compile_rules(source: &str) -> Result<CompiledGrammar, OuroError> {
    compile_source(&SourceContext::from_input(source))
}

/// Compiles a named source (so diagnostics carry the file name). A grammar
/// file that does not parse to its end is an error here: unlike a raw
/// `Parser::parse`, the compiler rejects trailing unconsumed input.
pub fn compile_source(source: &SourceContext) -> Result<CompiledGrammar, OuroError> {
    let state = notation::grammar().parse_source(source, Trailing::Reject)?;
    decode_grammar(state.into_result())
}

// ============================================================================
// RESULT DECODING - From the notation's parse result to output units
// ============================================================================

fn decode_grammar(value: ParseValue) -> Result<CompiledGrammar, OuroError> {
    let ParseValue::List(mut parts) = value else {
        return Err(internal_error("grammar result is not a list"));
    };
    if parts.len() != 3 {
        return Err(internal_error("grammar result has unexpected arity"));
    }
    parts.pop(); // trailing skip
    let rules_value = parts.pop().unwrap_or(ParseValue::Absent);
    let prologue_value = parts.pop().unwrap_or(ParseValue::Absent);

    let prologue = match prologue_value {
        ParseValue::Text(text) => Some(text),
        ParseValue::Absent => None,
        _ => return Err(internal_error("prologue result is not text")),
    };

    let ParseValue::List(rule_values) = rules_value else {
        return Err(internal_error("rule results are not a list"));
    };
    let mut rules = Vec::with_capacity(rule_values.len());
    for rule_value in rule_values {
        rules.push(decode_rule(rule_value)?);
    }

    Ok(CompiledGrammar { prologue, rules })
}

fn decode_rule(value: ParseValue) -> Result<GeneratedRule, OuroError> {
    let ParseValue::List(mut fields) = value else {
        return Err(internal_error("rule result is not a list"));
    };
    if fields.len() != 4 {
        return Err(internal_error("rule result has unexpected arity"));
    }
    let transform = match fields.pop().unwrap_or(ParseValue::Absent) {
        ParseValue::Text(text) => Some(text),
        ParseValue::Absent => None,
        _ => return Err(internal_error("transform result is not text")),
    };
    let body = expect_text(fields.pop(), "rule body")?;
    let name = expect_text(fields.pop(), "rule name")?;
    let kind = match expect_text(fields.pop(), "rule kind")?.as_str() {
        "lexical" => RuleKind::Lexical,
        "syntax" => RuleKind::Syntax,
        other => return Err(internal_error(format!("unknown rule kind '{}'", other))),
    };
    Ok(GeneratedRule {
        kind,
        name,
        body,
        transform,
    })
}

fn expect_text(value: Option<ParseValue>, what: &str) -> Result<String, OuroError> {
    match value {
        Some(ParseValue::Text(text)) => Ok(text),
        _ => Err(internal_error(format!("{} is not text", what))),
    }
}
