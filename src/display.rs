//! Parse-result display.
//!
//! Rendering is driven by an explicit `DisplayConfig` passed in by the
//! caller; there is no ambient formatting state. The CLI builds its config
//! from the terminal it is writing to, tests pass one in directly.

use std::io::{self, Write};

use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use crate::combinator::ParseValue;

/// How to render a parse result: whether to color, and how deep into nested
/// lists to descend before eliding.
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub color: ColorChoice,
    pub max_depth: Option<usize>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Never,
            max_depth: None,
        }
    }
}

/// Renders `value` to a plain string (colors are never embedded).
pub fn render(value: &ParseValue, config: &DisplayConfig) -> String {
    let mut buffer = Buffer::no_color();
    let _ = write_value(&mut buffer, value, 0, config);
    String::from_utf8_lossy(buffer.as_slice()).into_owned()
}

/// Prints `value` to stdout, colorized per `config.color`.
pub fn print(value: &ParseValue, config: &DisplayConfig) {
    let writer = BufferWriter::stdout(config.color);
    let mut buffer = writer.buffer();
    let _ = write_value(&mut buffer, value, 0, config);
    let _ = writeln!(buffer);
    let _ = writer.print(&buffer);
}

fn write_value<W: WriteColor>(
    out: &mut W,
    value: &ParseValue,
    depth: usize,
    config: &DisplayConfig,
) -> io::Result<()> {
    if config.max_depth.is_some_and(|limit| depth >= limit) {
        return write!(out, "…");
    }
    match value {
        ParseValue::Absent => {
            let _ = out.set_color(ColorSpec::new().set_dimmed(true));
            write!(out, "(none)")?;
            let _ = out.reset();
            Ok(())
        }
        ParseValue::Text(text) => {
            let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            write!(out, "{:?}", text)?;
            let _ = out.reset();
            Ok(())
        }
        ParseValue::List(items) => {
            write!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write_value(out, item, depth + 1, config)?;
            }
            write!(out, "]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_values() {
        let value = ParseValue::List(vec![
            ParseValue::Text("hi".into()),
            ParseValue::Absent,
            ParseValue::List(vec![ParseValue::Text("a".into())]),
        ]);
        assert_eq!(
            render(&value, &DisplayConfig::default()),
            r#"["hi", (none), ["a"]]"#
        );
    }

    #[test]
    fn depth_limit_elides_nested_lists() {
        let value = ParseValue::List(vec![ParseValue::List(vec![ParseValue::Text("x".into())])]);
        let config = DisplayConfig {
            max_depth: Some(1),
            ..DisplayConfig::default()
        };
        assert_eq!(render(&value, &config), "[…]");
    }
}
