//! Command-line shell - thin I/O around the compiler.
//!
//! The shell reads grammar files, hands them to the library, and prints the
//! results; no parsing logic lives here.

use std::{fs, path::PathBuf, process};

use clap::{Parser, Subcommand};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::combinator::Trailing;
use crate::display::{self, DisplayConfig};
use crate::errors::{internal_error, io_error, print_error, OuroError, SourceContext};
use crate::grammar::{self, notation, CompiledGrammar, RuleKind};

// ============================================================================
// CLI ARGUMENTS - Command-line argument definitions
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "ouro",
    version,
    about = "A parser-combinator engine and self-hosting grammar compiler."
)]
pub struct OuroArgs {
    #[command(subcommand)]
    pub command: ArgsCommand,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Compile a grammar file to Rust combinator declarations.
    Compile {
        /// The path to the grammar file to compile.
        #[arg(required = true)]
        file: PathBuf,
        /// Write the generated source here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the rules a grammar file compiles to.
    Rules {
        /// The path to the grammar file to inspect.
        #[arg(required = true)]
        file: PathBuf,
        /// Emit the rule inventory as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the notation parse tree for a grammar file.
    Tree {
        /// The path to the grammar file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = OuroArgs::parse();

    match args.command {
        ArgsCommand::Compile { file, output } => {
            let compiled = compile_file_or_exit(&file);
            let generated = compiled.render();
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, generated) {
                        print_error(io_error(path.display(), &e));
                        process::exit(1);
                    }
                }
                None => print!("{}", generated),
            }
        }

        ArgsCommand::Rules { file, json } => {
            let compiled = compile_file_or_exit(&file);
            if json {
                let rendered = serde_json::to_string_pretty(&compiled).unwrap_or_else(|e| {
                    print_error(internal_error(format!("rule inventory serialization: {}", e)));
                    process::exit(1);
                });
                println!("{}", rendered);
            } else {
                print_rules(&compiled);
            }
        }

        ArgsCommand::Tree { file } => {
            let source = read_source_or_exit(&file);
            let state = notation::grammar()
                .parse_source(&source, Trailing::Reject)
                .unwrap_or_else(|e| {
                    print_error(e);
                    process::exit(1);
                });
            let config = DisplayConfig {
                color: stdout_color(),
                max_depth: None,
            };
            display::print(state.result(), &config);
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS - Common patterns extracted
// ============================================================================

fn read_source_or_exit(path: &PathBuf) -> SourceContext {
    match fs::read_to_string(path) {
        Ok(content) => SourceContext::from_file(path.display().to_string(), content),
        Err(e) => {
            print_error(io_error(path.display(), &e));
            process::exit(1);
        }
    }
}

fn compile_file_or_exit(path: &PathBuf) -> CompiledGrammar {
    let source = read_source_or_exit(path);
    grammar::compile_source(&source).unwrap_or_else(|e: OuroError| {
        print_error(e);
        process::exit(1);
    })
}

fn stdout_color() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

// ============================================================================
// OUTPUT FUNCTIONS - Simple, direct output
// ============================================================================

fn print_rules(compiled: &CompiledGrammar) {
    if compiled.rules.is_empty() {
        println!("  No rules found.");
        return;
    }

    let mut stdout = StandardStream::stdout(stdout_color());
    for rule in &compiled.rules {
        let (tag, color) = match rule.kind {
            RuleKind::Lexical => ("lexical", Color::Yellow),
            RuleKind::Syntax => ("syntax ", Color::Cyan),
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
        print!("{} ", tag);
        let _ = stdout.reset();
        println!("{} = {}", rule.name, rule.body);
    }
}
