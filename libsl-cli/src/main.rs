use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use libsl_compiler::syntax::{LibraryDeclaration, SourceSpan};
use libsl_compiler::{CompileOptions, Compiler, Diagnostic, DiagnosticLevel, Library};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// One line per automaton with its states, shifts and operations.
    Summary,
    /// The full semantic graph in debug form.
    Debug,
}

#[derive(Parser)]
#[command(
    name = "libsl",
    version,
    about = "Check a LibSL library and build its semantic graph.",
    long_about = "Reads a LibSL syntax tree serialized as JSON, resolves every declaration \
                  and reports problems. Set LIBSL_LOG (e.g. `LIBSL_LOG=debug`) for tracing output."
)]
struct Cli {
    /// Path to the JSON syntax tree of a library.
    input: PathBuf,

    /// Original `.lsl` source, used to show the offending line under each diagnostic.
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Print the syntax tree before analysis.
    #[arg(long)]
    dump_syntax: bool,

    /// Emit the analysed library after a successful run.
    #[arg(long, value_enum)]
    emit: Vec<Emit>,

    /// Downgrade a redundant automaton qualifier on a nested function to a warning.
    #[arg(long)]
    lenient_ownership: bool,
}

fn main() -> Result<()> {
    if let Ok(filter) = EnvFilter::try_from_env("LIBSL_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let declaration: LibraryDeclaration = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse syntax tree {}", cli.input.display()))?;
    let source_text = match &cli.source {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let display_path = cli.source.as_deref().unwrap_or(&cli.input);
    let lines: Vec<&str> = source_text
        .as_deref()
        .map(|text| text.lines().collect())
        .unwrap_or_default();

    let options = CompileOptions {
        dump_syntax: cli.dump_syntax,
        strict_ownership: !cli.lenient_ownership,
    };
    let mut compiler = Compiler::new(options);
    let result = compiler.compile(&declaration);

    for diagnostic in compiler.diagnostics().entries() {
        print_diagnostic(display_path, &lines, diagnostic);
    }

    let compilation = match result {
        Ok(compilation) => compilation,
        Err(err) => {
            let errors = compiler.diagnostics().error_count();
            if errors > 0 {
                bail!("{err} with {errors} error(s)");
            }
            return Err(err);
        }
    };

    for emit in &cli.emit {
        match emit {
            Emit::Summary => print_summary(&compilation.library),
            Emit::Debug => println!("{:#?}", compilation.library),
        }
    }
    Ok(())
}

fn print_summary(library: &Library) {
    let metadata = &library.metadata;
    match &metadata.library_version {
        Some(version) => println!("library {} {}", metadata.name, version),
        None => println!("library {}", metadata.name),
    }
    let context = &library.context;
    for automaton in context.automata() {
        println!(
            "automaton {} : {} (states: {}, shifts: {}, functions: {}, constructors: {}, destructors: {}, procedures: {})",
            automaton.name,
            automaton.ty.name(),
            automaton.states.len(),
            automaton.shifts.len(),
            automaton.functions.len(),
            automaton.constructors.len(),
            automaton.destructors.len(),
            automaton.procedures.len()
        );
        for shift in &automaton.shifts {
            let functions = shift
                .functions
                .iter()
                .map(|id| context.function(*id).display_name())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {} -> {} ({functions})",
                shift.from.describe(),
                shift.to.describe()
            );
        }
    }
}

fn print_diagnostic(path: &Path, lines: &[&str], diagnostic: &Diagnostic) {
    let level = match diagnostic.level {
        DiagnosticLevel::Error => "error",
        DiagnosticLevel::Warning => "warning",
    };
    eprintln!("{level}[{}]: {}", diagnostic.kind.describe(), diagnostic.message);
    let Some(span) = diagnostic.span.filter(|span| span.line > 0) else {
        return;
    };
    eprintln!("  --> {}:{}:{}", path.display(), span.line, span.column);
    if let Some(line) = lines.get(span.line - 1) {
        eprint!("{}", excerpt(line, span));
    }
}

/// `line` in a numbered gutter with the columns of `span` underlined.
/// Spans running past the line are underlined to its end.
fn excerpt(line: &str, span: SourceSpan) -> String {
    let expand = |text: &str| text.replace('\t', "    ");
    let start = span.column.saturating_sub(1);
    let indent: String = line.chars().take(start).collect();
    let width = if span.end_line == span.line {
        span.end_column.saturating_sub(span.column) + 1
    } else {
        line.chars().count().saturating_sub(start)
    };

    let number = span.line.to_string();
    let gutter = " ".repeat(number.len());
    format!(
        "{gutter} |\n{number} | {}\n{gutter} | {}{}\n",
        expand(line),
        " ".repeat(expand(&indent).chars().count()),
        "^".repeat(width.max(1))
    )
}
