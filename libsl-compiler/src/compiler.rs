use anyhow::{bail, Result};

use crate::ast::LibraryDeclaration;
use crate::asg::{Library, LibraryMetadata};
use crate::builder::AsgBuilder;
use crate::context::SymbolContext;
use crate::diagnostics::Diagnostics;
use crate::error::StructuralError;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Print the incoming syntax tree before analysis.
    pub dump_syntax: bool,
    /// When off, a function nested in an automaton that also qualifies
    /// itself with that same automaton only gets a warning.
    pub strict_ownership: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dump_syntax: false,
            strict_ownership: true,
        }
    }
}

#[derive(Debug)]
pub struct Compilation {
    pub library: Library,
}

pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Builds the semantic graph of `declaration`.
    ///
    /// Recoverable problems are recorded in [`Compiler::diagnostics`] and the
    /// graph is still returned; only a malformed tree is an error.
    pub fn analyze(&mut self, declaration: &LibraryDeclaration) -> Result<Library, StructuralError> {
        if self.options.dump_syntax {
            println!("{declaration:#?}");
        }

        let mut context = SymbolContext::new();
        let mut builder = AsgBuilder::new(&mut context, &mut self.diagnostics, &self.options);
        builder.build(declaration)?;

        Ok(Library {
            metadata: LibraryMetadata {
                name: declaration.name.name.clone(),
                lsl_version: declaration.lsl_version.clone(),
                library_version: declaration.library_version.clone(),
                language: declaration.language.clone(),
                url: declaration.url.clone(),
            },
            imports: declaration.imports.clone(),
            includes: declaration.includes.clone(),
            context,
        })
    }

    /// Like [`Compiler::analyze`], but any error diagnostic fails the run.
    pub fn compile(&mut self, declaration: &LibraryDeclaration) -> Result<Compilation> {
        let library = self.analyze(declaration)?;
        if self.diagnostics.has_errors() {
            tracing::debug!(
                errors = self.diagnostics.error_count(),
                "semantic analysis reported errors"
            );
            bail!("Semantic analysis failed");
        }
        Ok(Compilation { library })
    }
}
