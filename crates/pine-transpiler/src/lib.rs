//! pine-transpiler — scripts d'indicateurs (style Pine) → modules JavaScript
//!
//! Chaîne : `lexer` (jetons + indentation) → `parser` (AST) → `codegen` (JS),
//! appuyée sur `builtins` (registre des fonctions intégrées + prélude runtime).
//!
//! API publique :
//! - [`transpile`] / [`transpile_with`] / [`transpile_file`] → [`TranspileOutcome`]
//! - [`Transpiler`] pour réutiliser une [`CompilerConfig`]
//!
//! ```no_run
//! let out = pine_transpiler::transpile("//@version=5\nindicator(\"Demo\")\nplot(close)\n");
//! assert!(out.is_success());
//! ```

#![forbid(unsafe_code)]

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod pipeline;

pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, GenerateError, LexError, ParseError, Severity, Stage, TranspileError};
pub use pipeline::{transpile, transpile_file, transpile_with, TranspileOutcome, Transpiled, Transpiler};

/// Version de la crate (affichée par la CLI).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
