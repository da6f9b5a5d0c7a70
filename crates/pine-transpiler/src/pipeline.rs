//! pipeline.rs — pilote lexer → parser → générateur
//!
//! Chaque appel repart de zéro (nouveaux lexer, parser, générateur) : aucune
//! donnée partagée entre deux transpilations. La première erreur arrête tout
//! et devient un `TranspileOutcome::Failure` avec son étape.

use std::path::Path;

use tracing::debug;

use crate::ast::Program;
use crate::codegen::{generate, Generated};
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, TranspileError};
use crate::lexer::{tokenize, Token};
use crate::parser::parse;

/// Produit complet d'une transpilation réussie.
#[derive(Debug, Clone, PartialEq)]
pub struct Transpiled {
    pub code: String,
    pub ast: Program,
    pub tokens: Vec<Token>,
    pub warnings: Vec<Diagnostic>,
}

/// Pipeline configuré, réutilisable pour plusieurs sources.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    config: CompilerConfig,
}

impl Transpiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, source: &str) -> Result<Transpiled, TranspileError> {
        let _span = tracing::debug_span!("transpile", bytes = source.len()).entered();

        let tokens = tokenize(source)?;
        debug!(tokens = tokens.len(), "analyse lexicale terminée");

        let ast = parse(tokens.clone())?;
        debug!(statements = ast.body.len(), version = ?ast.version, "analyse syntaxique terminée");

        let Generated { code, warnings } = generate(&ast, &self.config)?;
        debug!(bytes = code.len(), warnings = warnings.len(), "génération terminée");

        Ok(Transpiled { code, ast, tokens, warnings })
    }
}

/* ───────────────────────── Résultat ───────────────────────── */

/// `{ success: true, code, ast, tokens }` ou `{ success: false, error, stage }`.
#[derive(Debug, Clone, PartialEq)]
pub enum TranspileOutcome {
    Success(Transpiled),
    Failure(TranspileError),
}

impl TranspileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranspileOutcome::Success(_))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            TranspileOutcome::Success(t) => Some(&t.code),
            TranspileOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TranspileError> {
        match self {
            TranspileOutcome::Success(_) => None,
            TranspileOutcome::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<Transpiled, TranspileError> {
        match self {
            TranspileOutcome::Success(t) => Ok(t),
            TranspileOutcome::Failure(e) => Err(e),
        }
    }
}

impl From<Result<Transpiled, TranspileError>> for TranspileOutcome {
    fn from(r: Result<Transpiled, TranspileError>) -> Self {
        match r {
            Ok(t) => TranspileOutcome::Success(t),
            Err(e) => TranspileOutcome::Failure(e),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TranspileOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        match self {
            TranspileOutcome::Success(t) => {
                let mut s = serializer.serialize_struct("TranspileOutcome", 5)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("code", &t.code)?;
                s.serialize_field("ast", &t.ast)?;
                s.serialize_field("tokens", &t.tokens)?;
                s.serialize_field("warnings", &t.warnings)?;
                s.end()
            }
            TranspileOutcome::Failure(e) => {
                let mut s = serializer.serialize_struct("TranspileOutcome", 4)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("error", e.message())?;
                s.serialize_field("stage", &e.stage())?;
                s.serialize_field("line", &e.line())?;
                s.end()
            }
        }
    }
}

/* ───────────────────────── API ───────────────────────── */

/// Transpile avec la configuration par défaut.
pub fn transpile(source: &str) -> TranspileOutcome {
    transpile_with(source, &CompilerConfig::default())
}

pub fn transpile_with(source: &str, config: &CompilerConfig) -> TranspileOutcome {
    Transpiler::new(config.clone()).run(source).into()
}

/// Lit puis transpile un fichier (`.pine`).
pub fn transpile_file(path: impl AsRef<Path>, config: &CompilerConfig) -> std::io::Result<TranspileOutcome> {
    let source = std::fs::read_to_string(path.as_ref())?;
    Ok(transpile_with(&source, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Stage;

    #[test]
    fn success_carries_code_ast_and_tokens() {
        let out = transpile("x = 1\n").into_result().expect("transpile ok");
        assert!(out.code.contains("let x = 1;"));
        assert_eq!(out.ast.body.len(), 1);
        assert!(!out.tokens.is_empty());
    }

    #[test]
    fn each_stage_reports_itself() {
        let lex = transpile("x = \"ouverte\n");
        assert_eq!(lex.error().map(TranspileError::stage), Some(Stage::Lexer));

        let parse = transpile("x = (1 + \n");
        assert_eq!(parse.error().map(TranspileError::stage), Some(Stage::Parser));

        let gen = transpile("continue\n");
        assert_eq!(gen.error().map(TranspileError::stage), Some(Stage::Generator));
        assert!(gen.code().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn outcome_serializes_to_the_documented_shape() {
        let ok = serde_json::to_value(transpile("x = 1\n")).expect("json ok");
        assert_eq!(ok["success"], true);
        assert!(ok["code"].is_string());
        assert!(ok["ast"]["body"].is_array());
        assert!(ok["tokens"].is_array());

        let ko = serde_json::to_value(transpile("x = @\n")).expect("json ok");
        assert_eq!(ko["success"], false);
        assert_eq!(ko["stage"], "lexer");
        assert_eq!(ko["line"], 1);
        assert!(ko["error"].is_string());
    }
}
