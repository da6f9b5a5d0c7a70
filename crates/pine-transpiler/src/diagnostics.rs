//! diagnostics.rs — erreurs structurées par étape + avertissements non bloquants
//!
//! Chaque étape du pipeline a son propre type d'erreur (`LexError`,
//! `ParseError`, `GenerateError`), tous porteurs d'un numéro de ligne humain.
//! `TranspileError` les regroupe et sait dire de quelle étape il provient.

use std::fmt;

use thiserror::Error;

/* ───────────────────────────── Étapes ───────────────────────────── */

/// Étape du pipeline ayant produit une erreur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum Stage {
    Lexer,
    Parser,
    Generator,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Generator => "generator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ───────────────────────────── Erreurs ───────────────────────────── */

/// Erreur lexicale : caractère inconnu, chaîne non terminée, indentation incohérente.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl LexError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }
}

/// Erreur syntaxique : première attente non satisfaite, sans reprise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ligne {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Erreur de génération : nœud valide syntaxiquement mais sans traduction
/// possible à cet endroit (ex. `break` hors boucle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ligne {line}: {message}")]
pub struct GenerateError {
    pub line: usize,
    pub message: String,
}

impl GenerateError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Erreur agrégée renvoyée par le pipeline complet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranspileError {
    #[error("erreur lexicale {0}")]
    Lex(#[from] LexError),
    #[error("erreur de syntaxe {0}")]
    Parse(#[from] ParseError),
    #[error("erreur de génération {0}")]
    Generate(#[from] GenerateError),
}

impl TranspileError {
    pub fn stage(&self) -> Stage {
        match self {
            TranspileError::Lex(_) => Stage::Lexer,
            TranspileError::Parse(_) => Stage::Parser,
            TranspileError::Generate(_) => Stage::Generator,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            TranspileError::Lex(e) => e.line,
            TranspileError::Parse(e) => e.line,
            TranspileError::Generate(e) => e.line,
        }
    }

    /// Message brut, sans préfixe d'étape.
    pub fn message(&self) -> &str {
        match self {
            TranspileError::Lex(e) => &e.message,
            TranspileError::Parse(e) => &e.message,
            TranspileError::Generate(e) => &e.message,
        }
    }
}

/* ───────────────────────────── Avertissements ───────────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum Severity {
    Warning,
    Info,
}

/// Diagnostic non bloquant remonté par le générateur (arité, builtin inconnu…).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn warning(line: usize, msg: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: msg.into(), line }
    }

    pub fn info(line: usize, msg: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: msg.into(), line }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "avertissement",
            Severity::Info => "info",
        };
        write!(f, "{tag} (ligne {}): {}", self.line, self.message)
    }
}
