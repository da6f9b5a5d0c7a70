//! config.rs — réglages de la CLI (`pine2js.toml` + environnement)
//!
//! Priorité croissante : défauts → fichier TOML → variables d'environnement
//! (`PINE_INDENT`, `PINE_COMMENTS`, `PINE_RUNTIME`, `PINE2JS_NODE_BIN`,
//! `PINE_REVIEWER_CMD`) → options de ligne de commande.
//!
//! ```toml
//! [compiler]
//! indent_width = 4
//! comments = false
//!
//! [output]
//! dir = "dist"
//!
//! [review]
//! enabled = true
//! node = "/usr/local/bin/node"
//! command = "my-linter --strict"
//! ```

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use pine_transpiler::CompilerConfig;
use serde::Deserialize;

/// Nom du fichier cherché dans le répertoire courant sans `--config`.
pub const DEFAULT_CONFIG_FILE: &str = "pine2js.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub compiler: Option<CompilerConfig>,
    pub output: OutputSection,
    pub review: ReviewSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Dossier de sortie quand aucun fichier n'est donné.
    pub dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewSection {
    pub enabled: bool,
    /// Binaire `node` pour la vérification syntaxique.
    pub node: Option<String>,
    /// Relecteur externe : reçoit le chemin du fichier généré.
    pub command: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("TOML invalide")
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("lecture {path}"))?;
        Self::parse(&text).with_context(|| format!("configuration {path}"))
    }

    /// `--config` explicite (doit exister), sinon `pine2js.toml` s'il est présent.
    pub fn discover(explicit: Option<&Utf8Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Utf8Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(Utf8Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }
}

/// Réglages effectifs après fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub compiler: CompilerConfig,
    pub output_dir: Option<Utf8PathBuf>,
    pub review: bool,
    pub node_bin: String,
    pub reviewer_cmd: Option<String>,
}

impl Settings {
    /// Fusionne fichier + environnement ; les options CLI sont appliquées par l'appelant.
    pub fn resolve(file: FileConfig) -> Self {
        Self::resolve_with(file, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let compiler = file.compiler.unwrap_or_default().with_env(&env);
        let node_bin = env("PINE2JS_NODE_BIN")
            .filter(|s| !s.trim().is_empty())
            .or(file.review.node)
            .unwrap_or_else(|| "node".to_string());
        let reviewer_cmd = env("PINE_REVIEWER_CMD").filter(|s| !s.trim().is_empty()).or(file.review.command);
        Self { compiler, output_dir: file.output.dir, review: file.review.enabled, node_bin, reviewer_cmd }
    }
}
