//! config.rs — options de génération
//!
//! Valeurs par défaut raisonnables, surchargées par variables d'environnement
//! (`PINE_INDENT`, `PINE_COMMENTS`, `PINE_RUNTIME`) ou par la CLI.

/// Options du générateur JavaScript.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct CompilerConfig {
    /// Largeur d'indentation du JS émis (en espaces).
    pub indent_width: usize,
    /// Émettre les commentaires d'en-tête et de section.
    pub comments: bool,
    /// Émettre le prélude runtime (`const pinescript = …`).
    /// Désactivé, le module suppose un `globalThis.pinescript` déjà chargé.
    pub runtime_prelude: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { indent_width: 2, comments: true, runtime_prelude: true }
    }
}

impl CompilerConfig {
    /// Applique les surcharges `PINE_*` fournies par `env` ; les valeurs
    /// illisibles sont ignorées.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(w) = env("PINE_INDENT").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.indent_width = w.clamp(1, 8);
        }
        if let Some(b) = env("PINE_COMMENTS").as_deref().and_then(parse_bool) {
            self.comments = b;
        }
        if let Some(b) = env("PINE_RUNTIME").as_deref().and_then(parse_bool) {
            self.runtime_prelude = b;
        }
        self
    }

    /// Variante sans commentaires (option `--no-comments`).
    pub fn without_comments(mut self) -> Self {
        self.comments = false;
        self
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_emit_everything() {
        let c = CompilerConfig::default();
        assert_eq!(c.indent_width, 2);
        assert!(c.comments);
        assert!(c.runtime_prelude);
        assert!(!c.without_comments().comments);
    }

    #[test]
    fn bool_parsing_is_lenient() {
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("peut-être"), None);
    }

    #[test]
    fn environment_overrides_apply_on_top() {
        let base = CompilerConfig { indent_width: 4, ..CompilerConfig::default() };
        let c = base.clone().with_env(|k| match k {
            "PINE_COMMENTS" => Some("off".into()),
            "PINE_INDENT" => Some("42".into()),
            _ => None,
        });
        assert_eq!(c.indent_width, 8);
        assert!(!c.comments);
        assert!(c.runtime_prelude);
        assert_eq!(base.clone().with_env(|_| Some("n'importe".into())), base);
    }
}
