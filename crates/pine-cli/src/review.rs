//! review.rs — relecture du JavaScript généré
//!
//! Trois passes, aucune ne modifie le code :
//!   1. membres `pinescript.X` inconnus du runtime → avertissements ;
//!   2. `node --check` sur un `.mjs` temporaire (sauté avec une note sans node) ;
//!   3. relecteur externe optionnel : reçoit le chemin, sa sortie devient des notes.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::process::Command;

use camino::Utf8Path;
use pine_transpiler::builtins;
use tracing::{debug, warn};

use crate::util::fs;

/// Au-delà, la liste des membres inconnus est tronquée.
const MAX_LISTED: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

impl Default for ReviewReport {
    fn default() -> Self {
        Self { ok: true, errors: Vec::new(), warnings: Vec::new(), notes: Vec::new() }
    }
}

impl ReviewReport {
    fn error(&mut self, msg: impl Into<String>) {
        self.ok = false;
        self.errors.push(msg.into());
    }
}

impl fmt::Display for ReviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Review: {}", if self.ok { "PASS" } else { "FAIL" })?;
        for (title, items) in [("Errors:", &self.errors), ("Warnings:", &self.warnings), ("Notes:", &self.notes)] {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n{title}")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Reviewer {
    node_bin: String,
    command: Option<String>,
}

impl Reviewer {
    pub fn new(node_bin: impl Into<String>, command: Option<String>) -> Self {
        Self { node_bin: node_bin.into(), command }
    }

    pub fn review(&self, code: &str) -> ReviewReport {
        let mut report = ReviewReport::default();

        let missing = unknown_members(code);
        if !missing.is_empty() {
            let shown: Vec<&str> = missing.iter().take(MAX_LISTED).map(String::as_str).collect();
            let more = if missing.len() > MAX_LISTED { " ..." } else { "" };
            report.warnings.push(format!("membres runtime possiblement absents : {}{more}", shown.join(", ")));
        }

        let tmp = fs::tmp_file("pine2js-review", "mjs");
        if let Err(e) = fs::write_all(&tmp, code.as_bytes()) {
            report.notes.push(format!("fichier temporaire impossible ({tmp}) : {e}"));
            return report;
        }
        self.syntax_check(&tmp, &mut report);
        if let Some(cmd) = self.command.as_deref() {
            external_review(cmd, &tmp, &mut report);
        }
        let _ = std::fs::remove_file(&tmp);

        debug!(ok = report.ok, errors = report.errors.len(), warnings = report.warnings.len(), "relecture terminée");
        report
    }

    fn syntax_check(&self, path: &Utf8Path, report: &mut ReviewReport) {
        match Command::new(&self.node_bin).arg("--check").arg(path.as_str()).output() {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let detail = stderr.lines().find(|l| l.contains("Error")).unwrap_or_else(|| stderr.trim());
                report.error(format!("erreur de syntaxe : {detail}"));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.notes.push(format!("`{}` introuvable : vérification syntaxique sautée", self.node_bin));
            }
            Err(e) => {
                warn!(error = %e, "lancement de node impossible");
                report.notes.push(format!("`{}` non lancé : {e}", self.node_bin));
            }
        }
    }
}

fn external_review(cmd: &str, path: &Utf8Path, report: &mut ReviewReport) {
    let mut parts = cmd.split_whitespace();
    let Some(bin) = parts.next() else { return };
    match Command::new(bin).args(parts).arg(path.as_str()).output() {
        Ok(out) => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            report.notes.extend(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from));
            if !out.status.success() {
                report.warnings.push(format!("relecteur `{cmd}` : code de sortie {:?}", out.status.code()));
            }
        }
        Err(e) => report.warnings.push(format!("relecteur `{cmd}` non lancé : {e}")),
    }
}

/// Membres `pinescript.X` (premier niveau) absents du prélude, triés.
pub fn unknown_members(code: &str) -> BTreeSet<String> {
    let known = builtins::runtime_members();
    referenced_members(code).into_iter().filter(|m| !known.contains(m.as_str())).collect()
}

fn referenced_members(code: &str) -> BTreeSet<String> {
    const PREFIX: &str = "pinescript.";
    let mut out = BTreeSet::new();
    let mut rest = code;
    while let Some(at) = rest.find(PREFIX) {
        let boundary = rest[..at].chars().next_back().map_or(true, |c| !is_ident_char(c));
        rest = &rest[at + PREFIX.len()..];
        let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        if boundary && len > 0 && !rest.starts_with(|c: char| c.is_ascii_digit()) {
            out.insert(rest[..len].to_string());
        }
        rest = &rest[len..];
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn members_are_collected_once_and_sorted() {
        let found = referenced_members("pinescript.sma(a); pinescript.ta.rsi; mypinescript.zzz; pinescript.sma(b)");
        let found: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(found, vec!["sma", "ta"]);
    }

    #[test]
    fn unknown_members_exclude_the_prelude() {
        let missing = unknown_members("pinescript.sma(close); pinescript.ta.ema; pinescript.frobnicate(1)");
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["frobnicate".to_string()]);
    }

    #[test]
    fn report_display_lists_sections() {
        let mut r = ReviewReport::default();
        assert_eq!(r.to_string(), "Review: PASS");
        r.error("boom");
        r.notes.push("info".into());
        assert_eq!(r.to_string(), "Review: FAIL\nErrors:\n- boom\nNotes:\n- info");
    }

    #[test]
    fn missing_node_is_only_a_note() {
        let reviewer = Reviewer::new("pine2js-node-introuvable", None);
        let r = reviewer.review("const a = 1;\n");
        assert!(r.ok);
        assert!(r.errors.is_empty());
        assert_eq!(r.notes.len(), 1);
        assert!(r.notes[0].contains("introuvable"));
    }

    #[test]
    fn unknown_members_become_a_single_warning() {
        let reviewer = Reviewer::new("pine2js-node-introuvable", None);
        let r = reviewer.review("pinescript.nope(1); pinescript.zut(2);\n");
        assert!(r.ok);
        assert_eq!(r.warnings, vec!["membres runtime possiblement absents : nope, zut".to_string()]);
    }
}
