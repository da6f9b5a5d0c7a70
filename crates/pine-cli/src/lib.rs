//! pine-cli/src/lib.rs — CLI `pine2js`
//!
//! `pine2js <input.pine> [output.js]` : transpile un script, écrit le module
//! JavaScript (fichier, dossier `[output] dir` ou stdout), puis relit
//! éventuellement le résultat (`--review`).
//!
//! Codes de sortie : 0 succès, 1 échec de transpilation ou relecture FAIL,
//! 2 erreur d'usage (clap).

use std::fs;
use std::io::Write as _;
use std::process::ExitCode;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use pine_transpiler::{TranspileOutcome, Transpiled, Transpiler};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod review;
pub mod util;

use config::{FileConfig, Settings};
use review::Reviewer;

/// Point d'entrée du binaire (appelé depuis src/main.rs).
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(&cli)
}

#[derive(Parser, Debug)]
#[command(name = "pine2js", version, about = "Transpile des scripts Pine en modules JavaScript")]
pub struct Cli {
    /// Script source (.pine)
    pub input: Utf8PathBuf,
    /// Fichier JS de sortie (stdout par défaut)
    pub output: Option<Utf8PathBuf>,
    /// Détails (taille, lignes, avertissements) ; `-vv` active les traces debug
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Affiche la source avant le code généré
    #[arg(short, long)]
    pub source: bool,
    /// Retire les commentaires du JS émis
    #[arg(long)]
    pub no_comments: bool,
    /// Affiche l'AST (JSON) sur stdout
    #[arg(long)]
    pub ast: bool,
    /// Affiche les jetons (JSON) sur stdout
    #[arg(long)]
    pub tokens: bool,
    /// Affiche le résultat complet `{success, …}` en JSON
    #[arg(long)]
    pub json: bool,
    /// Relit le JS généré (membres runtime, syntaxe via node)
    #[arg(long, overrides_with = "no_review")]
    pub review: bool,
    #[arg(long, overrides_with = "review", hide = true)]
    pub no_review: bool,
    /// Fichier de configuration (défaut : ./pine2js.toml s'il existe)
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

/// Réglages effectifs : fichier → environnement → options.
pub fn settings_for(cli: &Cli) -> Result<Settings> {
    let file = FileConfig::discover(cli.config.as_deref())?;
    let mut settings = Settings::resolve(file);
    if cli.no_comments {
        settings.compiler = settings.compiler.without_comments();
    }
    if cli.review {
        settings.review = true;
    }
    if cli.no_review {
        settings.review = false;
    }
    Ok(settings)
}

pub fn execute(cli: &Cli) -> Result<ExitCode> {
    let settings = settings_for(cli)?;
    let source = fs::read_to_string(&cli.input).with_context(|| format!("lecture {}", cli.input))?;
    info!(input = %cli.input, bytes = source.len(), "transpilation");
    if cli.verbose > 0 {
        eprintln!("Fichier : {} ({} octets, {} lignes)", cli.input, source.len(), source.lines().count());
    }

    let outcome: TranspileOutcome = Transpiler::new(settings.compiler.clone()).run(&source).into();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome).context("sérialisation JSON")?);
        return Ok(if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let transpiled = match outcome {
        TranspileOutcome::Success(t) => t,
        TranspileOutcome::Failure(e) => {
            eprintln!("Échec ({}) : {}", e.stage(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.verbose > 0 {
        for w in &transpiled.warnings {
            eprintln!("{w}");
        }
    }
    dump_debug(cli, &transpiled)?;
    if cli.source {
        println!("// ---- source : {} ----", cli.input);
        println!("{}", source.trim_end());
        println!("// ---- JavaScript ----");
    }

    match output_path(cli, &settings) {
        Some(path) => {
            util::fs::write_all(&path, transpiled.code.as_bytes()).with_context(|| format!("écriture {path}"))?;
            if cli.verbose > 0 {
                eprintln!("Sortie : {path} ({} octets)", transpiled.code.len());
            }
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(transpiled.code.as_bytes()).context("écriture stdout")?;
            if cli.verbose > 0 {
                eprintln!("Sortie : stdout ({} octets)", transpiled.code.len());
            }
        }
    }

    if settings.review {
        let report = Reviewer::new(&settings.node_bin, settings.reviewer_cmd.clone()).review(&transpiled.code);
        eprintln!("{report}");
        if !report.ok {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn dump_debug(cli: &Cli, t: &Transpiled) -> Result<()> {
    if cli.ast {
        println!("{}", serde_json::to_string_pretty(&t.ast).context("sérialisation AST")?);
    }
    if cli.tokens {
        println!("{}", serde_json::to_string_pretty(&t.tokens).context("sérialisation jetons")?);
    }
    Ok(())
}

/// Sortie explicite, sinon `<dir>/<stem>.js` si `[output] dir` est configuré.
fn output_path(cli: &Cli, settings: &Settings) -> Option<Utf8PathBuf> {
    if let Some(out) = &cli.output {
        return Some(out.clone());
    }
    let dir = settings.output_dir.as_deref()?;
    let stem = cli.input.file_stem().unwrap_or("script");
    let path = dir.join(format!("{stem}.js"));
    debug!(%path, "sortie déduite de la configuration");
    Some(path)
}
