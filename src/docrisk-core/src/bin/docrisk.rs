//! docrisk CLI - fraud risk scoring for broker documents.
//!
//! Exit codes: 0 success, 2 input error (bad document, flags, or
//! configuration), 3 dependency failure (nothing could be extracted, or
//! the result could not be rendered).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use docrisk_core::{
    AssessConfig, AssessError, AssessmentEngine, AssessmentReport, Collaborators, Document,
    ExtractorKind, HttpClassifier,
};
use docrisk_registry::RegistryHandle;
use serde::Serialize;
use tracing::debug;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// docrisk - multi-signal fraud risk scoring for broker documents.
///
/// Combines phishing-language classification of the document text, metadata
/// tamper heuristics, and signature / broker-registry verification into a
/// single 0-100 risk score with an explanation for every component.
#[derive(Parser)]
#[command(name = "docrisk")]
#[command(version = VERSION)]
#[command(about = "Fraud risk scoring for broker documents")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtractorArg {
    /// Bundle if one exists, else poppler
    Auto,
    /// Pre-extracted JSON bundle
    Bundle,
    /// pdftotext / pdfinfo / pdfsig
    Poppler,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(arg: ExtractorArg) -> Self {
        match arg {
            ExtractorArg::Auto => Self::Auto,
            ExtractorArg::Bundle => Self::Bundle,
            ExtractorArg::Poppler => Self::Poppler,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one document
    Assess {
        /// Document to assess
        document: PathBuf,

        /// Broker registry (.json or SQLite)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Phishing threshold override, within [0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Text-classification endpoint
        #[arg(long)]
        classifier_url: Option<String>,

        /// Extraction backend
        #[arg(long, value_enum, default_value_t = ExtractorArg::Auto)]
        extractor: ExtractorArg,

        /// Include per-component results
        #[arg(long)]
        detailed: bool,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(path: Option<&Path>) -> Result<AssessConfig, AssessError> {
    match path {
        Some(p) => AssessConfig::from_toml_file(p),
        None => Ok(AssessConfig::default()),
    }
}

fn emit_json<T: Serialize>(value: &T) -> Result<(), AssessError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{}", rendered);
    Ok(())
}

fn print_report(report: &AssessmentReport, detailed: bool) {
    println!("\nRISK ASSESSMENT");
    println!("===============\n");
    println!("  Risk score: {:.2} / 100", report.assessment.risk_score);
    println!();
    println!("Signals:");
    for signal in &report.assessment.signals {
        println!("  - {}", signal);
    }

    if !detailed {
        return;
    }

    println!();
    println!("Document SHA-256: {}", report.document_sha256);
    println!();
    println!("Tamper heuristics: {}", if report.tamper.flag { "FLAGGED" } else { "clean" });
    for reason in &report.tamper.reasons {
        println!("  - {}", reason);
    }
    println!();
    println!("Text risk: {}", report.text.risk_score);
    println!();
    let legitimacy = &report.legitimacy;
    println!("Legitimacy: {:.2}", legitimacy.legitimacy_score);
    println!(
        "  Signature:       {}",
        match (legitimacy.signature.present, &legitimacy.signature.signer) {
            (false, _) => "none".to_string(),
            (true, Some(signer)) => format!("{} (trusted: {})", signer, legitimacy.signature.trusted),
            (true, None) => "present, signer unknown".to_string(),
        }
    );
    println!("  Broker verified: {}", legitimacy.broker_verified);
    if let Some(broker) = &legitimacy.broker {
        println!(
            "  Broker:          {} / {}",
            broker.name.as_deref().unwrap_or("-"),
            broker.registration_number.as_deref().unwrap_or("-")
        );
    }

    if !report.degraded.is_empty() {
        println!();
        println!("Degraded components:");
        for d in &report.degraded {
            println!("  - {}: {}", d.component, d.reason);
        }
    }
    println!();
    println!("Completed in {} ms", report.elapsed_ms);
}

#[allow(clippy::too_many_arguments)]
async fn run_assess(
    mut config: AssessConfig,
    document: &Path,
    registry: Option<PathBuf>,
    threshold: Option<f64>,
    classifier_url: Option<String>,
    extractor: ExtractorArg,
    detailed: bool,
    json: bool,
) -> Result<(), AssessError> {
    if let Some(path) = registry {
        config.registry.path = Some(path);
    }
    if let Some(t) = threshold {
        config.text.phishing_threshold = t;
    }
    if let Some(url) = classifier_url {
        config.classifier.endpoint = Some(url);
    }
    config.validate()?;

    let document = Document::open(document)?;
    let kind = ExtractorKind::from(extractor).resolve(&document);
    debug!(extractor = ?kind, "Extractor selected");

    let mut engine =
        AssessmentEngine::new(config.clone(), Collaborators::for_kind(kind, &config))?;
    if config.classifier.endpoint.is_some() {
        engine = engine.with_classifier(Arc::new(HttpClassifier::new(&config.classifier)?));
    }
    if let Some(path) = &config.registry.path {
        let handle = RegistryHandle::load_or_unavailable(path, config.registry.match_policy);
        engine = engine.with_registry(Arc::new(handle));
    }

    let result = engine.assess(&document).await;
    engine.shutdown().await;
    let report = result?;

    match (json, detailed) {
        (true, true) => emit_json(&report),
        (true, false) => emit_json(&report.assessment),
        (false, _) => {
            print_report(&report, detailed);
            Ok(())
        },
    }
}

async fn run(cli: Cli) -> Result<(), AssessError> {
    let config = load_config(cli.config.as_deref())?;
    let json = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Assess {
            document,
            registry,
            threshold,
            classifier_url,
            extractor,
            detailed,
        } => {
            run_assess(
                config,
                &document,
                registry,
                threshold,
                classifier_url,
                extractor,
                detailed,
                json,
            )
            .await
        },
        Commands::Config => {
            if json {
                emit_json(&config)
            } else {
                print!("{}", config.to_toml_string()?);
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable
    let level = if cli.format == OutputFormat::Json {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serializes to an error, like a map with non-string keys.
    struct Unrenderable;

    impl Serialize for Unrenderable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("value cannot be rendered"))
        }
    }

    #[test]
    fn test_emit_json_failure_is_an_error() {
        let err = emit_json(&Unrenderable).unwrap_err();
        assert!(matches!(err, AssessError::Output(_)));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("value cannot be rendered"));
    }

    #[test]
    fn test_emit_json_success() {
        assert!(emit_json(&serde_json::json!({"risk_score": 0.0})).is_ok());
    }
}
