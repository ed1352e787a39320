//! CLI binary for rxscan.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the pipeline on one image, and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rxscan::{
    process_from_file, send_reminder, validate_dosage, PipelineConfig, PrescriptionReport,
    SmtpConfig, DEFAULT_INTERACTION_API,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process a prescription photo
  rxscan prescription.jpg

  # Structured JSON output
  rxscan --json prescription.jpg > report.json

  # Validate the first extracted (drug, dosage) pair against safety limits
  rxscan --validate prescription.jpg

  # Process and email a reminder for the first extracted drug
  rxscan prescription.jpg --remind-to patient@example.com --remind-at 08:00

ENVIRONMENT VARIABLES:
  RXSCAN_MODEL_DIR        Directory with model.onnx, tokenizer.json, config.json
  RXSCAN_OCR_LANGS        Tesseract language spec (default: eng)
  RXSCAN_INTERACTION_API  Interaction-label search endpoint base URL
  RXSCAN_SMTP_HOST        Mail relay hostname          (reminders only)
  RXSCAN_SMTP_PORT        Submission port, default 587 (reminders only)
  RXSCAN_SMTP_USERNAME    Relay account username       (reminders only)
  RXSCAN_SMTP_PASSWORD    Relay account password       (reminders only)
  RXSCAN_SMTP_FROM        Sender mailbox, defaults to the username

SETUP:
  1. Install Tesseract with the language data you need (eng by default).
  2. Export a clinical NER checkpoint to ONNX and point RXSCAN_MODEL_DIR at it.
  3. rxscan prescription.jpg
"#;

/// Extract drugs, dosages, and frequencies from a prescription image.
#[derive(Parser, Debug)]
#[command(
    name = "rxscan",
    version,
    about = "Extract structured drug/dosage/frequency data from a prescription image",
    long_about = "Run OCR and clinical named-entity recognition over a photographed \
prescription, check the extracted drugs for known interactions, and optionally validate \
dosages or send an email reminder.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the prescription image (PNG, JPEG, BMP, or TIFF).
    input: PathBuf,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "RXSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory holding model.onnx, tokenizer.json, and config.json.
    #[arg(long, env = "RXSCAN_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Tesseract language spec, e.g. eng or eng+fra.
    #[arg(long, env = "RXSCAN_OCR_LANGS", default_value = "eng")]
    languages: String,

    /// Interaction-label search endpoint base URL.
    #[arg(long, env = "RXSCAN_INTERACTION_API", default_value = DEFAULT_INTERACTION_API)]
    interaction_api: String,

    /// Interaction lookup timeout in seconds.
    #[arg(long, env = "RXSCAN_LOOKUP_TIMEOUT", default_value_t = 5)]
    lookup_timeout: u64,

    /// Minimum model confidence (0.0–1.0) for a span to be kept.
    #[arg(long, env = "RXSCAN_MIN_SCORE", default_value_t = 0.0)]
    min_score: f32,

    /// Validate the first extracted (drug, dosage) pair against safety limits.
    #[arg(long)]
    validate: bool,

    /// Email address to send a reminder to (uses the first extracted pair).
    #[arg(long, requires = "remind_at")]
    remind_to: Option<String>,

    /// Time-of-day string rendered into the reminder, e.g. 08:00.
    #[arg(long, requires = "remind_to")]
    remind_at: Option<String>,

    /// Output structured JSON instead of the human-readable report.
    #[arg(long, env = "RXSCAN_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RXSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RXSCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = PipelineConfig::builder()
        .ocr_languages(&cli.languages)
        .interaction_api(&cli.interaction_api)
        .lookup_timeout_secs(cli.lookup_timeout)
        .min_entity_score(cli.min_score);
    if let Some(ref dir) = cli.model_dir {
        builder = builder.model_dir(dir);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let report = process_from_file(&cli.input, &config)
        .await
        .with_context(|| format!("Failed to process '{}'", cli.input.display()))?;

    let verdict = cli
        .validate
        .then(|| report.first_drug_and_dosage())
        .flatten()
        .map(|(drug, dosage)| (drug.to_string(), dosage.to_string(), validate_dosage(drug, dosage)));

    if cli.validate && verdict.is_none() && !cli.quiet {
        eprintln!(
            "{}",
            yellow("No (drug, dosage) pair was extracted; nothing to validate.")
        );
    }

    // ── Print ────────────────────────────────────────────────────────────
    let rendered = if cli.json {
        let value = match &verdict {
            Some((_, _, v)) => serde_json::json!({ "report": &report, "validation": v }),
            None => serde_json::to_value(&report).context("Failed to serialise report")?,
        };
        serde_json::to_string_pretty(&value).context("Failed to serialise report")?
    } else {
        render_human(&report, &verdict)
    };

    match cli.output {
        Some(ref path) => {
            std::fs::write(path, rendered.as_bytes())
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            if !cli.quiet {
                eprintln!("{} report → {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    // ── Optional reminder ────────────────────────────────────────────────
    if let (Some(to), Some(at)) = (cli.remind_to.as_deref(), cli.remind_at.as_deref()) {
        let Some((drug, dosage)) = report.first_drug_and_dosage() else {
            bail!("Cannot send a reminder: no (drug, dosage) pair was extracted");
        };
        let smtp = match config.smtp.clone().or_else(SmtpConfig::from_env) {
            Some(smtp) => smtp,
            None => bail!(
                "SMTP relay not configured — set RXSCAN_SMTP_HOST / RXSCAN_SMTP_USERNAME / \
                 RXSCAN_SMTP_PASSWORD"
            ),
        };
        send_reminder(&smtp, to, drug, dosage, at)
            .await
            .context("Reminder dispatch failed")?;
        if !cli.quiet {
            eprintln!("{} reminder sent to {}", green("✔"), bold(to));
        }
    }

    Ok(())
}

/// Render the human-readable report.
fn render_human(
    report: &PrescriptionReport,
    verdict: &Option<(String, String, rxscan::ValidationVerdict)>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", bold("Extracted text")));
    for line in report.text.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str(&format!("  {}\n", dim(line)));
    }

    out.push_str(&format!("\n{}\n", bold("Entities")));
    out.push_str(&render_bucket("drugs", &report.entities.drugs));
    out.push_str(&render_bucket("dosages", &report.entities.dosages));
    out.push_str(&render_bucket("frequencies", &report.entities.frequencies));

    out.push_str(&format!("\n{}\n", bold("Interactions")));
    out.push_str(&format!("  {}\n", report.interactions));

    if let Some((drug, dosage, v)) = verdict {
        out.push_str(&format!("\n{}\n", bold("Dosage check")));
        out.push_str(&format!("  {} {} — {}\n", drug, dim(dosage), cyan(&v.to_string())));
    }

    out.push_str(&format!(
        "\n{}\n",
        dim(&format!(
            "decode {}ms · ocr {}ms · ner {}ms · lookup {}ms · total {}ms",
            report.stats.decode_ms,
            report.stats.ocr_ms,
            report.stats.ner_ms,
            report.stats.lookup_ms,
            report.stats.total_ms
        ))
    ));

    out
}

fn render_bucket(name: &str, entries: &[String]) -> String {
    if entries.is_empty() {
        format!("  {name}: {}\n", dim("none"))
    } else {
        format!("  {name}: {}\n", entries.join(", "))
    }
}
