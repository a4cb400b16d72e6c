//! CLI binary for edgequake-intake.
//!
//! A thin shim over the library crate: maps CLI flags to `IntakeConfig`,
//! prints the conversation as it happens and writes the final PDF.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_intake::{
    classify_file, drive, open_session, prepare_file, write_artifact, Artifact, ClassificationResult,
    FlowState, IntakeConfig, IntakeMachine, IntakeProgressCallback, IntakeReport, Message,
    ProgressCallback, Role, SubmitOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Prints every transcript message to stderr and shows a spinner while a
/// submission is being analysed.
struct CliProgressCallback {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
        })
    }

    fn start_spinner(&self, state: FlowState) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Analysing");
        bar.set_message(match state {
            FlowState::AnalyzingFirst => "first submission…",
            _ => "second side…",
        });
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    /// Print above the spinner when one is running so it is not torn.
    fn print(&self, line: String) {
        match self.spinner.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(bar) => bar.println(line),
                None => eprintln!("{line}"),
            },
            Err(_) => eprintln!("{line}"),
        }
    }
}

impl IntakeProgressCallback for CliProgressCallback {
    fn on_state_change(&self, _from: FlowState, to: FlowState) {
        if to.is_analyzing() {
            self.start_spinner(to);
        } else {
            self.stop_spinner();
        }
    }

    fn on_message(&self, message: &Message) {
        self.print(format_message(message));
    }

    fn on_artifact_ready(&self, artifact: &Artifact) {
        self.print(format!(
            "  {} {}  {}",
            green("▣"),
            bold(&artifact.file_name),
            dim(&format!("{} bytes", artifact.len()))
        ));
    }
}

fn format_message(message: &Message) -> String {
    match message.role {
        Role::User => format!("{} {}", cyan("you  ▸"), message.text),
        Role::Assistant if message.is_error => format!("{} {}", red("bot  ✗"), message.text),
        Role::Assistant => format!("{} {}", green("bot  ◆"), message.text),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Front and back photos, PDF written next to you
  intake front.jpg back.jpg

  # Choose the output file
  intake front.jpg back.jpg -o cedula.pdf

  # A single PDF that already holds both sides
  intake scan.pdf

  # Images from URLs
  intake https://example.com/front.jpg https://example.com/back.jpg

  # Guided session: type paths, `retry`, `restart`, `status` or `quit`
  intake --interactive

  # Just ask the model what a file is
  intake --classify-only --json photo.jpg

  # Give up after three rejected files in a row
  intake --max-rejections 3 front.jpg back.jpg

SUPPORTED DOCUMENTS:
  cedula_ciudadania           two sides
  tarjeta_identidad           two sides
  registro_civil_nacimiento   single page
  registro_civil_matrimonio   single page
  registro_civil_defuncion    single page

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override the log filter
"#;

/// Guided identity-document intake with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "intake",
    version,
    about = "Validate identity-document photos with a vision LLM and merge both sides into one PDF",
    long_about = "Submit photos or PDFs of an identity document. Each file is classified by a \
vision LLM (kind, side, validity, legibility); the session asks for the missing side until both \
are in, then lays them out on one A4 page. Supports OpenAI, Anthropic, Google Gemini, Azure \
OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files or HTTP/HTTPS URLs, submitted in order.
    inputs: Vec<String>,

    /// Write the final PDF here instead of `<kind>_<timestamp>.pdf`.
    #[arg(short, long, env = "INTAKE_OUTPUT")]
    output: Option<PathBuf>,

    /// Read commands from stdin: a path or URL, `restart`, `retry`, `status`, `quit`.
    #[arg(short, long, env = "INTAKE_INTERACTIVE")]
    interactive: bool,

    /// Classify each input on its own and print the verdict; no session.
    #[arg(long)]
    classify_only: bool,

    /// Print structured JSON on stdout instead of a summary.
    #[arg(long, env = "INTAKE_JSON")]
    json: bool,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Retries per classification on LLM failure.
    #[arg(
        long,
        env = "INTAKE_MAX_RETRIES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "INTAKE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "INTAKE_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Send photos as they are, without contrast and sharpening.
    #[arg(long, env = "INTAKE_NO_ENHANCE")]
    no_enhance: bool,

    /// Stop the session after this many consecutive rejections.
    #[arg(long, env = "INTAKE_MAX_REJECTIONS",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_rejections: Option<u32>,

    /// Path to a text file containing a custom classification prompt.
    #[arg(long, env = "INTAKE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INTAKE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INTAKE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The live transcript is the main feedback, so library INFO logs are
    // only shown on request.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.inputs.is_empty() && !cli.interactive {
        anyhow::bail!("No input given. Pass one or more files/URLs, or use --interactive.");
    }

    let progress: Option<ProgressCallback> = if cli.quiet || cli.classify_only {
        None
    } else {
        Some(CliProgressCallback::new() as Arc<dyn IntakeProgressCallback>)
    };
    let config = build_config(&cli, progress).await?;

    if cli.classify_only {
        return classify_only(&cli, &config).await;
    }

    let mut machine = open_session(&config)
        .await
        .context("Failed to start the intake session")?;

    if cli.interactive {
        run_interactive(&cli, &config, &mut machine).await?;
    } else {
        let report = drive(&mut machine, &cli.inputs, &config)
            .await
            .context("Intake failed")?;
        if let Some(ref artifact) = report.artifact {
            save(&cli, artifact)?;
        }
        print_report(&cli, &report)?;
    }

    Ok(if machine.final_artifact().is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `IntakeConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IntakeConfig> {
    let mut builder = IntakeConfig::builder()
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .enhance_images(!cli.no_enhance);

    if let Some(n) = cli.max_rejections {
        builder = builder.max_consecutive_rejections(n);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    Ok(config)
}

async fn classify_only(cli: &Cli, config: &IntakeConfig) -> Result<ExitCode> {
    let mut verdicts = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let verdict = classify_file(input, config)
            .await
            .with_context(|| format!("Failed to classify {input}"))?;
        if !cli.json && !cli.quiet {
            print_verdict(input, &verdict);
        }
        verdicts.push(serde_json::json!({ "input": input, "result": verdict }));
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&verdicts).context("Failed to serialise verdicts")?
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn print_verdict(input: &str, verdict: &ClassificationResult) {
    let mark = if verdict.is_valid && verdict.is_legible {
        green("✓")
    } else {
        red("✗")
    };
    println!(
        "{} {}  {} / {}  valid={} legible={}",
        mark,
        bold(input),
        verdict.kind.as_str(),
        verdict.detected_side,
        verdict.is_valid,
        verdict.is_legible
    );
    if !verdict.feedback.is_empty() {
        println!("    {}", dim(&verdict.feedback));
    }
    for (field, value) in &verdict.extracted.0 {
        if let Some(ref text) = value.value {
            println!(
                "    {:<24} {}  {}",
                field.label(),
                text,
                dim(&format!("{:.0}%", value.confidence * 100.0))
            );
        }
    }
}

async fn run_interactive(cli: &Cli, config: &IntakeConfig, machine: &mut IntakeMachine) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "{}",
            dim("Type a path or URL to submit it; `status`, `retry`, `restart` or `quit`.")
        );
    }

    // Inputs given on the command line are submitted first.
    if !cli.inputs.is_empty() {
        let report = drive(machine, &cli.inputs, config).await.context("Intake failed")?;
        if let Some(ref artifact) = report.artifact {
            save(cli, artifact)?;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let state = machine.state();
        let accepts = if state.accepts_multi_page() {
            "image or PDF"
        } else {
            "image"
        };
        eprint!("{} ", cyan(&format!("[{state}: {accepts}] ›")));
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            "restart" => machine.restart(),
            "status" => {
                let snapshot = machine.snapshot();
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&snapshot).context("Failed to serialise status")?
                );
            }
            "retry" => match machine.retry_consolidation().await {
                Ok(outcome) => {
                    if let Some(artifact) = outcome.artifact() {
                        save(cli, artifact)?;
                    }
                }
                Err(e) => eprintln!("{} {}", red("✗"), e),
            },
            input => {
                let (file, multi_page) = match prepare_file(input, config).await {
                    Ok(prepared) => prepared,
                    Err(e) => {
                        eprintln!("{} {}", red("✗"), e);
                        continue;
                    }
                };
                match machine.submit(file, multi_page).await {
                    Ok(SubmitOutcome::Completed {
                        artifact: Some(ref artifact),
                        ..
                    }) => save(cli, artifact)?,
                    Ok(_) => {}
                    Err(e) => eprintln!("{} {}", red("✗"), e),
                }
            }
        }
    }

    if cli.json {
        let report = IntakeReport::from_machine(machine, 0);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }
    Ok(())
}

fn save(cli: &Cli, artifact: &Artifact) -> Result<()> {
    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    write_artifact(artifact, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if !cli.quiet {
        eprintln!(
            "{}  {}  →  {}",
            green("✔"),
            artifact.file_name,
            bold(&path.display().to_string())
        );
    }
    Ok(())
}

fn print_report(cli: &Cli, report: &IntakeReport) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    if report.is_complete() {
        if report.needs_review {
            eprintln!("{} completed, flagged for manual review", cyan("⚠"));
        }
    } else {
        eprintln!(
            "{} no document produced ({} after {} input(s))",
            red("✘"),
            report.state,
            report.inputs_used
        );
    }
    Ok(())
}
