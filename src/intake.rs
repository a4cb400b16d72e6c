//! Library entry points.
//!
//! [`open_session`] wires the real adapters (vision classifier, pdfium
//! consolidator) into an [`IntakeMachine`]; [`run_intake`] feeds it a list of
//! inputs the way the CLI's batch mode does. Callers that bring their own
//! ports construct [`IntakeMachine::new`] directly and use [`drive`].

use crate::config::IntakeConfig;
use crate::conversation::ConversationLog;
use crate::error::IntakeError;
use crate::machine::{IntakeMachine, SubmitOutcome};
use crate::model::{Artifact, ClassificationResult, DocumentSide, ExtractedData, FlowState, SubmittedFile};
use crate::pipeline::consolidate::PdfConsolidator;
use crate::pipeline::enhance::enhance_image;
use crate::pipeline::input::{is_multi_page_format, resolve_input};
use crate::pipeline::llm::VisionClassifier;
use crate::pipeline::render::bind_pdfium;
use crate::ports::{ClassificationRequest, Classifier};
use crate::session::SessionSnapshot;
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Everything a finished [`run_intake`] call produced.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeReport {
    pub state: FlowState,
    pub artifact: Option<Artifact>,
    pub needs_review: bool,
    pub extracted: ExtractedData,
    pub session: SessionSnapshot,
    pub transcript: ConversationLog,
    /// How many inputs were submitted before the session stopped.
    pub inputs_used: usize,
}

impl IntakeReport {
    pub fn is_complete(&self) -> bool {
        self.artifact.is_some()
    }

    /// Capture the machine's current state. `inputs_used` is informational.
    pub fn from_machine(machine: &IntakeMachine, inputs_used: usize) -> Self {
        Self {
            state: machine.state(),
            artifact: machine.final_artifact().cloned(),
            needs_review: machine.needs_review(),
            extracted: machine.merged_data(),
            session: machine.snapshot(),
            transcript: machine.log().clone(),
            inputs_used,
        }
    }
}

/// Build a machine backed by the vision classifier and the PDF consolidator.
///
/// Fails early when no LLM provider can be resolved or pdfium cannot be
/// bound, rather than on the first submission.
pub async fn open_session(config: &IntakeConfig) -> Result<IntakeMachine, IntakeError> {
    let provider = resolve_provider(config).await?;
    tokio::task::spawn_blocking(|| bind_pdfium().map(|_| ()))
        .await
        .map_err(|e| IntakeError::Internal(format!("pdfium probe panicked: {e}")))??;

    info!("LLM provider and pdfium ready");
    Ok(IntakeMachine::new(
        Arc::new(VisionClassifier::new(provider, config.clone())),
        Arc::new(PdfConsolidator::new()),
        config.clone(),
    ))
}

/// Resolve, validate and enhance one input.
///
/// Returns the file and whether it is a multi-page format.
pub async fn prepare_file(
    input: &str,
    config: &IntakeConfig,
) -> Result<(SubmittedFile, bool), IntakeError> {
    let file = resolve_input(input, config).await?;
    let multi_page = is_multi_page_format(&file);
    let file = enhance_image(file, config).await;
    Ok((file, multi_page))
}

/// Open a session and submit `inputs` in order.
///
/// Stops at `Completed` or `Error`; inputs left over are ignored with a
/// warning. Running out of inputs first is not an error: the report simply
/// has no artifact.
pub async fn run_intake<S: AsRef<str>>(
    inputs: &[S],
    config: &IntakeConfig,
) -> Result<IntakeReport, IntakeError> {
    let mut machine = open_session(config).await?;
    drive(&mut machine, inputs, config).await
}

/// Submit `inputs` to an existing machine. See [`run_intake`].
pub async fn drive<S: AsRef<str>>(
    machine: &mut IntakeMachine,
    inputs: &[S],
    config: &IntakeConfig,
) -> Result<IntakeReport, IntakeError> {
    let mut used = 0;
    for input in inputs {
        if matches!(machine.state(), FlowState::Completed | FlowState::Error) {
            warn!(
                "Session is {}; ignoring {} remaining input(s)",
                machine.state(),
                inputs.len() - used
            );
            break;
        }

        let (file, multi_page) = prepare_file(input.as_ref(), config).await?;
        used += 1;
        match machine.submit(file, multi_page).await? {
            SubmitOutcome::Completed { needs_review, .. } => {
                info!("Intake completed after {} input(s) (review: {})", used, needs_review)
            }
            SubmitOutcome::Failed { rejections } => {
                warn!("Intake stopped after {} consecutive rejections", rejections)
            }
            _ => {}
        }
    }
    Ok(IntakeReport::from_machine(machine, used))
}

/// Classify a single input without running a session.
pub async fn classify_file(
    input: &str,
    config: &IntakeConfig,
) -> Result<ClassificationResult, IntakeError> {
    let provider = resolve_provider(config).await?;
    let (file, _) = prepare_file(input, config).await?;
    let classifier = VisionClassifier::new(provider, config.clone());
    Ok(classifier
        .classify(ClassificationRequest {
            file: &file,
            expected_side: Some(DocumentSide::Front),
            expected_kind: None,
        })
        .await)
}

/// Write the artifact atomically: a temp file in the target directory is
/// renamed over `path`, so readers never see a partial PDF.
pub fn write_artifact(artifact: &Artifact, path: impl AsRef<Path>) -> Result<(), IntakeError> {
    let path = path.as_ref();
    let write_failed = |source: std::io::Error| IntakeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(&artifact.data).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.len());
    Ok(())
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, IntakeError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        IntakeError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`]; the API key comes from the provider's usual env var.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Auto-detection** via `ProviderFactory::from_env`.
pub async fn resolve_provider(config: &IntakeConfig) -> Result<Arc<dyn LLMProvider>, IntakeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| IntakeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision-capable LLM provider could be auto-detected.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY or GEMINI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
