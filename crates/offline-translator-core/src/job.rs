//! The translate-a-PDF job: extraction, translation and writing as one
//! background unit of work.
//!
//! The worker never touches session state. It only posts [`JobMessage`]s to
//! an unbounded channel; the interactive loop drains them in order and applies
//! them (see [`crate::session::TranslatorSession`]).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{AppConfig, Lang};
use crate::error::Error;
use crate::ocr::TesseractOcr;
use crate::pdf::{EXTRACTION_PROGRESS_SPAN, LopdfWriter, PdfWriter, TextExtractor};
use crate::translator::Translator;

pub type JobId = Uuid;

/// Progress once the translation call has returned.
pub const TRANSLATED_PROGRESS: f32 = 75.0;
/// Progress once the output file is written.
pub const COMPLETE_PROGRESS: f32 = 100.0;

/// Working stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum JobStage {
    Extracting = 0,
    Translating = 1,
    Writing = 2,
}

impl JobStage {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Extracting,
            1 => Self::Translating,
            _ => Self::Writing,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extracting => "text extraction",
            Self::Translating => "translation",
            Self::Writing => "PDF writing",
        })
    }
}

/// Why a job failed, and in which stage.
#[derive(Debug)]
pub struct JobFailure {
    pub stage: JobStage,
    pub error: Error,
}

impl JobFailure {
    pub const fn new(stage: JobStage, error: Error) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Job lifecycle. Transitions only move forward.
#[derive(Debug, Default)]
pub enum JobState {
    #[default]
    Idle,
    Extracting,
    Translating,
    Writing,
    Succeeded(PathBuf),
    Failed(JobFailure),
}

impl JobState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Extracting => 1,
            Self::Translating => 2,
            Self::Writing => 3,
            Self::Succeeded(_) | Self::Failed(_) => 4,
        }
    }

    /// Whether moving to `next` respects the forward-only ordering.
    ///
    /// `Failed` is reachable from any non-terminal state; `Succeeded` only
    /// from `Writing`.
    pub const fn can_advance_to(&self, next: &Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Idle => false,
            Self::Failed(_) => true,
            Self::Succeeded(_) => matches!(self, Self::Writing),
            _ => next.rank() > self.rank(),
        }
    }
}

impl From<JobStage> for JobState {
    fn from(stage: JobStage) -> Self {
        match stage {
            JobStage::Extracting => Self::Extracting,
            JobStage::Translating => Self::Translating,
            JobStage::Writing => Self::Writing,
        }
    }
}

/// Something the worker reports
#[derive(Debug)]
pub enum JobEvent {
    Stage(JobStage),
    /// Overall progress in percent, non-decreasing within a job
    Progress(f32),
    Finished(Result<PathBuf, JobFailure>),
}

#[derive(Debug)]
pub struct JobMessage {
    pub job: JobId,
    pub event: JobEvent,
}

/// Inputs for one job
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source_lang: Lang,
    pub target_lang: Lang,
}

/// Posts a job's messages and remembers the stage it last announced.
#[derive(Clone)]
struct Reporter {
    job: JobId,
    tx: UnboundedSender<JobMessage>,
    stage: Arc<AtomicU8>,
}

impl Reporter {
    fn send(&self, event: JobEvent) {
        // A closed channel means the session is gone; nothing left to notify.
        let _ = self.tx.send(JobMessage { job: self.job, event });
    }

    fn stage(&self, stage: JobStage) {
        self.stage.store(stage as u8, Ordering::SeqCst);
        self.send(JobEvent::Stage(stage));
    }

    fn current_stage(&self) -> JobStage {
        JobStage::from_u8(self.stage.load(Ordering::SeqCst))
    }

    fn progress(&self, percent: f32) {
        self.send(JobEvent::Progress(percent));
    }
}

/// Extractor, translator and writer wired together.
pub struct TranslationPipeline {
    extractor: TextExtractor,
    translator: Translator,
    writer: Arc<dyn PdfWriter>,
}

impl TranslationPipeline {
    pub fn new(
        extractor: TextExtractor,
        translator: Translator,
        writer: Arc<dyn PdfWriter>,
    ) -> Self {
        Self {
            extractor,
            translator,
            writer,
        }
    }

    /// MuPDF reading, tesseract OCR and lopdf output, configured from `config`.
    ///
    /// Fails only when the configured output font cannot be loaded.
    pub fn from_config(
        config: &AppConfig,
        translator: Translator,
    ) -> crate::error::Result<Self> {
        let ocr = Arc::new(TesseractOcr::from_config(&config.ocr));
        let writer = LopdfWriter::from_config(&config.layout)?;
        Ok(Self::new(
            TextExtractor::with_mupdf(ocr, config.ocr_dpi),
            translator,
            Arc::new(writer),
        ))
    }

    pub const fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Start a job on the tokio runtime.
    ///
    /// Exactly one `Finished` message is posted for the returned id, even if
    /// the worker panics.
    pub fn spawn(
        self: &Arc<Self>,
        request: JobRequest,
        tx: UnboundedSender<JobMessage>,
    ) -> (JobId, JoinHandle<()>) {
        let job = Uuid::new_v4();
        let reporter = Reporter {
            job,
            tx,
            stage: Arc::new(AtomicU8::new(JobStage::Extracting as u8)),
        };
        let pipeline = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!(
                "Job {} started: {} ({} -> {})",
                job,
                request.input.display(),
                request.source_lang,
                request.target_lang
            );

            let worker_reporter = reporter.clone();
            let worker =
                tokio::spawn(async move { pipeline.run(&request, &worker_reporter).await });

            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(JobFailure::new(
                    reporter.current_stage(),
                    Error::WorkerPanicked(e.to_string()),
                )),
            };

            match &outcome {
                Ok(path) => info!("Job {} succeeded: {}", job, path.display()),
                Err(failure) => error!("Job {} failed: {}", job, failure),
            }
            reporter.send(JobEvent::Finished(outcome));
        });

        (job, handle)
    }

    async fn run(&self, request: &JobRequest, reporter: &Reporter) -> Result<PathBuf, JobFailure> {
        reporter.stage(JobStage::Extracting);
        let extractor = self.extractor.clone();
        let input = request.input.clone();
        let progress = reporter.clone();
        let text = tokio::task::spawn_blocking(move || {
            extractor.extract(&input, |percent| progress.progress(percent))
        })
        .await
        .map_err(|e| JobFailure::new(JobStage::Extracting, Error::WorkerPanicked(e.to_string())))?
        .map_err(|e| JobFailure::new(JobStage::Extracting, e))?;
        reporter.progress(EXTRACTION_PROGRESS_SPAN);

        let route = self
            .translator
            .resolve_route(&request.source_lang, &request.target_lang)
            .map_err(|e| JobFailure::new(JobStage::Extracting, e))?;

        reporter.stage(JobStage::Translating);
        let translated = self
            .translator
            .translate(&route, &text)
            .await
            .map_err(|e| JobFailure::new(JobStage::Translating, e))?;
        reporter.progress(TRANSLATED_PROGRESS);

        reporter.stage(JobStage::Writing);
        let writer = Arc::clone(&self.writer);
        let output = request.output.clone();
        tokio::task::spawn_blocking(move || writer.write(&translated, &output))
            .await
            .map_err(|e| JobFailure::new(JobStage::Writing, Error::WorkerPanicked(e.to_string())))?
            .map_err(|e| JobFailure::new(JobStage::Writing, e))?;
        reporter.progress(COMPLETE_PROGRESS);

        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> JobState {
        JobState::Failed(JobFailure::new(JobStage::Translating, Error::EmptyDocumentText))
    }

    #[test]
    fn test_forward_transitions() {
        assert!(JobState::Idle.can_advance_to(&JobState::Extracting));
        assert!(JobState::Extracting.can_advance_to(&JobState::Translating));
        assert!(JobState::Translating.can_advance_to(&JobState::Writing));
        assert!(JobState::Writing.can_advance_to(&JobState::Succeeded(PathBuf::from("out.pdf"))));
    }

    #[test]
    fn test_backward_and_skipping_to_success_rejected() {
        assert!(!JobState::Translating.can_advance_to(&JobState::Extracting));
        assert!(!JobState::Extracting.can_advance_to(&JobState::Idle));
        assert!(!JobState::Extracting.can_advance_to(&JobState::Succeeded(PathBuf::new())));
    }

    #[test]
    fn test_failure_reachable_from_any_active_state() {
        let active = [
            JobState::Idle,
            JobState::Extracting,
            JobState::Translating,
            JobState::Writing,
        ];
        for state in active {
            assert!(state.can_advance_to(&failed()));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let done = JobState::Succeeded(PathBuf::from("out.pdf"));
        assert!(done.is_terminal());
        assert!(!done.can_advance_to(&failed()));
        assert!(!failed().can_advance_to(&JobState::Extracting));
    }

    #[test]
    fn test_failure_display_names_stage() {
        let failure =
            JobFailure::new(JobStage::Writing, Error::WriteFailure("disk full".to_string()));
        assert_eq!(
            failure.to_string(),
            "PDF writing failed: failed to write translated PDF: disk full"
        );
    }

    #[test]
    fn test_stage_round_trips_through_u8() {
        for stage in [JobStage::Extracting, JobStage::Translating, JobStage::Writing] {
            assert_eq!(JobStage::from_u8(stage as u8), stage);
        }
    }
}
