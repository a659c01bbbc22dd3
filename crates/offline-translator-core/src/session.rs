//! Interactive state for one user: selected input, both previews, the
//! running job and what the controls should currently allow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, Lang};
use crate::error::{Error, Result};
use crate::job::{
    COMPLETE_PROGRESS, JobEvent, JobId, JobMessage, JobRequest, JobState, TranslationPipeline,
};
use crate::preview::PagedPreviewCache;
use crate::util::copy_output;

/// A user-facing message produced while applying job results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(text) | Self::Error(text) => text,
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Session driving translation jobs and the two preview slots.
///
/// At most one job runs at a time. Progress and results reach the session
/// only as [`JobMessage`]s, applied in arrival order through
/// [`TranslatorSession::apply`].
pub struct TranslatorSession {
    pipeline: Arc<TranslationPipeline>,
    source_lang: Lang,
    target_lang: Lang,
    output_path: PathBuf,
    input: Option<PathBuf>,
    original: PagedPreviewCache,
    translated: PagedPreviewCache,
    progress: f32,
    state: JobState,
    active: Option<JobId>,
    has_output: bool,
    notice: Option<Notice>,
    tx: UnboundedSender<JobMessage>,
    rx: UnboundedReceiver<JobMessage>,
}

impl TranslatorSession {
    pub fn new(
        pipeline: Arc<TranslationPipeline>,
        original: PagedPreviewCache,
        translated: PagedPreviewCache,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            pipeline,
            source_lang: Lang::new(crate::config::DEFAULT_SOURCE_LANG),
            target_lang: Lang::new(crate::config::DEFAULT_TARGET_LANG),
            output_path: output_path.into(),
            input: None,
            original,
            translated,
            progress: 0.0,
            state: JobState::Idle,
            active: None,
            has_output: false,
            notice: None,
            tx,
            rx,
        }
    }

    /// Session with MuPDF previews and languages from configuration.
    pub fn from_config(config: &AppConfig, pipeline: Arc<TranslationPipeline>) -> Self {
        let preview =
            || PagedPreviewCache::with_mupdf(config.preview_dpi, config.preview_cache_pages);
        let mut session = Self::new(pipeline, preview(), preview(), config.output_path.clone());
        session.set_languages(config.source_lang.clone(), config.target_lang.clone());
        session
    }

    pub fn set_languages(&mut self, source: Lang, target: Lang) {
        self.source_lang = source;
        self.target_lang = target;
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = path.into();
    }

    /// Choose the PDF to translate and show its first page.
    ///
    /// The selection and the original preview always change together: when
    /// the document cannot be read both are cleared and translating is
    /// refused until another file is selected.
    pub fn select_input(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let pages = match self.original.open(path) {
            Ok(pages) => pages,
            Err(e) => {
                self.input = None;
                return Err(e);
            }
        };
        self.input = Some(path.to_path_buf());
        info!("Selected {} ({} pages)", path.display(), pages);

        if pages > 0 {
            self.original.show(1)?;
        }
        Ok(pages)
    }

    /// Start translating the selected input in the background.
    pub fn start_translation(&mut self) -> Result<JobId> {
        if self.active.is_some() {
            return Err(Error::JobAlreadyRunning);
        }
        let input = self.input.clone().ok_or(Error::NoInputSelected)?;

        let request = JobRequest {
            input,
            output: self.output_path.clone(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
        };

        self.progress = 0.0;
        self.state = JobState::Idle;
        self.has_output = false;
        self.notice = None;

        // Detached; every job ends with a Finished message.
        let (id, _handle) = self.pipeline.spawn(request, self.tx.clone());
        self.active = Some(id);
        Ok(id)
    }

    /// Wait for the next message of the running job.
    ///
    /// Returns `None` once nothing is running and the queue is empty.
    pub async fn next_message(&mut self) -> Option<JobMessage> {
        if let Ok(message) = self.rx.try_recv() {
            return Some(message);
        }
        if self.active.is_none() {
            return None;
        }
        self.rx.recv().await
    }

    /// Apply every message already queued, without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Apply one worker message to the session.
    ///
    /// Messages from any job other than the running one are ignored.
    pub fn apply(&mut self, message: JobMessage) {
        if self.active != Some(message.job) {
            debug!("Ignoring message from stale job {}", message.job);
            return;
        }

        match message.event {
            JobEvent::Stage(stage) => self.advance(JobState::from(stage)),
            JobEvent::Progress(percent) => self.progress = percent,
            JobEvent::Finished(Ok(path)) => {
                self.progress = COMPLETE_PROGRESS;
                self.active = None;
                self.has_output = true;
                self.notice = Some(Notice::Info(format!(
                    "Translated PDF saved as {}",
                    path.display()
                )));
                self.show_translated(&path);
                self.advance(JobState::Succeeded(path));
            }
            JobEvent::Finished(Err(failure)) => {
                self.progress = 0.0;
                self.active = None;
                self.notice = Some(Notice::Error(failure.to_string()));
                self.advance(JobState::Failed(failure));
            }
        }
    }

    fn advance(&mut self, next: JobState) {
        if self.state.can_advance_to(&next) {
            self.state = next;
        } else {
            warn!("Ignoring job transition {:?} -> {:?}", self.state, next);
        }
    }

    fn show_translated(&mut self, path: &Path) {
        let shown = self.translated.open(path).and_then(|pages| {
            if pages > 0 {
                self.translated.show(1).map(|_| ())
            } else {
                Ok(())
            }
        });

        if let Err(e) = shown {
            self.notice = Some(Notice::Error(format!(
                "Translated PDF saved as {}, but it could not be previewed: {e}",
                path.display()
            )));
        }
    }

    /// Copy the last translated PDF to a user-chosen location.
    pub fn save_translated(&self, destination: impl AsRef<Path>) -> Result<u64> {
        if !self.has_output {
            return Err(Error::NoTranslatedOutput);
        }
        let destination = destination.as_ref();
        let bytes = copy_output(&self.output_path, destination)?;
        info!("Saved translated PDF to {}", destination.display());
        Ok(bytes)
    }

    pub const fn progress(&self) -> f32 {
        self.progress
    }

    pub const fn state(&self) -> &JobState {
        &self.state
    }

    pub const fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub const fn active_job(&self) -> Option<JobId> {
        self.active
    }

    /// Whether the translate control is enabled
    pub const fn can_translate(&self) -> bool {
        self.active.is_none()
    }

    /// Whether the save control is enabled
    pub const fn can_save(&self) -> bool {
        self.has_output && self.active.is_none()
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub const fn source_lang(&self) -> &Lang {
        &self.source_lang
    }

    pub const fn target_lang(&self) -> &Lang {
        &self.target_lang
    }

    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub const fn original(&self) -> &PagedPreviewCache {
        &self.original
    }

    pub const fn original_mut(&mut self) -> &mut PagedPreviewCache {
        &mut self.original
    }

    pub const fn translated(&self) -> &PagedPreviewCache {
        &self.translated
    }

    pub const fn translated_mut(&mut self) -> &mut PagedPreviewCache {
        &mut self.translated
    }
}
