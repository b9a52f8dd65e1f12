//! View State: everything the window renders, and the handlers that change it.
//!
//! Owned by the UI thread. Download workers only talk to it through
//! [`WorkerEvent`]s drained by [`ViewState::poll_download`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{info, warn};

use crate::downloader::{WorkerEvent, spawn_download};
use crate::error::InputError;
use crate::extractor::Extractor;
use crate::metadata::resolve_metadata;
use crate::model::{DownloadStatus, Mode, ProgressState, SearchResults};
use crate::search::resolve_search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
    Info,
}

/// A message for a blocking dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: &'static str,
    pub message: String,
}

impl Notice {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: "Error",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error",
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: "Done",
            message: message.into(),
        }
    }
}

pub struct ViewState {
    pub mode: Mode,
    /// URL or search topic, depending on `mode`
    pub input: String,
    pub info_text: String,
    pub progress: ProgressState,
    destination: Option<PathBuf>,
    results: SearchResults,
    format: String,
    /// Thumbnail the presentation layer should fetch next
    pending_thumbnail: Option<String>,
    /// Folder of the active or last finished download
    download_dir: Option<PathBuf>,
    download_events: Option<UnboundedReceiver<WorkerEvent>>,
    notices: Vec<Notice>,
}

impl ViewState {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            mode: Mode::Url,
            input: String::new(),
            info_text: "Video info".to_string(),
            progress: ProgressState::default(),
            destination: None,
            results: SearchResults::default(),
            format: format.into(),
            pending_thumbnail: None,
            download_dir: None,
            download_events: None,
            notices: Vec::new(),
        }
    }

    /// Switches input interpretation. Leaving search mode drops the results.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == Mode::Search && mode == Mode::Url {
            self.results.clear();
        }
        self.mode = mode;
    }

    pub fn input_label(&self) -> &'static str {
        match self.mode {
            Mode::Url => "YouTube video URL:",
            Mode::Search => "Enter search topic:",
        }
    }

    pub fn search_lines(&self) -> Vec<String> {
        self.results.display_lines()
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn destination_label(&self) -> String {
        match &self.destination {
            Some(path) => path.display().to_string(),
            None => "Path not selected".to_string(),
        }
    }

    /// Chosen folder from the directory dialog; `None` means it was cancelled.
    pub fn choose_destination(&mut self, folder: Option<PathBuf>) {
        if let Some(folder) = folder {
            info!(folder = %folder.display(), "destination selected");
            self.destination = Some(folder);
        }
    }

    /// Resolves the current input as a URL and shows its metadata.
    pub fn show_info(&mut self, extractor: &dyn Extractor) {
        let outcome = resolve_metadata(extractor, &self.input);
        self.info_text = outcome.info_text();
        self.pending_thumbnail = outcome
            .metadata()
            .and_then(|meta| meta.thumbnail.clone());
    }

    /// Searches for the current input and replaces the result list.
    pub fn run_search(&mut self, extractor: &dyn Extractor) {
        let outcome = resolve_search(extractor, &self.input);
        self.info_text = outcome.info_text();
        self.pending_thumbnail = None;
        self.results = outcome.into_results();
    }

    /// Puts result `index` into the input field and shows it as a pasted URL.
    pub fn select_result(
        &mut self,
        extractor: &dyn Extractor,
        index: usize,
    ) -> Result<(), InputError> {
        let reference = self
            .results
            .get(index)
            .map(|entry| entry.reference.clone())
            .ok_or(InputError::NoSuchResult(index + 1))?;
        self.input = reference.as_str().to_string();
        self.set_mode(Mode::Url);
        self.show_info(extractor);
        Ok(())
    }

    pub fn take_thumbnail_request(&mut self) -> Option<String> {
        self.pending_thumbnail.take()
    }

    pub fn is_downloading(&self) -> bool {
        self.download_events.is_some()
    }

    /// Folder to offer in "Open folder" once a download has finished
    pub fn finished_folder(&self) -> Option<&Path> {
        match self.progress.status {
            DownloadStatus::Finished => self.download_dir.as_deref(),
            _ => None,
        }
    }

    /// Starts a download of the current input into the chosen folder.
    ///
    /// Refused with a warning while another download runs or when the URL or
    /// folder is missing; nothing is spawned in those cases.
    pub fn start_download(&mut self, runtime: &Handle, extractor: Arc<dyn Extractor>) {
        if self.is_downloading() {
            self.notices
                .push(Notice::warning(InputError::DownloadInProgress.to_string()));
            return;
        }
        let url = self.input.trim().to_string();
        match spawn_download(
            runtime,
            extractor,
            &url,
            self.destination.as_deref(),
            &self.format,
        ) {
            Ok(events) => {
                self.download_dir = self.destination.clone();
                self.track_download(events);
            }
            Err(err) => {
                warn!(%err, "download not started");
                self.notices.push(Notice::warning(err.to_string()));
            }
        }
    }

    fn track_download(&mut self, events: UnboundedReceiver<WorkerEvent>) {
        self.progress.start();
        self.download_events = Some(events);
    }

    /// Applies every event the worker has sent since the last frame.
    pub fn poll_download(&mut self) {
        let Some(mut events) = self.download_events.take() else {
            return;
        };
        let mut done = false;
        loop {
            match events.try_recv() {
                Ok(WorkerEvent::Hook(hook)) => {
                    if self.progress.apply(&hook) {
                        let message = self.completion_message();
                        self.notices.push(Notice::info(message));
                    }
                }
                Ok(WorkerEvent::Completed) => {
                    if self.progress.status != DownloadStatus::Finished {
                        // tool exited cleanly without a final callback
                        self.progress.finish();
                        let message = self.completion_message();
                        self.notices.push(Notice::info(message));
                    }
                    done = true;
                    break;
                }
                Ok(WorkerEvent::Failed(reason)) => {
                    self.fail_download(&reason);
                    done = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail_download("download worker stopped unexpectedly");
                    done = true;
                    break;
                }
            }
        }
        if !done {
            self.download_events = Some(events);
        }
    }

    fn fail_download(&mut self, reason: &str) {
        if self.progress.status == DownloadStatus::Finished {
            // the file is already on disk; a late exit error is only logged
            warn!(reason, "download finished but yt-dlp reported an error");
            return;
        }
        self.progress.fail();
        self.notices.push(Notice::error(format!(
            "Failed to download video:\n{}",
            reason
        )));
    }

    fn completion_message(&self) -> String {
        let dir = self
            .download_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        format!("Video downloaded to:\n{}", dir)
    }

    /// Dialogs to show, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;
    use crate::extractor::MockExtractor;
    use crate::model::{ProgressHook, SearchEntry, VideoMetadata, VideoReference};
    use tokio::sync::mpsc::unbounded_channel;

    fn lofi_entries() -> Vec<SearchEntry> {
        ["Lofi Girl", "Chillhop", "College Music"]
            .iter()
            .enumerate()
            .map(|(i, title)| SearchEntry {
                metadata: VideoMetadata {
                    title: Some(format!("{title} radio")),
                    uploader: Some(title.to_string()),
                    upload_date: VideoMetadata::parse_upload_date(&format!("2022010{}", i + 1)),
                    thumbnail: None,
                },
                reference: VideoReference::new(format!("https://www.youtube.com/watch?v=lofi{i}")),
            })
            .collect()
    }

    #[test]
    fn search_then_select_converges_on_url_mode() {
        let mut mock = MockExtractor::new();
        mock.expect_search()
            .times(1)
            .returning(|_, _| Ok(lofi_entries()));
        mock.expect_fetch_metadata()
            .withf(|url| url == "https://www.youtube.com/watch?v=lofi1")
            .times(1)
            .returning(|_| {
                Ok(VideoMetadata {
                    title: Some("Chillhop radio".into()),
                    uploader: Some("Chillhop".into()),
                    upload_date: VideoMetadata::parse_upload_date("20220102"),
                    thumbnail: Some("https://i.ytimg.com/vi/lofi1/hqdefault.jpg".into()),
                })
            });

        let mut view = ViewState::new("mp4");
        view.set_mode(Mode::Search);
        assert_eq!(view.input_label(), "Enter search topic:");
        view.input = "lofi".into();
        view.run_search(&mock);

        assert_eq!(
            view.search_lines(),
            vec![
                "1. Lofi Girl radio | Lofi Girl | 01.01.2022",
                "2. Chillhop radio | Chillhop | 02.01.2022",
                "3. College Music radio | College Music | 03.01.2022",
            ]
        );
        assert_eq!(view.info_text, "Select a video from the list.");

        view.select_result(&mock, 1).unwrap();
        assert_eq!(view.input, "https://www.youtube.com/watch?v=lofi1");
        assert_eq!(view.mode, Mode::Url);
        assert!(view.search_lines().is_empty());
        assert_eq!(
            view.info_text,
            "Title: Chillhop radio\nUploader: Chillhop\nDate: 02.01.2022"
        );
        assert_eq!(
            view.take_thumbnail_request().as_deref(),
            Some("https://i.ytimg.com/vi/lofi1/hqdefault.jpg")
        );
    }

    #[test]
    fn leaving_search_mode_discards_results() {
        let mut mock = MockExtractor::new();
        mock.expect_search().returning(|_, _| Ok(lofi_entries()));

        let mut view = ViewState::new("mp4");
        view.set_mode(Mode::Search);
        view.input = "lofi".into();
        view.run_search(&mock);
        assert_eq!(view.search_lines().len(), 3);

        view.set_mode(Mode::Search);
        assert_eq!(view.search_lines().len(), 3);
        view.set_mode(Mode::Url);
        assert!(view.search_lines().is_empty());
        assert_eq!(view.input_label(), "YouTube video URL:");
    }

    #[test]
    fn failed_search_clears_previous_results() {
        let mut mock = MockExtractor::new();
        let mut calls = 0;
        mock.expect_search().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(lofi_entries())
            } else {
                Err(ExtractorError::Failed("ERROR: offline".into()))
            }
        });

        let mut view = ViewState::new("mp4");
        view.set_mode(Mode::Search);
        view.input = "lofi".into();
        view.run_search(&mock);
        view.run_search(&mock);

        assert!(view.search_lines().is_empty());
        assert_eq!(view.info_text, "Search error: ERROR: offline");
    }

    #[test]
    fn selecting_missing_result_is_an_error() {
        let mut mock = MockExtractor::new();
        mock.expect_fetch_metadata().never();

        let mut view = ViewState::new("mp4");
        assert_eq!(view.select_result(&mock, 0), Err(InputError::NoSuchResult(1)));
    }

    #[test]
    fn download_without_folder_warns_and_spawns_nothing() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut mock = MockExtractor::new();
        mock.expect_download().never();

        let mut view = ViewState::new("mp4");
        view.input = "https://youtu.be/abc".into();
        view.start_download(rt.handle(), Arc::new(mock));

        assert!(!view.is_downloading());
        assert_eq!(view.progress.status, DownloadStatus::Idle);
        assert_eq!(
            view.take_notices(),
            vec![Notice::warning("Please enter a URL and select a folder.")]
        );
    }

    #[test]
    fn cancelled_folder_dialog_keeps_previous_choice() {
        let mut view = ViewState::new("mp4");
        assert_eq!(view.destination_label(), "Path not selected");
        view.choose_destination(Some(PathBuf::from("/videos")));
        view.choose_destination(None);
        assert_eq!(view.destination(), Some(Path::new("/videos")));
    }

    #[test]
    fn second_trigger_while_running_is_refused() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut mock = MockExtractor::new();
        mock.expect_download().never();

        let mut view = ViewState::new("mp4");
        let (_tx, rx) = unbounded_channel();
        view.track_download(rx);
        view.input = "https://youtu.be/abc".into();
        view.choose_destination(Some(PathBuf::from("/videos")));
        view.start_download(rt.handle(), Arc::new(mock));

        assert!(view.is_downloading());
        assert_eq!(
            view.take_notices(),
            vec![Notice::warning("A download is already running.")]
        );
    }

    #[test]
    fn worker_events_drive_progress_to_completion() {
        let mut view = ViewState::new("mp4");
        view.download_dir = Some(PathBuf::from("/videos"));
        let (tx, rx) = unbounded_channel();
        view.track_download(rx);

        tx.send(WorkerEvent::Hook(ProgressHook::downloading("10.0%"))).unwrap();
        tx.send(WorkerEvent::Hook(ProgressHook::downloading("garbage"))).unwrap();
        view.poll_download();
        assert_eq!(view.progress.percent, 10.0);
        assert_eq!(view.progress.label(), "Progress: 10.0%");
        assert!(view.is_downloading());

        tx.send(WorkerEvent::Hook(ProgressHook::downloading("64.0%"))).unwrap();
        tx.send(WorkerEvent::Hook(ProgressHook::finished())).unwrap();
        tx.send(WorkerEvent::Completed).unwrap();
        view.poll_download();

        assert_eq!(view.progress.percent, 100.0);
        assert!(!view.is_downloading());
        assert_eq!(view.finished_folder(), Some(Path::new("/videos")));
        let expected = format!("Video downloaded to:\n{}", Path::new("/videos").display());
        assert_eq!(view.take_notices(), vec![Notice::info(expected)]);
    }

    #[test]
    fn clean_exit_without_finished_hook_counts_as_finished() {
        let mut view = ViewState::new("mp4");
        let (tx, rx) = unbounded_channel();
        view.track_download(rx);
        tx.send(WorkerEvent::Completed).unwrap();
        view.poll_download();

        assert_eq!(view.progress.status, DownloadStatus::Finished);
        assert_eq!(view.progress.percent, 100.0);
        assert_eq!(view.take_notices().len(), 1);
    }

    #[test]
    fn failure_event_raises_error_notice() {
        let mut view = ViewState::new("mp4");
        let (tx, rx) = unbounded_channel();
        view.track_download(rx);
        tx.send(WorkerEvent::Hook(ProgressHook::downloading("30.0%"))).unwrap();
        tx.send(WorkerEvent::Failed("ERROR: Requested format is not available".into()))
            .unwrap();
        view.poll_download();

        assert_eq!(view.progress.status, DownloadStatus::Failed);
        assert_eq!(view.progress.label(), "Download failed");
        assert!(!view.is_downloading());
        assert_eq!(
            view.take_notices(),
            vec![Notice::error(
                "Failed to download video:\nERROR: Requested format is not available"
            )]
        );
    }

    #[test]
    fn failed_exit_after_finished_hook_only_reports_success() {
        let mut view = ViewState::new("mp4");
        let (tx, rx) = unbounded_channel();
        view.track_download(rx);
        tx.send(WorkerEvent::Hook(ProgressHook::finished())).unwrap();
        tx.send(WorkerEvent::Failed("ERROR: Postprocessing: ffmpeg not found".into()))
            .unwrap();
        view.poll_download();

        assert_eq!(view.progress.status, DownloadStatus::Finished);
        assert!(!view.is_downloading());
        let notices = view.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
    }

    #[test]
    fn vanished_worker_is_a_failure() {
        let mut view = ViewState::new("mp4");
        let (tx, rx) = unbounded_channel();
        view.track_download(rx);
        drop(tx);
        view.poll_download();

        assert_eq!(view.progress.status, DownloadStatus::Failed);
        assert!(!view.is_downloading());
    }
}
