//! Download Worker: runs one extractor download off the UI thread and
//! reports back over a channel.

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info};

use crate::error::InputError;
use crate::extractor::{Extractor, ProgressCallback};
use crate::model::{DownloadRequest, ProgressHook};

/// Messages from a download worker to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A progress callback, forwarded as-is
    Hook(ProgressHook),
    /// The tool exited successfully. Always the last event.
    Completed,
    /// The tool failed. Always the last event.
    Failed(String),
}

/// Validates the request and starts the download on a blocking worker thread.
///
/// Missing input is reported before anything is spawned.
pub fn spawn_download(
    runtime: &Handle,
    extractor: Arc<dyn Extractor>,
    url: &str,
    directory: Option<&Path>,
    format: &str,
) -> Result<UnboundedReceiver<WorkerEvent>, InputError> {
    let request = DownloadRequest::new(url, directory, format)?;
    let (tx, rx) = unbounded_channel();
    runtime.spawn_blocking(move || run_download(extractor.as_ref(), request, tx));
    Ok(rx)
}

/// Body of the worker thread. Every extractor error is caught here.
pub fn run_download(
    extractor: &dyn Extractor,
    request: DownloadRequest,
    events: UnboundedSender<WorkerEvent>,
) {
    info!(url = %request.reference, "download started");
    let hooks = events.clone();
    let on_progress: ProgressCallback = Box::new(move |hook| {
        // receiver gone means the window closed; nothing left to update
        let _ = hooks.send(WorkerEvent::Hook(hook));
    });

    let terminal = match extractor.download(&request, on_progress) {
        Ok(()) => {
            info!(url = %request.reference, "download completed");
            WorkerEvent::Completed
        }
        Err(err) => {
            error!(%err, url = %request.reference, "download failed");
            WorkerEvent::Failed(err.to_string())
        }
    };
    let _ = events.send(terminal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;
    use crate::extractor::MockExtractor;
    use std::path::PathBuf;

    fn drain(mut rx: UnboundedReceiver<WorkerEvent>) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.blocking_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn missing_folder_is_rejected_before_spawning() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut mock = MockExtractor::new();
        mock.expect_download().never();

        let result = spawn_download(rt.handle(), Arc::new(mock), "https://youtu.be/a", None, "mp4");
        assert_eq!(result.err(), Some(InputError::MissingDownloadInput));
    }

    #[test]
    fn missing_url_is_rejected_before_spawning() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut mock = MockExtractor::new();
        mock.expect_download().never();

        let dir = PathBuf::from("/tmp");
        let result = spawn_download(rt.handle(), Arc::new(mock), "  ", Some(dir.as_path()), "mp4");
        assert_eq!(result.err(), Some(InputError::MissingDownloadInput));
    }

    #[test]
    fn hooks_are_forwarded_then_completion() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut mock = MockExtractor::new();
        mock.expect_download()
            .withf(|req, _| req.reference.as_str() == "https://youtu.be/a" && req.format == "mp4")
            .times(1)
            .returning(|_, mut on_progress| {
                on_progress(ProgressHook::downloading("  5.0%"));
                on_progress(ProgressHook::downloading("61.2%"));
                on_progress(ProgressHook::finished());
                Ok(())
            });

        let dir = PathBuf::from("/tmp/out");
        let rx = spawn_download(rt.handle(), Arc::new(mock), "https://youtu.be/a", Some(dir.as_path()), "mp4")
            .unwrap();

        assert_eq!(
            drain(rx),
            vec![
                WorkerEvent::Hook(ProgressHook::downloading("  5.0%")),
                WorkerEvent::Hook(ProgressHook::downloading("61.2%")),
                WorkerEvent::Hook(ProgressHook::finished()),
                WorkerEvent::Completed,
            ]
        );
    }

    #[test]
    fn extractor_error_is_caught_and_reported() {
        let mut mock = MockExtractor::new();
        mock.expect_download().times(1).returning(|_, mut on_progress| {
            on_progress(ProgressHook::downloading("12.0%"));
            Err(ExtractorError::Failed("ERROR: HTTP Error 403".into()))
        });

        let (tx, rx) = unbounded_channel();
        let request = DownloadRequest::new("https://youtu.be/a", Some(Path::new("/tmp")), "mp4")
            .unwrap();
        run_download(&mock, request, tx);

        assert_eq!(
            drain(rx),
            vec![
                WorkerEvent::Hook(ProgressHook::downloading("12.0%")),
                WorkerEvent::Failed("ERROR: HTTP Error 403".into()),
            ]
        );
    }
}
