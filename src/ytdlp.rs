//! [`Extractor`] backed by the yt-dlp command-line program.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
};

use rust_embed::RustEmbed;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    runtime::Handle,
};
use tracing::{debug, info, trace, warn};

use crate::config::AppConfig;
use crate::error::ExtractorError;
use crate::extractor::{Extractor, ProgressCallback};
use crate::model::{DownloadRequest, SearchEntry, VideoMetadata, VideoReference};
use crate::progress::{PROGRESS_TEMPLATE, parse_progress_from_line};

/// Optional bundled yt-dlp binary
#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

const BINARY_NAME: &str = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };

pub struct YtDlp {
    program: PathBuf,
    format: String,
    socket_timeout_secs: Option<u32>,
    runtime: Handle,
}

impl YtDlp {
    /// `runtime` drives the child processes; calls block on it, so they must
    /// not be made from inside an async task.
    pub fn new(config: &AppConfig, runtime: Handle) -> Self {
        let program = resolve_program(config.ytdlp_path.as_deref());
        info!(program = %program.display(), "using yt-dlp");
        Self {
            program,
            format: config.format.clone(),
            socket_timeout_secs: config.socket_timeout_secs,
            runtime,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(secs) = self.socket_timeout_secs {
            cmd.arg("--socket-timeout").arg(secs.to_string());
        }
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, err: std::io::Error) -> ExtractorError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ExtractorError::ToolUnavailable(format!("{} not found", self.program.display()))
        } else {
            ExtractorError::Io(err)
        }
    }

    /// Runs yt-dlp to completion and returns its stdout.
    async fn run(&self, args: &[String]) -> Result<String, ExtractorError> {
        debug!(?args, "running yt-dlp");
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::Failed(failure_message(&stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_download(
        &self,
        request: &DownloadRequest,
        mut on_progress: ProgressCallback,
    ) -> Result<(), ExtractorError> {
        let args = download_args(request);
        info!(url = %request.reference, dir = %request.directory.display(), "starting yt-dlp download");
        let mut child = self
            .command()
            .args(&args)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExtractorError::ToolUnavailable("no output pipes".to_string()));
        };
        // split on raw bytes: yt-dlp may write titles in the locale encoding
        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let (mut out_done, mut err_done) = (false, false);
        let mut diagnostics = Vec::new();

        // yt-dlp may print progress on either stream
        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_segment(), if !out_done => match line?.map(decode_line) {
                    Some(line) => {
                        trace!("yt-dlp> {}", line);
                        if let Some(hook) = parse_progress_from_line(&line) {
                            on_progress(hook);
                        }
                    }
                    None => out_done = true,
                },
                line = err_lines.next_segment(), if !err_done => match line?.map(decode_line) {
                    Some(line) => match parse_progress_from_line(&line) {
                        Some(hook) => on_progress(hook),
                        None => {
                            debug!("yt-dlp stderr> {}", line);
                            diagnostics.push(line);
                        }
                    },
                    None => err_done = true,
                },
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(ExtractorError::Failed(failure_message(&diagnostics.join("\n"))))
        }
    }
}

impl Extractor for YtDlp {
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        let args = metadata_args(url);
        let stdout = self.runtime.block_on(self.run(&args))?;
        parse_metadata_output(&stdout)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>, ExtractorError> {
        let args = search_args(query, limit);
        let stdout = self.runtime.block_on(self.run(&args))?;
        Ok(parse_search_output(&stdout, limit))
    }

    fn download(
        &self,
        request: &DownloadRequest,
        on_progress: ProgressCallback,
    ) -> Result<(), ExtractorError> {
        self.runtime.block_on(self.run_download(request, on_progress))
    }
}

/// Fields we read from yt-dlp's `--dump-json` objects
#[derive(Debug, Default, Deserialize)]
struct RawVideo {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    upload_date: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
}

impl RawVideo {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            title: self.title.clone(),
            uploader: self.uploader.clone().or_else(|| self.channel.clone()),
            upload_date: self
                .upload_date
                .as_deref()
                .and_then(VideoMetadata::parse_upload_date),
            thumbnail: self.thumbnail.clone(),
        }
    }

    fn reference(&self) -> Option<VideoReference> {
        self.webpage_url
            .clone()
            .or_else(|| self.url.clone())
            .or_else(|| {
                self.id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })
            .map(VideoReference::new)
    }
}

fn metadata_args(url: &str) -> Vec<String> {
    [
        "--dump-single-json",
        "--flat-playlist",
        "--no-playlist",
        "--no-warnings",
        "--",
        url,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn search_args(query: &str, limit: usize) -> Vec<String> {
    vec![
        "--dump-json".to_string(),
        "--no-warnings".to_string(),
        "--".to_string(),
        format!("ytsearch{}:{}", limit, query),
    ]
}

fn download_args(request: &DownloadRequest) -> Vec<String> {
    vec![
        "--no-playlist".to_string(),
        "-f".to_string(),
        request.format.clone(),
        "--newline".to_string(),
        "--windows-filenames".to_string(),
        "--progress-template".to_string(),
        PROGRESS_TEMPLATE.to_string(),
        "-o".to_string(),
        request.output_template(),
        "--".to_string(),
        request.reference.as_str().to_string(),
    ]
}

/// Reads the first JSON object; older yt-dlp builds may print one per entry.
fn parse_metadata_output(stdout: &str) -> Result<VideoMetadata, ExtractorError> {
    let first = stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let raw: RawVideo = serde_json::from_str(first)?;
    Ok(raw.metadata())
}

fn decode_line(bytes: Vec<u8>) -> String {
    let line = String::from_utf8_lossy(&bytes);
    line.trim_end_matches('\r').to_string()
}

/// One JSON object per line; lines that are blank, undecodable or lack a
/// playable reference are skipped.
fn parse_search_output(stdout: &str, limit: usize) -> Vec<SearchEntry> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<RawVideo>(line) {
            Ok(raw) => Some(raw),
            Err(err) => {
                debug!(%err, "skipping undecodable search line");
                None
            }
        })
        .filter_map(|raw| {
            let reference = raw.reference()?;
            Some(SearchEntry {
                metadata: raw.metadata(),
                reference,
            })
        })
        .take(limit)
        .collect()
}

/// Picks the most useful line of yt-dlp's diagnostics
fn failure_message(stderr: &str) -> String {
    if let Some(line) = stderr
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
    {
        return line.trim().to_string();
    }
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "yt-dlp exited with an error".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Configured path, then the embedded binary, then whatever is on PATH.
fn resolve_program(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    unpack_embedded().unwrap_or_else(|| PathBuf::from(BINARY_NAME))
}

fn unpack_embedded() -> Option<PathBuf> {
    let data = Asset::get(BINARY_NAME)?;
    let target = std::env::temp_dir().join(format!("tubegrab-{}", BINARY_NAME));
    if !target.exists() {
        if let Err(err) = write_executable(&target, &data.data) {
            warn!(%err, path = %target.display(), "cannot unpack bundled yt-dlp");
            return None;
        }
    }
    Some(target)
}

fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
