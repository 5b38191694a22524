use std::{
    ffi::OsString,
    fmt::Debug,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use color_eyre::{
    eyre::{OptionExt, WrapErr},
    Report, Result,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn, Level};

use crate::args::Quality;

const VIMEO_PLAYER_URL: &str = "https://player.vimeo.com/video/";

/// Derive the player URL of a lesson's backing video.
///
/// The last path segment of the backing URL is the remote video id. The result
/// is both the download target and the key for duplicate detection.
pub(crate) fn canonical_video_url(backing_url: &str) -> Option<String> {
    let video_id = backing_url
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|video_id| !video_id.is_empty())?;

    Some(format!("{VIMEO_PLAYER_URL}{video_id}"))
}

/// The external download engine.
#[derive(Clone, Debug)]
pub(crate) struct YtDlp {
    pub bin: PathBuf,
    /// Embedded players refuse to play without the embedding site as referer.
    pub referer: String,
}

/// Why the engine gave up on a video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VideoFailure {
    Unsupported,
    AccessDenied,
}

/// Download a lesson video to `<file_path>.<ext>`.
///
/// An unsupported link or a refused download is logged and skipped.
/// Failing to run the engine at all is an error.
#[instrument(level = Level::DEBUG, skip(yt_dlp, token))]
pub(crate) async fn download_video_lesson(
    yt_dlp: &YtDlp,
    video_url: &str,
    file_path: &Path,
    token: &str,
    quality: Quality,
) -> Result<()> {
    info!("Writing video file '{}'...", file_path.display());

    let output_dir = file_path
        .parent()
        .ok_or_eyre("video file path has no parent directory")?;
    tokio::fs::create_dir_all(output_dir).await?;

    debug!(video_url, "Parsing url");

    let (status, errors) = child_read_to_end(
        Command::new(&yt_dlp.bin)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(ytdlp_args(yt_dlp, video_url, file_path, token, quality)?)
            .spawn()
            .wrap_err("yt-dlp command failed to start")?,
    )
    .await?;

    if status.success() {
        info!(video_url, "Finished downloading '{}'.", file_path.display());
        return Ok(());
    }

    match classify_failure(&errors) {
        VideoFailure::Unsupported => error!(
            video_url,
            "Could not download video. Please open the link manually and verify that the video exists!"
        ),
        VideoFailure::AccessDenied => error!(
            video_url,
            %status,
            errors = errors.join("\n"),
            "Access denied while downloading video or audio file"
        ),
    }

    Ok(())
}

fn ytdlp_args(
    yt_dlp: &YtDlp,
    video_url: &str,
    file_path: &Path,
    token: &str,
    quality: Quality,
) -> Result<Vec<OsString>> {
    let output_dir = file_path
        .parent()
        .ok_or_eyre("video file path has no parent directory")?;
    let file_name = file_path
        .file_name()
        .ok_or_eyre("video file path has no file name")?
        .to_string_lossy()
        // `%` starts a field in yt-dlp output templates.
        .replace('%', "%%");
    let height = quality.height();

    Ok(vec![
        "--newline".into(),
        "--no-colors".into(),
        "--format".into(),
        format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]/best").into(),
        "--referer".into(),
        yt_dlp.referer.as_str().into(),
        // Visible in the process list while yt-dlp runs; fine for a single-user machine.
        "--add-header".into(),
        format!("Authorization:bearer {token}").into(),
        "--paths".into(),
        output_dir.as_os_str().to_owned(),
        "--output".into(),
        format!("{file_name}.%(ext)s").into(),
        video_url.into(),
    ])
}

fn classify_failure(errors: &[String]) -> VideoFailure {
    if errors.iter().any(|line| line.contains("Unsupported URL")) {
        VideoFailure::Unsupported
    } else {
        VideoFailure::AccessDenied
    }
}

/// Read a child process's stdout and stderr streams to their end and await its exit.
///
/// Returns the exit status and the stderr lines.
#[instrument(level = Level::DEBUG)]
async fn child_read_to_end(mut child: Child) -> Result<(ExitStatus, Vec<String>)> {
    let consume_stdout = child
        .stdout
        .take()
        .map(|stdout| consume_stream(stdout, |line| debug!(line)));

    let consume_stderr = child.stderr.take().map(collect_stream);

    let await_exit = async {
        child
            .wait()
            .await
            .wrap_err("yt-dlp command failed to run")
    };

    let (status, (), errors) = tokio::try_join!(
        await_exit,
        maybe_join(consume_stdout),
        maybe_join(consume_stderr),
    )
    .wrap_err("Could not join child consumers for stdout, stderr and awaiting child exit.")?;

    Ok((status, errors))
}

// Await the `JoinHandle` if the given `Option` is `Some(_)`
#[inline]
async fn maybe_join<T: Default>(maybe_spawned: Option<JoinHandle<Result<T>>>) -> Result<T> {
    if let Some(spawned) = maybe_spawned {
        return spawned.await?;
    }

    Ok(T::default())
}

/// Consume a child process stream, invoking a callback on each line.
#[instrument(level = Level::DEBUG)]
fn consume_stream<A: AsyncRead + Unpin + Send + 'static + Debug>(
    reader: A,
    callback: fn(String),
) -> JoinHandle<Result<()>> {
    let mut lines = BufReader::new(reader).lines();

    tokio::spawn(async move {
        while let Some(line) = lines.next_line().await? {
            callback(line);
        }

        Ok::<(), Report>(())
    })
}

/// Consume a child process stream, logging and keeping each line.
#[instrument(level = Level::DEBUG)]
fn collect_stream<A: AsyncRead + Unpin + Send + 'static + Debug>(
    reader: A,
) -> JoinHandle<Result<Vec<String>>> {
    let mut lines = BufReader::new(reader).lines();

    tokio::spawn(async move {
        let mut collected = Vec::new();
        while let Some(line) = lines.next_line().await? {
            warn!(line);
            collected.push(line);
        }

        Ok::<_, Report>(collected)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yt_dlp(bin: &str) -> YtDlp {
        YtDlp {
            bin: bin.into(),
            referer: "https://learn.kodekloud.com/".to_owned(),
        }
    }

    #[test]
    fn canonical_url_uses_trailing_segment() {
        assert_eq!(
            canonical_video_url("https://vimeo.com/123456/").as_deref(),
            Some("https://player.vimeo.com/video/123456")
        );
        assert_eq!(
            canonical_video_url("https://vimeo.com/channels/k8s/987").as_deref(),
            Some("https://player.vimeo.com/video/987")
        );
        assert_eq!(canonical_video_url(" / "), None);
        assert_eq!(canonical_video_url(""), None);
    }

    #[test]
    fn engine_receives_quality_token_and_output() {
        let args = ytdlp_args(
            &yt_dlp("yt-dlp"),
            "https://player.vimeo.com/video/1",
            Path::new("out/1 - Module/2 - 100% Docker"),
            "secret",
            Quality::P720,
        )
        .unwrap();
        let args = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        let after = |flag: &str| {
            let position = args.iter().position(|arg| arg == flag).unwrap();
            args[position + 1].clone()
        };

        assert_eq!(
            after("--format"),
            "bestvideo[height<=720]+bestaudio/best[height<=720]/best"
        );
        assert_eq!(after("--add-header"), "Authorization:bearer secret");
        assert_eq!(after("--referer"), "https://learn.kodekloud.com/");
        assert_eq!(after("--paths"), "out/1 - Module");
        assert_eq!(after("--output"), "2 - 100%% Docker.%(ext)s");
        assert_eq!(args.last().unwrap(), "https://player.vimeo.com/video/1");
    }

    #[test]
    fn failures_are_classified_from_stderr() {
        assert_eq!(
            classify_failure(&["ERROR: Unsupported URL: https://example.com".to_owned()]),
            VideoFailure::Unsupported
        );
        assert_eq!(
            classify_failure(&["ERROR: [vimeo] 1: HTTP Error 403: Forbidden".to_owned()]),
            VideoFailure::AccessDenied
        );
        assert_eq!(classify_failure(&[]), VideoFailure::AccessDenied);
    }

    #[tokio::test]
    async fn missing_engine_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = download_video_lesson(
            &yt_dlp("/nonexistent/yt-dlp"),
            "https://player.vimeo.com/video/1",
            &dir.path().join("module").join("1 - Intro"),
            "secret",
            Quality::P1080,
        )
        .await;

        assert!(result.is_err());
        assert!(dir.path().join("module").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_failures_are_skipped() {
        let dir = tempfile::tempdir().unwrap();

        download_video_lesson(
            &yt_dlp("false"),
            "https://player.vimeo.com/video/1",
            &dir.path().join("1 - Intro"),
            "secret",
            Quality::P1080,
        )
        .await
        .unwrap();
    }
}
