use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the course API
    #[arg(
        long,
        global = true,
        env = "KODEKLOUD_API_URL",
        default_value = "https://learn-api.kodekloud.com"
    )]
    pub api_url: Url,

    /// Base URL of the learning site (lesson pages, video referer)
    #[arg(
        long,
        global = true,
        env = "KODEKLOUD_SITE_URL",
        default_value = "https://learn.kodekloud.com"
    )]
    pub site_url: Url,

    /// Base URL of the quiz API
    #[arg(
        long,
        global = true,
        env = "KODEKLOUD_QUIZ_API_URL",
        default_value = "https://mcq-backend-main.kodekloud.com"
    )]
    pub quiz_api_url: Url,

    /// User agent (browser signature)
    #[arg(
        short,
        long,
        global = true,
        env = "USER_AGENT",
        default_value = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/112.0"
    )]
    pub user_agent: String,

    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download a course (videos, resource pages and their PDFs)
    #[command(visible_alias = "dl")]
    Course(CourseArgs),

    /// Download all quizzes as markdown
    Quiz(QuizArgs),
}

#[derive(clap::Args)]
pub(crate) struct CourseArgs {
    /// Course URL, e.g. https://learn.kodekloud.com/user/courses/docker-training-course-for-the-absolute-beginner.
    /// Omit to pick courses interactively.
    pub course_url: Option<Url>,

    /// Quality of the videos to be downloaded
    #[arg(long, value_enum, default_value_t = Quality::P1080)]
    pub quality: Quality,

    /// Target-dir
    #[arg(short, long, env = "KODEKLOUD_DIR", default_value = "Downloads")]
    pub output_dir: PathBuf,

    /// Bearer token. Copy from DevTools → Network → any `api/lessons` request → Authorization header.
    #[arg(short, long, env = "KODEKLOUD_TOKEN")]
    pub token: String,

    /// Abort when the same video would be downloaded more than N times
    /// (an expired token makes the server hand out the same fallback video for every lesson)
    #[arg(short, long, env = "MAX_DUPLICATE_COUNT", default_value_t = 3)]
    pub max_duplicate_count: usize,

    /// Path to the `yt-dlp` binary
    #[arg(short, long, env = "YT_DLP_BIN", default_value = "yt-dlp")]
    pub yt_dlp_bin: PathBuf,

    /// Send the bearer token with resource page and PDF requests, too
    #[arg(long, env = "AUTHENTICATE_RESOURCES")]
    pub authenticate_resources: bool,
}

#[derive(clap::Args)]
pub(crate) struct QuizArgs {
    /// Target-dir
    #[arg(short, long, env = "KODEKLOUD_DIR", default_value = "Downloads")]
    pub output_dir: PathBuf,

    /// Write one markdown file per quiz instead of a single combined file
    #[arg(short, long)]
    pub separate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Quality {
    #[value(name = "144p")]
    P144,
    #[value(name = "240p")]
    P240,
    #[value(name = "360p")]
    P360,
    #[value(name = "480p")]
    P480,
    #[value(name = "720p")]
    P720,
    #[value(name = "1080p")]
    P1080,
}

impl Quality {
    pub fn height(self) -> u32 {
        match self {
            Quality::P144 => 144,
            Quality::P240 => 240,
            Quality::P360 => 360,
            Quality::P480 => 480,
            Quality::P720 => 720,
            Quality::P1080 => 1080,
        }
    }
}

/// Strip whitespace and a pasted `Bearer ` prefix from the token.
pub(crate) fn normalize_token(token: &str) -> &str {
    let token = token.trim();

    match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => token[7..].trim_start(),
        _ => token,
    }
}
