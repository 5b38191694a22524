use std::path::{Path, PathBuf};

use color_eyre::{eyre::OptionExt, Result};
use futures::StreamExt;
use once_cell::sync::Lazy;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Url};
use scraper::{ElementRef, Html, Selector};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info, instrument, warn, Level};

use crate::paths::safe_path;

static SELECTOR_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.learndash_content_wrap").unwrap());

static SELECTOR_PLACEHOLDER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".ld-alert, .learndash-login-form").unwrap());

static SELECTOR_LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// What is kept of a lesson page.
#[derive(Debug)]
struct LessonContent {
    markdown: String,
    pdf_urls: Vec<Url>,
}

/// Mirror a lesson page as `<file_path>.md`, and its linked PDFs next to it.
///
/// Pages without lesson content are skipped, so are PDFs that fail to download.
/// The token is only sent if given.
#[instrument(level = Level::DEBUG, skip(client, token))]
pub(crate) async fn download_resource_lesson(
    client: &Client,
    lesson_url: &Url,
    file_path: &Path,
    token: Option<&str>,
) -> Result<()> {
    let response = authorize(client.get(lesson_url.clone()), token)
        .send()
        .await?;
    debug!(status = %response.status(), "Fetched lesson page");
    let page = response.text().await?;

    let Some(content) = extract_lesson(&page, lesson_url) else {
        info!(%lesson_url, "No lesson content found, skipping");
        return Ok(());
    };

    info!("Writing resource file '{}'...", file_path.display());

    let output_dir = file_path
        .parent()
        .ok_or_eyre("resource file path has no parent directory")?;
    tokio::fs::create_dir_all(output_dir).await?;
    tokio::fs::write(with_suffix(file_path, "md"), content.markdown).await?;

    for pdf_url in content.pdf_urls {
        if let Err(report) = download_file(client, pdf_url.clone(), output_dir, token).await {
            warn!(%pdf_url, ?report, "Skipping PDF");
        }
    }

    Ok(())
}

/// Pick the lesson body out of a page, as markdown plus the PDFs it links to.
fn extract_lesson(page: &str, page_url: &Url) -> Option<LessonContent> {
    let document = Html::parse_document(page);
    let container = document.select(&SELECTOR_CONTENT).next()?;

    if !is_normal_content(container) {
        debug!("Lesson content container holds no lesson");
        return None;
    }

    let mut pdf_urls: Vec<Url> = Vec::new();
    for href in container
        .select(&SELECTOR_LINKS)
        .filter_map(|link| link.value().attr("href"))
    {
        let Ok(url) = page_url.join(href.trim()) else {
            debug!(href, "Skipping unparsable link");
            continue;
        };

        if is_pdf(&url) && !pdf_urls.contains(&url) {
            pdf_urls.push(url);
        }
    }

    Some(LessonContent {
        markdown: html2md::parse_html(&container.html()),
        pdf_urls,
    })
}

fn is_pdf(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}

/// Tell a lesson body from an empty or locked placeholder page.
fn is_normal_content(container: ElementRef<'_>) -> bool {
    let has_text = container.text().any(|text| !text.trim().is_empty());
    let is_placeholder = container.select(&SELECTOR_PLACEHOLDER).next().is_some();

    has_text && !is_placeholder
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header(AUTHORIZATION, format!("bearer {token}")),
        None => request,
    }
}

/// `path` plus `.suffix`, keeping any dots already in the file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut path = path.as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    path.into()
}

/// Stream a file to disk.
#[instrument(level = Level::DEBUG, skip(client, token))]
async fn download_file(
    client: &Client,
    download_url: Url,
    output_path: &Path,
    token: Option<&str>,
) -> Result<()> {
    let file_name = download_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_owned())
        })
        .ok_or_eyre("download URL has no file name")?;
    let file_path = output_path.join(safe_path(file_name));

    info!(
        "Downloading file '{}' to '{}'...",
        download_url,
        file_path.display()
    );

    let response = authorize(client.get(download_url.clone()), token)
        .send()
        .await?
        .error_for_status()?;

    let mut file = File::create(&file_path).await?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;

    info!(
        "Finished downloading '{}' to '{}'.",
        download_url,
        file_path.display()
    );

    Ok(())
}
