use std::{collections::HashMap, path::Path};

use color_eyre::Result;
use reqwest::{Client, Url};
use tracing::{debug, error, info, instrument, Level};

use crate::{
    api::Api,
    args::Quality,
    course::{CourseTarget, LessonKind},
    error::Error,
    paths::plan_path,
    resource, video,
    video::YtDlp,
};

/// Where lessons end up once the dispatcher has decided what they are.
pub(crate) trait LessonDownloader {
    async fn download_video(&self, video_url: &str, file_path: &Path) -> Result<()>;

    async fn download_resource(&self, lesson_url: &Url, file_path: &Path) -> Result<()>;
}

/// Videos through `yt-dlp`, resource pages through the HTTP client.
pub(crate) struct Downloader {
    pub client: Client,
    pub yt_dlp: YtDlp,
    pub token: String,
    pub quality: Quality,
    /// Also send the token with resource page and PDF requests.
    pub authenticate_resources: bool,
}

impl LessonDownloader for Downloader {
    async fn download_video(&self, video_url: &str, file_path: &Path) -> Result<()> {
        video::download_video_lesson(&self.yt_dlp, video_url, file_path, &self.token, self.quality)
            .await
    }

    async fn download_resource(&self, lesson_url: &Url, file_path: &Path) -> Result<()> {
        let token = self
            .authenticate_resources
            .then_some(self.token.as_str());

        resource::download_resource_lesson(&self.client, lesson_url, file_path, token).await
    }
}

/// Counts how often each canonical video URL was picked during one run.
///
/// An expired token does not fail requests: the server answers every lesson
/// with the same fallback video instead. Seeing one video too often is the
/// only hint of that.
#[derive(Debug)]
pub(crate) struct DuplicateCounter {
    max: usize,
    counts: HashMap<String, usize>,
}

impl DuplicateCounter {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            counts: HashMap::new(),
        }
    }

    /// Record a selection of `video_url`, failing once it was selected more than `max` times.
    pub fn select(&mut self, video_url: &str) -> Result<usize, Error> {
        let count = self.counts.entry(video_url.to_owned()).or_default();
        *count += 1;

        if *count > self.max {
            return Err(Error::DuplicateVideo {
                url: video_url.to_owned(),
                count: *count,
                max: self.max,
            });
        }

        Ok(*count)
    }
}

/// Mirror every lesson of a course, one after the other.
///
/// Lessons whose video cannot be determined are logged and skipped. The run
/// stops with [`Error::DuplicateVideo`] when one video is handed out for more
/// than `max_duplicate_count` lessons.
#[instrument(level = Level::DEBUG, skip(api, token, downloader))]
pub(crate) async fn download_course<D: LessonDownloader>(
    api: &Api,
    target: CourseTarget,
    token: &str,
    downloader: &D,
    output_dir: &Path,
    max_duplicate_count: usize,
) -> Result<()> {
    let detail = target.resolve(api).await?;
    let course = &detail.course;

    info!(title = course.title, url = %course.url, "Downloading course");

    let mut duplicates = DuplicateCounter::new(max_duplicate_count);

    for (module_index, module) in (1..).zip(&detail.modules) {
        for (lesson_index, lesson) in (1..).zip(&module.lessons) {
            let file_path = plan_path(
                output_dir,
                &course.title,
                module_index,
                &module.title,
                lesson_index,
                &lesson.title,
            );

            match lesson.kind {
                LessonKind::Video => {
                    // Video URLs are only handed out to authenticated requests.
                    let authenticated = api.authenticated_course(&course.id, token).await?;

                    let Some(lesson_data) = authenticated.lesson(&lesson.id) else {
                        error!(
                            lesson_id = lesson.id,
                            course_id = course.id,
                            "Lesson not found in course"
                        );
                        continue;
                    };

                    let Some(video_url) = lesson_data
                        .video_url
                        .as_deref()
                        .and_then(video::canonical_video_url)
                    else {
                        error!(
                            lesson_id = lesson.id,
                            lesson_title = lesson.title,
                            "No video URL found for lesson"
                        );
                        continue;
                    };

                    let count = duplicates.select(&video_url)?;
                    debug!(video_url, count, "Selected video");

                    downloader.download_video(&video_url, &file_path).await?;
                }
                LessonKind::Resource => {
                    let lesson_url = api.lesson_url(&course.slug, &module.id, &lesson.id)?;
                    downloader
                        .download_resource(&lesson_url, &file_path)
                        .await?;
                }
            }
        }
    }

    info!(title = course.title, "Finished downloading course");

    Ok(())
}
