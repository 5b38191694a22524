use thiserror::Error;

/// Conditions which end a run on purpose.
///
/// These travel inside `color_eyre::Report`s, so callers that care
/// can tell them apart with `Report::downcast_ref`.
#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("course '{slug}' was not found")]
    CourseNotFound { slug: String },

    #[error("'{0}' does not name a course")]
    InvalidCourseUrl(String),

    #[error(
        "the video {url} was handed out {count} times, more than the allowed {max}.\n\
         Your token might have expired or you are not enrolled in the course.\n\
         Please refresh the token or enroll in the course and try again."
    )]
    DuplicateVideo {
        url: String,
        count: usize,
        max: usize,
    },
}
