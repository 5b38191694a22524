use color_eyre::Result;
use reqwest::Url;
use tracing::{info, instrument, Level};

use crate::{api::Api, error::Error, json, Id};

pub(crate) use crate::json::LessonKind;

/// A course as found in the catalogue, before its modules are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Course {
    pub id: Id,
    pub slug: String,
    pub title: String,
    pub url: Url,
}

#[derive(Clone, Debug)]
pub(crate) struct CourseDetail {
    pub course: Course,
    pub modules: Vec<Module>,
}

#[derive(Clone, Debug)]
pub(crate) struct Module {
    pub id: Id,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Clone, Debug)]
pub(crate) struct Lesson {
    pub id: Id,
    pub title: String,
    pub kind: LessonKind,
}

/// Either end of course resolution. Downloads accept both.
#[derive(Clone, Debug)]
pub(crate) enum CourseTarget {
    Summary(Course),
    Detail(CourseDetail),
}

impl CourseTarget {
    /// Fetch the module tree unless it is already known.
    pub async fn resolve(self, api: &Api) -> Result<CourseDetail> {
        match self {
            CourseTarget::Summary(course) => fetch_course_detail(api, &course.slug).await,
            CourseTarget::Detail(detail) => Ok(detail),
        }
    }
}

impl Course {
    pub fn from_listing(api: &Api, item: json::CoursesListItem) -> Result<Self> {
        Ok(Self {
            url: course_url(api, &item.slug)?,
            id: item.id,
            title: htmlize::unescape(item.title).into_owned(),
            slug: item.slug,
        })
    }
}

/// Resolve a course page URL (its last path segment being the course slug) to the full course.
pub(crate) async fn parse_course_from_url(api: &Api, url: &Url) -> Result<CourseDetail> {
    let slug = course_slug(url)?;
    fetch_course_detail(api, slug).await
}

/// Fetch the module tree of a course. Nothing is cached between calls.
#[instrument(level = Level::DEBUG, skip(api))]
pub(crate) async fn fetch_course_detail(api: &Api, slug: &str) -> Result<CourseDetail> {
    info!(slug, "Fetching course detail");

    let detail = api.course_detail(slug).await?;
    let course = Course {
        url: course_url(api, &detail.slug)?,
        id: detail.id,
        title: htmlize::unescape(detail.title).into_owned(),
        slug: detail.slug,
    };

    let modules = detail
        .modules
        .into_iter()
        .map(|module| Module {
            id: module.id,
            title: htmlize::unescape(module.title).into_owned(),
            lessons: module
                .lessons
                .into_iter()
                .map(|lesson| Lesson {
                    id: lesson.id,
                    title: htmlize::unescape(lesson.title).into_owned(),
                    kind: lesson.kind,
                })
                .collect(),
        })
        .collect();

    Ok(CourseDetail { course, modules })
}

fn course_slug(url: &Url) -> Result<&str> {
    url.path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|slug| !slug.is_empty())
        .ok_or_else(|| Error::InvalidCourseUrl(url.to_string()).into())
}

fn course_url(api: &Api, slug: &str) -> Result<Url> {
    let mut url = api.site_url().clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidCourseUrl(api.site_url().to_string()))?
        .pop_if_empty()
        .extend(["user", "courses", slug]);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::api::tests::api_for;

    #[test]
    fn slug_is_last_path_segment() {
        let url =
            Url::parse("https://learn.kodekloud.com/user/courses/docker-for-beginners//").unwrap();
        assert_eq!(course_slug(&url).unwrap(), "docker-for-beginners");

        let url = Url::parse("https://learn.kodekloud.com/").unwrap();
        let report = course_slug(&url).unwrap_err();
        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::InvalidCourseUrl(_))
        ));
    }

    #[tokio::test]
    async fn course_tree_is_resolved_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/courses/docker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c1",
                "slug": "docker",
                "title": "Docker &amp; Friends",
                "modules": [
                    {"id": "m2", "title": "Intro", "lessons": [
                        {"id": "l9", "title": "Welcome", "type": "video"},
                        {"id": "l3", "title": "Notes", "type": "resource"}
                    ]},
                    {"id": "m1", "title": "Outro", "lessons": []}
                ]
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let url = Url::parse(&format!("{}/user/courses/docker/", server.uri())).unwrap();
        let detail = parse_course_from_url(&api, &url).await.unwrap();

        assert_eq!(detail.course.title, "Docker & Friends");
        assert_eq!(detail.course.url.path(), "/user/courses/docker");
        assert_eq!(
            detail.modules.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            ["m2", "m1"]
        );
        let lessons = &detail.modules[0].lessons;
        assert_eq!(lessons[0].id, "l9");
        assert_eq!(lessons[0].kind, LessonKind::Video);
        assert_eq!(lessons[1].kind, LessonKind::Resource);
    }

    #[tokio::test]
    async fn summary_targets_are_fetched_on_resolve() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/courses/k8s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c2", "slug": "k8s", "title": "Kubernetes", "modules": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let course = Course::from_listing(
            &api,
            json::CoursesListItem {
                id: "c2".into(),
                slug: "k8s".into(),
                title: "Kubernetes".into(),
            },
        )
        .unwrap();

        let detail = CourseTarget::Summary(course.clone())
            .resolve(&api)
            .await
            .unwrap();
        assert_eq!(detail.course, course);
    }
}
