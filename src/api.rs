use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use reqwest::{
    header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client, StatusCode, Url,
};
use tracing::{debug, instrument, Level};

use crate::{error::Error, json};

/// The remote endpoints this tool talks to.
#[derive(Clone, Debug)]
pub(crate) struct Api {
    client: Client,
    api_url: Url,
    site_url: Url,
    quiz_api_url: Url,
}

impl Api {
    pub fn new(user_agent: &str, api_url: Url, site_url: Url, quiz_api_url: Url) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, "*/*".parse()?);
                headers.insert(USER_AGENT, user_agent.parse()?);
                debug!(?headers);
                headers
            })
            .build()?;

        Ok(Self {
            client,
            api_url,
            site_url,
            quiz_api_url,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    /// Fetch modules and lessons of the course with the given slug.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn course_detail(&self, slug: &str) -> Result<json::CourseDetail> {
        let url = endpoint(&self.api_url, &["api", "courses", slug])?;

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::CourseNotFound {
                slug: slug.to_owned(),
            }
            .into());
        }

        response
            .error_for_status()?
            .json()
            .await
            .wrap_err_with(|| format!("failed to parse course detail of '{slug}'"))
    }

    /// Fetch the course as seen by the token's owner, which carries the lessons' video URLs.
    #[instrument(level = Level::DEBUG, skip(self, token))]
    pub async fn authenticated_course(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<json::AuthenticatedCourse> {
        let url = endpoint(&self.api_url, &["api", "courses", course_id])?;

        self.client
            .get(url)
            .query(&[("course_id", course_id)])
            .header(AUTHORIZATION, format!("bearer {token}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err_with(|| format!("failed to parse authenticated course '{course_id}'"))
    }

    /// Fetch one page of the course catalogue.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn courses_page(&self, page: u32) -> Result<json::CoursesListResponse> {
        let url = endpoint(&self.api_url, &["api", "courses"])?;

        self.client
            .get(url)
            .query(&[("page", page), ("limit", 100)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("failed to parse course listing")
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn quizzes(&self) -> Result<Vec<json::Quiz>> {
        let url = endpoint(&self.quiz_api_url, &["api", "quizzes", "all"])?;

        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("failed to parse quiz list")
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn quiz_questions(&self, quiz_id: &str) -> Result<Vec<json::Question>> {
        let url = endpoint(&self.quiz_api_url, &["api", "questions", "quiz"])?;

        let questions: json::QuestionsResponse = self
            .client
            .get(url)
            .query(&[("id", quiz_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err_with(|| format!("failed to parse questions of quiz '{quiz_id}'"))?;

        Ok(questions.into_questions())
    }

    /// Web page of a non-video lesson.
    pub fn lesson_url(&self, course_slug: &str, module_id: &str, lesson_id: &str) -> Result<Url> {
        endpoint(
            &self.site_url,
            &[
                "user", "courses", course_slug, "module", module_id, "lesson", lesson_id,
            ],
        )
    }
}

/// Append percent-encoded path segments to a base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| eyre!("'{base}' cannot be used as a base URL"))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

#[cfg(test)]
pub(crate) mod tests {
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    pub(crate) fn api_for(server: &MockServer) -> Api {
        let base = Url::parse(&server.uri()).unwrap();
        Api::new("test-agent", base.clone(), base.clone(), base).unwrap()
    }

    #[test]
    fn endpoints_escape_segments() {
        let base = Url::parse("https://learn.kodekloud.com/").unwrap();
        let url = endpoint(&base, &["user", "courses", "a b", "module", "1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://learn.kodekloud.com/user/courses/a%20b/module/1"
        );

        let base = Url::parse("https://example.com/prefix/").unwrap();
        let url = endpoint(&base, &["api", "quizzes", "all"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/prefix/api/quizzes/all");
    }

    #[tokio::test]
    async fn unknown_slug_is_course_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/courses/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let report = api_for(&server).course_detail("missing").await.unwrap_err();

        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::CourseNotFound { slug }) if slug == "missing"
        ));
    }

    #[tokio::test]
    async fn authenticated_course_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/courses/c1"))
            .and(query_param("course_id", "c1"))
            .and(header("authorization", "bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "modules": [{"lessons": [{"id": "l1", "video_url": "https://vimeo.com/7"}]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let course = api_for(&server)
            .authenticated_course("c1", "secret")
            .await
            .unwrap();

        assert_eq!(
            course.lesson("l1").unwrap().video_url.as_deref(),
            Some("https://vimeo.com/7")
        );
    }
}
