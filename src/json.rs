use serde::Deserialize;

use crate::Id;

// == Fetch course detail (by slug, or by id with a bearer token) ==

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CourseDetail {
    pub id: Id,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Module {
    pub id: Id,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Lesson {
    pub id: Id,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: LessonKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LessonKind {
    Video,
    #[default]
    #[serde(other)]
    Resource,
}

// == Fetch lesson video URLs (authenticated) ==

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AuthenticatedCourse {
    #[serde(default)]
    pub modules: Vec<AuthenticatedModule>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AuthenticatedModule {
    #[serde(default)]
    pub lessons: Vec<AuthenticatedLesson>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AuthenticatedLesson {
    pub id: Id,
    pub video_url: Option<String>,
}

impl AuthenticatedCourse {
    pub fn lesson(&self, lesson_id: &str) -> Option<&AuthenticatedLesson> {
        self.modules
            .iter()
            .flat_map(|module| module.lessons.iter())
            .find(|lesson| lesson.id == lesson_id)
    }
}

// == Fetch course listing ==

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CoursesListResponse {
    #[serde(default)]
    pub courses: Vec<CoursesListItem>,
    pub metadata: Option<CoursesListMetadata>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CoursesListItem {
    pub id: Id,
    pub slug: String,
    pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CoursesListMetadata {
    pub next_page: Option<u32>,
}

// == Fetch quizzes ==

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Quiz {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id,
    pub name: Option<String>,
    pub topic: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuestionsResponse {
    List(Vec<Question>),
    Wrapped { questions: Vec<Question> },
}

impl QuestionsResponse {
    pub fn into_questions(self) -> Vec<Question> {
        match self {
            QuestionsResponse::List(questions) | QuestionsResponse::Wrapped { questions } => {
                questions
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Question {
    pub question: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(rename = "correctAnswers", default)]
    pub correct_answers: Vec<String>,
    pub code: Option<Code>,
    pub explanation: Option<String>,
    #[serde(rename = "documentationLink")]
    pub documentation_link: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Code {
    pub script: Option<String>,
}
