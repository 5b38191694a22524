use std::{fmt::Write, path::Path};

use color_eyre::Result;
use tracing::{info, instrument, warn, Level};

use crate::{api::Api, json};

/// File name of the single combined quiz document.
pub(crate) const COMBINED_FILE_NAME: &str = "KodeKloud_Quiz.md";

/// Render every quiz to markdown.
///
/// With `separate`, each quiz goes to a file of its own named after it; otherwise
/// all quizzes end up in [`COMBINED_FILE_NAME`], separated by horizontal rules.
/// A quiz whose questions cannot be fetched is logged and left out.
#[instrument(level = Level::DEBUG, skip(api))]
pub(crate) async fn download_quiz(api: &Api, output_dir: &Path, separate: bool) -> Result<()> {
    let quizzes = api.quizzes().await?;
    info!("Total {} quizzes available!", quizzes.len());

    tokio::fs::create_dir_all(output_dir).await?;

    let mut markdown = if separate {
        String::new()
    } else {
        "# KodeKloud Quiz\n".to_owned()
    };

    for (quiz_index, quiz) in (1..).zip(&quizzes) {
        let name = quiz_name(quiz);
        info!("Fetching Quiz {quiz_index} - {name}");

        let questions = match api.quiz_questions(&quiz.id).await {
            Ok(questions) => questions,
            Err(report) => {
                warn!(quiz_id = quiz.id, ?report, "Skipping quiz, questions unavailable");
                continue;
            }
        };

        render_quiz(&mut markdown, name, &questions);

        if separate {
            let output_file = output_dir.join(format!("{}.md", name.replace('/', "")));
            tokio::fs::write(&output_file, &markdown).await?;
            info!("Quiz file written in '{}'", output_file.display());

            markdown.clear();
        } else {
            markdown.push_str("\n---\n");
        }
    }

    if !separate {
        let output_file = output_dir.join(COMBINED_FILE_NAME);
        tokio::fs::write(&output_file, &markdown).await?;
        info!("Quiz file written in '{}'", output_file.display());
    }

    Ok(())
}

fn quiz_name(quiz: &json::Quiz) -> &str {
    [quiz.name.as_deref(), quiz.topic.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(&quiz.id)
}

fn render_quiz(out: &mut String, name: &str, questions: &[json::Question]) {
    // Writing to a `String` cannot fail.
    let _ = writeln!(out, "\n## {name}");

    for (index, question) in (1..).zip(questions) {
        let _ = writeln!(out, "\n**{index}. {}**\n", question.question.trim());
        for answer in &question.answers {
            let _ = writeln!(out, "* [ ] {answer}");
        }

        let _ = writeln!(out, "\n**Correct answer:**");
        for answer in &question.correct_answers {
            let _ = writeln!(out, "* [x] {answer}");
        }

        if let Some(script) = question
            .code
            .as_ref()
            .and_then(|code| non_blank(code.script.as_deref()))
        {
            let _ = writeln!(out, "\n**Code**:\n```\n{}\n```", script.trim_end());
        }
        if let Some(explanation) = non_blank(question.explanation.as_deref()) {
            let _ = writeln!(out, "\n**Explanation**: {explanation}");
        }
        if let Some(link) = non_blank(question.documentation_link.as_deref()) {
            let _ = writeln!(out, "\n**Documentation Link**: {link}");
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
