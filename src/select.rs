use color_eyre::{
    eyre::{bail, eyre},
    Result,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::{api::Api, course::Course};

/// Page through the whole course catalogue.
pub(crate) async fn collect_all_courses(api: &Api) -> Result<Vec<Course>> {
    let mut courses = Vec::new();
    let mut page = 1;

    loop {
        let response = api.courses_page(page).await?;
        let received = response.courses.len();

        for item in response.courses {
            courses.push(Course::from_listing(api, item)?);
        }

        match response.metadata.and_then(|metadata| metadata.next_page) {
            Some(next_page) if next_page > page && received > 0 => page = next_page,
            _ => break,
        }
    }

    info!("Found {} courses", courses.len());

    Ok(courses)
}

/// List courses on stdout and let the user pick some, e.g. `1,3,5-7` or `all`.
pub(crate) async fn select_courses(mut courses: Vec<Course>) -> Result<Vec<Course>> {
    if courses.is_empty() {
        bail!("no courses available to select from");
    }

    let mut stdout = io::stdout();
    let mut listing = String::new();
    for (number, course) in (1..).zip(&courses) {
        listing.push_str(&format!("{number:>4}. {}\n", course.title));
    }
    stdout.write_all(listing.as_bytes()).await?;

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        stdout
            .write_all(b"Select courses to download (e.g. 1,3,5-7 or all): ")
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            bail!("no course selected");
        };

        match parse_selection(&line, courses.len()) {
            Ok(indices) => {
                let mut selected = Vec::with_capacity(indices.len());
                // Indices are sorted; take from the back so earlier ones stay valid.
                for index in indices.into_iter().rev() {
                    selected.push(courses.swap_remove(index));
                }
                selected.reverse();
                return Ok(selected);
            }
            Err(report) => warn!("{report}"),
        }
    }
}

/// Turn 1-based course numbers and ranges into sorted, distinct 0-based indices.
fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }

    let number = |token: &str| -> Result<usize> {
        token
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|number| (1..=count).contains(number))
            .ok_or_else(|| eyre!("'{token}' is not a course number between 1 and {count}"))
    };

    let mut indices = Vec::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        match token.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    bail!("'{token}' is an empty range");
                }
                indices.extend(start - 1..end);
            }
            None => indices.push(number(token)? - 1),
        }
    }

    if indices.is_empty() {
        bail!("no course selected");
    }

    indices.sort_unstable();
    indices.dedup();

    Ok(indices)
}
