use clap::Parser;
use color_eyre::Result;
use tracing::info;

use crate::{
    api::Api,
    args::{normalize_token, Args, Command, CourseArgs, QuizArgs},
    course::CourseTarget,
    dispatch::Downloader,
    video::YtDlp,
};

mod api;
mod args;
mod course;
mod dispatch;
mod error;
mod json;
mod paths;
mod quiz;
mod resource;
mod select;
mod trace;
mod video;

/// Remote identifiers, opaque strings.
pub(crate) type Id = String;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    trace::init(&args)?;

    let api = Api::new(
        &args.user_agent,
        args.api_url,
        args.site_url,
        args.quiz_api_url,
    )?;

    match args.command {
        Command::Course(course_args) => download_courses(&api, course_args).await,
        Command::Quiz(QuizArgs {
            output_dir,
            separate,
        }) => quiz::download_quiz(&api, &output_dir, separate).await,
    }
}

async fn download_courses(api: &Api, args: CourseArgs) -> Result<()> {
    let token = normalize_token(&args.token).to_owned();

    let targets = match &args.course_url {
        Some(course_url) => vec![CourseTarget::Detail(
            course::parse_course_from_url(api, course_url).await?,
        )],
        None => select::select_courses(select::collect_all_courses(api).await?)
            .await?
            .into_iter()
            .map(CourseTarget::Summary)
            .collect(),
    };

    let downloader = Downloader {
        client: api.client().clone(),
        yt_dlp: YtDlp {
            bin: args.yt_dlp_bin,
            referer: api.site_url().to_string(),
        },
        token: token.clone(),
        quality: args.quality,
        authenticate_resources: args.authenticate_resources,
    };

    for target in targets {
        dispatch::download_course(
            api,
            target,
            &token,
            &downloader,
            &args.output_dir,
            args.max_duplicate_count,
        )
        .await?;
    }

    info!("All done.");

    Ok(())
}
