use std::process::ExitCode;

mod app;
mod aws;
mod cli;
mod config_file;
mod logs;
mod render;
mod taskdef;
mod term;

use cli::{Command, get_cli_args};
use config_file::EcscopeConfigFile;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = get_cli_args();
    let config = match EcscopeConfigFile::try_init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Unable to read config file: {err}");
            return ExitCode::FAILURE;
        }
    };

    let region = args
        .region
        .clone()
        .or_else(|| config.region.clone())
        .or_else(|| std::env::var("AWS_REGION").ok())
        .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok());
    let profile = args.profile.clone().or_else(|| config.profile.clone());
    let aws = aws::command::AwsCli::new(region, profile);

    let result = match &args.cmd {
        Command::Compare { source, target } => app::compare(&aws, source, target).await,
        Command::Revisions { family, limit } => app::revisions(&aws, family, *limit).await,
        Command::Logs {
            cluster,
            task,
            container,
            lines,
            filter,
        } => {
            app::logs(
                &aws,
                &config,
                cluster,
                task,
                container,
                *lines,
                filter.as_deref(),
            )
            .await
        }
        Command::Tail {
            cluster,
            task,
            container,
            filter,
        } => app::tail(&aws, &config, cluster, task, container, filter.as_deref()).await,
        Command::LogGroups {
            cluster,
            container,
            service,
            family,
        } => {
            app::log_groups(
                &aws,
                &config,
                cluster,
                container,
                service.as_deref(),
                family.as_deref(),
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
