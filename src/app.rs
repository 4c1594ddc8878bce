use log::info;

use crate::aws::command::AwsCli;
use crate::aws::ecs::{EcsClient, EcsError, LogTarget, resolve_log_target, task_id_from_arn};
use crate::aws::logs::CloudWatchLogs;
use crate::aws::sts;
use crate::config_file::EcscopeConfigFile;
use crate::logs::ranking::rank_log_groups;
use crate::logs::source::{LogSource, LogSourceError};
use crate::logs::tail::{TailError, TailOptions, run_tail_session};
use crate::render;
use crate::taskdef::diff;
use crate::taskdef::normalize::{MalformedDefinition, normalize};
use crate::term::{ConsoleRenderer, CrosstermKeys, RawModeGuard};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error(transparent)]
    Malformed(#[from] MalformedDefinition),
    #[error(transparent)]
    Logs(#[from] LogSourceError),
    #[error(transparent)]
    Tail(#[from] TailError),
    #[error("container '{container}' has no usable awslogs log configuration")]
    NoLogConfig { container: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn compare(aws: &AwsCli, source: &str, target: &str) -> Result<(), AppError> {
    let ecs = EcsClient::new(aws);
    let source_raw = ecs.describe_task_definition(source).await?;
    let target_raw = ecs.describe_task_definition(target).await?;

    let source_def = normalize(&source_raw)?;
    let target_def = normalize(&target_raw)?;

    let changes = diff::compare(&source_def, &target_def);
    render::print_changes(&source_def, &target_def, &changes);
    Ok(())
}

pub async fn revisions(aws: &AwsCli, family: &str, limit: usize) -> Result<(), AppError> {
    let ecs = EcsClient::new(aws);
    let revisions = ecs.list_revisions(family, limit).await?;
    if revisions.is_empty() {
        println!("No revisions found for family '{family}'.");
        return Ok(());
    }
    render::print_revisions(&revisions);
    Ok(())
}

pub async fn logs(
    aws: &AwsCli,
    config: &EcscopeConfigFile,
    cluster: &str,
    task: &str,
    container: &str,
    lines: Option<usize>,
    filter: Option<&str>,
) -> Result<(), AppError> {
    let target = resolve_target(aws, config, cluster, task, container).await?;
    let source = CloudWatchLogs::new(aws.clone(), None);

    let limit = lines.unwrap_or(config.history_limit);
    let events = source
        .fetch_recent(&target.group, &target.stream, limit, filter)
        .await?;

    if events.is_empty() {
        println!("No logs found in stream '{}'.", target.stream);
        return Ok(());
    }

    println!(
        "Last {} log entries for container '{container}' ({} / {}):",
        events.len(),
        target.group,
        target.stream
    );
    render::print_log_lines(&events);
    Ok(())
}

pub async fn tail(
    aws: &AwsCli,
    config: &EcscopeConfigFile,
    cluster: &str,
    task: &str,
    container: &str,
    filter: Option<&str>,
) -> Result<(), AppError> {
    let target = resolve_target(aws, config, cluster, task, container).await?;
    let account_id = sts::account_id(aws).await;
    let source = CloudWatchLogs::new(aws.clone(), account_id);

    println!("Tailing logs for container '{container}'");
    println!("log group:  {}", target.group);
    println!("log stream: {}", target.stream);
    println!("Keys: q stop, f set filter, c clear filter");

    let _guard = RawModeGuard::enable()?;
    let mut renderer = ConsoleRenderer;
    run_tail_session(
        &source,
        CrosstermKeys,
        &mut renderer,
        &target.group,
        &target.stream,
        TailOptions {
            history_limit: config.history_limit,
            initial_filter: filter.unwrap_or_default().to_string(),
        },
    )
    .await?;
    Ok(())
}

pub async fn log_groups(
    aws: &AwsCli,
    config: &EcscopeConfigFile,
    cluster: &str,
    container: &str,
    service: Option<&str>,
    family: Option<&str>,
) -> Result<(), AppError> {
    let source = CloudWatchLogs::new(aws.clone(), None);
    let candidates = source.list_log_groups(config.log_group_candidates).await?;
    let ranked = rank_log_groups(&candidates, cluster, container, service, family);

    if ranked.is_empty() {
        println!("No log groups look relevant to '{cluster}' / '{container}'.");
        return Ok(());
    }
    for group in ranked {
        println!("{group}");
    }
    Ok(())
}

/// Resolve the (group, stream) pair for one container of a running task.
/// Without a usable awslogs configuration there is nothing to read, so
/// ranked candidate groups are printed as a hint before failing.
async fn resolve_target(
    aws: &AwsCli,
    config: &EcscopeConfigFile,
    cluster: &str,
    task: &str,
    container: &str,
) -> Result<LogTarget, AppError> {
    let ecs = EcsClient::new(aws);
    let overview = ecs.describe_task(cluster, task).await?;
    let task_definition = ecs
        .describe_task_definition(&overview.task_definition_arn)
        .await?;
    let task_id = task_id_from_arn(&overview.task_arn);

    match resolve_log_target(&task_definition, container, task_id) {
        Some(target) => {
            info!(
                "resolved log target {} / {} for container {container}",
                target.group, target.stream
            );
            Ok(target)
        }
        None => {
            let source = CloudWatchLogs::new(aws.clone(), None);
            let candidates = source
                .list_log_groups(config.log_group_candidates)
                .await
                .unwrap_or_default();
            let family = task_definition
                .get("family")
                .and_then(serde_json::Value::as_str);
            let ranked = rank_log_groups(&candidates, cluster, container, None, family);
            if !ranked.is_empty() {
                eprintln!("Log groups that might hold this container's logs:");
                for group in ranked {
                    eprintln!("  {group}");
                }
            }
            Err(AppError::NoLogConfig {
                container: container.to_string(),
            })
        }
    }
}
