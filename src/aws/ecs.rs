use serde::Deserialize;
use serde_json::Value;

use crate::aws::command::{AwsCli, AwsCliError};

#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error(transparent)]
    Aws(#[from] AwsCliError),
    #[error("task '{task}' not found in cluster '{cluster}'")]
    TaskNotFound { cluster: String, task: String },
}

/// One known revision of a task definition family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRef {
    pub arn: String,
    pub family: String,
    pub revision: i64,
}

/// The slice of a running task we need for log addressing.
#[derive(Debug, Clone)]
pub struct TaskOverview {
    pub task_arn: String,
    pub task_definition_arn: String,
}

/// Resolved log destination for one container of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub group: String,
    pub stream: String,
}

pub struct EcsClient<'a> {
    aws: &'a AwsCli,
}

impl<'a> EcsClient<'a> {
    pub fn new(aws: &'a AwsCli) -> Self {
        Self { aws }
    }

    /// Fetch a raw task definition blob by family:revision or full ARN.
    /// The blob goes to the normalizer untouched.
    pub async fn describe_task_definition(&self, reference: &str) -> Result<Value, EcsError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "taskDefinition")]
            task_definition: Value,
        }

        let response: Response = self
            .aws
            .run_json(&[
                "ecs",
                "describe-task-definition",
                "--task-definition",
                reference,
            ])
            .await?;
        Ok(response.task_definition)
    }

    /// List the most recent revisions of a family, newest first.
    pub async fn list_revisions(
        &self,
        family: &str,
        limit: usize,
    ) -> Result<Vec<RevisionRef>, EcsError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "taskDefinitionArns", default)]
            task_definition_arns: Vec<String>,
        }

        let response: Response = self
            .aws
            .run_json(&[
                "ecs",
                "list-task-definitions",
                "--family-prefix",
                family,
                "--sort",
                "DESC",
            ])
            .await?;

        Ok(revisions_from_arns(&response.task_definition_arns, limit))
    }

    pub async fn describe_task(
        &self,
        cluster: &str,
        task: &str,
    ) -> Result<TaskOverview, EcsError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            tasks: Vec<Task>,
        }
        #[derive(Deserialize)]
        struct Task {
            #[serde(rename = "taskArn")]
            task_arn: String,
            #[serde(rename = "taskDefinitionArn")]
            task_definition_arn: String,
        }

        let response: Response = self
            .aws
            .run_json(&["ecs", "describe-tasks", "--cluster", cluster, "--tasks", task])
            .await?;

        response
            .tasks
            .into_iter()
            .next()
            .map(|t| TaskOverview {
                task_arn: t.task_arn,
                task_definition_arn: t.task_definition_arn,
            })
            .ok_or_else(|| EcsError::TaskNotFound {
                cluster: cluster.to_string(),
                task: task.to_string(),
            })
    }
}

/// Parse, sort newest-first and cap the ARN list from
/// `list-task-definitions`. Unparseable ARNs are skipped.
fn revisions_from_arns(arns: &[String], limit: usize) -> Vec<RevisionRef> {
    let mut revisions: Vec<RevisionRef> = arns
        .iter()
        .filter_map(|arn| parse_revision_arn(arn))
        .collect();
    revisions.sort_by(|a, b| b.revision.cmp(&a.revision));
    revisions.truncate(limit);
    revisions
}

/// `arn:aws:ecs:region:account:task-definition/family:revision`
fn parse_revision_arn(arn: &str) -> Option<RevisionRef> {
    let name = arn.rsplit('/').next()?;
    let (family, revision) = name.rsplit_once(':')?;
    Some(RevisionRef {
        arn: arn.to_string(),
        family: family.to_string(),
        revision: revision.parse().ok()?,
    })
}

/// Extract the task id (last ARN path segment).
pub fn task_id_from_arn(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

pub fn build_log_stream_name(prefix: &str, container: &str, task_id: &str) -> String {
    format!("{prefix}/{container}/{task_id}")
}

/// Resolve where a container's logs land, from its raw task definition.
/// Only the `awslogs` driver is addressable; anything else yields `None`
/// and the caller falls back to ranked log group suggestions.
pub fn resolve_log_target(task_definition: &Value, container: &str, task_id: &str) -> Option<LogTarget> {
    let definitions = task_definition.get("containerDefinitions")?.as_array()?;
    let definition = definitions
        .iter()
        .find(|def| def.get("name").and_then(Value::as_str) == Some(container))?;

    let log_config = definition.get("logConfiguration")?;
    if log_config.get("logDriver").and_then(Value::as_str) != Some("awslogs") {
        return None;
    }

    let options = log_config.get("options")?;
    let group = options.get("awslogs-group")?.as_str()?.to_string();
    let prefix = options
        .get("awslogs-stream-prefix")
        .and_then(Value::as_str)
        .unwrap_or("ecs");

    Some(LogTarget {
        group,
        stream: build_log_stream_name(prefix, container, task_id),
    })
}
