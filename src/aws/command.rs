use std::process::Stdio;

use log::debug;
use serde::de::DeserializeOwned;

/// Thin wrapper around the `aws` CLI. Credential and profile resolution
/// stay entirely on the CLI's side; we only pass the region and profile
/// through when the user gave one.
#[derive(Debug, Clone)]
pub struct AwsCli {
    region: Option<String>,
    profile: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AwsCliError {
    #[error("unable to run the aws CLI (is it installed and on PATH?): {0}")]
    Spawn(std::io::Error),
    #[error("aws {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
    #[error("unable to parse aws CLI output: {0}")]
    Json(#[from] serde_json::Error),
}

impl AwsCli {
    pub fn new(region: Option<String>, profile: Option<String>) -> Self {
        Self { region, profile }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn base_command(&self, args: &[&str]) -> tokio::process::Command {
        let mut command = tokio::process::Command::new("aws");
        command.args(args).arg("--output").arg("json");
        if let Some(region) = &self.region {
            command.arg("--region").arg(region);
        }
        if let Some(profile) = &self.profile {
            command.arg("--profile").arg(profile);
        }
        command.stdin(Stdio::null());
        command
    }

    /// Run a subcommand to completion and return its stdout.
    pub async fn run(&self, args: &[&str]) -> Result<Vec<u8>, AwsCliError> {
        debug!("running aws {}", args.join(" "));
        let output = self
            .base_command(args)
            .output()
            .await
            .map_err(AwsCliError::Spawn)?;

        if !output.status.success() {
            return Err(AwsCliError::Failed {
                command: args.iter().take(2).copied().collect::<Vec<_>>().join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run a subcommand and deserialize its JSON stdout.
    pub async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, AwsCliError> {
        let stdout = self.run(args).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    /// Spawn a long-running subcommand with piped stdout/stderr. The child
    /// is killed if the handle is dropped without an explicit shutdown.
    pub fn stream(&self, args: &[&str]) -> std::io::Result<tokio::process::Child> {
        debug!("streaming aws {}", args.join(" "));
        self.base_command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}
