use chrono::{Local, TimeZone};

use crate::aws::ecs::RevisionRef;
use crate::logs::source::LogLine;
use crate::taskdef::diff::Change;
use crate::taskdef::normalize::{MountPoint, PortMapping, TaskDefinition};

/// `[HH:MM:SS] message`, or the bare message when no timestamp came with
/// the event.
pub fn format_log_line(line: &LogLine) -> String {
    let message = line.message.trim_end();
    match line
        .timestamp
        .and_then(|millis| Local.timestamp_millis_opt(millis).single())
    {
        Some(timestamp) => format!("[{}] {}", timestamp.format("%H:%M:%S"), message),
        None => message.to_string(),
    }
}

pub fn print_log_lines(lines: &[LogLine]) {
    for line in lines {
        println!("{}", format_log_line(line));
    }
}

pub fn print_revisions(revisions: &[RevisionRef]) {
    for revision in revisions {
        println!("{}:{}  ({})", revision.family, revision.revision, revision.arn);
    }
}

pub fn print_changes(source: &TaskDefinition, target: &TaskDefinition, changes: &[Change]) {
    println!(
        "Comparing {}:{} -> {}:{}",
        source.family, source.revision, target.family, target.revision
    );

    if changes.is_empty() {
        println!("No changes.");
        return;
    }

    for change in changes {
        println!("{}", describe_change(change));
    }
    println!("{} change(s).", changes.len());
}

fn describe_change(change: &Change) -> String {
    match change {
        Change::TaskCpu { old, new } => {
            format!("task cpu: {} -> {}", fmt_opt(old), fmt_opt(new))
        }
        Change::TaskMemory { old, new } => {
            format!("task memory: {} -> {}", fmt_opt(old), fmt_opt(new))
        }
        Change::Image { container, old, new } => {
            format!("[{container}] image: {old} -> {new}")
        }
        Change::ContainerCpu { container, old, new } => {
            format!("[{container}] cpu: {} -> {}", fmt_opt(old), fmt_opt(new))
        }
        Change::ContainerMemory { container, old, new } => {
            format!("[{container}] memory: {} -> {}", fmt_opt(old), fmt_opt(new))
        }
        Change::EnvAdded { container, key, value } => {
            format!("[{container}] env {key} added: {value}")
        }
        Change::EnvRemoved { container, key, value } => {
            format!("[{container}] env {key} removed (was {value})")
        }
        Change::EnvChanged { container, key, old, new } => {
            format!("[{container}] env {key}: {old} -> {new}")
        }
        Change::SecretAdded { container, key, value } => {
            format!("[{container}] secret {key} added: {value}")
        }
        Change::SecretRemoved { container, key, value } => {
            format!("[{container}] secret {key} removed (was {value})")
        }
        Change::SecretChanged { container, key, old, new } => {
            format!("[{container}] secret {key}: {old} -> {new}")
        }
        Change::Ports { container, old, new } => {
            format!(
                "[{container}] port mappings: {} -> {}",
                fmt_ports(old),
                fmt_ports(new)
            )
        }
        Change::Command { container, old, new } => {
            format!(
                "[{container}] command: {} -> {}",
                fmt_words(old),
                fmt_words(new)
            )
        }
        Change::EntryPoint { container, old, new } => {
            format!(
                "[{container}] entrypoint: {} -> {}",
                fmt_words(old),
                fmt_words(new)
            )
        }
        Change::Volumes { container, old, new } => {
            format!(
                "[{container}] volume mounts: {} -> {}",
                fmt_mounts(old),
                fmt_mounts(new)
            )
        }
    }
}

fn fmt_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "<none>".to_string(),
    }
}

fn fmt_words(words: &Option<Vec<String>>) -> String {
    match words {
        Some(words) => words.join(" "),
        None => "<none>".to_string(),
    }
}

fn fmt_ports(ports: &[PortMapping]) -> String {
    if ports.is_empty() {
        return "<none>".to_string();
    }
    ports
        .iter()
        .map(|port| {
            let container = port
                .container_port
                .map_or_else(|| "?".to_string(), |p| p.to_string());
            let host = port
                .host_port
                .map_or_else(|| "dynamic".to_string(), |p| p.to_string());
            let protocol = port.protocol.as_deref().unwrap_or("tcp");
            format!("{container}:{host}/{protocol}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_mounts(mounts: &[MountPoint]) -> String {
    if mounts.is_empty() {
        return "<none>".to_string();
    }
    mounts
        .iter()
        .map(|mount| {
            format!(
                "{}:{}{}",
                mount.source_volume.as_deref().unwrap_or("?"),
                mount.container_path.as_deref().unwrap_or("?"),
                if mount.read_only { ":ro" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_log_line_without_timestamp() {
        let line = LogLine {
            timestamp: None,
            message: "plain\n".to_string(),
            event_id: None,
        };
        assert_eq!(format_log_line(&line), "plain");
    }

    #[test]
    fn test_format_log_line_with_timestamp_has_bracketed_prefix() {
        let line = LogLine {
            timestamp: Some(1_700_000_000_000),
            message: "hello".to_string(),
            event_id: None,
        };
        let rendered = format_log_line(&line);
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] hello"));
    }

    #[test]
    fn test_describe_image_change() {
        let change = Change::Image {
            container: "app".to_string(),
            old: "example/app:1.0".to_string(),
            new: "example/app:2.0".to_string(),
        };
        assert_eq!(
            describe_change(&change),
            "[app] image: example/app:1.0 -> example/app:2.0"
        );
    }

    #[test]
    fn test_describe_ports_change() {
        let change = Change::Ports {
            container: "app".to_string(),
            old: vec![],
            new: vec![PortMapping {
                container_port: Some(8080),
                host_port: None,
                protocol: None,
            }],
        };
        assert_eq!(
            describe_change(&change),
            "[app] port mappings: <none> -> 8080:dynamic/tcp"
        );
    }

    #[test]
    fn test_describe_env_removed() {
        let change = Change::EnvRemoved {
            container: "app".to_string(),
            key: "DEBUG".to_string(),
            value: "false".to_string(),
        };
        assert_eq!(describe_change(&change), "[app] env DEBUG removed (was false)");
    }
}
