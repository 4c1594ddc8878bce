use std::collections::BTreeMap;

use crate::taskdef::normalize::{ContainerDefinition, MountPoint, PortMapping, TaskDefinition};

/// One semantic difference between two task definitions.
///
/// Task-level variants carry no container name; env/secret variants carry
/// the affected key; port and volume variants carry the full old and new
/// sequences since they compare as wholes.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    TaskCpu {
        old: Option<String>,
        new: Option<String>,
    },
    TaskMemory {
        old: Option<String>,
        new: Option<String>,
    },
    Image {
        container: String,
        old: String,
        new: String,
    },
    ContainerCpu {
        container: String,
        old: Option<i64>,
        new: Option<i64>,
    },
    ContainerMemory {
        container: String,
        old: Option<i64>,
        new: Option<i64>,
    },
    EnvAdded {
        container: String,
        key: String,
        value: String,
    },
    EnvRemoved {
        container: String,
        key: String,
        value: String,
    },
    EnvChanged {
        container: String,
        key: String,
        old: String,
        new: String,
    },
    SecretAdded {
        container: String,
        key: String,
        value: String,
    },
    SecretRemoved {
        container: String,
        key: String,
        value: String,
    },
    SecretChanged {
        container: String,
        key: String,
        old: String,
        new: String,
    },
    Ports {
        container: String,
        old: Vec<PortMapping>,
        new: Vec<PortMapping>,
    },
    Command {
        container: String,
        old: Option<Vec<String>>,
        new: Option<Vec<String>>,
    },
    EntryPoint {
        container: String,
        old: Option<Vec<String>>,
        new: Option<Vec<String>>,
    },
    Volumes {
        container: String,
        old: Vec<MountPoint>,
        new: Vec<MountPoint>,
    },
}

/// Compare two normalized task definitions.
///
/// Task-level changes come first, then per-container changes in the
/// source's container order. Only containers present on both sides are
/// compared; a container added or removed wholesale produces no record.
pub fn compare(source: &TaskDefinition, target: &TaskDefinition) -> Vec<Change> {
    let mut changes = Vec::new();

    if source.task_cpu != target.task_cpu {
        changes.push(Change::TaskCpu {
            old: source.task_cpu.clone(),
            new: target.task_cpu.clone(),
        });
    }
    if source.task_memory != target.task_memory {
        changes.push(Change::TaskMemory {
            old: source.task_memory.clone(),
            new: target.task_memory.clone(),
        });
    }

    let target_by_name: BTreeMap<&str, &ContainerDefinition> = target
        .containers
        .iter()
        .map(|container| (container.name.as_str(), container))
        .collect();

    for source_container in &source.containers {
        if let Some(target_container) = target_by_name.get(source_container.name.as_str()) {
            compare_container(source_container, target_container, &mut changes);
        }
    }

    changes
}

fn compare_container(
    source: &ContainerDefinition,
    target: &ContainerDefinition,
    changes: &mut Vec<Change>,
) {
    let container = source.name.clone();

    if source.image != target.image {
        changes.push(Change::Image {
            container: container.clone(),
            old: source.image.clone(),
            new: target.image.clone(),
        });
    }
    if source.cpu != target.cpu {
        changes.push(Change::ContainerCpu {
            container: container.clone(),
            old: source.cpu,
            new: target.cpu,
        });
    }
    if source.memory != target.memory {
        changes.push(Change::ContainerMemory {
            container: container.clone(),
            old: source.memory,
            new: target.memory,
        });
    }

    compare_maps(
        MapKind::Env,
        &source.environment,
        &target.environment,
        &container,
        changes,
    );
    compare_maps(
        MapKind::Secret,
        &source.secrets,
        &target.secrets,
        &container,
        changes,
    );

    if source.ports != target.ports {
        changes.push(Change::Ports {
            container: container.clone(),
            old: source.ports.clone(),
            new: target.ports.clone(),
        });
    }
    if source.command != target.command {
        changes.push(Change::Command {
            container: container.clone(),
            old: source.command.clone(),
            new: target.command.clone(),
        });
    }
    if source.entry_point != target.entry_point {
        changes.push(Change::EntryPoint {
            container: container.clone(),
            old: source.entry_point.clone(),
            new: target.entry_point.clone(),
        });
    }
    if source.mount_points != target.mount_points {
        changes.push(Change::Volumes {
            container,
            old: source.mount_points.clone(),
            new: target.mount_points.clone(),
        });
    }
}

#[derive(Clone, Copy)]
enum MapKind {
    Env,
    Secret,
}

fn compare_maps(
    kind: MapKind,
    source: &BTreeMap<String, String>,
    target: &BTreeMap<String, String>,
    container: &str,
    changes: &mut Vec<Change>,
) {
    for (key, value) in source {
        match target.get(key) {
            None => changes.push(match kind {
                MapKind::Env => Change::EnvRemoved {
                    container: container.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                },
                MapKind::Secret => Change::SecretRemoved {
                    container: container.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                },
            }),
            Some(target_value) if target_value != value => changes.push(match kind {
                MapKind::Env => Change::EnvChanged {
                    container: container.to_string(),
                    key: key.clone(),
                    old: value.clone(),
                    new: target_value.clone(),
                },
                MapKind::Secret => Change::SecretChanged {
                    container: container.to_string(),
                    key: key.clone(),
                    old: value.clone(),
                    new: target_value.clone(),
                },
            }),
            Some(_) => {}
        }
    }

    for (key, value) in target {
        if !source.contains_key(key) {
            changes.push(match kind {
                MapKind::Env => Change::EnvAdded {
                    container: container.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                },
                MapKind::Secret => Change::SecretAdded {
                    container: container.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taskdef::normalize::normalize;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use serde_json::json;

    fn container(name: &str, image: &str) -> ContainerDefinition {
        ContainerDefinition {
            name: name.to_string(),
            image: image.to_string(),
            cpu: None,
            memory: None,
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
            ports: Vec::new(),
            mount_points: Vec::new(),
            command: None,
            entry_point: None,
            log_driver: None,
        }
    }

    fn task(containers: Vec<ContainerDefinition>) -> TaskDefinition {
        TaskDefinition {
            family: "web".to_string(),
            revision: 1,
            task_cpu: Some("256".to_string()),
            task_memory: Some("512".to_string()),
            containers,
        }
    }

    #[test]
    fn test_identical_definitions_yield_no_changes() {
        let def = task(vec![container("app", "example/app:1.0")]);
        assert!(compare(&def, &def).is_empty());
    }

    #[test]
    fn test_image_change_names_the_container() {
        let source = task(vec![container("app", "example/app:1.0")]);
        let target = task(vec![container("app", "example/app:2.0")]);

        let changes = compare(&source, &target);
        assert_eq!(
            changes,
            vec![Change::Image {
                container: "app".to_string(),
                old: "example/app:1.0".to_string(),
                new: "example/app:2.0".to_string(),
            }]
        );
    }

    #[test]
    fn test_task_level_changes_come_first() {
        let mut source = task(vec![container("app", "example/app:1.0")]);
        let mut target = task(vec![container("app", "example/app:2.0")]);
        source.task_cpu = Some("256".to_string());
        target.task_cpu = Some("512".to_string());
        target.task_memory = Some("1024".to_string());

        let changes = compare(&source, &target);
        assert_eq!(changes.len(), 3);
        assert!(matches!(changes[0], Change::TaskCpu { .. }));
        assert!(matches!(changes[1], Change::TaskMemory { .. }));
        assert!(matches!(changes[2], Change::Image { .. }));
    }

    #[test]
    fn test_environment_diff_partition() {
        let mut source_container = container("app", "example/app:1.0");
        source_container.environment =
            BTreeMap::from([("ENV".into(), "staging".into()), ("DEBUG".into(), "false".into())]);
        let mut target_container = container("app", "example/app:1.0");
        target_container.environment = BTreeMap::from([
            ("ENV".into(), "production".into()),
            ("LOG_LEVEL".into(), "info".into()),
        ]);

        let changes = compare(&task(vec![source_container]), &task(vec![target_container]));
        assert_eq!(changes.len(), 3);
        assert!(changes.contains(&Change::EnvChanged {
            container: "app".to_string(),
            key: "ENV".to_string(),
            old: "staging".to_string(),
            new: "production".to_string(),
        }));
        assert!(changes.contains(&Change::EnvAdded {
            container: "app".to_string(),
            key: "LOG_LEVEL".to_string(),
            value: "info".to_string(),
        }));
        assert!(changes.contains(&Change::EnvRemoved {
            container: "app".to_string(),
            key: "DEBUG".to_string(),
            value: "false".to_string(),
        }));
    }

    #[test]
    fn test_secret_diff_partition() {
        let mut source_container = container("app", "example/app:1.0");
        source_container.secrets = BTreeMap::from([(
            "DB_PASSWORD".into(),
            "arn:aws:ssm:eu-west-1:123:parameter/db-old".into(),
        )]);
        let mut target_container = container("app", "example/app:1.0");
        target_container.secrets = BTreeMap::from([(
            "DB_PASSWORD".into(),
            "arn:aws:ssm:eu-west-1:123:parameter/db-new".into(),
        )]);

        let changes = compare(&task(vec![source_container]), &task(vec![target_container]));
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], Change::SecretChanged { ref key, .. } if key == "DB_PASSWORD"));
    }

    #[test]
    fn test_unmatched_containers_produce_no_records() {
        let source = task(vec![
            container("app", "example/app:1.0"),
            container("only-in-source", "example/a:1"),
        ]);
        let target = task(vec![
            container("app", "example/app:1.0"),
            container("only-in-target", "example/b:1"),
        ]);

        assert!(compare(&source, &target).is_empty());
    }

    #[test]
    fn test_ports_compare_as_whole_sequences() {
        let mut source_container = container("app", "example/app:1.0");
        source_container.ports = vec![PortMapping {
            container_port: Some(8080),
            host_port: Some(80),
            protocol: Some("tcp".to_string()),
        }];
        let mut target_container = container("app", "example/app:1.0");
        target_container.ports = vec![PortMapping {
            container_port: Some(8081),
            host_port: Some(80),
            protocol: Some("tcp".to_string()),
        }];

        let changes = compare(
            &task(vec![source_container.clone()]),
            &task(vec![target_container.clone()]),
        );
        assert_eq!(
            changes,
            vec![Change::Ports {
                container: "app".to_string(),
                old: source_container.ports,
                new: target_container.ports,
            }]
        );
    }

    #[test]
    fn test_command_and_entrypoint_changes() {
        let mut source_container = container("app", "example/app:1.0");
        source_container.command = Some(vec!["serve".into()]);
        let mut target_container = container("app", "example/app:1.0");
        target_container.command = Some(vec!["serve".into(), "--verbose".into()]);
        target_container.entry_point = Some(vec!["/entry.sh".into()]);

        let changes = compare(&task(vec![source_container]), &task(vec![target_container]));
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], Change::Command { .. }));
        assert!(matches!(changes[1], Change::EntryPoint { .. }));
    }

    #[test]
    fn test_absent_and_empty_ports_are_equal() {
        // One raw definition omits portMappings entirely, the other carries
        // an empty list. Normalization defaults both to an empty sequence.
        let without = json!({
            "family": "web",
            "revision": 1,
            "containerDefinitions": [{"name": "app", "image": "example/app:1.0"}],
        });
        let with_empty = json!({
            "family": "web",
            "revision": 2,
            "containerDefinitions": [{
                "name": "app",
                "image": "example/app:1.0",
                "portMappings": [],
                "mountPoints": [],
            }],
        });

        let source = normalize(&without).expect("Failed to normalize");
        let target = normalize(&with_empty).expect("Failed to normalize");
        assert!(compare(&source, &target).is_empty());
    }

    impl Arbitrary for PortMapping {
        fn arbitrary(g: &mut Gen) -> Self {
            PortMapping {
                container_port: Option::<i64>::arbitrary(g),
                host_port: Option::<i64>::arbitrary(g),
                protocol: Option::<String>::arbitrary(g),
            }
        }
    }

    impl Arbitrary for MountPoint {
        fn arbitrary(g: &mut Gen) -> Self {
            MountPoint {
                source_volume: Option::<String>::arbitrary(g),
                container_path: Option::<String>::arbitrary(g),
                read_only: bool::arbitrary(g),
            }
        }
    }

    impl Arbitrary for ContainerDefinition {
        fn arbitrary(g: &mut Gen) -> Self {
            ContainerDefinition {
                name: String::arbitrary(g),
                image: String::arbitrary(g),
                cpu: Option::<i64>::arbitrary(g),
                memory: Option::<i64>::arbitrary(g),
                environment: BTreeMap::arbitrary(g),
                secrets: BTreeMap::arbitrary(g),
                ports: Vec::arbitrary(g),
                mount_points: Vec::arbitrary(g),
                command: Option::<Vec<String>>::arbitrary(g),
                entry_point: Option::<Vec<String>>::arbitrary(g),
                log_driver: Option::<String>::arbitrary(g),
            }
        }
    }

    impl Arbitrary for TaskDefinition {
        fn arbitrary(g: &mut Gen) -> Self {
            TaskDefinition {
                family: String::arbitrary(g),
                revision: i64::arbitrary(g),
                task_cpu: Option::<String>::arbitrary(g),
                task_memory: Option::<String>::arbitrary(g),
                containers: Vec::arbitrary(g),
            }
        }
    }

    #[quickcheck]
    fn prop_compare_is_reflexive(def: TaskDefinition) -> bool {
        compare(&def, &def).is_empty()
    }
}
