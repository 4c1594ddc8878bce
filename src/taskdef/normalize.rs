use std::collections::BTreeMap;

use serde_json::Value;

/// A task definition reduced to the fields that matter for operational
/// comparison. AWS metadata (ARNs, registration timestamps, status,
/// compatibility lists) does not survive normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub family: String,
    pub revision: i64,
    /// Task-level cpu, carried as the string AWS returns it as.
    pub task_cpu: Option<String>,
    pub task_memory: Option<String>,
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub cpu: Option<i64>,
    pub memory: Option<i64>,
    pub environment: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub mount_points: Vec<MountPoint>,
    pub command: Option<Vec<String>>,
    pub entry_point: Option<Vec<String>>,
    pub log_driver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: Option<i64>,
    pub host_port: Option<i64>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub source_volume: Option<String>,
    pub container_path: Option<String>,
    pub read_only: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MalformedDefinition {
    #[error("task definition is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("container definition at index {index} is missing required field `{field}`")]
    MissingContainerField { index: usize, field: &'static str },
}

/// Reduce a raw `describe-task-definition` payload to a [`TaskDefinition`].
///
/// Extra provider fields are tolerated and dropped. `family` and `revision`
/// are required at the task level, `name` and `image` per container.
/// Absent `environment`/`secrets` become empty maps and absent
/// `portMappings`/`mountPoints` empty sequences, so the differ never has
/// to distinguish "absent" from "present but empty".
pub fn normalize(raw: &Value) -> Result<TaskDefinition, MalformedDefinition> {
    let family = raw
        .get("family")
        .and_then(Value::as_str)
        .ok_or(MalformedDefinition::MissingField("family"))?
        .to_string();
    let revision = raw
        .get("revision")
        .and_then(Value::as_i64)
        .ok_or(MalformedDefinition::MissingField("revision"))?;

    let mut containers = Vec::new();
    if let Some(defs) = raw.get("containerDefinitions").and_then(Value::as_array) {
        for (index, def) in defs.iter().enumerate() {
            containers.push(normalize_container(def, index)?);
        }
    }

    Ok(TaskDefinition {
        family,
        revision,
        task_cpu: scalar_string(raw.get("cpu")),
        task_memory: scalar_string(raw.get("memory")),
        containers,
    })
}

fn normalize_container(
    def: &Value,
    index: usize,
) -> Result<ContainerDefinition, MalformedDefinition> {
    let name = def
        .get("name")
        .and_then(Value::as_str)
        .ok_or(MalformedDefinition::MissingContainerField {
            index,
            field: "name",
        })?
        .to_string();
    let image = def
        .get("image")
        .and_then(Value::as_str)
        .ok_or(MalformedDefinition::MissingContainerField {
            index,
            field: "image",
        })?
        .to_string();

    let log_driver = def
        .get("logConfiguration")
        .and_then(|config| config.get("logDriver"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ContainerDefinition {
        name,
        image,
        cpu: def.get("cpu").and_then(Value::as_i64),
        memory: def.get("memory").and_then(Value::as_i64),
        environment: name_value_map(def.get("environment"), "value"),
        secrets: name_value_map(def.get("secrets"), "valueFrom"),
        ports: def
            .get("portMappings")
            .and_then(Value::as_array)
            .map(|mappings| mappings.iter().map(port_mapping).collect())
            .unwrap_or_default(),
        mount_points: def
            .get("mountPoints")
            .and_then(Value::as_array)
            .map(|points| points.iter().map(mount_point).collect())
            .unwrap_or_default(),
        command: string_list(def.get("command")),
        entry_point: string_list(def.get("entryPoint")),
        log_driver,
    })
}

/// Collapse a `[{name, <value_key>}]` list into a map. Entries missing
/// either field are skipped; a duplicate name lets the last value win.
fn name_value_map(list: Option<&Value>, value_key: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(entries) = list.and_then(Value::as_array) {
        for entry in entries {
            let name = entry.get("name").and_then(Value::as_str);
            let value = entry.get(value_key).and_then(Value::as_str);
            if let (Some(name), Some(value)) = (name, value) {
                map.insert(name.to_string(), value.to_string());
            }
        }
    }
    map
}

fn port_mapping(value: &Value) -> PortMapping {
    PortMapping {
        container_port: value.get("containerPort").and_then(Value::as_i64),
        host_port: value.get("hostPort").and_then(Value::as_i64),
        protocol: value.get("protocol").and_then(Value::as_str).map(str::to_string),
    }
}

fn mount_point(value: &Value) -> MountPoint {
    MountPoint {
        source_volume: value
            .get("sourceVolume")
            .and_then(Value::as_str)
            .map(str::to_string),
        container_path: value
            .get("containerPath")
            .and_then(Value::as_str)
            .map(str::to_string),
        read_only: value
            .get("readOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}
