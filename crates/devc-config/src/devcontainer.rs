//! devcontainer.json configuration parsing
//!
//! Loading is a pipeline of plain value transformations:
//! parse (JSONC + synonyms + normalization) -> defaults -> validation.

use crate::{ConfigError, Result, Workspace};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// File name looked up inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "devcontainer.json";

/// Default configuration directory, relative to the workspace
pub const DEFAULT_CONFIG_DIR: &str = ".devcontainer";

/// Default container-side workspace folder
pub const DEFAULT_WORKSPACE_FOLDER: &str = "/workspace";

/// Complete devcontainer.json configuration
///
/// Fields that accept either a scalar or a list in the file are always held
/// in list form here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevContainerConfig {
    /// Project name, defaults to the workspace basename
    pub name: String,

    /// Image to run (single-container mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image build parameters
    #[serde(skip_serializing_if = "BuildConfig::is_empty")]
    pub build: BuildConfig,

    /// Compose files (multi-service mode)
    #[serde(deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub docker_compose_file: Vec<String>,

    /// Compose service the dev container attaches to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Compose services to start, all when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_services: Vec<String>,

    /// Environment set at container creation
    #[serde(deserialize_with = "env_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub container_env: BTreeMap<String, String>,

    /// Environment set on every exec / attach
    #[serde(deserialize_with = "env_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub remote_env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_user: Option<String>,

    /// Extra mounts in engine `--mount` syntax
    #[serde(deserialize_with = "mount_list", skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<String>,

    /// Ports to publish
    #[serde(deserialize_with = "port_list", skip_serializing_if = "Vec::is_empty")]
    pub forward_ports: Vec<String>,

    /// Extra arguments for container creation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_args: Vec<String>,

    /// Linux capabilities to add
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,

    /// Security options
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_opt: Vec<String>,

    /// Working directory inside the container
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workspace_folder: String,

    /// Bind mount of the host workspace
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workspace_mount: String,

    /// Keep the container alive with a sleep loop instead of its entrypoint
    pub override_command: bool,

    /// Run an init process (PID 1) inside the container
    pub init: bool,

    /// Run container in privileged mode
    pub privileged: bool,

    #[serde(rename = "updateRemoteUserUID")]
    pub update_remote_user_uid: bool,

    /// Command to run on the host before the engine is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize_command: Option<LifecycleCommand>,

    /// Command to run when container is created (runs before postCreateCommand)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_create_command: Option<LifecycleCommand>,

    /// Command to run after container is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_create_command: Option<LifecycleCommand>,

    /// Command to run after container starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_start_command: Option<LifecycleCommand>,

    /// Command to run when attaching a shell
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_attach_command: Option<LifecycleCommand>,

    /// Options we parse but don't act on (customizations, features, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for DevContainerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: None,
            build: BuildConfig::default(),
            docker_compose_file: Vec::new(),
            service: None,
            run_services: Vec::new(),
            container_env: BTreeMap::new(),
            remote_env: BTreeMap::new(),
            container_user: None,
            remote_user: None,
            mounts: Vec::new(),
            forward_ports: Vec::new(),
            run_args: Vec::new(),
            cap_add: Vec::new(),
            security_opt: Vec::new(),
            workspace_folder: String::new(),
            workspace_mount: String::new(),
            override_command: true,
            init: false,
            privileged: false,
            update_remote_user_uid: true,
            initialize_command: None,
            on_create_command: None,
            post_create_command: None,
            post_start_command: None,
            post_attach_command: None,
            extra: HashMap::new(),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Path to Dockerfile, relative to the configuration directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    /// Build context path
    pub context: String,

    /// Build arguments
    #[serde(deserialize_with = "env_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,

    /// Target stage in multi-stage build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Cache from images
    #[serde(deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub cache_from: Vec<String>,
}

impl BuildConfig {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lifecycle hook: a shell string, an argv list, or named commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LifecycleCommand {
    /// Run through `sh -c`
    Shell(String),
    /// Run as-is
    Argv(Vec<String>),
    /// Named commands, run one after another in name order
    Named(BTreeMap<String, StringOrArray>),
}

impl LifecycleCommand {
    /// Every command this hook expands to, as argv lists; empty entries are skipped
    pub fn argvs(&self) -> Vec<Vec<String>> {
        match self {
            Self::Shell(cmd) => shell_argv(cmd).into_iter().collect(),
            Self::Argv(args) if args.is_empty() => Vec::new(),
            Self::Argv(args) => vec![args.clone()],
            Self::Named(commands) => commands
                .values()
                .filter_map(|cmd| match cmd {
                    StringOrArray::String(s) => shell_argv(s),
                    StringOrArray::Array(a) if a.is_empty() => None,
                    StringOrArray::Array(a) => Some(a.clone()),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.argvs().is_empty()
    }
}

fn shell_argv(cmd: &str) -> Option<Vec<String>> {
    if cmd.trim().is_empty() {
        None
    } else {
        Some(vec!["sh".to_string(), "-c".to_string(), cmd.to_string()])
    }
}

/// String or array of strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrArray {
    String(String),
    Array(Vec<String>),
}

impl StringOrArray {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::String(s) => vec![s],
            Self::Array(a) => a,
        }
    }
}

/// Mount configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Mount {
    /// "type=bind,source=/path,target=/path"
    String(String),
    Object(MountObject),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MountObject {
    #[serde(rename = "type")]
    mount_type: Option<String>,
    source: Option<String>,
    target: String,
    #[serde(default)]
    read_only: bool,
}

impl Mount {
    fn into_engine_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Object(obj) => {
                let mut parts = vec![format!(
                    "type={}",
                    obj.mount_type.as_deref().unwrap_or("bind")
                )];
                if let Some(source) = obj.source {
                    parts.push(format!("source={}", source));
                }
                parts.push(format!("target={}", obj.target));
                if obj.read_only {
                    parts.push("readonly".to_string());
                }
                parts.join(",")
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Port {
    Number(u16),
    String(String),
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrArray>::deserialize(deserializer)?
        .map(StringOrArray::into_vec)
        .unwrap_or_default())
}

fn mount_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Mount>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(Mount::into_engine_string)
        .collect())
}

fn port_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Port>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|p| match p {
            Port::Number(n) => n.to_string(),
            Port::String(s) => s,
        })
        .collect())
}

/// Env maps allow `null` values to mean "unset"; those entries are dropped
fn env_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect(),
    )
}

/// Where the dev container image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Pre-built image
    Image(String),
    /// Build from Dockerfile
    Dockerfile(String),
    /// Compose files
    Compose(Vec<String>),
}

/// Top-level keys that are synonyms for keys under `build`
const BUILD_SYNONYMS: [(&str, &str); 3] = [
    ("dockerfile", "dockerfile"),
    ("dockerFile", "dockerfile"),
    ("context", "context"),
];

impl DevContainerConfig {
    /// Load, default and validate `<config_dir>/devcontainer.json`
    pub fn load(config_dir: &Path, workspace: &Workspace) -> Result<Self> {
        let config = Self::load_from(&config_dir.join(CONFIG_FILE_NAME))?.with_defaults(workspace);
        config.validate()?;
        tracing::debug!("Loaded devcontainer config: {:?}", config);
        Ok(config)
    }

    /// Parse a devcontainer.json file without defaults or validation
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse devcontainer.json content
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let content = strip_trailing_commas(&strip_json_comments(content));

        let mut value: Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::JsonParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        apply_synonyms(&mut value);

        serde_json::from_value(value).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Fill in values derived from the workspace when the file leaves them unset
    pub fn with_defaults(mut self, workspace: &Workspace) -> Self {
        if self.build.context.is_empty() {
            self.build.context = ".".to_string();
        }
        if self.name.is_empty() {
            self.name = workspace.name.clone();
        }
        if self.workspace_folder.is_empty() {
            self.workspace_folder = DEFAULT_WORKSPACE_FOLDER.to_string();
        }
        if self.workspace_mount.is_empty() {
            self.workspace_mount = format!(
                "type=bind,source={},target={},consistency=cached",
                workspace.path_str(),
                self.workspace_folder
            );
        }
        self
    }

    /// Check required and mutually exclusive settings
    pub fn validate(&self) -> Result<()> {
        let set: Vec<&'static str> = [
            ("image", self.image().is_some()),
            ("build.dockerfile", self.dockerfile().is_some()),
            ("dockerComposeFile", !self.docker_compose_file.is_empty()),
        ]
        .into_iter()
        .filter_map(|(key, is_set)| is_set.then_some(key))
        .collect();

        match set.as_slice() {
            [] => return Err(ConfigError::MissingSource),
            [_] => {}
            [first, second, ..] => {
                return Err(ConfigError::Conflict {
                    first: *first,
                    second: *second,
                })
            }
        }

        if !self.docker_compose_file.is_empty() && self.service().is_none() {
            return Err(ConfigError::ServiceRequired);
        }

        Ok(())
    }

    /// Get the effective image source
    pub fn image_source(&self) -> Option<ImageSource> {
        if let Some(image) = self.image() {
            Some(ImageSource::Image(image.to_string()))
        } else if let Some(dockerfile) = self.dockerfile() {
            Some(ImageSource::Dockerfile(dockerfile.to_string()))
        } else if !self.docker_compose_file.is_empty() {
            Some(ImageSource::Compose(self.docker_compose_file.clone()))
        } else {
            None
        }
    }

    pub fn image(&self) -> Option<&str> {
        non_empty(&self.image)
    }

    pub fn dockerfile(&self) -> Option<&str> {
        non_empty(&self.build.dockerfile)
    }

    pub fn service(&self) -> Option<&str> {
        non_empty(&self.service)
    }

    /// Get the user for exec / attach (remoteUser, falling back to containerUser)
    pub fn effective_user(&self) -> Option<&str> {
        non_empty(&self.remote_user).or(non_empty(&self.container_user))
    }
}

/// Minimal configuration written by `devc init`
pub const SCAFFOLD: &str = "{\n  \"image\": \"alpine:latest\"\n}\n";

/// Create `<config_dir>/devcontainer.json` from [`SCAFFOLD`]
///
/// Returns `false` and leaves the file untouched when it already exists.
pub fn write_scaffold(config_dir: &Path) -> Result<bool> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
        path: config_dir.to_path_buf(),
        source: e,
    })?;
    std::fs::write(&path, SCAFFOLD).map_err(|e| ConfigError::WriteError {
        path: path.clone(),
        source: e,
    })?;

    tracing::info!("Created {}", path.display());
    Ok(true)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Move top-level synonym keys under `build`; an explicit `build.*` key wins
fn apply_synonyms(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };

    for (alias, key) in BUILD_SYNONYMS {
        let Some(aliased) = root.remove(alias) else {
            continue;
        };
        let build = root
            .entry("build")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(build) = build.as_object_mut() {
            build.entry(key).or_insert(aliased);
        }
    }
}

/// Strip JSON comments (// and /* */) for JSONC support
fn strip_json_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            result.push(c);
            continue;
        }

        if in_string {
            result.push(c);
            continue;
        }

        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    while let Some(&nc) = chars.peek() {
                        if nc == '\n' {
                            break;
                        }
                        chars.next();
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    while let Some(nc) = chars.next() {
                        if nc == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            break;
                        }
                    }
                    continue;
                }
                _ => {}
            }
        }

        result.push(c);
    }

    result
}

/// Drop commas that directly precede a closing `}` or `]`
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            result.push(c);
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|nc| !nc.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(c);
    }

    result
}
