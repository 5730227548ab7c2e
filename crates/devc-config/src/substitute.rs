//! Variable substitution for devcontainer.json values
//!
//! Resolved on load, one pass per variable kind, in this order:
//! - `${localEnv:VAR}` / `${localEnv:VAR:default}`: host environment variable
//! - `${localWorkspaceFolder}`: host workspace path
//! - `${containerWorkspaceFolder}`: container workspace path (`workspaceFolder`)
//! - `${localWorkspaceFolderBasename}`: last segment of host workspace path
//! - `${containerWorkspaceFolderBasename}`: last segment of container workspace path
//!
//! `${containerEnv:VAR}` is left as-is here. It needs a live engine and is
//! resolved with [`resolve_container_env`] when an exec injects `remoteEnv`.

use crate::{basename, DevContainerConfig, Workspace};
use std::collections::{BTreeMap, HashMap};

/// Variable kinds resolved from host-side context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    LocalEnv,
    LocalWorkspaceFolder,
    ContainerWorkspaceFolder,
    LocalWorkspaceFolderBasename,
    ContainerWorkspaceFolderBasename,
}

impl Placeholder {
    /// Pass order. `containerWorkspaceFolder*` read `workspaceFolder` after the
    /// earlier passes have resolved it.
    pub const PASSES: [Placeholder; 5] = [
        Placeholder::LocalEnv,
        Placeholder::LocalWorkspaceFolder,
        Placeholder::ContainerWorkspaceFolder,
        Placeholder::LocalWorkspaceFolderBasename,
        Placeholder::ContainerWorkspaceFolderBasename,
    ];

    /// Variable name as written inside `${...}`
    pub fn token(&self) -> &'static str {
        match self {
            Self::LocalEnv => "localEnv",
            Self::LocalWorkspaceFolder => "localWorkspaceFolder",
            Self::ContainerWorkspaceFolder => "containerWorkspaceFolder",
            Self::LocalWorkspaceFolderBasename => "localWorkspaceFolderBasename",
            Self::ContainerWorkspaceFolderBasename => "containerWorkspaceFolderBasename",
        }
    }
}

/// Configuration fields that go through variable resolution
pub const RESOLVED_FIELDS: [&str; 19] = [
    "build.args",
    "build.cacheFrom",
    "build.context",
    "build.dockerfile",
    "build.target",
    "containerEnv",
    "containerUser",
    "dockerComposeFile",
    "forwardPorts",
    "image",
    "mounts",
    "name",
    "remoteEnv",
    "remoteUser",
    "runArgs",
    "runServices",
    "service",
    "workspaceFolder",
    "workspaceMount",
];

/// Mutable view of one string-bearing field
enum FieldMut<'a> {
    Str(&'a mut String),
    OptStr(&'a mut Option<String>),
    List(&'a mut Vec<String>),
    Map(&'a mut BTreeMap<String, String>),
}

impl FieldMut<'_> {
    fn apply(self, f: &dyn Fn(&str) -> String) {
        match self {
            FieldMut::Str(s) => *s = f(s.as_str()),
            FieldMut::OptStr(opt) => {
                if let Some(s) = opt {
                    *s = f(s.as_str());
                }
            }
            FieldMut::List(list) => {
                for s in list.iter_mut() {
                    *s = f(s.as_str());
                }
            }
            FieldMut::Map(map) => {
                for v in map.values_mut() {
                    *v = f(v.as_str());
                }
            }
        }
    }
}

fn field_mut<'a>(config: &'a mut DevContainerConfig, path: &str) -> Option<FieldMut<'a>> {
    let field = match path {
        "build.args" => FieldMut::Map(&mut config.build.args),
        "build.cacheFrom" => FieldMut::List(&mut config.build.cache_from),
        "build.context" => FieldMut::Str(&mut config.build.context),
        "build.dockerfile" => FieldMut::OptStr(&mut config.build.dockerfile),
        "build.target" => FieldMut::OptStr(&mut config.build.target),
        "containerEnv" => FieldMut::Map(&mut config.container_env),
        "containerUser" => FieldMut::OptStr(&mut config.container_user),
        "dockerComposeFile" => FieldMut::List(&mut config.docker_compose_file),
        "forwardPorts" => FieldMut::List(&mut config.forward_ports),
        "image" => FieldMut::OptStr(&mut config.image),
        "mounts" => FieldMut::List(&mut config.mounts),
        "name" => FieldMut::Str(&mut config.name),
        "remoteEnv" => FieldMut::Map(&mut config.remote_env),
        "remoteUser" => FieldMut::OptStr(&mut config.remote_user),
        "runArgs" => FieldMut::List(&mut config.run_args),
        "runServices" => FieldMut::List(&mut config.run_services),
        "service" => FieldMut::OptStr(&mut config.service),
        "workspaceFolder" => FieldMut::Str(&mut config.workspace_folder),
        "workspaceMount" => FieldMut::Str(&mut config.workspace_mount),
        _ => return None,
    };
    Some(field)
}

/// Resolve every host-side variable in the resolvable fields
///
/// Expects defaults to be applied already so `workspaceFolder` holds its final value.
pub fn resolve(mut config: DevContainerConfig, workspace: &Workspace) -> DevContainerConfig {
    for pass in Placeholder::PASSES {
        let substitute: Box<dyn Fn(&str) -> String> = match pass {
            Placeholder::LocalEnv => Box::new(resolve_local_env),
            Placeholder::LocalWorkspaceFolder => {
                let value = workspace.path_str();
                Box::new(move |s: &str| replace_literal(s, pass, &value))
            }
            Placeholder::ContainerWorkspaceFolder => {
                let value = config.workspace_folder.clone();
                Box::new(move |s: &str| replace_literal(s, pass, &value))
            }
            Placeholder::LocalWorkspaceFolderBasename => {
                let value = workspace.name.clone();
                Box::new(move |s: &str| replace_literal(s, pass, &value))
            }
            Placeholder::ContainerWorkspaceFolderBasename => {
                let value = basename(&config.workspace_folder);
                Box::new(move |s: &str| replace_literal(s, pass, &value))
            }
        };

        for path in RESOLVED_FIELDS {
            if let Some(field) = field_mut(&mut config, path) {
                field.apply(substitute.as_ref());
            }
        }
    }

    tracing::debug!("Resolved devcontainer config: {:?}", config);
    config
}

/// Replace `${localEnv:VAR}` and `${localEnv:VAR:default}` occurrences
pub fn resolve_local_env(input: &str) -> String {
    replace_tokens(input, |token| {
        let rest = token.strip_prefix("localEnv:")?;
        let (name, default) = match rest.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (rest, None),
        };
        if !is_variable_name(name) {
            return None;
        }
        Some(
            std::env::var(name)
                .ok()
                .or_else(|| default.map(str::to_string))
                .unwrap_or_default(),
        )
    })
}

/// Names referenced by `${containerEnv:VAR}` in a string, in order of appearance
pub fn container_env_names(input: &str) -> Vec<String> {
    let mut names = Vec::new();
    replace_tokens(input, |token| {
        let name = container_env_name(token)?;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        None
    });
    names
}

/// Replace `${containerEnv:VAR}` with values read from the running container
///
/// Variables missing from `values` resolve to an empty string.
pub fn resolve_container_env(input: &str, values: &HashMap<String, String>) -> String {
    replace_tokens(input, |token| {
        let name = container_env_name(token)?;
        Some(values.get(name).cloned().unwrap_or_default())
    })
}

fn container_env_name(token: &str) -> Option<&str> {
    token
        .strip_prefix("containerEnv:")
        .filter(|name| is_variable_name(name))
}

fn replace_literal(input: &str, placeholder: Placeholder, value: &str) -> String {
    replace_tokens(input, |token| {
        (token == placeholder.token()).then(|| value.to_string())
    })
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scan `input` for `${token}` and replace each one `resolve` knows about
///
/// Unknown tokens are kept verbatim. Replacement values are not rescanned.
fn replace_tokens(input: &str, mut resolve: impl FnMut(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) => match resolve(&after[..end]) {
                Some(value) => {
                    result.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    // keep the opener and keep scanning, inner tokens may still match
                    result.push_str("${");
                    rest = after;
                }
            },
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}
