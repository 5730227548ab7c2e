//! Host workspace identity

use std::path::{Path, PathBuf};

/// The host directory a dev container is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Absolute path of the host working directory
    pub path: PathBuf,
    /// Last path segment, used for default names
    pub name: String,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = basename(&path.to_string_lossy());
        Self { path, name }
    }

    /// Workspace rooted at the process working directory
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Last segment of a slash separated path, ignoring trailing separators
pub fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_name_is_basename() {
        let ws = Workspace::new("/home/u/myproj");
        assert_eq!(ws.name, "myproj");
        assert_eq!(ws.path_str(), "/home/u/myproj");
    }

    #[test]
    fn test_basename_trailing_slash() {
        assert_eq!(basename("/workspace/"), "workspace");
        assert_eq!(basename("/"), "");
    }
}
