//! Classification of referenced modules as external.
//!
//! A module counts as external when its defining location lives under the
//! standard/third-party library install root rather than inside the
//! project. Two resolution strategies feed the same resolver: names taken
//! from import statements, and bare name references looked up in the
//! enclosing file's import bindings.

use std::collections::HashMap;
use std::path::PathBuf;

/// Resolves a top-level module name to whether it is library-installed.
pub trait ModuleResolver: Send + Sync {
    /// True when `name` resolves to a module under the library install
    /// location rather than the local project.
    fn is_external(&self, name: &str) -> bool;
}

/// Resolver that tests module origins against a library install root,
/// mirroring an interpreter's stdlib/site-packages layout: a module is
/// external when `<root>/<name>` is a package directory or
/// `<root>/<name>.<ext>` is a module file.
#[derive(Debug, Clone)]
pub struct InstallRootResolver {
    root: PathBuf,
    extensions: Vec<String>,
}

impl InstallRootResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["py".to_string(), "so".to_string()],
        }
    }

    /// Replace the module-file extensions considered during resolution.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }
}

impl ModuleResolver for InstallRootResolver {
    fn is_external(&self, name: &str) -> bool {
        // An unset root classifies nothing as external.
        if name.is_empty() || self.root.as_os_str().is_empty() {
            return false;
        }
        let top = name.split('.').next().unwrap_or(name);
        if self.root.join(top).is_dir() {
            return true;
        }
        self.extensions
            .iter()
            .any(|ext| self.root.join(format!("{top}.{ext}")).is_file())
    }
}

/// Name bindings introduced by a source file's import statements:
/// bound name -> top-level module it came from.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    imports: HashMap<String, String>,
}

impl ModuleScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `binding` refers into `module`.
    pub fn bind(&mut self, binding: impl Into<String>, module: impl Into<String>) {
        let module = module.into();
        let top = module.split('.').next().unwrap_or(&module).to_string();
        self.imports.insert(binding.into(), top);
    }

    /// The top-level module a bare name reference resolves to, if any.
    pub fn module_for(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_install_root_resolver_package_and_module() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("numpy")).unwrap();
        fs::write(root.path().join("pickle.py"), "").unwrap();

        let resolver = InstallRootResolver::new(root.path());
        assert!(resolver.is_external("numpy"));
        assert!(resolver.is_external("numpy.linalg"));
        assert!(resolver.is_external("pickle"));
        assert!(!resolver.is_external("my_project_module"));
    }

    #[test]
    fn test_unset_root_resolves_nothing() {
        let resolver = InstallRootResolver::new("");
        assert!(!resolver.is_external("os"));
    }

    #[test]
    fn test_scope_binds_to_top_module() {
        let mut scope = ModuleScope::new();
        scope.bind("path", "os.path");
        scope.bind("np", "numpy");

        assert_eq!(scope.module_for("path"), Some("os"));
        assert_eq!(scope.module_for("np"), Some("numpy"));
        assert_eq!(scope.module_for("unbound"), None);
    }
}
