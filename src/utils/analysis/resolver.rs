//! Import resolution: from an [`ImportDeclaration`] to project files
//!
//! Resolution is deliberately generous. Python decides at runtime whether
//! `a.b.c` names a module, a package, or an attribute re-exported by a package
//! `__init__`, so every file that could hold the name is returned.

use std::collections::BTreeSet;

use crate::core::{FileId, FileIndex, ImportDeclaration};
use crate::utils::analysis::external::ExternalClassifier;

pub struct ImportResolver<'a> {
    index: &'a FileIndex,
    external: &'a dyn ExternalClassifier,
}

impl<'a> ImportResolver<'a> {
    pub fn new(index: &'a FileIndex, external: &'a dyn ExternalClassifier) -> Self {
        Self { index, external }
    }

    /// Resolves `declaration`, written inside `importer`, to the project files
    /// it may denote. External and unknown modules resolve to nothing.
    pub fn resolve(&self, declaration: &ImportDeclaration, importer: &FileId) -> BTreeSet<FileId> {
        if declaration.is_relative() {
            self.resolve_relative(&declaration.module, declaration.level, importer)
        } else {
            self.resolve_absolute(&declaration.module)
        }
    }

    /// True if the top-level name is not part of the project.
    pub fn is_external(&self, top_level: &str) -> bool {
        self.external.is_external(top_level) || !self.index.has_prefix(top_level)
    }

    fn resolve_absolute(&self, module: &str) -> BTreeSet<FileId> {
        let mut resolved = BTreeSet::new();
        let parts: Vec<&str> = module.split('.').filter(|p| !p.is_empty()).collect();
        let Some(top_level) = parts.first() else {
            return resolved;
        };

        if self.is_external(top_level) {
            tracing::trace!(module, "skipping external import");
            return resolved;
        }

        for i in (1..=parts.len()).rev() {
            let prefix = parts[..i].join("/");

            self.add_if_indexed(&format!("{}.py", prefix), &mut resolved);

            let init = format!("{}/__init__.py", prefix);
            if self.add_if_indexed(&init, &mut resolved) && i < parts.len() {
                // Package prefix matched with trailing components left: the
                // next component may be a submodule rather than a re-export.
                self.add_if_indexed(&format!("{}/{}.py", prefix, parts[i]), &mut resolved);
            }
        }

        resolved
    }

    fn resolve_relative(&self, module: &str, level: usize, importer: &FileId) -> BTreeSet<FileId> {
        let mut resolved = BTreeSet::new();

        let mut dir = importer.dir_segments();
        for _ in 1..level {
            dir.pop();
        }

        let mut target = dir.join("/");
        if !module.is_empty() {
            let module_path = module.replace('.', "/");
            target = if target.is_empty() {
                module_path
            } else {
                format!("{}/{}", target, module_path)
            };
            self.add_if_indexed(&format!("{}.py", target), &mut resolved);
        }

        let init = if target.is_empty() {
            "__init__.py".to_string()
        } else {
            format!("{}/__init__.py", target)
        };
        self.add_if_indexed(&init, &mut resolved);

        resolved
    }

    fn add_if_indexed(&self, candidate: &str, resolved: &mut BTreeSet<FileId>) -> bool {
        if self.index.contains(candidate) {
            resolved.insert(FileId::new(candidate));
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ImportedSymbols;
    use crate::utils::analysis::external::PythonEnvironment;

    fn ids(list: &[&str]) -> BTreeSet<FileId> {
        list.iter().map(|s| FileId::new(s)).collect()
    }

    fn absolute(module: &str) -> ImportDeclaration {
        ImportDeclaration::absolute(module, ImportedSymbols::Wildcard)
    }

    fn relative(module: &str, level: usize) -> ImportDeclaration {
        ImportDeclaration::relative(module, level, ImportedSymbols::names(["x"]))
    }

    #[test]
    fn test_resolve_module_file() {
        let index = FileIndex::from_files(".", ["a.py", "b.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        assert_eq!(resolver.resolve(&absolute("a"), &FileId::new("b.py")), ids(&["a.py"]));
    }

    #[test]
    fn test_resolve_package_includes_init() {
        let index = FileIndex::from_files(".", ["pkg/__init__.py", "pkg/impl.py", "consumer.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&absolute("pkg"), &FileId::new("consumer.py"));
        assert_eq!(resolved, ids(&["pkg/__init__.py"]));
    }

    #[test]
    fn test_resolve_progressive_prefixes() {
        let index = FileIndex::from_files(
            ".",
            ["a/__init__.py", "a/b/__init__.py", "a/b/c.py", "a/b.py", "main.py"],
        );
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&absolute("a.b.c"), &FileId::new("main.py"));
        assert_eq!(
            resolved,
            ids(&["a/__init__.py", "a/b/__init__.py", "a/b/c.py", "a/b.py"])
        );
    }

    #[test]
    fn test_resolve_attribute_of_package() {
        // `import pkg.helper` where helper is a name defined in pkg/__init__.py
        let index = FileIndex::from_files(".", ["pkg/__init__.py", "main.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&absolute("pkg.helper"), &FileId::new("main.py"));
        assert_eq!(resolved, ids(&["pkg/__init__.py"]));
    }

    #[test]
    fn test_external_imports_resolve_to_nothing() {
        let index = FileIndex::from_files(".", ["os.py", "requests_helpers.py", "main.py"]);
        let env = PythonEnvironment::new(["os"], ["Requests"]);
        let resolver = ImportResolver::new(&index, &env);
        let main = FileId::new("main.py");

        // stdlib name wins even if the project shadows it
        assert!(resolver.resolve(&absolute("os"), &main).is_empty());
        assert!(resolver.resolve(&absolute("requests"), &main).is_empty());
        // unknown to the project: no file starts with the name
        assert!(resolver.resolve(&absolute("numpy"), &main).is_empty());
    }

    #[test]
    fn test_resolve_relative_sibling() {
        let index = FileIndex::from_files(".", ["src/auth.py", "src/models.py", "src/__init__.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&relative("models", 1), &FileId::new("src/auth.py"));
        assert_eq!(resolved, ids(&["src/models.py"]));
    }

    #[test]
    fn test_resolve_relative_parent_package_init() {
        let index = FileIndex::from_files(
            ".",
            ["app/__init__.py", "app/config.py", "app/api/__init__.py", "app/api/views.py"],
        );
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);
        let views = FileId::new("app/api/views.py");

        // from .. import config
        assert_eq!(resolver.resolve(&relative("", 2), &views), ids(&["app/__init__.py"]));
        // from . import x
        assert_eq!(resolver.resolve(&relative("", 1), &views), ids(&["app/api/__init__.py"]));
        // from ..config import x
        assert_eq!(resolver.resolve(&relative("config", 2), &views), ids(&["app/config.py"]));
    }

    #[test]
    fn test_resolve_relative_dotted_module_package() {
        let index = FileIndex::from_files(".", ["app/core/db/__init__.py", "app/api/views.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&relative("core.db", 2), &FileId::new("app/api/views.py"));
        assert_eq!(resolved, ids(&["app/core/db/__init__.py"]));
    }

    #[test]
    fn test_resolve_relative_above_root_saturates() {
        let index = FileIndex::from_files(".", ["__init__.py", "util.py", "main.py"]);
        let env = PythonEnvironment::stdlib_only();
        let resolver = ImportResolver::new(&index, &env);

        let resolved = resolver.resolve(&relative("util", 3), &FileId::new("main.py"));
        assert_eq!(resolved, ids(&["util.py"]));
    }
}
