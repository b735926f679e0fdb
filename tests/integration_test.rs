use depper::{DepperConfig, FileId, OutputFormat, Session};
use depper::runner::{ChangeSource, select_tests};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_project(root: &Path, files: &[(&str, &str)]) -> anyhow::Result<()> {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

fn ids(list: &[&str]) -> BTreeSet<FileId> {
    list.iter().map(|s| FileId::new(s)).collect()
}

fn symbols(file: &str, names: &[&str]) -> BTreeMap<String, BTreeSet<String>> {
    BTreeMap::from([(
        file.to_string(),
        names.iter().map(|n| n.to_string()).collect(),
    )])
}

/// Auth service -> models -> validators, each with its own tests.
fn sample_project() -> anyhow::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("src/__init__.py", ""),
            (
                "src/validators.py",
                "import re\n\n\ndef validate_email(email):\n    return bool(re.match(r\".+@.+\", email))\n\n\ndef validate_username(name):\n    return name.isalnum()\n",
            ),
            (
                "src/models.py",
                "from .validators import validate_email\n\n\nclass User:\n    def __init__(self, email):\n        validate_email(email)\n        self.email = email\n\n\nclass Admin(User):\n    pass\n",
            ),
            (
                "src/auth.py",
                "from .models import User, Admin\n\n\nclass AuthService:\n    def login(self, user):\n        return isinstance(user, (User, Admin))\n",
            ),
            (
                "tests/test_auth.py",
                "import pytest\nfrom src.auth import AuthService\nfrom src.models import User, Admin\n",
            ),
            ("tests/test_models.py", "import pytest\nfrom src.models import User, Admin\n"),
            (
                "tests/test_validators.py",
                "import pytest\nfrom src.validators import validate_email, validate_username\n",
            ),
        ],
    )?;
    Ok(temp_dir)
}

#[test]
fn test_sample_project_graph() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(session.dependencies_of("src/auth.py"), ids(&["src/models.py"]));
    assert_eq!(session.dependencies_of("src/models.py"), ids(&["src/validators.py"]));
    // `import re` and `import pytest` never produce edges
    assert!(session.dependencies_of("src/validators.py").is_empty());
    assert_eq!(
        session.dependencies_of("tests/test_auth.py"),
        ids(&["src/__init__.py", "src/auth.py", "src/models.py"])
    );
    assert_eq!(
        session.test_files(),
        ids(&["tests/test_auth.py", "tests/test_models.py", "tests/test_validators.py"])
    );
    Ok(())
}

#[test]
fn test_transitive_selection() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(
        session.affected_tests(&["src/validators.py"]),
        ids(&["tests/test_auth.py", "tests/test_models.py", "tests/test_validators.py"])
    );
    assert_eq!(
        session.affected_tests(&["src/auth.py"]),
        ids(&["tests/test_auth.py"])
    );
    assert_eq!(
        session.affected_tests(&["tests/test_models.py"]),
        ids(&["tests/test_models.py"])
    );
    assert!(session.affected_tests::<&str>(&[]).is_empty());
    Ok(())
}

#[test]
fn test_symbol_selection() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(
        session.affected_tests_by_symbols(&symbols("src/validators.py", &["validate_username"])),
        ids(&["tests/test_validators.py"])
    );
    assert_eq!(
        session.affected_tests_by_symbols(&symbols("src/models.py", &["Admin"])),
        ids(&["tests/test_auth.py", "tests/test_models.py"])
    );
    // one hop only: nothing imports AuthService.login by name
    assert!(
        session
            .affected_tests_by_symbols(&symbols("src/auth.py", &["Unrelated"]))
            .is_empty()
    );
    Ok(())
}

#[test]
fn test_transitive_through_intermediate_module() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("a.py", "def f():\n    return 1\n"),
            ("b.py", "import a\n"),
            ("test_b.py", "import b\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(session.affected_tests(&["a.py"]), ids(&["test_b.py"]));
    Ok(())
}

#[test]
fn test_package_import_includes_init() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("pkg/__init__.py", "from .impl import helper\n"),
            ("pkg/impl.py", "def helper():\n    pass\n"),
            ("test_pkg.py", "import pkg\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(session.dependencies_of("test_pkg.py"), ids(&["pkg/__init__.py"]));
    assert_eq!(session.affected_tests(&["pkg/impl.py"]), ids(&["test_pkg.py"]));
    Ok(())
}

#[test]
fn test_symbol_overlap() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("calc.py", "def add(a, b):\n    return a + b\n\n\ndef subtract(a, b):\n    return a - b\n"),
            ("test_add.py", "from calc import add\n"),
            ("test_all.py", "from calc import *\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(
        session.affected_tests_by_symbols(&symbols("calc.py", &["add"])),
        ids(&["test_add.py", "test_all.py"])
    );
    // wildcard importers are always selected
    assert_eq!(
        session.affected_tests_by_symbols(&symbols("calc.py", &["subtract"])),
        ids(&["test_all.py"])
    );
    assert!(
        session
            .affected_tests_by_symbols(&symbols("calc.py", &[]))
            .is_empty()
    );
    Ok(())
}

#[test]
fn test_circular_imports() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("a.py", "import b\n"),
            ("b.py", "import a\n"),
            ("test_a.py", "import a\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(session.dependents_of("a.py"), ids(&["b.py", "test_a.py"]));
    assert_eq!(session.dependents_of("b.py"), ids(&["a.py"]));
    assert_eq!(session.affected_tests(&["b.py"]), ids(&["test_a.py"]));
    Ok(())
}

#[test]
fn test_no_edges_for_external_imports() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("app.py", "import os\nimport json\nimport requests\nfrom collections import OrderedDict\n"),
            ("test_app.py", "import app\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert!(session.dependencies_of("app.py").is_empty());
    assert_eq!(session.graph().edge_count(), 1);
    Ok(())
}

#[test]
fn test_editable_install_in_project_venv() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("my_app/core.py", "def f():\n    return 1\n"),
            ("tests/test_core.py", "from my_app.core import f\n"),
            (
                ".venv/lib/python3.12/site-packages/my_app-0.1.0.dist-info/METADATA",
                "Metadata-Version: 2.1\nName: my-app\nVersion: 0.1.0\n",
            ),
            (
                ".venv/lib/python3.12/site-packages/requests-2.31.0.dist-info/METADATA",
                "Metadata-Version: 2.1\nName: requests\n",
            ),
            (".venv/lib/python3.12/site-packages/my_app.pth", "/src\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[".venv".to_string()], &[])?;

    assert_eq!(
        session.dependencies_of("tests/test_core.py"),
        ids(&["my_app/core.py"])
    );
    assert_eq!(
        session.affected_tests(&["my_app/core.py"]),
        ids(&["tests/test_core.py"])
    );
    Ok(())
}

#[test]
fn test_relative_parent_import() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("app/__init__.py", "VERSION = 1\n"),
            ("app/api/__init__.py", ""),
            ("app/api/views.py", "from .. import VERSION\n"),
            ("tests/test_views.py", "from app.api.views import *\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert_eq!(session.dependencies_of("app/api/views.py"), ids(&["app/__init__.py"]));
    assert_eq!(session.affected_tests(&["app/__init__.py"]), ids(&["tests/test_views.py"]));
    Ok(())
}

#[test]
fn test_exclusions_and_depperignore() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("core.py", "X = 1\n"),
            ("venv/lib/site.py", "import core\n"),
            ("legacy/old.py", "import core\n"),
            ("generated/stub.py", "import core\n"),
            (".depperignore", "# generated code\ngenerated\n"),
        ],
    )?;
    let session = Session::build(
        temp_dir.path(),
        &["venv".to_string(), "legacy".to_string()],
        &[],
    )?;

    let indexed: Vec<&str> = session.file_index().iter().map(FileId::as_str).collect();
    assert_eq!(indexed, vec!["core.py"]);
    Ok(())
}

#[test]
fn test_unparsable_file_is_tolerated() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_project(
        temp_dir.path(),
        &[
            ("good.py", "def ok():\n    pass\n"),
            ("broken.py", "import good\ndef broken(:\n"),
            ("test_good.py", "import good\n"),
        ],
    )?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    assert!(session.graph().has_node("broken.py"));
    assert!(session.dependencies_of("broken.py").is_empty());
    assert_eq!(session.affected_tests(&["good.py"]), ids(&["test_good.py"]));
    Ok(())
}

#[test]
fn test_rebuild_is_idempotent_and_monotonic() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    let first = Session::build(temp_dir.path(), &[], &[])?;
    let second = Session::build(temp_dir.path(), &[], &[])?;

    for file in first.file_index().iter() {
        assert_eq!(
            first.dependencies_of(file.as_str()),
            second.dependencies_of(file.as_str())
        );
    }

    let small = first.affected_tests(&["src/auth.py"]);
    let large = first.affected_tests(&["src/auth.py", "src/validators.py"]);
    assert!(small.is_subset(&large));
    Ok(())
}

#[test]
fn test_graph_symmetry() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    let session = Session::build(temp_dir.path(), &[], &[])?;

    for file in session.file_index().iter() {
        for dependency in session.dependencies_of(file.as_str()) {
            assert!(session.dependents_of(dependency.as_str()).contains(file));
        }
        for dependent in session.dependents_of(file.as_str()) {
            assert!(session.dependencies_of(dependent.as_str()).contains(file));
        }
    }
    Ok(())
}

#[test]
fn test_end_to_end_with_config_file() -> anyhow::Result<()> {
    let temp_dir = sample_project()?;
    fs::write(
        temp_dir.path().join("depper.toml"),
        "output_format = \"json\"\nrun_all_on_empty = true\n",
    )?;

    let config = DepperConfig::load_from_dir(temp_dir.path())?.unwrap_or_default();
    assert_eq!(config.output_format, OutputFormat::Json);

    let report = select_tests(
        &config,
        &ChangeSource::Files(vec!["src/models.py".to_string()]),
    )?;
    let selected: Vec<&str> = report.selected.iter().map(FileId::as_str).collect();
    assert_eq!(selected, vec!["tests/test_auth.py", "tests/test_models.py"]);
    assert_eq!(
        report.pytest_command().as_deref(),
        Some("pytest tests/test_auth.py tests/test_models.py")
    );
    Ok(())
}
