//! External-module classification
//!
//! Decides whether a top-level import name belongs to the standard library or
//! to an installed third-party distribution. Such imports never become graph
//! edges.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::FileIndex;

/// Decides whether a top-level module name lives outside the project.
pub trait ExternalClassifier: Send + Sync {
    fn is_external(&self, top_level: &str) -> bool;
}

impl<F> ExternalClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_external(&self, top_level: &str) -> bool {
        self(top_level)
    }
}

/// Top-level module names shipped with CPython 3 (`sys.stdlib_module_names`).
pub const STDLIB_MODULES: &[&str] = &[
    "__future__", "_abc", "_aix_support", "_ast", "_asyncio", "_bisect", "_blake2",
    "_bootsubprocess", "_bz2", "_codecs", "_collections", "_collections_abc",
    "_compat_pickle", "_compression", "_contextvars", "_crypt", "_csv", "_ctypes",
    "_curses", "_datetime", "_decimal", "_elementtree", "_functools", "_hashlib",
    "_heapq", "_imp", "_io", "_json", "_locale", "_lsprof", "_lzma", "_markupbase",
    "_md5", "_multiprocessing", "_opcode", "_operator", "_osx_support", "_pickle",
    "_posixsubprocess", "_py_abc", "_pydecimal", "_pyio", "_queue", "_random",
    "_sha1", "_sha256", "_sha3", "_sha512", "_signal", "_sitebuiltins", "_socket",
    "_sqlite3", "_sre", "_ssl", "_stat", "_statistics", "_string", "_strptime",
    "_struct", "_symtable", "_thread", "_threading_local", "_tokenize", "_tracemalloc",
    "_typing", "_uuid", "_warnings", "_weakref", "_weakrefset", "_winapi", "_zoneinfo",
    "abc", "aifc", "antigravity", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "bisect", "builtins",
    "bz2", "cProfile", "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code",
    "codecs", "codeop", "collections", "colorsys", "compileall", "concurrent",
    "configparser", "contextlib", "contextvars", "copy", "copyreg", "crypt", "csv",
    "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis",
    "distutils", "doctest", "email", "encodings", "ensurepip", "enum", "errno",
    "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions", "ftplib",
    "functools", "gc", "genericpath", "getopt", "getpass", "gettext", "glob",
    "graphlib", "grp", "gzip", "hashlib", "heapq", "hmac", "html", "http", "idlelib",
    "imaplib", "imghdr", "imp", "importlib", "inspect", "io", "ipaddress", "itertools",
    "json", "keyword", "lib2to3", "linecache", "locale", "logging", "lzma", "mailbox",
    "mailcap", "marshal", "math", "mimetypes", "mmap", "modulefinder", "msilib",
    "msvcrt", "multiprocessing", "netrc", "nis", "nntplib", "nt", "ntpath",
    "nturl2path", "numbers", "opcode", "operator", "optparse", "os", "ossaudiodev",
    "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil", "platform",
    "plistlib", "poplib", "posix", "posixpath", "pprint", "profile", "pstats", "pty",
    "pwd", "py_compile", "pyclbr", "pydoc", "pydoc_data", "pyexpat", "queue", "quopri",
    "random", "re", "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched",
    "secrets", "select", "selectors", "shelve", "shlex", "shutil", "signal", "site",
    "smtpd", "smtplib", "sndhdr", "socket", "socketserver", "spwd", "sqlite3",
    "sre_compile", "sre_constants", "sre_parse", "ssl", "stat", "statistics", "string",
    "stringprep", "struct", "subprocess", "sunau", "symtable", "sys", "sysconfig",
    "syslog", "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "textwrap",
    "this", "threading", "time", "timeit", "tkinter", "token", "tokenize", "tomllib",
    "trace", "traceback", "tracemalloc", "tty", "turtle", "turtledemo", "types",
    "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

/// Default classifier: standard library names plus installed distributions.
#[derive(Debug, Clone, Default)]
pub struct PythonEnvironment {
    stdlib: HashSet<String>,
    /// Lowercased distribution and top-level package names.
    installed: HashSet<String>,
}

impl PythonEnvironment {
    pub fn new<I, J, S, T>(stdlib: I, installed: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: AsRef<str>,
    {
        Self {
            stdlib: stdlib.into_iter().map(Into::into).collect(),
            installed: installed
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Standard library only, nothing installed.
    pub fn stdlib_only() -> Self {
        Self::new(STDLIB_MODULES.iter().copied(), std::iter::empty::<&str>())
    }

    /// Standard library plus every distribution found in `site_packages`.
    pub fn discover(site_packages: &[PathBuf]) -> Self {
        let mut env = Self::stdlib_only();
        for dir in site_packages {
            let found = installed_packages(dir);
            tracing::debug!(dir = %dir.display(), packages = found.len(), "scanned site-packages");
            env.installed.extend(found);
        }
        env
    }

    /// Forgets installed names the project provides itself.
    ///
    /// A project installed into its own virtualenv (editable installs) shows
    /// up as a distribution; its package must still resolve to project files.
    /// Standard library names are kept.
    pub fn without_project_packages(mut self, index: &FileIndex) -> Self {
        self.installed.retain(|name| {
            let local = index.provides_module(name);
            if local {
                tracing::debug!(package = %name, "installed package is provided by the project");
            }
            !local
        });
        self
    }

    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }
}

impl ExternalClassifier for PythonEnvironment {
    fn is_external(&self, top_level: &str) -> bool {
        self.stdlib.contains(top_level) || self.installed.contains(&top_level.to_lowercase())
    }
}

/// Candidate site-packages directories for a project: the active virtualenv
/// plus `venv`/`.venv`/`env` inside the project root.
pub fn default_site_packages(project_root: &Path) -> Vec<PathBuf> {
    let mut envs: Vec<PathBuf> = [".venv", "venv", "env"]
        .iter()
        .map(|name| project_root.join(name))
        .collect();
    if let Some(active) = std::env::var_os("VIRTUAL_ENV") {
        envs.push(PathBuf::from(active));
    }

    let mut dirs = Vec::new();
    for env in envs {
        // Windows layout
        let flat = env.join("Lib").join("site-packages");
        if flat.is_dir() {
            dirs.push(flat);
        }
        // POSIX layout: lib/pythonX.Y/site-packages
        let Ok(entries) = fs::read_dir(env.join("lib")) else {
            continue;
        };
        for entry in entries.flatten() {
            let candidate = entry.path().join("site-packages");
            if entry.file_name().to_string_lossy().starts_with("python") && candidate.is_dir() {
                dirs.push(candidate);
            }
        }
    }
    dirs
}

/// Lowercased names of the distributions installed in one site-packages dir.
///
/// Reads `<name>-<version>.dist-info` / `.egg-info` directory names and their
/// `top_level.txt`, which lists the import names a distribution provides.
pub fn installed_packages(site_packages: &Path) -> HashSet<String> {
    let mut names = HashSet::new();
    let Ok(entries) = fs::read_dir(site_packages) else {
        return names;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = file_name
            .strip_suffix(".dist-info")
            .or_else(|| file_name.strip_suffix(".egg-info"))
        else {
            continue;
        };

        if let Some(dist) = stem.split('-').next().filter(|s| !s.is_empty()) {
            names.insert(dist.to_lowercase());
        }

        if let Ok(top_level) = fs::read_to_string(entry.path().join("top_level.txt")) {
            names.extend(
                top_level
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_lowercase),
            );
        }
    }
    names
}
