//! Header and library search path resolution.
//!
//! [`PathResolver`] turns a probe's declared artifacts into ordered lists of
//! candidate directories. Candidates are assembled most specific first:
//!
//! 1. directories inside an operator-supplied custom path that contain a
//!    declared artifact, then the custom path itself
//! 2. the in-tree copy under `src/libs/<name>`, which ends the search
//! 3. platform locations (vcpkg and drive fallbacks on Windows, standard
//!    prefixes on Unix-family targets, Homebrew on Darwin)
//!
//! Only directories that exist at call time are returned.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ArtifactKind, ProbeError};
use crate::target::{Target, TargetOs};

/// Directory below the source root holding vendored dependencies.
pub const VENDOR_DIR: &str = "src/libs";

/// How deep an operator-supplied path is walked.
const CUSTOM_WALK_DEPTH: usize = 8;

/// Filesystem root the platform locations are resolved against.
///
/// The default resolves against the real root (and real drive letters on
/// Windows). Tests use [`SystemLayout::rooted`] to point every platform
/// location into a scratch tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemLayout {
    root: Option<PathBuf>,
}

impl SystemLayout {
    /// Resolve platform locations below `root` instead of `/`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn rebase(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(path),
        }
    }

    /// Drive roots on Windows-family hosts.
    fn drives(&self) -> Vec<PathBuf> {
        match &self.root {
            Some(root) => vec![root.clone()],
            None => ('C'..='Z')
                .map(|d| PathBuf::from(format!("{d}:\\")))
                .filter(|p| p.exists())
                .collect(),
        }
    }
}

/// An in-tree copy of a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendoredCopy {
    pub path: PathBuf,
    /// Trailing numeric suffix of the directory name, if any.
    pub version: Option<String>,
}

/// Resolves search directories for the active build target.
#[derive(Debug, Clone)]
pub struct PathResolver {
    target: Target,
    source_root: PathBuf,
    vcpkg_root: Option<PathBuf>,
    layout: SystemLayout,
}

impl PathResolver {
    pub fn new(target: Target, source_root: impl Into<PathBuf>) -> Self {
        Self {
            target,
            source_root: source_root.into(),
            vcpkg_root: None,
            layout: SystemLayout::default(),
        }
    }

    pub fn with_vcpkg_root(mut self, root: Option<PathBuf>) -> Self {
        self.vcpkg_root = root;
        self
    }

    pub fn with_system_layout(mut self, layout: SystemLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    fn vendor_root(&self) -> PathBuf {
        self.source_root.join(VENDOR_DIR)
    }

    /// Look for `src/libs/<name>-<version>`.
    ///
    /// When several versions are checked in, the lexically first one wins.
    pub fn vendored_copy(&self, name: &str) -> Option<VendoredCopy> {
        let prefix = format!("{name}-");
        let mut matches: Vec<PathBuf> = std::fs::read_dir(self.vendor_root())
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        matches.sort();

        let path = matches.into_iter().next()?;
        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(version_suffix);
        Some(VendoredCopy { path, version })
    }

    /// Ordered, existing directories to search for `headers`.
    pub fn include_paths(
        &self,
        name: &str,
        headers: &[&str],
        custom: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(custom) = custom {
            paths.extend(walk_for(custom, |file| {
                headers
                    .iter()
                    .find(|header| file.ends_with(header))
                    .map(|header| Path::new(header).components().count())
            }));
            paths.push(custom.to_path_buf());
        }

        let in_tree = self.vendor_root().join(name);
        if custom.is_none() && in_tree.is_dir() {
            paths.push(in_tree);
        } else {
            paths.extend(self.platform_include_paths(name));
        }

        paths.push(self.source_root.join("include"));
        existing_dirs(paths)
    }

    /// Ordered, existing directories to search for `libraries`.
    pub fn library_paths(
        &self,
        name: &str,
        libraries: &[&str],
        custom: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let extensions = library_extensions(self.target.os);

        if let Some(custom) = custom {
            paths.push(custom.join("lib"));
            paths.extend(walk_for(custom, |file| {
                let name = file.file_name()?.to_string_lossy();
                libraries
                    .iter()
                    .any(|lib| extensions.iter().any(|ext| matches_library(&name, lib, ext)))
                    .then_some(1)
            }));
        }

        let in_tree = self.vendor_root().join(name);
        if custom.is_none() && in_tree.is_dir() {
            paths.push(in_tree);
        } else {
            paths.extend(self.platform_library_paths(name));
        }

        existing_dirs(paths)
    }

    fn platform_include_paths(&self, name: &str) -> Vec<PathBuf> {
        let os = self.target.os;
        if os.is_windows() {
            return self.windows_paths(name, "include");
        }

        let triple = self.target.gnu_triple();
        let mut candidates = vec![
            "/usr/include".to_string(),
            "/usr/local/include".to_string(),
            format!("/usr/include/{triple}"),
            format!("/usr/local/include/{triple}"),
            format!("/usr/include/{name}"),
            format!("/usr/local/include/{name}"),
            "/opt/include".to_string(),
            "/opt/local/include".to_string(),
        ];
        if os == TargetOs::Darwin {
            candidates.push("/opt/homebrew/include".to_string());
        }
        candidates.iter().map(|c| self.layout.rebase(c)).collect()
    }

    fn platform_library_paths(&self, name: &str) -> Vec<PathBuf> {
        let os = self.target.os;
        if os.is_windows() {
            return self.windows_paths(name, "lib");
        }

        let candidates: Vec<String> = if os == TargetOs::Darwin {
            vec![
                "/usr/local/lib".to_string(),
                "/opt/homebrew/lib".to_string(),
                "/opt/local/lib".to_string(),
            ]
        } else {
            let triple = self.target.gnu_triple();
            vec![
                "/usr/lib".to_string(),
                "/usr/local/lib".to_string(),
                format!("/usr/lib/{triple}"),
                format!("/opt/local/lib/{triple}"),
                "/usr/lib64".to_string(),
                "/lib".to_string(),
                "/lib64".to_string(),
                "/opt/lib".to_string(),
                "/opt/local/lib".to_string(),
            ]
        };
        candidates.iter().map(|c| self.layout.rebase(c)).collect()
    }

    /// vcpkg package directory, then msys and bare drive fallbacks.
    fn windows_paths(&self, name: &str, leaf: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(vcpkg) = &self.vcpkg_root {
            paths.push(vcpkg.join("packages").join(name));
        }
        for drive in self.layout.drives() {
            paths.push(drive.join("msys64").join("mingw64").join(leaf));
            paths.push(drive.join("msys64").join("mingw32").join(leaf));
            paths.push(drive.join(leaf));
        }
        paths.push(self.layout.rebase("C:\\Program Files"));
        paths.push(self.layout.rebase("C:\\Program Files (x86)"));
        paths
    }

    /// Find the directory holding each header.
    ///
    /// Every primary header must be found. If one is missing the check
    /// still passes when any alternative header is found. The in-tree
    /// `include/` directory is appended as an auxiliary path.
    pub fn locate_headers(
        &self,
        probe: &str,
        headers: &[&str],
        alternatives: &[&str],
        search: &[PathBuf],
    ) -> Result<Vec<PathBuf>, ProbeError> {
        let mut found = Vec::new();
        if headers.is_empty() && alternatives.is_empty() {
            return Ok(found);
        }

        let mut missing = Vec::new();
        for header in headers {
            match find_in(probe, search, |dir| dir.join(header).is_file()) {
                Some(dir) => push_unique(&mut found, dir),
                None => missing.push(header.to_string()),
            }
        }

        if !missing.is_empty() || headers.is_empty() {
            let alt = alternatives
                .iter()
                .find_map(|h| find_in(probe, search, |dir| dir.join(h).is_file()));
            match alt {
                Some(dir) => {
                    debug!("{probe}: using alternative header in {}", dir.display());
                    push_unique(&mut found, dir);
                }
                None => {
                    missing.extend(alternatives.iter().map(|h| h.to_string()));
                    return Err(ProbeError::MissingArtifact {
                        probe: probe.to_string(),
                        kind: ArtifactKind::Header,
                        missing,
                        searched: search.to_vec(),
                    });
                }
            }
        }

        let aux = self.source_root.join("include");
        if aux.is_dir() {
            push_unique(&mut found, aux);
        }
        Ok(found)
    }

    /// Find the directory holding each library. All must be found.
    pub fn locate_libraries(
        &self,
        probe: &str,
        libraries: &[&str],
        search: &[PathBuf],
    ) -> Result<Vec<PathBuf>, ProbeError> {
        let extensions = library_extensions(self.target.os);
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for lib in libraries {
            let hit = find_in(probe, search, |dir| dir_has_library(dir, lib, extensions));
            match hit {
                Some(dir) => push_unique(&mut found, dir),
                None => missing.push(lib.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            Err(ProbeError::MissingArtifact {
                probe: probe.to_string(),
                kind: ArtifactKind::Library,
                missing,
                searched: search.to_vec(),
            })
        }
    }
}

/// Library file suffixes for a target family.
pub fn library_extensions(os: TargetOs) -> &'static [&'static str] {
    match os {
        TargetOs::Windows => &[".lib", ".dll", ".a", ".dll.a"],
        TargetOs::Darwin => &[".a", ".dylib", ".so"],
        _ => &[".a", ".so"],
    }
}

/// `<base>*<ext>`. The suffix must end the name, so a tree holding only
/// `libz.so.1` does not match `.so`.
pub fn matches_library(file_name: &str, base: &str, ext: &str) -> bool {
    file_name.len() >= base.len() + ext.len()
        && file_name.starts_with(base)
        && file_name.ends_with(ext)
}

fn dir_has_library(dir: &Path, base: &str, extensions: &[&str]) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        entry.path().is_file() && extensions.iter().any(|ext| matches_library(&name, base, ext))
    })
}

fn find_in(probe: &str, search: &[PathBuf], hit: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    search
        .iter()
        .inspect(|dir| debug!("{probe}: checking {}", dir.display()))
        .find(|dir| hit(dir))
        .cloned()
}

/// Directories below `root` holding a file accepted by `wanted`.
///
/// `wanted` returns how many path components the match spans, so a hit on
/// `curl/curl.h` yields the directory above `curl/`.
fn walk_for(root: &Path, wanted: impl Fn(&Path) -> Option<usize>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .max_depth(CUSTOM_WALK_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(levels) = wanted(entry.path()) else {
            continue;
        };
        if let Some(dir) = entry.path().ancestors().nth(levels) {
            push_unique(&mut dirs, dir.to_path_buf());
        }
    }
    dirs
}

fn existing_dirs(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            push_unique(&mut out, path);
        }
    }
    out
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

/// Version from a trailing `-<digits and dots>` suffix.
fn version_suffix(dir_name: &str) -> Option<String> {
    let re = Regex::new(r"-([\d.]+)$").ok()?;
    re.captures(dir_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
