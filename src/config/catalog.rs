//! Component catalog: components, the artifacts they deploy and the named
//! profiles that group them.
//!
//! The catalog is embedded in the binary from `conf/catalog.toml`.  A
//! `catalog.toml` at the source root replaces it entirely.  Either way the
//! catalog is validated once at load time and then passed by reference.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::platform::PlatformId;

/// Catalog compiled into the binary.
const EMBEDDED: &str = include_str!("../../conf/catalog.toml");

/// Origin label used in errors for the embedded catalog.
pub const EMBEDDED_ORIGIN: &str = "<embedded>";

/// File name of the catalog override at the source root.
pub const CATALOG_FILE: &str = "catalog.toml";

/// How an artifact is placed at its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Target is a symbolic link to the source.
    #[default]
    Symlink,
    /// Target is an independent copy of the source.
    Copy,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symlink => f.write_str("symlink"),
            Self::Copy => f.write_str("copy"),
        }
    }
}

/// A single file or directory deployed by a component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Artifact {
    /// Path relative to `<root>/<component id>/`.
    pub source: String,
    /// Path relative to the target home (`~/` prefix and absolute paths allowed).
    pub target: String,
    /// Placement mode.
    #[serde(default)]
    pub mode: Mode,
    /// Platforms the artifact applies to; empty means every platform.
    #[serde(default)]
    pub platforms: Vec<PlatformId>,
}

impl Artifact {
    /// Absolute source path for the owning component under `root`.
    #[must_use]
    pub fn source_path(&self, root: &Path, component_id: &str) -> PathBuf {
        root.join(component_id).join(&self.source)
    }

    /// Absolute target path under `home`.
    #[must_use]
    pub fn target_path(&self, home: &Path) -> PathBuf {
        expand_home(&self.target, home)
    }
}

/// A warn-level check that a deployed file contains some expected text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoftCheck {
    /// File to inspect, in target-path form.
    pub path: String,
    /// Text expected somewhere in the file.
    pub contains: String,
    /// Message reported when the text is missing.
    #[serde(default)]
    pub note: String,
}

/// A named unit of configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    /// Unique identifier, also the directory name under the source root.
    pub id: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Artifacts placed when the component is deployed.
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<Artifact>,
    /// Executables the component expects on `PATH`.
    #[serde(default)]
    pub binaries: Vec<String>,
    /// Companion-configuration checks.
    #[serde(default, rename = "check")]
    pub checks: Vec<SoftCheck>,
}

impl Component {
    /// Artifacts that apply to `platform`, in catalog order.
    pub fn artifacts_for(&self, platform: PlatformId) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(move |a| platform.allowed_by(&a.platforms))
    }
}

/// A named, ordered set of components.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Unique profile name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Component ids in deployment order.
    pub components: Vec<String>,
}

impl Profile {
    /// Whether every component of `other` is also part of this profile.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        other.components.iter().all(|c| self.components.contains(c))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    #[serde(default, rename = "component")]
    components: Vec<Component>,
    #[serde(default, rename = "profile")]
    profiles: Vec<Profile>,
}

/// The validated, immutable component catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    components: Vec<Component>,
    profiles: Vec<Profile>,
    origin: String,
}

impl Catalog {
    /// Load the catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded catalog fails validation.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(EMBEDDED, EMBEDDED_ORIGIN)
    }

    /// Load `<root>/catalog.toml` when present, otherwise the embedded catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the override cannot be read, parsed or validated.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CATALOG_FILE);
        if !path.is_file() {
            return Self::embedded();
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Parse and validate a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input, and
    /// [`ConfigError::DuplicateComponent`], [`ConfigError::DuplicateProfile`]
    /// or [`ConfigError::ComponentNotFound`] when validation fails.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = toml::from_str(content).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.message().to_string(),
        })?;
        Self::validate(&raw)?;
        Ok(Self {
            components: raw.components,
            profiles: raw.profiles,
            origin: origin.to_string(),
        })
    }

    fn validate(raw: &RawCatalog) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for component in &raw.components {
            if !ids.insert(component.id.as_str()) {
                return Err(ConfigError::DuplicateComponent(component.id.clone()));
            }
        }

        let mut names = HashSet::new();
        for profile in &raw.profiles {
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile(profile.name.clone()));
            }
            if let Some(missing) = profile
                .components
                .iter()
                .find(|id| !ids.contains(id.as_str()))
            {
                return Err(ConfigError::ComponentNotFound {
                    id: missing.clone(),
                    referenced_by: Some(profile.name.clone()),
                });
            }
        }
        Ok(())
    }

    /// Where the catalog was loaded from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Every profile, in catalog order.
    #[must_use]
    pub fn list_profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Every component, in catalog order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Look up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] listing every known profile.
    pub fn get_profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
                available: self.profile_names(),
            })
    }

    /// Look up a component by id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ComponentNotFound`] if no such component exists.
    pub fn get_component(&self, id: &str) -> Result<&Component, ConfigError> {
        self.components
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ConfigError::ComponentNotFound {
                id: id.to_string(),
                referenced_by: None,
            })
    }

    /// Profile names in catalog order.
    #[must_use]
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    /// Component ids in catalog order.
    #[must_use]
    pub fn component_ids(&self) -> Vec<String> {
        self.components.iter().map(|c| c.id.clone()).collect()
    }

    /// Render the profile list for `--list-profiles`.
    #[must_use]
    pub fn render_profiles(&self) -> String {
        let width = self
            .profiles
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);
        self.profiles
            .iter()
            .map(|p| {
                format!(
                    "{:width$}  {}\n{:width$}  {}",
                    p.name,
                    p.description,
                    "",
                    p.components.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the component list for `--list-profiles`.
    #[must_use]
    pub fn render_components(&self) -> String {
        let width = self
            .components
            .iter()
            .map(|c| c.id.len())
            .max()
            .unwrap_or(0);
        self.components
            .iter()
            .map(|c| format!("{:width$}  {}", c.id, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Resolve a target-style path against `home`.
///
/// `~` and `~/…` are relative to `home`, absolute paths are kept, and any
/// other relative path is joined onto `home`.
#[must_use]
pub fn expand_home(target: &str, home: &Path) -> PathBuf {
    if target == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = target
        .strip_prefix("~/")
        .or_else(|| target.strip_prefix("~\\"))
    {
        return home.join(rest);
    }
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
[[component]]
id = "a"
description = "First"

[[component.artifact]]
source = "a.conf"
target = "~/.a.conf"

[[component]]
id = "b"
description = "Second"
binaries = ["b"]

[[component.artifact]]
source = "b.json"
target = ".config/b.json"
mode = "copy"
platforms = ["macos"]

[[profile]]
name = "min"
description = "Minimal set"
components = ["a"]

[[profile]]
name = "all"
description = "Everything"
components = ["a", "b"]
"#;

    fn embedded() -> Catalog {
        Catalog::embedded().expect("embedded catalog is valid")
    }

    #[test]
    fn embedded_catalog_loads() {
        let catalog = embedded();
        assert_eq!(catalog.origin(), EMBEDDED_ORIGIN);
        assert_eq!(
            catalog.profile_names(),
            vec!["minimal", "deploy", "development", "full"]
        );
        assert!(catalog.get_component("git").is_ok());
    }

    #[test]
    fn canonical_profiles_are_nested() {
        let catalog = embedded();
        let chain = ["minimal", "deploy", "development", "full"];
        for pair in chain.windows(2) {
            let smaller = catalog.get_profile(pair[0]).unwrap();
            let larger = catalog.get_profile(pair[1]).unwrap();
            assert!(
                larger.contains_all(smaller),
                "{} should contain {}",
                larger.name,
                smaller.name
            );
        }
    }

    #[test]
    fn claude_is_only_in_full() {
        let catalog = embedded();
        let claude = catalog.get_component("claude").unwrap();
        assert!(claude.artifacts.iter().any(|a| a.mode == Mode::Copy));
        for name in ["minimal", "deploy", "development"] {
            let profile = catalog.get_profile(name).unwrap();
            assert!(!profile.components.contains(&claude.id), "{name}");
        }
    }

    #[test]
    fn full_profile_covers_whole_catalog() {
        let catalog = embedded();
        let full = catalog.get_profile("full").unwrap();
        assert_eq!(full.components, catalog.component_ids());
    }

    #[test]
    fn every_embedded_component_has_artifacts() {
        for component in embedded().components() {
            assert!(
                !component.artifacts.is_empty(),
                "{} has no artifacts",
                component.id
            );
        }
    }

    #[test]
    fn get_profile_unknown_lists_available() {
        let catalog = embedded();
        let err = catalog.get_profile("gaming").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gaming"));
        assert!(msg.contains("minimal, deploy, development, full"));
    }

    #[test]
    fn get_component_unknown() {
        let err = embedded().get_component("emacs").unwrap_err();
        assert!(matches!(err, ConfigError::ComponentNotFound { ref id, .. } if id == "emacs"));
    }

    #[test]
    fn parses_modes_and_platforms() {
        let catalog = Catalog::from_toml_str(SMALL, "test").unwrap();
        let a = catalog.get_component("a").unwrap();
        assert_eq!(a.artifacts[0].mode, Mode::Symlink);
        assert!(a.artifacts[0].platforms.is_empty());
        let b = catalog.get_component("b").unwrap();
        assert_eq!(b.artifacts[0].mode, Mode::Copy);
        assert_eq!(b.artifacts[0].platforms, vec![PlatformId::Macos]);
        assert_eq!(b.binaries, vec!["b"]);
    }

    #[test]
    fn artifacts_for_filters_by_platform() {
        let catalog = Catalog::from_toml_str(SMALL, "test").unwrap();
        let b = catalog.get_component("b").unwrap();
        assert_eq!(b.artifacts_for(PlatformId::Macos).count(), 1);
        assert_eq!(b.artifacts_for(PlatformId::Debian).count(), 0);
    }

    #[test]
    fn profile_referencing_missing_component_fails_closed() {
        let content = r#"
[[component]]
id = "a"
[[component.artifact]]
source = "x"
target = "~/.x"

[[profile]]
name = "broken"
components = ["a", "ghost"]
"#;
        let err = Catalog::from_toml_str(content, "test").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown component 'ghost' (referenced by profile 'broken')"
        );
    }

    #[test]
    fn duplicate_component_rejected() {
        let content = "[[component]]\nid = \"a\"\n[[component]]\nid = \"a\"\n";
        let err = Catalog::from_toml_str(content, "test").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateComponent(ref id) if id == "a"));
    }

    #[test]
    fn duplicate_profile_rejected() {
        let content = "[[profile]]\nname = \"p\"\ncomponents = []\n[[profile]]\nname = \"p\"\ncomponents = []\n";
        let err = Catalog::from_toml_str(content, "test").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProfile(ref n) if n == "p"));
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let content = "[[component]]\nid = \"a\"\ncolour = \"red\"\n";
        let err = Catalog::from_toml_str(content, "override.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid catalog override.toml:"));
    }

    #[test]
    fn load_prefers_root_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CATALOG_FILE), SMALL).unwrap();
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.profile_names(), vec!["min", "all"]);
        assert!(catalog.origin().ends_with(CATALOG_FILE));
    }

    #[test]
    fn load_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.origin(), EMBEDDED_ORIGIN);
    }

    #[test]
    fn render_profiles_lists_components() {
        let catalog = Catalog::from_toml_str(SMALL, "test").unwrap();
        insta::assert_snapshot!(catalog.render_profiles(), @r"
min  Minimal set
     a
all  Everything
     a, b
");
    }

    #[test]
    fn render_components_aligns_ids() {
        let catalog = Catalog::from_toml_str(SMALL, "test").unwrap();
        insta::assert_snapshot!(catalog.render_components(), @r"
a  First
b  Second
");
    }

    #[test]
    fn expand_home_variants() {
        let home = Path::new("/home/u");
        assert_eq!(expand_home("~", home), PathBuf::from("/home/u"));
        assert_eq!(expand_home("~/.zshrc", home), PathBuf::from("/home/u/.zshrc"));
        assert_eq!(
            expand_home(".config/gh/config.yml", home),
            PathBuf::from("/home/u/.config/gh/config.yml")
        );
        #[cfg(unix)]
        assert_eq!(expand_home("/etc/motd", home), PathBuf::from("/etc/motd"));
    }

    #[test]
    fn artifact_paths() {
        let catalog = Catalog::from_toml_str(SMALL, "test").unwrap();
        let a = &catalog.get_component("a").unwrap().artifacts[0];
        assert_eq!(
            a.source_path(Path::new("/src"), "a"),
            PathBuf::from("/src/a/a.conf")
        );
        assert_eq!(a.target_path(Path::new("/h")), PathBuf::from("/h/.a.conf"));
    }
}
