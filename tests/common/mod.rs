// Shared helpers for integration tests.
//
// Provides a temporary source tree and target home, plus a fluent builder so
// each integration test can set up an isolated deployment without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dotdeploy::cli::GlobalOpts;
use dotdeploy::config::catalog::Catalog;
use dotdeploy::config::selection::{self, Selection};
use dotdeploy::deploy::{self, DeployOptions, Deployer, DeploymentTask};
use dotdeploy::logging::{LogFile, Logger};
use dotdeploy::platform::PlatformId;

/// Backup timestamp used by every deployer built here.
pub const STAMP: &str = "20240301120000";

/// A small catalog with nested profiles and one copy-mode component.
pub const CATALOG: &str = r#"
[[component]]
id = "zsh"
description = "Shell"
binaries = ["sh"]

[[component.artifact]]
source = "zshrc"
target = "~/.zshrc"

[[component]]
id = "git"
description = "Git"

[[component.artifact]]
source = "gitconfig"
target = "~/.gitconfig"

[[component.check]]
path = "~/.gitconfig"
contains = "delta"
note = "delta pager not configured"

[[component]]
id = "tmux"
description = "Multiplexer"

[[component.artifact]]
source = "tmux.conf"
target = "~/.tmux.conf"

[[component]]
id = "ssh"
description = "SSH client"

[[component.artifact]]
source = "config"
target = "~/.ssh/config"
mode = "copy"

[[profile]]
name = "minimal"
description = "Basics"
components = ["zsh", "git"]

[[profile]]
name = "full"
description = "Everything"
components = ["zsh", "git", "tmux", "ssh"]
"#;

/// A source tree and a target home backed by one [`tempfile::TempDir`].
pub struct TestTree {
    dir: tempfile::TempDir,
}

impl TestTree {
    /// Create a tree with [`CATALOG`] and a source file for every artifact.
    pub fn new() -> Self {
        TestTreeBuilder::new().build()
    }

    /// Path to the source tree root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("dotfiles")
    }

    /// Path to the target home.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Load the catalog written to the tree.
    pub fn catalog(&self) -> Catalog {
        Catalog::load(&self.root()).expect("load catalog")
    }

    /// Global options pointing at this tree.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            root: Some(self.root()),
            home: Some(self.home()),
            ..GlobalOpts::default()
        }
    }

    /// A logger whose log file would live inside this tree, never under the
    /// real user cache.
    pub fn logger(&self, command: &str) -> Logger {
        Logger::new(Some(LogFile::in_dir(&self.dir.path().join("cache"), command)))
    }

    /// Resolve a selection the way the CLI does, without a prompter.
    pub fn select(&self, explicit: &[&str], profile: Option<&str>) -> Selection {
        let explicit: Vec<String> = explicit.iter().map(ToString::to_string).collect();
        selection::resolve(&self.catalog(), &explicit, profile, None).expect("resolve selection")
    }

    /// Plan the deployment tasks for `selection`.
    pub fn plan(&self, selection: &Selection) -> Vec<DeploymentTask> {
        deploy::plan(
            &self.catalog(),
            selection,
            PlatformId::Debian,
            &self.root(),
            &self.home(),
        )
        .expect("plan tasks")
    }

    /// A deployer with a fixed backup timestamp.
    pub fn deployer(&self, options: DeployOptions) -> Deployer {
        Deployer::new(self.root(), options).with_stamp(STAMP)
    }

    /// Write `content` to `rel` under the target home.
    pub fn home_file(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.home().join(rel), content)
    }

    /// Write `content` to `rel` under the source tree.
    pub fn source_file(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.root().join(rel), content)
    }

    /// Every file name in the directory holding `target`.
    pub fn siblings(&self, target: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(target.parent().expect("parent"))
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
    path.to_path_buf()
}

/// Fluent builder for [`TestTree`].
pub struct TestTreeBuilder {
    tree: TestTree,
    catalog: String,
    sources: bool,
}

impl TestTreeBuilder {
    /// Begin building a tree around [`CATALOG`].
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        Self {
            tree: TestTree { dir },
            catalog: CATALOG.to_string(),
            sources: true,
        }
    }

    /// Use `content` as `<root>/catalog.toml` instead of [`CATALOG`].
    pub fn with_catalog(mut self, content: &str) -> Self {
        self.catalog = content.to_string();
        self
    }

    /// Do not create source files for the catalog's artifacts.
    pub fn without_sources(mut self) -> Self {
        self.sources = false;
        self
    }

    /// Finish building and return the tree.
    pub fn build(self) -> TestTree {
        let root = self.tree.root();
        std::fs::create_dir_all(&root).expect("create root");
        std::fs::create_dir_all(self.tree.home()).expect("create home");
        std::fs::write(root.join("catalog.toml"), &self.catalog).expect("write catalog");

        if self.sources
            && let Ok(catalog) = Catalog::from_toml_str(&self.catalog, "test")
        {
            for component in catalog.components() {
                for artifact in &component.artifacts {
                    write(
                        &artifact.source_path(&root, &component.id),
                        &format!("# {} {}\n", component.id, artifact.source),
                    );
                }
            }
        }
        self.tree
    }
}
