//! Command orchestration: the setup shared by every command, plus one
//! module per subcommand.
pub mod install;
pub mod reset;
pub mod verify;

use anyhow::{Context as _, Result};
use std::ffi::OsString;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::config::catalog::{CATALOG_FILE, Catalog};
use crate::config::selection::{self, Prompter, Selection, TerminalPrompter};
use crate::deploy::{self, DeploymentTask};
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::{self, PlatformInfo};

/// Environment variable naming the source tree root.
pub const ROOT_ENV: &str = "DOTDEPLOY_ROOT";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, catalog loading, component resolution
/// and task planning so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host platform.
    pub platform: PlatformInfo,
    /// Canonical source tree root.
    pub root: PathBuf,
    /// Target home directory.
    pub home: PathBuf,
    /// Loaded component catalog.
    pub catalog: Catalog,
    /// Resolved component selection.
    pub selection: Selection,
    /// Planned tasks, in selection order.
    pub tasks: Vec<DeploymentTask>,
}

impl CommandSetup {
    /// Detect the platform, load the catalog, resolve the selection and plan
    /// the deployment tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, the
    /// catalog fails to load, or the selection cannot be resolved.  Nothing
    /// has been written to the filesystem when this fails.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = platform::detect(&SystemExecutor);
        log.info(&format!("platform: {platform}"));
        if !platform.has_package_manager() {
            log.debug("no package manager detected");
        }

        let root = resolve_root(global)?;
        let home = resolve_home(global)?;
        log.debug(&format!("source root: {}", root.display()));
        log.debug(&format!("target home: {}", home.display()));

        log.stage("Loading catalog");
        let catalog = Catalog::load(&root)?;
        log.info(&format!(
            "{} components, {} profiles ({})",
            catalog.components().len(),
            catalog.list_profiles().len(),
            catalog.origin()
        ));

        log.stage("Resolving components");
        let selection = resolve_selection(global, &catalog, log)?;
        log.info(&format!(
            "{}: {}",
            selection.origin,
            selection.components.join(", ")
        ));

        let tasks = deploy::plan(&catalog, &selection, platform.platform, &root, &home)?;
        log.debug(&format!("{} deployment tasks", tasks.len()));

        Ok(Self {
            platform,
            root,
            home,
            catalog,
            selection,
            tasks,
        })
    }
}

fn resolve_selection(global: &GlobalOpts, catalog: &Catalog, log: &Logger) -> Result<Selection> {
    let mut terminal = None;
    if global.interactive {
        if std::io::stdin().is_terminal() {
            terminal = Some(TerminalPrompter::stdio());
        } else {
            log.warn("--interactive ignored: stdin is not a terminal");
        }
    }
    let prompter = terminal.as_mut().map(|p| p as &mut dyn Prompter);

    Ok(selection::resolve(
        catalog,
        &global.components,
        global.profile.as_deref(),
        prompter,
    )?)
}

/// Print the profile and component registry.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn list_profiles(global: &GlobalOpts) -> Result<()> {
    let root = resolve_root(global)?;
    let catalog = Catalog::load(&root)?;
    println!("Profiles:\n{}", indent(&catalog.render_profiles()));
    println!("\nComponents:\n{}", indent(&catalog.render_components()));
    Ok(())
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the summary and bail if any item failed.
///
/// # Errors
///
/// Returns an error if one or more items recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} item(s) failed");
    }
    Ok(())
}

/// Resolve the source tree root: `--root`, then `$DOTDEPLOY_ROOT`, then a
/// tree next to the executable, then the current directory.
///
/// # Errors
///
/// Returns an error if the current directory cannot be read.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let exe = std::env::current_exe().ok();
    let root = resolve_root_from(
        global.root.as_deref(),
        std::env::var_os(ROOT_ENV),
        exe.as_deref(),
        &cwd,
    );
    Ok(dunce::canonicalize(&root).unwrap_or(root))
}

fn resolve_root_from(
    explicit: Option<&Path>,
    env: Option<OsString>,
    exe: Option<&Path>,
    cwd: &Path,
) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    if let Some(root) = env.filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    if let Some(parent) = exe.and_then(Path::parent) {
        let candidates = [
            parent.join("../.."), // target/release/ → repo root
            parent.join(".."),    // bin/ → repo root
        ];
        if let Some(found) = candidates.into_iter().find(|c| is_source_root(c)) {
            return found;
        }
    }
    cwd.to_path_buf()
}

/// Whether `dir` looks like a source tree: it carries a catalog override or
/// a directory for at least one embedded component.
fn is_source_root(dir: &Path) -> bool {
    if dir.join(CATALOG_FILE).is_file() {
        return true;
    }
    Catalog::embedded().is_ok_and(|catalog| {
        catalog
            .components()
            .iter()
            .any(|c| dir.join(&c.id).is_dir())
    })
}

/// Resolve the target home: `--home`, then `$HOME`, then `%USERPROFILE%`.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn resolve_home(global: &GlobalOpts) -> Result<PathBuf> {
    resolve_home_from(
        global.home.as_deref(),
        std::env::var_os("HOME"),
        std::env::var_os("USERPROFILE"),
    )
    .context("cannot determine home directory. Use --home or set HOME")
}

fn resolve_home_from(
    explicit: Option<&Path>,
    home: Option<OsString>,
    profile: Option<OsString>,
) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        home.into_iter()
            .chain(profile)
            .find(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}
