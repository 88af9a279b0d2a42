//! Platform and package-manager detection.
//!
//! Detection is an ordered chain of probes (kernel, os-release, executables)
//! evaluated first-match-wins against a [`SystemInspector`].  It never fails:
//! when nothing matches the result is `unknown`/`unknown` and callers skip
//! package-manager-dependent behaviour.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;
use crate::exec::Executor;

/// Normalized platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    /// Apple macOS.
    Macos,
    /// Debian and derivatives (Ubuntu, Mint, Pop!_OS, ...).
    Debian,
    /// Red Hat family (RHEL, Fedora, CentOS, Rocky, Alma, ...).
    Rhel,
    /// Arch Linux and derivatives.
    Arch,
    /// Microsoft Windows.
    Windows,
    /// Nothing matched.
    Unknown,
}

impl PlatformId {
    /// Whether something restricted to `platforms` applies here.
    ///
    /// An empty restriction list applies everywhere.
    #[must_use]
    pub fn allowed_by(self, platforms: &[Self]) -> bool {
        platforms.is_empty() || platforms.contains(&self)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Macos => "macos",
            Self::Debian => "debian",
            Self::Rhel => "rhel",
            Self::Arch => "arch",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Native package manager associated with a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// Homebrew.
    Brew,
    /// APT.
    Apt,
    /// DNF.
    Dnf,
    /// YUM.
    Yum,
    /// pacman.
    Pacman,
    /// winget.
    Winget,
    /// No package manager detected.
    Unknown,
}

impl PackageManager {
    /// Executable name of the package manager, or `None` when unknown.
    #[must_use]
    pub const fn command(self) -> Option<&'static str> {
        match self {
            Self::Brew => Some("brew"),
            Self::Apt => Some("apt"),
            Self::Dnf => Some("dnf"),
            Self::Yum => Some("yum"),
            Self::Pacman => Some("pacman"),
            Self::Winget => Some("winget"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command().unwrap_or("unknown"))
    }
}

/// Platform information for the current system.
///
/// Computed once at startup and passed by reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    /// Normalized platform family.
    pub platform: PlatformId,
    /// Package manager for the platform.
    pub package_manager: PackageManager,
    /// Distribution or OS version, empty when unknown.
    pub os_version: String,
}

impl PlatformInfo {
    /// Create a platform with explicit values.
    #[must_use]
    pub fn new(
        platform: PlatformId,
        package_manager: PackageManager,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            package_manager,
            os_version: os_version.into(),
        }
    }

    /// The fallback result when no probe matches.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            platform: PlatformId::Unknown,
            package_manager: PackageManager::Unknown,
            os_version: String::new(),
        }
    }

    /// Whether package-manager-dependent operations can run.
    #[must_use]
    pub fn has_package_manager(&self) -> bool {
        self.package_manager != PackageManager::Unknown
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.platform)?;
        if !self.os_version.is_empty() {
            write!(f, " {}", self.os_version)?;
        }
        write!(f, " ({})", self.package_manager)
    }
}

/// Read-only view of the host used by the detection probes.
#[cfg_attr(test, mockall::automock)]
pub trait SystemInspector {
    /// Kernel/OS name as reported by the Rust target (`linux`, `macos`, ...).
    fn kernel(&self) -> String;

    /// Contents of the OS-release descriptor, if present.
    fn os_release(&self) -> Option<String>;

    /// Whether `name` resolves on the executable search path.
    fn has_executable(&self, name: &str) -> bool;

    /// Product version reported by the OS itself (macOS / Windows only).
    fn product_version(&self) -> Option<String>;
}

/// [`SystemInspector`] that queries the running machine.
#[derive(Debug)]
pub struct LiveInspector<'a> {
    executor: &'a dyn Executor,
}

impl<'a> LiveInspector<'a> {
    /// Create an inspector that spawns processes through `executor`.
    #[must_use]
    pub const fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }
}

/// Locations checked for the OS-release descriptor, in order.
const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

impl SystemInspector for LiveInspector<'_> {
    fn kernel(&self) -> String {
        std::env::consts::OS.to_string()
    }

    fn os_release(&self) -> Option<String> {
        OS_RELEASE_PATHS
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
    }

    fn has_executable(&self, name: &str) -> bool {
        self.executor.which(name).is_some()
    }

    fn product_version(&self) -> Option<String> {
        let result = match std::env::consts::OS {
            "macos" => self.executor.run_unchecked("sw_vers", &["-productVersion"]),
            "windows" => self.executor.run_unchecked("cmd", &["/c", "ver"]),
            _ => return None,
        }
        .ok()?;
        let version = result.stdout.trim();
        (result.success && !version.is_empty()).then(|| version.to_string())
    }
}

/// A single detection probe.
type Probe = fn(&dyn SystemInspector) -> Option<PlatformInfo>;

/// Probes in evaluation order; the first `Some` wins.
const PROBES: &[(&str, Probe)] = &[
    ("kernel", probe_kernel),
    ("os-release", probe_os_release),
    ("executables", probe_executables),
];

/// Executables probed when the release descriptor is missing or unrecognized.
const EXECUTABLE_PROBES: &[(&str, PlatformId, PackageManager)] = &[
    ("apt", PlatformId::Debian, PackageManager::Apt),
    ("dnf", PlatformId::Rhel, PackageManager::Dnf),
    ("yum", PlatformId::Rhel, PackageManager::Yum),
    ("pacman", PlatformId::Arch, PackageManager::Pacman),
];

/// Detect the current platform.
#[must_use]
pub fn detect(executor: &dyn Executor) -> PlatformInfo {
    detect_with(&LiveInspector::new(executor))
}

/// Run the probe chain against `inspector`.
#[must_use]
pub fn detect_with(inspector: &dyn SystemInspector) -> PlatformInfo {
    for (name, probe) in PROBES {
        if let Some(info) = probe(inspector) {
            tracing::debug!("platform probe '{name}' matched: {info}");
            return info;
        }
    }

    let err = PlatformError::DetectionAmbiguous(format!(
        "kernel '{}' with no recognized release descriptor or package manager",
        inspector.kernel()
    ));
    tracing::warn!("{err}; package installation will be skipped");
    PlatformInfo::unknown()
}

fn probe_kernel(inspector: &dyn SystemInspector) -> Option<PlatformInfo> {
    let (platform, package_manager) = match inspector.kernel().as_str() {
        "macos" => (PlatformId::Macos, PackageManager::Brew),
        "windows" => (PlatformId::Windows, PackageManager::Winget),
        _ => return None,
    };
    let version = inspector.product_version().unwrap_or_default();
    Some(PlatformInfo::new(platform, package_manager, version))
}

fn probe_os_release(inspector: &dyn SystemInspector) -> Option<PlatformInfo> {
    let fields = parse_os_release(&inspector.os_release()?);
    let mut candidates = fields
        .get("ID")
        .into_iter()
        .chain(fields.get("ID_LIKE"))
        .flat_map(|v| v.split_whitespace());

    let platform = candidates.find_map(map_distribution)?;
    let package_manager = match platform {
        PlatformId::Debian => PackageManager::Apt,
        PlatformId::Arch => PackageManager::Pacman,
        PlatformId::Rhel => rhel_package_manager(inspector),
        _ => return None,
    };
    Some(PlatformInfo::new(
        platform,
        package_manager,
        release_version(&fields),
    ))
}

fn probe_executables(inspector: &dyn SystemInspector) -> Option<PlatformInfo> {
    let (_, platform, package_manager) = EXECUTABLE_PROBES
        .iter()
        .find(|(exe, _, _)| inspector.has_executable(exe))?;
    let version = inspector
        .os_release()
        .map(|content| release_version(&parse_os_release(&content)))
        .unwrap_or_default();
    Some(PlatformInfo::new(*platform, *package_manager, version))
}

/// DNF when present, YUM on older systems that only ship YUM.
fn rhel_package_manager(inspector: &dyn SystemInspector) -> PackageManager {
    if !inspector.has_executable("dnf") && inspector.has_executable("yum") {
        PackageManager::Yum
    } else {
        PackageManager::Dnf
    }
}

/// Map an os-release distribution identifier to a platform family.
#[must_use]
pub fn map_distribution(id: &str) -> Option<PlatformId> {
    match id.to_ascii_lowercase().as_str() {
        "debian" | "ubuntu" | "linuxmint" | "pop" | "raspbian" | "elementary" | "kali"
        | "neon" | "zorin" => Some(PlatformId::Debian),
        "rhel" | "fedora" | "centos" | "rocky" | "almalinux" | "ol" | "amzn" | "nobara" => {
            Some(PlatformId::Rhel)
        }
        "arch" | "manjaro" | "endeavouros" | "garuda" | "artix" | "cachyos" => {
            Some(PlatformId::Arch)
        }
        _ => None,
    }
}

/// Parse an os-release file into its `KEY=value` pairs.
///
/// Blank lines and `#` comments are ignored; surrounding single or double
/// quotes are stripped from values.
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), unquoted.to_string())
        })
        .collect()
}

fn release_version(fields: &HashMap<String, String>) -> String {
    fields
        .get("VERSION_ID")
        .or_else(|| fields.get("BUILD_ID"))
        .cloned()
        .unwrap_or_default()
}
