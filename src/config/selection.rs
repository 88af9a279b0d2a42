//! Component selection: explicit list, named profile, interactive choice or
//! the default profile, in that order of precedence.
use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead, Write};

use super::catalog::{Catalog, Component, Profile};
use crate::error::ResolutionError;

/// Profile used when nothing else selects components.
pub const DEFAULT_PROFILE: &str = "full";

/// How a [`Selection`] was arrived at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOrigin {
    /// `--components` on the command line.
    Explicit,
    /// A named profile, from `--profile`, the menu or the default.
    Profile(String),
    /// Per-component answers in the interactive menu.
    Custom,
}

impl fmt::Display for SelectionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("explicit components"),
            Self::Profile(name) => write!(f, "profile '{name}'"),
            Self::Custom => f.write_str("custom selection"),
        }
    }
}

/// The resolved set of component ids to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Component ids in deployment order.
    pub components: Vec<String>,
    /// Where the selection came from.
    pub origin: SelectionOrigin,
}

/// Answer to the profile menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileChoice {
    /// A named profile.
    Profile(String),
    /// Choose components one by one.
    Custom,
}

/// Interactive selection front-end.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Present the profile menu (plus a custom entry) and return the choice.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn choose_profile(&mut self, profiles: &[Profile]) -> io::Result<ProfileChoice>;

    /// Ask whether `component` should be included in a custom selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, component: &Component) -> io::Result<bool>;
}

/// Numbered-menu [`Prompter`] over any reader/writer pair.
#[derive(Debug)]
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Create a prompter reading answers from `input` and writing to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> io::Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a selection was made",
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose_profile(&mut self, profiles: &[Profile]) -> io::Result<ProfileChoice> {
        let width = profiles
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max("custom".len());
        let custom = profiles.len() + 1;

        writeln!(self.output, "\nSelect a profile:")?;
        for (i, profile) in profiles.iter().enumerate() {
            writeln!(
                self.output,
                "  \x1b[1m{}\x1b[0m) {:width$}  {}",
                i + 1,
                profile.name,
                profile.description
            )?;
        }
        writeln!(
            self.output,
            "  \x1b[1m{custom}\x1b[0m) {:width$}  Choose components one by one",
            "custom"
        )?;

        loop {
            write!(self.output, "\nProfile [1-{custom}]: ")?;
            let answer = self.read_answer()?;
            match answer.parse::<usize>() {
                Ok(n) if n == custom => return Ok(ProfileChoice::Custom),
                Ok(n) if n >= 1 => {
                    if let Some(profile) = profiles.get(n - 1) {
                        return Ok(ProfileChoice::Profile(profile.name.clone()));
                    }
                }
                _ => {}
            }
            writeln!(self.output, "Invalid selection: {answer}")?;
        }
    }

    fn confirm(&mut self, component: &Component) -> io::Result<bool> {
        write!(
            self.output,
            "Include {} ({})? [y/N]: ",
            component.id, component.description
        )?;
        let answer = self.read_answer()?.to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Resolve the components to deploy.
///
/// Precedence: a non-empty `explicit` list, then `profile`, then the
/// interactive `prompter`, then [`DEFAULT_PROFILE`].
///
/// # Errors
///
/// Returns [`ResolutionError::UnknownComponent`] or
/// [`ResolutionError::UnknownProfile`] for names the catalog does not define,
/// [`ResolutionError::EmptySelection`] when a custom selection declines every
/// component, and [`ResolutionError::Prompt`] if the prompt cannot be read.
pub fn resolve(
    catalog: &Catalog,
    explicit: &[String],
    profile: Option<&str>,
    prompter: Option<&mut dyn Prompter>,
) -> Result<Selection, ResolutionError> {
    let requested: Vec<&str> = explicit
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if !requested.is_empty() {
        return resolve_explicit(catalog, &requested);
    }

    if let Some(name) = profile {
        return resolve_profile(catalog, name);
    }

    if let Some(prompter) = prompter {
        return match prompter.choose_profile(catalog.list_profiles())? {
            ProfileChoice::Profile(name) => resolve_profile(catalog, &name),
            ProfileChoice::Custom => resolve_custom(catalog, prompter),
        };
    }

    resolve_profile(catalog, DEFAULT_PROFILE)
}

fn resolve_explicit(catalog: &Catalog, requested: &[&str]) -> Result<Selection, ResolutionError> {
    let valid = catalog.component_ids();
    let mut unknown: Vec<String> = Vec::new();
    for id in requested {
        if !valid.iter().any(|v| v == id) && !unknown.iter().any(|u| u == id) {
            unknown.push((*id).to_string());
        }
    }
    if !unknown.is_empty() {
        return Err(ResolutionError::UnknownComponent { ids: unknown, valid });
    }

    let wanted: HashSet<&str> = requested.iter().copied().collect();
    Ok(Selection {
        components: valid
            .into_iter()
            .filter(|id| wanted.contains(id.as_str()))
            .collect(),
        origin: SelectionOrigin::Explicit,
    })
}

fn resolve_profile(catalog: &Catalog, name: &str) -> Result<Selection, ResolutionError> {
    let profile = catalog
        .get_profile(name)
        .map_err(|_| ResolutionError::UnknownProfile {
            name: name.to_string(),
            valid: catalog.profile_names(),
        })?;
    Ok(Selection {
        components: profile.components.clone(),
        origin: SelectionOrigin::Profile(profile.name.clone()),
    })
}

fn resolve_custom(
    catalog: &Catalog,
    prompter: &mut dyn Prompter,
) -> Result<Selection, ResolutionError> {
    let mut components = Vec::new();
    for component in catalog.components() {
        if prompter.confirm(component)? {
            components.push(component.id.clone());
        }
    }
    if components.is_empty() {
        return Err(ResolutionError::EmptySelection);
    }
    Ok(Selection {
        components,
        origin: SelectionOrigin::Custom,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn explicit_list_wins_over_profile() {
        let selection = resolve(&catalog(), &ids(&["git", "vim"]), Some("full"), None).unwrap();
        assert_eq!(selection.components, ids(&["git", "vim"]));
        assert_eq!(selection.origin, SelectionOrigin::Explicit);
    }

    #[test]
    fn explicit_list_is_normalized_to_catalog_order() {
        let selection =
            resolve(&catalog(), &ids(&[" vim ", "", "git", "vim"]), None, None).unwrap();
        assert_eq!(selection.components, ids(&["git", "vim"]));
    }

    #[test]
    fn explicit_order_does_not_matter() {
        let a = resolve(&catalog(), &ids(&["tmux", "zsh"]), None, None).unwrap();
        let b = resolve(&catalog(), &ids(&["zsh", "tmux"]), None, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn blank_explicit_list_falls_through_to_profile() {
        let selection = resolve(&catalog(), &ids(&["", "  "]), Some("minimal"), None).unwrap();
        assert_eq!(selection.components, ids(&["zsh", "git", "editorconfig"]));
        assert_eq!(
            selection.origin,
            SelectionOrigin::Profile("minimal".to_string())
        );
    }

    #[test]
    fn explicit_unknown_components_are_reported_together() {
        let err = resolve(&catalog(), &ids(&["emacs", "git", "nano"]), None, None).unwrap_err();
        match err {
            ResolutionError::UnknownComponent { ids: bad, valid } => {
                assert_eq!(bad, ids(&["emacs", "nano"]));
                assert!(valid.contains(&"git".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_profile_fails_closed() {
        let err = resolve(&catalog(), &[], Some("nonexistent"), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown profile 'nonexistent' (valid profiles: minimal, deploy, development, full)"
        );
    }

    #[test]
    fn profile_flag_wins_over_prompter() {
        let mut prompter = MockPrompter::new();
        prompter.expect_choose_profile().never();
        let selection = resolve(&catalog(), &[], Some("deploy"), Some(&mut prompter)).unwrap();
        assert_eq!(
            selection.origin,
            SelectionOrigin::Profile("deploy".to_string())
        );
    }

    #[test]
    fn default_is_full_profile() {
        let selection = resolve(&catalog(), &[], None, None).unwrap();
        assert_eq!(selection.origin, SelectionOrigin::Profile("full".to_string()));
        assert_eq!(selection.components, catalog().component_ids());
    }

    #[test]
    fn interactive_profile_choice() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_choose_profile()
            .times(1)
            .returning(|_| Ok(ProfileChoice::Profile("development".to_string())));
        let selection = resolve(&catalog(), &[], None, Some(&mut prompter)).unwrap();
        assert_eq!(
            selection.origin,
            SelectionOrigin::Profile("development".to_string())
        );
        assert!(selection.components.contains(&"vscode".to_string()));
    }

    #[test]
    fn interactive_custom_selection_asks_per_component() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_choose_profile()
            .returning(|_| Ok(ProfileChoice::Custom));
        prompter
            .expect_confirm()
            .times(catalog().components().len())
            .returning(|c| Ok(c.id == "git" || c.id == "gh"));
        let selection = resolve(&catalog(), &[], None, Some(&mut prompter)).unwrap();
        assert_eq!(selection.components, ids(&["git", "gh"]));
        assert_eq!(selection.origin, SelectionOrigin::Custom);
    }

    #[test]
    fn interactive_custom_selection_empty_is_error() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_choose_profile()
            .returning(|_| Ok(ProfileChoice::Custom));
        prompter.expect_confirm().returning(|_| Ok(false));
        let err = resolve(&catalog(), &[], None, Some(&mut prompter)).unwrap_err();
        assert!(matches!(err, ResolutionError::EmptySelection));
    }

    #[test]
    fn prompt_failure_surfaces_as_prompt_error() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_choose_profile()
            .returning(|_| Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed")));
        let err = resolve(&catalog(), &[], None, Some(&mut prompter)).unwrap_err();
        assert!(matches!(err, ResolutionError::Prompt(_)));
    }

    #[test]
    fn terminal_prompter_reprompts_on_invalid_input() {
        let catalog = catalog();
        let input = io::Cursor::new("0\nabc\n2\n");
        let mut output = Vec::new();
        let choice = TerminalPrompter::new(input, &mut output)
            .choose_profile(catalog.list_profiles())
            .unwrap();
        assert_eq!(choice, ProfileChoice::Profile("deploy".to_string()));
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("custom"));
        assert_eq!(shown.matches("Invalid selection").count(), 2);
    }

    #[test]
    fn terminal_prompter_custom_entry_is_last() {
        let catalog = catalog();
        let custom = (catalog.list_profiles().len() + 1).to_string();
        let input = io::Cursor::new(format!("{custom}\n"));
        let choice = TerminalPrompter::new(input, Vec::new())
            .choose_profile(catalog.list_profiles())
            .unwrap();
        assert_eq!(choice, ProfileChoice::Custom);
    }

    #[test]
    fn terminal_prompter_eof_is_error() {
        let catalog = catalog();
        let err = TerminalPrompter::new(io::Cursor::new(""), Vec::new())
            .choose_profile(catalog.list_profiles())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn terminal_prompter_confirm_accepts_yes() {
        let catalog = catalog();
        let git = catalog.get_component("git").unwrap();
        let mut prompter = TerminalPrompter::new(io::Cursor::new("YES\nn\n\n"), Vec::new());
        assert!(prompter.confirm(git).unwrap());
        assert!(!prompter.confirm(git).unwrap());
        assert!(!prompter.confirm(git).unwrap());
    }
}
