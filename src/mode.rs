//! Edit/View mode state machine and the save sequence that drives it

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::profile::ProfileAggregate;
use crate::store::{KeyValueStore, ProfileRepository, StoreError};
use crate::validation::{FieldError, Validator, validate_profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Edit,
    View,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Loading => f.write_str("loading"),
            Mode::Edit => f.write_str("edit"),
            Mode::View => f.write_str("view"),
        }
    }
}

/// Mode to open in when a stored profile exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialMode {
    #[default]
    View,
    Edit,
}

impl std::str::FromStr for InitialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(InitialMode::View),
            "edit" => Ok(InitialMode::Edit),
            other => Err(format!("unknown initial mode '{other}' (expected view or edit)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    Loaded { found: bool },
    EditRequested,
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from {from} on {event:?}")]
pub struct ModeError {
    pub from: Mode,
    pub event: ModeEvent,
}

/// Next mode for `event`, or an error if the transition is not allowed
pub fn transition(from: Mode, event: ModeEvent, policy: InitialMode) -> Result<Mode, ModeError> {
    match (from, event) {
        (Mode::Loading, ModeEvent::Loaded { found: false }) => Ok(Mode::Edit),
        (Mode::Loading, ModeEvent::Loaded { found: true }) => Ok(match policy {
            InitialMode::View => Mode::View,
            InitialMode::Edit => Mode::Edit,
        }),
        (Mode::View, ModeEvent::EditRequested) => Ok(Mode::Edit),
        (Mode::Edit, ModeEvent::Saved) => Ok(Mode::View),
        (from, event) => Err(ModeError { from, event }),
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("profile has {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("failed to save profile: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidTransition(#[from] ModeError),
}

impl SaveError {
    /// Per-field messages when the save was blocked by validation
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SaveError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// Owns the persisted profile and the current mode
pub struct ModeController<S> {
    mode: Mode,
    policy: InitialMode,
    repository: ProfileRepository<S>,
    validator: Box<dyn Validator>,
    profile: ProfileAggregate,
    /// A profile exists in the store, loaded or written by this controller
    saved: bool,
}

impl<S: KeyValueStore> ModeController<S> {
    pub fn new(repository: ProfileRepository<S>, validator: Box<dyn Validator>, policy: InitialMode) -> Self {
        Self {
            mode: Mode::Loading,
            policy,
            repository,
            validator,
            profile: ProfileAggregate::default(),
            saved: false,
        }
    }

    pub fn current_mode(&self) -> Mode {
        self.mode
    }

    /// Last saved (or loaded) profile
    pub fn profile(&self) -> &ProfileAggregate {
        &self.profile
    }

    /// False while `profile()` is only the empty default
    pub fn has_saved_profile(&self) -> bool {
        self.saved
    }

    pub fn repository(&self) -> &ProfileRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut ProfileRepository<S> {
        &mut self.repository
    }

    /// Read the stored profile and leave `Loading`
    pub fn load(&mut self) -> Result<Mode, ModeError> {
        let stored = self.repository.load();
        let found = stored.is_some();
        let next = transition(self.mode, ModeEvent::Loaded { found }, self.policy)?;
        self.saved = found;
        self.profile = stored.unwrap_or_default();
        self.enter(next);
        Ok(next)
    }

    pub fn request_edit(&mut self) -> Result<(), ModeError> {
        let next = transition(self.mode, ModeEvent::EditRequested, self.policy)?;
        self.enter(next);
        Ok(())
    }

    /// Validate and persist `profile`, then switch to `View`.
    ///
    /// Validation or store failures leave the controller in `Edit` with the
    /// previously saved profile untouched.
    pub fn request_save(&mut self, profile: ProfileAggregate) -> Result<(), SaveError> {
        if self.mode != Mode::Edit {
            return Err(ModeError {
                from: self.mode,
                event: ModeEvent::Saved,
            }
            .into());
        }

        let errors = validate_profile(self.validator.as_ref(), &profile);
        if !errors.is_empty() {
            warn!(count = errors.len(), "Save blocked by validation errors");
            return Err(SaveError::Validation(errors));
        }

        if let Err(e) = self.repository.save(&profile) {
            warn!(error = %e, "Save failed, staying in edit mode");
            return Err(e.into());
        }

        let next = transition(self.mode, ModeEvent::Saved, self.policy)?;
        self.saved = true;
        self.profile = profile;
        self.enter(next);
        Ok(())
    }

    fn enter(&mut self, next: Mode) {
        info!(from = %self.mode, to = %next, "Mode transition");
        self.mode = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::validation::StandardRules;
    use crate::validation::tests::valid_profile;

    fn controller(store: MemoryStore, policy: InitialMode) -> ModeController<MemoryStore> {
        ModeController::new(ProfileRepository::new(store), Box::new(StandardRules), policy)
    }

    fn stored(profile: &ProfileAggregate) -> MemoryStore {
        let mut repo = ProfileRepository::new(MemoryStore::new());
        repo.save(profile).unwrap();
        repo.store().clone()
    }

    #[test]
    fn test_transition_table() {
        let p = InitialMode::View;
        assert_eq!(transition(Mode::Loading, ModeEvent::Loaded { found: false }, p), Ok(Mode::Edit));
        assert_eq!(transition(Mode::Loading, ModeEvent::Loaded { found: true }, p), Ok(Mode::View));
        assert_eq!(
            transition(Mode::Loading, ModeEvent::Loaded { found: true }, InitialMode::Edit),
            Ok(Mode::Edit)
        );
        assert_eq!(transition(Mode::View, ModeEvent::EditRequested, p), Ok(Mode::Edit));
        assert_eq!(transition(Mode::Edit, ModeEvent::Saved, p), Ok(Mode::View));

        assert!(transition(Mode::Edit, ModeEvent::EditRequested, p).is_err());
        assert!(transition(Mode::View, ModeEvent::Saved, p).is_err());
        assert!(transition(Mode::Loading, ModeEvent::Saved, p).is_err());
        assert!(transition(Mode::View, ModeEvent::Loaded { found: true }, p).is_err());
    }

    #[test]
    fn test_empty_store_starts_in_edit_with_defaults() {
        let mut ctl = controller(MemoryStore::new(), InitialMode::View);
        assert_eq!(ctl.current_mode(), Mode::Loading);

        assert_eq!(ctl.load(), Ok(Mode::Edit));
        assert_eq!(ctl.profile(), &ProfileAggregate::default());
        assert!(!ctl.has_saved_profile());
    }

    #[test]
    fn test_stored_profile_follows_policy() {
        let profile = valid_profile();

        let mut view = controller(stored(&profile), InitialMode::View);
        assert_eq!(view.load(), Ok(Mode::View));
        assert_eq!(view.profile(), &profile);

        let mut edit = controller(stored(&profile), InitialMode::Edit);
        assert_eq!(edit.load(), Ok(Mode::Edit));
        assert!(edit.has_saved_profile());
    }

    #[test]
    fn test_save_moves_to_view_and_persists() {
        let mut ctl = controller(MemoryStore::new(), InitialMode::View);
        ctl.load().unwrap();
        assert!(!ctl.has_saved_profile());

        ctl.request_save(valid_profile()).unwrap();
        assert!(ctl.has_saved_profile());
        assert_eq!(ctl.current_mode(), Mode::View);
        assert_eq!(ctl.profile(), &valid_profile());
        assert_eq!(ctl.repository().load(), Some(valid_profile()));
    }

    #[test]
    fn test_invalid_email_keeps_edit() {
        let mut ctl = controller(MemoryStore::new(), InitialMode::View);
        ctl.load().unwrap();

        let mut profile = valid_profile();
        profile.email = "not-an-email".to_string();
        let err = ctl.request_save(profile).unwrap_err();

        assert_eq!(ctl.current_mode(), Mode::Edit);
        assert!(err.field_errors().iter().any(|e| e.field == "email"));
        assert!(ctl.repository().load().is_none());
    }

    #[test]
    fn test_store_failure_keeps_edit_and_old_profile() {
        let original = valid_profile();
        let mut ctl = controller(stored(&original), InitialMode::Edit);
        ctl.load().unwrap();
        ctl.repository_mut().store_mut().fail_writes = Some("quota exceeded".to_string());

        let mut changed = valid_profile();
        changed.pitch = "Updated".to_string();
        let err = ctl.request_save(changed).unwrap_err();

        assert!(matches!(err, SaveError::Store(_)));
        assert_eq!(ctl.current_mode(), Mode::Edit);
        assert_eq!(ctl.profile(), &original);
    }

    #[test]
    fn test_edit_request_only_from_view() {
        let mut ctl = controller(stored(&valid_profile()), InitialMode::View);
        assert!(ctl.request_edit().is_err());

        ctl.load().unwrap();
        ctl.request_edit().unwrap();
        assert_eq!(ctl.current_mode(), Mode::Edit);
        assert!(ctl.request_edit().is_err());
    }

    #[test]
    fn test_save_outside_edit_rejected() {
        let mut ctl = controller(stored(&valid_profile()), InitialMode::View);
        ctl.load().unwrap();

        let err = ctl.request_save(valid_profile()).unwrap_err();
        assert!(matches!(err, SaveError::InvalidTransition(_)));
        assert_eq!(ctl.current_mode(), Mode::View);
    }
}
