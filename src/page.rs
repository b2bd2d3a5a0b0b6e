//! The profile page: mode controller plus the edit session while in `Edit`

use std::fmt;
use tracing::{debug, info};

use crate::editor::ProfileEditor;
use crate::mode::{Mode, ModeController, ModeError, ModeEvent, SaveError};
use crate::profile::{ProfileAggregate, ProfileField};
use crate::store::KeyValueStore;

pub struct ProfilePage<S> {
    controller: ModeController<S>,
    editor: Option<ProfileEditor>,
}

impl<S: KeyValueStore> ProfilePage<S> {
    pub fn new(controller: ModeController<S>) -> Self {
        Self {
            controller,
            editor: None,
        }
    }

    /// Load the stored profile and open the matching mode
    pub fn start(&mut self) -> Result<Mode, ModeError> {
        let mode = self.controller.load()?;
        if mode == Mode::Edit {
            self.open_editor();
        }
        Ok(mode)
    }

    pub fn mode(&self) -> Mode {
        self.controller.current_mode()
    }

    /// Last persisted profile
    pub fn profile(&self) -> &ProfileAggregate {
        self.controller.profile()
    }

    pub fn controller(&self) -> &ModeController<S> {
        &self.controller
    }

    pub fn editor(&self) -> Option<&ProfileEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut ProfileEditor> {
        self.editor.as_mut()
    }

    /// Switch from `View` to `Edit` with a fresh draft of the saved profile
    pub fn request_edit(&mut self) -> Result<&mut ProfileEditor, ModeError> {
        self.controller.request_edit()?;
        Ok(self.open_editor())
    }

    /// Submit the draft. On success the edit session ends, uncommitted avatar
    /// work is dropped and the page is in `View`. On failure the whole session
    /// is kept, live crop included, so the user can fix it.
    pub fn submit(&mut self) -> Result<(), SaveError> {
        let Some(editor) = self.editor.as_mut() else {
            return Err(ModeError {
                from: self.controller.current_mode(),
                event: ModeEvent::Saved,
            }
            .into());
        };

        self.controller.request_save(editor.draft().clone())?;
        editor.settle();
        self.editor = None;
        info!("Profile submitted");
        Ok(())
    }

    /// Read-only rendering of the persisted profile
    pub fn view(&self) -> ProfileView<'_> {
        ProfileView::new(self.controller.profile())
    }

    fn open_editor(&mut self) -> &mut ProfileEditor {
        debug!("Opening edit session");
        self.editor.insert(ProfileEditor::new(self.controller.profile().clone()))
    }
}

/// Plain-text summary of a profile
pub struct ProfileView<'a> {
    profile: &'a ProfileAggregate,
}

impl<'a> ProfileView<'a> {
    pub fn new(profile: &'a ProfileAggregate) -> Self {
        Self { profile }
    }
}

impl fmt::Display for ProfileView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.profile;

        match &p.avatar {
            Some(avatar) => writeln!(
                f,
                "Avatar: {}x{} {}",
                avatar.width,
                avatar.height,
                avatar.mime().unwrap_or("image")
            )?,
            None => writeln!(f, "Avatar: none")?,
        }

        for field in ProfileField::ALL {
            let value = p.field(field);
            if !value.is_empty() {
                writeln!(f, "{}: {}", field.label(), value)?;
            }
        }

        writeln!(f, "Profile: {}", p.visibility.label())?;

        if !p.interests.is_empty() {
            writeln!(f, "Interests: {}", p.interests.join(", "))?;
        }
        if !p.potential_interests.is_empty() {
            writeln!(f, "Potential interests: {}", p.potential_interests.join(", "))?;
        }
        if !p.links.is_empty() {
            writeln!(f, "Links:")?;
            for link in &p.links {
                writeln!(f, "  {} <{}>", link.name, link.url)?;
            }
        }
        Ok(())
    }
}
