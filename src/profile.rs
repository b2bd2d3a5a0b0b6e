//! The profile aggregate: identity fields, avatar, tag lists and links
//!
//! A profile is edited as a draft and replaced wholesale on save, so every
//! mutator here either applies completely or leaves the value untouched.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

use crate::avatar::AvatarAsset;
use crate::lists::{ListEditor, ListError};

/// Whether the profile is listed publicly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Private => "Private",
            Visibility::Public => "Public",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(format!("unknown visibility '{other}' (expected private or public)")),
        }
    }
}

/// A named external link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl Link {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// One key of a [`Link`] record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    Name,
    Url,
}

/// Scalar identity fields, named as they appear in the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Name,
    LastName,
    JobTitle,
    Phone,
    Email,
    Address,
    Pitch,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::Name,
        ProfileField::LastName,
        ProfileField::JobTitle,
        ProfileField::Phone,
        ProfileField::Email,
        ProfileField::Address,
        ProfileField::Pitch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::LastName => "lastName",
            ProfileField::JobTitle => "jobTitle",
            ProfileField::Phone => "phone",
            ProfileField::Email => "email",
            ProfileField::Address => "address",
            ProfileField::Pitch => "pitch",
        }
    }

    /// Human-readable label for the read-only view
    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::Name => "Name",
            ProfileField::LastName => "Last Name",
            ProfileField::JobTitle => "Job Title",
            ProfileField::Phone => "Phone",
            ProfileField::Email => "Email",
            ProfileField::Address => "Address",
            ProfileField::Pitch => "Pitch",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown profile field '{s}'"))
    }
}

/// Which dynamic collection a list operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Interests,
    PotentialInterests,
    Links,
}

impl ListField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListField::Interests => "interests",
            ListField::PotentialInterests => "potentialInterests",
            ListField::Links => "links",
        }
    }
}

impl std::str::FromStr for ListField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [ListField::Interests, ListField::PotentialInterests, ListField::Links]
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown list '{s}' (expected interests, potentialInterests or links)"))
    }
}

/// A value destined for one of the dynamic collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListValue {
    Tag(String),
    Link(Link),
}

/// The complete profile record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileAggregate {
    pub name: String,
    pub last_name: String,
    pub job_title: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub pitch: String,

    pub visibility: Visibility,

    pub interests: Vec<String>,
    pub potential_interests: Vec<String>,
    pub links: Vec<Link>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_avatar")]
    pub avatar: Option<AvatarAsset>,
}

/// Avatars are stored as an asset object. Older records hold a bare data URI,
/// or `""` for no avatar.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAvatar {
    Asset(AvatarAsset),
    DataUri(String),
}

fn deserialize_avatar<'de, D>(deserializer: D) -> Result<Option<AvatarAsset>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StoredAvatar>::deserialize(deserializer)? {
        None => None,
        Some(StoredAvatar::Asset(asset)) => Some(asset),
        Some(StoredAvatar::DataUri(uri)) if uri.trim().is_empty() => None,
        Some(StoredAvatar::DataUri(uri)) => match AvatarAsset::from_data_uri(&uri) {
            Ok(asset) => Some(asset),
            Err(e) => {
                // Keep the rest of the profile
                warn!(error = %e, "Stored avatar is unreadable, dropping it");
                None
            }
        },
    })
}

impl ProfileAggregate {
    pub fn field(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Name => &self.name,
            ProfileField::LastName => &self.last_name,
            ProfileField::JobTitle => &self.job_title,
            ProfileField::Phone => &self.phone,
            ProfileField::Email => &self.email,
            ProfileField::Address => &self.address,
            ProfileField::Pitch => &self.pitch,
        }
    }

    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::LastName => &mut self.last_name,
            ProfileField::JobTitle => &mut self.job_title,
            ProfileField::Phone => &mut self.phone,
            ProfileField::Email => &mut self.email,
            ProfileField::Address => &mut self.address,
            ProfileField::Pitch => &mut self.pitch,
        };
        *slot = value.into();
    }

    /// Number of entries in a dynamic collection
    pub fn list_len(&self, field: ListField) -> usize {
        match field {
            ListField::Interests => self.interests.len(),
            ListField::PotentialInterests => self.potential_interests.len(),
            ListField::Links => self.links.len(),
        }
    }

    /// Append a default entry to a collection
    pub fn add_item(&mut self, editor: &ListEditor, field: ListField) -> Result<(), ListError> {
        match field {
            ListField::Interests => self.interests = editor.add(&self.interests)?,
            ListField::PotentialInterests => {
                self.potential_interests = editor.add(&self.potential_interests)?
            }
            ListField::Links => self.links = editor.add(&self.links)?,
        }
        Ok(())
    }

    /// Append a specific entry to a collection
    pub fn push_item(&mut self, editor: &ListEditor, field: ListField, value: ListValue) -> Result<(), ListError> {
        match (field, value) {
            (ListField::Interests, ListValue::Tag(tag)) => {
                self.interests = editor.push(&self.interests, tag)?
            }
            (ListField::PotentialInterests, ListValue::Tag(tag)) => {
                self.potential_interests = editor.push(&self.potential_interests, tag)?
            }
            (ListField::Links, ListValue::Link(link)) => self.links = editor.push(&self.links, link)?,
            _ => return Err(ListError::ItemKindMismatch),
        }
        Ok(())
    }

    /// Replace the entry at `index`
    pub fn update_item(
        &mut self,
        editor: &ListEditor,
        field: ListField,
        index: usize,
        value: ListValue,
    ) -> Result<(), ListError> {
        match (field, value) {
            (ListField::Interests, ListValue::Tag(tag)) => {
                self.interests = editor.update(&self.interests, index, tag)?
            }
            (ListField::PotentialInterests, ListValue::Tag(tag)) => {
                self.potential_interests = editor.update(&self.potential_interests, index, tag)?
            }
            (ListField::Links, ListValue::Link(link)) => {
                self.links = editor.update(&self.links, index, link)?
            }
            _ => return Err(ListError::ItemKindMismatch),
        }
        Ok(())
    }

    /// Change one key of the link at `index`
    pub fn update_link_field(
        &mut self,
        editor: &ListEditor,
        index: usize,
        key: LinkField,
        value: &str,
    ) -> Result<(), ListError> {
        let mut link = self
            .links
            .get(index)
            .cloned()
            .ok_or(ListError::IndexOutOfRange {
                index,
                len: self.links.len(),
            })?;
        match key {
            LinkField::Name => link.name = value.to_string(),
            LinkField::Url => link.url = value.to_string(),
        }
        self.links = editor.update(&self.links, index, link)?;
        Ok(())
    }

    /// Remove the entry at `index`
    pub fn remove_item(&mut self, editor: &ListEditor, field: ListField, index: usize) -> Result<(), ListError> {
        match field {
            ListField::Interests => self.interests = editor.remove(&self.interests, index)?,
            ListField::PotentialInterests => {
                self.potential_interests = editor.remove(&self.potential_interests, index)?
            }
            ListField::Links => self.links = editor.remove(&self.links, index)?,
        }
        Ok(())
    }

    /// Bring a record read from storage back within list bounds.
    /// Returns true if anything was trimmed.
    pub fn normalize(&mut self, editor: &ListEditor) -> bool {
        let mut changed = false;

        for (field, list) in [
            (ListField::Interests, &mut self.interests),
            (ListField::PotentialInterests, &mut self.potential_interests),
        ] {
            let dropped = editor.clamp_len(list);
            if dropped > 0 {
                warn!(field = field.as_str(), dropped, max = editor.max_items, "list exceeds bound, truncating");
                changed = true;
            }
            for tag in list.iter_mut() {
                if editor.clamp_tag(tag) {
                    warn!(field = field.as_str(), max = editor.max_item_chars, "tag exceeds length bound, truncating");
                    changed = true;
                }
            }
        }

        let dropped = editor.clamp_len(&mut self.links);
        if dropped > 0 {
            warn!(field = ListField::Links.as_str(), dropped, max = editor.max_items, "list exceeds bound, truncating");
            changed = true;
        }

        changed
    }
}
