//! Command-line front end

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::profile::{Link, ListField, ListValue, ProfileField, Visibility};

#[derive(Parser, Debug)]
#[command(name = "profile-dashboard")]
#[command(about = "View and edit a personal profile stored on this machine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the saved profile
    Show,

    /// Change the profile and save it
    Edit(EditArgs),

    /// Write the saved avatar to a PNG file
    ExportAvatar { path: PathBuf },

    /// Print config and store locations
    Path,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Set a field, e.g. `--set email=ada@example.com`
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub sets: Vec<FieldAssign>,

    #[arg(long)]
    pub visibility: Option<Visibility>,

    /// Append an entry. Links take `links=NAME=URL`.
    #[arg(long = "add", value_name = "LIST=VALUE")]
    pub adds: Vec<ListEntry>,

    /// Replace an entry, e.g. `--update interests:0=rust`
    #[arg(long = "update", value_name = "LIST:INDEX=VALUE")]
    pub updates: Vec<ListUpdate>,

    /// Remove an entry, e.g. `--remove links:1`. Applied after updates.
    #[arg(long = "remove", value_name = "LIST:INDEX")]
    pub removes: Vec<ListIndex>,

    /// Image to use as the new avatar (.jpg, .jpeg or .png)
    #[arg(long)]
    pub avatar: Option<PathBuf>,

    /// Crop rectangle in source pixels
    #[arg(long, value_name = "X,Y,W,H", requires = "avatar")]
    pub crop: Option<CropRect>,

    #[arg(long, requires = "avatar")]
    pub zoom: Option<f32>,

    #[arg(long, conflicts_with = "avatar")]
    pub remove_avatar: bool,
}

#[derive(Debug, Clone)]
pub struct FieldAssign {
    pub field: ProfileField,
    pub value: String,
}

impl FromStr for FieldAssign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s.split_once('=').ok_or("expected FIELD=VALUE")?;
        Ok(Self {
            field: field.trim().parse()?,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub list: ListField,
    pub value: ListValue,
}

impl FromStr for ListEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (list, raw) = s.split_once('=').ok_or("expected LIST=VALUE")?;
        let list: ListField = list.trim().parse()?;
        Ok(Self {
            list,
            value: list_value(list, raw)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ListIndex {
    pub list: ListField,
    pub index: usize,
}

impl FromStr for ListIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (list, index) = s.split_once(':').ok_or("expected LIST:INDEX")?;
        Ok(Self {
            list: list.trim().parse()?,
            index: index
                .trim()
                .parse()
                .map_err(|e| format!("invalid index '{index}': {e}"))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ListUpdate {
    pub target: ListIndex,
    pub value: ListValue,
}

impl FromStr for ListUpdate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, raw) = s.split_once('=').ok_or("expected LIST:INDEX=VALUE")?;
        let target: ListIndex = target.parse()?;
        Ok(Self {
            value: list_value(target.list, raw)?,
            target,
        })
    }
}

fn list_value(list: ListField, raw: &str) -> Result<ListValue, String> {
    match list {
        ListField::Links => {
            let (name, url) = raw.split_once('=').ok_or("links take NAME=URL")?;
            Ok(ListValue::Link(Link::new(name, url)))
        }
        ListField::Interests | ListField::PotentialInterests => Ok(ListValue::Tag(raw.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid crop rectangle '{s}': {e}"))?;
        match parts[..] {
            [x, y, width, height] => Ok(Self { x, y, width, height }),
            _ => Err(format!("expected X,Y,W,H, got '{s}'")),
        }
    }
}
