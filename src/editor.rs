//! Edit session: a draft profile plus the avatar pipeline feeding it
//!
//! The draft is the only mutable copy of the profile while editing. The
//! persisted profile is not touched until the page submits the draft.

use tracing::{debug, info, warn};

use crate::avatar::{
    AcquireError, AvatarAsset, AvatarLoader, CropEngine, CropError, CropRegion, Generation, ImageBlob,
    SessionId, SourceImage, acquire,
};
use crate::constants::avatar::DEFAULT_ZOOM;
use crate::lists::{ListEditor, ListError};
use crate::profile::{LinkField, ListField, ListValue, ProfileAggregate, ProfileField, Visibility};

pub struct ProfileEditor {
    draft: ProfileAggregate,
    lists: ListEditor,
    crop: CropEngine,
    loader: AvatarLoader,
    avatar_error: Option<AcquireError>,
}

impl ProfileEditor {
    pub fn new(draft: ProfileAggregate) -> Self {
        Self {
            draft,
            lists: ListEditor::default(),
            crop: CropEngine::default(),
            loader: AvatarLoader::new(),
            avatar_error: None,
        }
    }

    pub fn draft(&self) -> &ProfileAggregate {
        &self.draft
    }

    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        self.draft.set_field(field, value);
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.draft.visibility = visibility;
    }

    // ----- dynamic lists -----

    pub fn add_item(&mut self, field: ListField) -> Result<(), ListError> {
        self.draft.add_item(&self.lists, field).inspect_err(|e| log_list_error(field, e))
    }

    pub fn push_item(&mut self, field: ListField, value: ListValue) -> Result<(), ListError> {
        self.draft
            .push_item(&self.lists, field, value)
            .inspect_err(|e| log_list_error(field, e))
    }

    pub fn update_item(&mut self, field: ListField, index: usize, value: ListValue) -> Result<(), ListError> {
        self.draft
            .update_item(&self.lists, field, index, value)
            .inspect_err(|e| log_list_error(field, e))
    }

    pub fn update_link_field(&mut self, index: usize, key: LinkField, value: &str) -> Result<(), ListError> {
        self.draft
            .update_link_field(&self.lists, index, key, value)
            .inspect_err(|e| log_list_error(ListField::Links, e))
    }

    pub fn remove_item(&mut self, field: ListField, index: usize) -> Result<(), ListError> {
        self.draft
            .remove_item(&self.lists, field, index)
            .inspect_err(|e| log_list_error(field, e))
    }

    // ----- avatar -----

    /// Last acquisition failure, cleared by the next successful selection
    pub fn avatar_error(&self) -> Option<&AcquireError> {
        self.avatar_error.as_ref()
    }

    /// Queue `blob` for background decoding. Supersedes any pending
    /// selection. Requires a Tokio runtime.
    pub fn select_avatar(&mut self, blob: ImageBlob) -> Generation {
        self.loader.select(blob)
    }

    pub fn avatar_pending(&self) -> bool {
        self.loader.is_pending()
    }

    /// Apply a finished decode if one is ready
    pub fn poll_avatar(&mut self) -> Option<Result<SessionId, AcquireError>> {
        let result = self.loader.poll()?;
        Some(self.apply_decode(result))
    }

    /// Wait for the pending selection and apply it
    pub async fn await_avatar(&mut self) -> Option<Result<SessionId, AcquireError>> {
        let result = self.loader.wait().await?;
        Some(self.apply_decode(result))
    }

    /// Validate and decode on the calling thread
    pub fn load_avatar_now(&mut self, blob: &ImageBlob) -> Result<SessionId, AcquireError> {
        self.loader.cancel();
        self.apply_decode(acquire(blob))
    }

    pub fn cancel_avatar_load(&mut self) {
        self.loader.cancel();
    }

    fn apply_decode(&mut self, result: Result<SourceImage, AcquireError>) -> Result<SessionId, AcquireError> {
        match result {
            Ok(source) => {
                self.avatar_error = None;
                let id = self.crop.begin_crop(source);
                // Zoom carries over once a rectangle is chosen
                let initial = CropRegion {
                    zoom: DEFAULT_ZOOM,
                    ..CropRegion::default()
                };
                // Session was opened just above
                if let Err(e) = self.crop.update_region(id, initial) {
                    warn!(error = %e, "Failed to apply default crop zoom");
                }
                Ok(id)
            }
            Err(e) => {
                // Prior avatar and crop session stay as they were
                self.avatar_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn crop_session(&self) -> Option<SessionId> {
        self.crop.active_session()
    }

    pub fn crop_region(&self) -> Option<CropRegion> {
        self.crop.active_session().and_then(|id| self.crop.region(id).ok())
    }

    /// Dimensions of the image being cropped
    pub fn crop_source_dimensions(&self) -> Option<(u32, u32)> {
        self.crop
            .active_session()
            .and_then(|id| self.crop.source_dimensions(id).ok())
    }

    pub fn update_crop(&mut self, region: CropRegion) -> Result<(), CropError> {
        let id = self.crop.active_session().ok_or(CropError::NoSession)?;
        self.crop.update_region(id, region)
    }

    /// Render the current crop into the staging slot
    pub fn preview_crop(&mut self) -> Result<&AvatarAsset, CropError> {
        let id = self.crop.active_session().ok_or(CropError::NoSession)?;
        self.crop.preview(id)
    }

    pub fn staged_avatar(&self) -> Option<&AvatarAsset> {
        self.crop.staged()
    }

    /// Finish the crop and make the result the draft's avatar
    pub fn commit_crop(&mut self) -> Result<&AvatarAsset, CropError> {
        let id = self.crop.active_session().ok_or(CropError::NoSession)?;
        let asset = self.crop.commit(id)?;
        info!(width = asset.width, height = asset.height, "Avatar committed to draft");
        Ok(self.draft.avatar.insert(asset))
    }

    pub fn cancel_crop(&mut self) {
        if let Some(id) = self.crop.active_session() {
            self.crop.cancel(id);
        }
    }

    /// Drop the committed avatar and anything in progress
    pub fn remove_avatar(&mut self) {
        self.cancel_crop();
        self.loader.cancel();
        self.avatar_error = None;
        if self.draft.avatar.take().is_some() {
            info!("Avatar removed from draft");
        }
    }

    /// Abandon in-flight avatar work before the draft is submitted
    pub fn settle(&mut self) {
        if self.crop.active_session().is_some() {
            debug!("Discarding uncommitted crop on submit");
        }
        self.cancel_crop();
        self.loader.cancel();
    }
}

fn log_list_error(field: ListField, error: &ListError) {
    warn!(field = field.as_str(), error = %error, "List edit rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::acquire::tests::png_blob;
    use crate::constants::avatar::{MAX_FILE_SIZE, OUTPUT_SIZE};
    use crate::constants::lists::MAX_ITEMS;
    use crate::profile::Link;
    use std::time::Duration;

    async fn poll_until_ready(editor: &mut ProfileEditor) -> Option<Result<SessionId, AcquireError>> {
        for _ in 0..200 {
            if let Some(result) = editor.poll_avatar() {
                return Some(result);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[test]
    fn test_list_edits_apply_to_draft() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        for tag in ["a", "b", "c"] {
            editor.push_item(ListField::Interests, ListValue::Tag(tag.to_string())).unwrap();
        }
        editor.remove_item(ListField::Interests, 1).unwrap();
        assert_eq!(editor.draft().interests, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_update_link_field_edits_one_side() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor
            .push_item(ListField::Links, ListValue::Link(Link::new("Docs", "https://example.com")))
            .unwrap();

        editor.update_link_field(0, LinkField::Url, "https://example.org").unwrap();
        assert_eq!(editor.draft().links, vec![Link::new("Docs", "https://example.org")]);

        let before = editor.draft().clone();
        assert_eq!(
            editor.update_link_field(3, LinkField::Name, "Blog"),
            Err(ListError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(editor.draft(), &before);
    }

    #[test]
    fn test_list_full_surfaces_and_leaves_draft() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        for _ in 0..MAX_ITEMS {
            editor.add_item(ListField::PotentialInterests).unwrap();
        }
        let before = editor.draft().clone();

        assert_eq!(
            editor.add_item(ListField::PotentialInterests),
            Err(ListError::ListFull { max: MAX_ITEMS })
        );
        assert_eq!(editor.draft(), &before);
    }

    #[test]
    fn test_load_commit_sets_avatar() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(300, 200)).unwrap();
        assert_eq!(editor.crop_region().map(|r| r.zoom), Some(DEFAULT_ZOOM));

        let asset = editor.commit_crop().unwrap().clone();
        assert_eq!((asset.width, asset.height), (OUTPUT_SIZE, OUTPUT_SIZE));
        assert_eq!(editor.draft().avatar.as_ref(), Some(&asset));
        assert!(editor.crop_session().is_none());
    }

    #[test]
    fn test_unadjusted_crop_takes_centred_square() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(200, 100)).unwrap();

        assert_eq!(editor.crop_source_dimensions(), Some((200, 100)));
        let region = editor.crop_region().unwrap();
        assert!(region.is_unset());
        assert_eq!(region.resolve(200, 100), (50, 0, 100, 100));
    }

    #[test]
    fn test_cancel_after_commit_keeps_avatar() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(40, 40)).unwrap();
        editor.commit_crop().unwrap();
        let committed = editor.draft().avatar.clone();

        editor.cancel_crop();
        assert!(committed.is_some());
        assert_eq!(editor.draft().avatar, committed);
    }

    #[test]
    fn test_failed_acquire_keeps_committed_avatar() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(40, 40)).unwrap();
        let committed = editor.commit_crop().unwrap().clone();

        let oversized = ImageBlob::new("image/png", vec![0u8; 6 * 1024 * 1024]);
        let err = editor.load_avatar_now(&oversized).unwrap_err();

        assert!(matches!(err, AcquireError::FileTooLarge { max: MAX_FILE_SIZE, .. }));
        assert_eq!(editor.avatar_error(), Some(&err));
        assert_eq!(editor.draft().avatar.as_ref(), Some(&committed));
    }

    #[test]
    fn test_cancel_crop_keeps_previous_avatar() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(40, 40)).unwrap();
        let committed = editor.commit_crop().unwrap().clone();

        editor.load_avatar_now(&png_blob(90, 60)).unwrap();
        editor.preview_crop().unwrap();
        assert!(editor.staged_avatar().is_some());

        editor.cancel_crop();
        assert!(editor.staged_avatar().is_none());
        assert_eq!(editor.draft().avatar.as_ref(), Some(&committed));
    }

    #[test]
    fn test_remove_avatar_clears_everything() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.load_avatar_now(&png_blob(40, 40)).unwrap();
        editor.commit_crop().unwrap();
        editor.load_avatar_now(&png_blob(40, 40)).unwrap();

        editor.remove_avatar();
        assert!(editor.draft().avatar.is_none());
        assert!(editor.crop_session().is_none());
        assert!(matches!(editor.commit_crop(), Err(CropError::NoSession)));
    }

    #[tokio::test]
    async fn test_async_selection_last_wins() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.select_avatar(png_blob(10, 10));
        editor.select_avatar(png_blob(64, 32));

        let id = editor.await_avatar().await.unwrap().unwrap();
        assert_eq!(editor.crop_session(), Some(id));
        let asset = editor.commit_crop().unwrap();
        assert_eq!((asset.source_width, asset.source_height), (64, 32));
    }

    #[tokio::test]
    async fn test_poll_drops_superseded_decode() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        assert!(editor.poll_avatar().is_none());

        editor.select_avatar(png_blob(10, 10));
        editor.select_avatar(png_blob(48, 24));

        let id = poll_until_ready(&mut editor).await.unwrap().unwrap();
        assert_eq!(editor.crop_session(), Some(id));
        assert_eq!(editor.crop_source_dimensions(), Some((48, 24)));
        assert!(!editor.avatar_pending());

        // The superseded decode never opens a session
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(editor.poll_avatar().is_none());
        assert_eq!(editor.crop_session(), Some(id));
    }

    #[tokio::test]
    async fn test_cancel_avatar_load_drops_completion() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.select_avatar(png_blob(16, 16));
        editor.cancel_avatar_load();
        assert!(!editor.avatar_pending());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(editor.poll_avatar().is_none());
        assert!(editor.crop_session().is_none());
        assert!(editor.avatar_error().is_none());
    }

    #[tokio::test]
    async fn test_async_selection_cancelled_by_remove() {
        let mut editor = ProfileEditor::new(ProfileAggregate::default());
        editor.select_avatar(png_blob(10, 10));
        editor.remove_avatar();

        assert!(!editor.avatar_pending());
        assert!(editor.await_avatar().await.is_none());
        assert!(editor.crop_session().is_none());
    }
}
