//! State of a post being composed: pending images, copy and the active
//! editor stage. Updated only through [`DraftState::apply`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DraftError;
use crate::geo::GeoCoordinate;
use crate::media::{ImageRecord, MetadataStatus};

/// Editor tabs, in the order a post is put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorStage {
    #[default]
    Write,
    Generator,
    Preview,
    Setting,
}

impl EditorStage {
    pub fn next(self) -> Self {
        match self {
            EditorStage::Write => EditorStage::Generator,
            EditorStage::Generator => EditorStage::Preview,
            EditorStage::Preview | EditorStage::Setting => EditorStage::Setting,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            EditorStage::Write | EditorStage::Generator => EditorStage::Write,
            EditorStage::Preview => EditorStage::Generator,
            EditorStage::Setting => EditorStage::Preview,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DraftAction {
    AddImages(Vec<ImageRecord>),
    RemoveImage(String),
    SetLocation { id: String, coordinate: GeoCoordinate },
    SetFeatured(String),
    ClearFeatured,
    SetDescription(String),
    SetGeneratedContent(Option<String>),
    SetStage(EditorStage),
    Discard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    pub images: Vec<ImageRecord>,
    pub description: String,
    pub generated_content: Option<String>,
    pub stage: EditorStage,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: DraftAction) -> Result<(), DraftError> {
        match action {
            DraftAction::AddImages(records) => {
                for mut record in records {
                    if self.images.iter().any(|r| r.id == record.id) {
                        debug!(
                            id = %record.id,
                            filename = %record.filename,
                            "image already pending"
                        );
                        continue;
                    }
                    // Featured is only ever set through SetFeatured.
                    record.featured = false;
                    self.images.push(record);
                }
            }
            DraftAction::RemoveImage(id) => {
                let idx = self.position(&id)?;
                self.images.remove(idx);
            }
            DraftAction::SetLocation { id, coordinate } => {
                let idx = self.position(&id)?;
                let record = &mut self.images[idx];
                debug!(id = %record.id, %coordinate, "location set manually");
                record.coordinate = coordinate;
                record.status = MetadataStatus::UserSupplied;
            }
            DraftAction::SetFeatured(id) => {
                let idx = self.position(&id)?;
                for (i, record) in self.images.iter_mut().enumerate() {
                    record.featured = i == idx;
                }
            }
            DraftAction::ClearFeatured => {
                for record in &mut self.images {
                    record.featured = false;
                }
            }
            DraftAction::SetDescription(text) => self.description = text,
            DraftAction::SetGeneratedContent(content) => self.generated_content = content,
            DraftAction::SetStage(stage) => self.stage = stage,
            DraftAction::Discard => *self = Self::default(),
        }
        Ok(())
    }

    pub fn featured(&self) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.featured)
    }

    /// Images whose location still has to be confirmed by the user.
    pub fn needs_review(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images.iter().filter(|r| r.needs_review())
    }

    fn position(&self, id: &str) -> Result<usize, DraftError> {
        self.images
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DraftError::UnknownImage(id.to_string()))
    }
}
