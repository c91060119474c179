use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    #[default]
    Remodeling,
    New,
    Occupied,
}

fn default_work_hours() -> f64 {
    4.0
}

fn default_use_watermark() -> bool {
    true
}

/// Site metadata collected in the first wizard step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    #[serde(default)]
    pub building_name: String,
    #[serde(default)]
    pub work_date: String,
    #[serde(default)]
    pub work_type: WorkType,
    #[serde(default)]
    pub detailed_location: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub product_color: String,
    #[serde(default = "default_work_hours")]
    pub work_hours: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default = "default_use_watermark")]
    pub use_watermark: bool,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        SiteMetadata {
            building_name: String::new(),
            work_date: String::new(),
            work_type: WorkType::default(),
            detailed_location: String::new(),
            product_type: String::new(),
            product_color: String::new(),
            work_hours: default_work_hours(),
            issues: Vec::new(),
            use_watermark: default_use_watermark(),
        }
    }
}

/// One before/after slot produced by the upload step. Either side may still
/// be missing while the user is uploading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPair {
    pub id: Uuid,
    pub before: Option<String>,
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_name: Option<String>,
}

impl PhotoPair {
    pub fn is_complete(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }
}

/// A named data-URI file as sent by the bulk upload form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPhoto {
    pub name: String,
    pub data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSetPayload {
    pub before: String,
    pub after: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_name: Option<String>,
}

/// Request body posted to the generation webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(flatten)]
    pub metadata: SiteMetadata,
    pub photo_sets: Vec<PhotoSetPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: String,
    pub content: String,
}

impl Section {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Section {
            kind: kind.into(),
            content: content.into(),
        }
    }
}

/// Canonical result of normalizing one webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedContent {
    pub title: String,
    pub sections: Vec<Section>,
    pub images: Vec<String>,
    pub hashtags: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
}

/// Editable unit of the workspace. `content` is HTML for text blocks and an
/// image URL or data URI for image blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub id: Uuid,
    pub kind: BlockKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_type: Option<String>,
}
