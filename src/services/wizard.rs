use crate::models::{PhotoPair, SiteMetadata, UploadedPhoto, WebhookPayload};
use crate::services::normalizer::{fallback_title, normalize};
use crate::services::payload::{build_payload, merge_pairs, pair_by_filename};
use crate::services::webhook::WebhookError;
use crate::services::workspace::{ImageFallback, Workspace};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    MetadataEntry,
    PhotoUpload,
    Editing,
    Done,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WizardError {
    #[error("{action} is not allowed in step {step:?}")]
    InvalidTransition {
        action: &'static str,
        step: WizardStep,
    },
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("at least one complete before/after pair is required")]
    NoCompletePairs,
    #[error("a generation request is already in flight")]
    AlreadyGenerating,
    #[error("no generated content to work with yet")]
    NoWorkspace,
}

/// Handed out when a generation starts; the response is only accepted while
/// its cycle is still current.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub cycle: u64,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Ready,
    Failed,
    Discarded,
}

/// Four-step flow: metadata, photos, generate/edit, done.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wizard {
    id: Uuid,
    step: WizardStep,
    metadata: SiteMetadata,
    photo_pairs: Vec<PhotoPair>,
    generating: bool,
    last_error: Option<String>,
    workspace: Option<Workspace>,
    #[serde(skip)]
    cycle: u64,
    #[serde(skip)]
    image_fallback: ImageFallback,
}

impl Wizard {
    pub fn new(image_fallback: ImageFallback) -> Self {
        Wizard {
            id: Uuid::new_v4(),
            step: WizardStep::MetadataEntry,
            metadata: SiteMetadata::default(),
            photo_pairs: Vec::new(),
            generating: false,
            last_error: None,
            workspace: None,
            cycle: 0,
            image_fallback,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    pub fn photo_pairs(&self) -> &[PhotoPair] {
        &self.photo_pairs
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    /// Mutable access for edits; only while editing and not in flight.
    pub fn workspace_mut(&mut self) -> Result<&mut Workspace, WizardError> {
        self.expect_step(WizardStep::Editing, "edit")?;
        self.workspace.as_mut().ok_or(WizardError::NoWorkspace)
    }

    pub fn submit_metadata(&mut self, metadata: SiteMetadata) -> Result<(), WizardError> {
        self.expect_step(WizardStep::MetadataEntry, "submit metadata")?;

        let required = [
            ("buildingName", &metadata.building_name),
            ("workDate", &metadata.work_date),
            ("detailedLocation", &metadata.detailed_location),
            ("productType", &metadata.product_type),
            ("productColor", &metadata.product_color),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(WizardError::MissingFields(missing));
        }

        self.metadata = metadata;
        self.step = WizardStep::PhotoUpload;
        Ok(())
    }

    pub fn add_uploads(&mut self, files: Vec<UploadedPhoto>) -> Result<(), WizardError> {
        self.expect_step(WizardStep::PhotoUpload, "upload photos")?;
        merge_pairs(&mut self.photo_pairs, pair_by_filename(files));
        Ok(())
    }

    pub fn remove_pair(&mut self, pair_id: Uuid) -> Result<bool, WizardError> {
        self.expect_step(WizardStep::PhotoUpload, "remove photos")?;
        let before = self.photo_pairs.len();
        self.photo_pairs.retain(|pair| pair.id != pair_id);
        Ok(self.photo_pairs.len() != before)
    }

    pub fn clear_pairs(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::PhotoUpload, "clear photos")?;
        self.photo_pairs.clear();
        Ok(())
    }

    /// Moves to step 3 with the in-flight flag raised. The caller submits the
    /// ticket's payload and reports back through [`Wizard::finish_generation`].
    pub fn start_generation(&mut self) -> Result<GenerationTicket, WizardError> {
        if self.generating {
            return Err(WizardError::AlreadyGenerating);
        }
        self.expect_step(WizardStep::PhotoUpload, "generate")?;
        if !self.photo_pairs.iter().any(PhotoPair::is_complete) {
            return Err(WizardError::NoCompletePairs);
        }

        self.cycle += 1;
        self.step = WizardStep::Editing;
        self.generating = true;
        self.last_error = None;
        self.workspace = None;

        Ok(GenerationTicket {
            cycle: self.cycle,
            payload: build_payload(&self.metadata, &self.photo_pairs),
        })
    }

    pub fn finish_generation(
        &mut self,
        cycle: u64,
        result: Result<Value, WebhookError>,
    ) -> GenerationOutcome {
        if cycle != self.cycle || !self.generating || self.step != WizardStep::Editing {
            tracing::info!(wizard = %self.id, cycle, "discarding stale generation response");
            return GenerationOutcome::Discarded;
        }
        self.generating = false;

        match result {
            Ok(raw) => {
                let content = normalize(&raw, &fallback_title(&self.metadata.building_name));
                let uploaded_after: Vec<String> = self
                    .photo_pairs
                    .iter()
                    .filter_map(|pair| pair.after.clone())
                    .collect();
                tracing::info!(
                    wizard = %self.id,
                    sections = content.sections.len(),
                    images = content.images.len(),
                    "generation ready"
                );
                let workspace = Workspace::new(content, self.image_fallback, &uploaded_after);
                self.workspace = Some(workspace);
                GenerationOutcome::Ready
            }
            Err(e) => {
                tracing::warn!(wizard = %self.id, "generation failed: {e}");
                self.last_error = Some(e.user_message());
                self.workspace = None;
                self.step = WizardStep::PhotoUpload;
                GenerationOutcome::Failed
            }
        }
    }

    pub fn back(&mut self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::PhotoUpload => {
                self.step = WizardStep::MetadataEntry;
                Ok(())
            }
            WizardStep::Editing => {
                // Any in-flight response now belongs to an abandoned cycle.
                self.cycle += 1;
                self.generating = false;
                self.workspace = None;
                self.step = WizardStep::PhotoUpload;
                Ok(())
            }
            step => Err(WizardError::InvalidTransition {
                action: "go back",
                step,
            }),
        }
    }

    pub fn complete(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Editing, "complete")?;
        if self.generating {
            return Err(WizardError::AlreadyGenerating);
        }
        if self.workspace.is_none() {
            return Err(WizardError::NoWorkspace);
        }
        self.step = WizardStep::Done;
        Ok(())
    }

    /// Starts over from step 1, dropping everything but the session identity.
    pub fn reset(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Done, "reset")?;
        *self = Wizard {
            id: self.id,
            cycle: self.cycle + 1,
            ..Wizard::new(self.image_fallback)
        };
        Ok(())
    }

    fn expect_step(&self, expected: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step != expected {
            return Err(WizardError::InvalidTransition {
                action,
                step: self.step,
            });
        }
        if self.generating {
            return Err(WizardError::AlreadyGenerating);
        }
        Ok(())
    }
}
