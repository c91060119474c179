use crate::models::{BlockKind, ContentBlock, NormalizedContent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which pictures the image bank offers after a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFallback {
    /// Only images returned by the webhook.
    Generated,
    /// Only the uploaded "after" photos.
    Uploaded,
    /// Generated images, or the uploaded "after" photos when none came back.
    #[default]
    GeneratedThenUploaded,
}

/// Editable state for one generation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    title: String,
    hashtags: String,
    blocks: Vec<ContentBlock>,
    images: Vec<String>,
}

impl Workspace {
    pub fn new(
        content: NormalizedContent,
        fallback: ImageFallback,
        uploaded_after: &[String],
    ) -> Self {
        let images = match fallback {
            ImageFallback::Generated => content.images,
            ImageFallback::Uploaded => uploaded_after.to_vec(),
            ImageFallback::GeneratedThenUploaded if content.images.is_empty() => {
                uploaded_after.to_vec()
            }
            ImageFallback::GeneratedThenUploaded => content.images,
        };

        let blocks = content
            .sections
            .into_iter()
            .map(|section| ContentBlock {
                id: Uuid::new_v4(),
                kind: BlockKind::Text,
                content: section.content,
                section_type: Some(section.kind),
            })
            .collect();

        Workspace {
            title: content.title,
            hashtags: content.hashtags,
            blocks,
            images,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn hashtags(&self) -> &str {
        &self.hashtags
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn edit_title(&mut self, text: impl Into<String>) {
        self.title = text.into();
    }

    pub fn edit_hashtags(&mut self, text: impl Into<String>) {
        self.hashtags = text.into();
    }

    /// Replaces a block's content. Returns false when the id is unknown.
    pub fn edit_section_content(&mut self, id: Uuid, html: impl Into<String>) -> bool {
        match self.blocks.iter_mut().find(|block| block.id == id) {
            Some(block) => {
                block.content = html.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_section(&mut self, id: Uuid) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|block| block.id != id);
        self.blocks.len() != before
    }

    /// Inserts a new image block; `index` past the end appends.
    pub fn insert_image_at(&mut self, index: usize, image: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        let index = index.min(self.blocks.len());
        self.blocks.insert(
            index,
            ContentBlock {
                id,
                kind: BlockKind::Image,
                content: image.into(),
                section_type: None,
            },
        );
        id
    }

    /// Moves the block at `from` to the drop position `to`, where `to` counts
    /// positions in the list before the move.
    pub fn move_section(&mut self, from: usize, to: usize) -> bool {
        if from >= self.blocks.len() {
            return false;
        }
        let block = self.blocks.remove(from);
        let target = if from < to { to - 1 } else { to };
        let target = target.min(self.blocks.len());
        self.blocks.insert(target, block);
        true
    }
}
