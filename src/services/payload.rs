use crate::models::{PhotoPair, PhotoSetPayload, SiteMetadata, UploadedPhoto, WebhookPayload};
use uuid::Uuid;

pub const MAX_PHOTO_PAIRS: usize = 10;

/// Builds the webhook body. Pairs missing either side are skipped.
pub fn build_payload(metadata: &SiteMetadata, pairs: &[PhotoPair]) -> WebhookPayload {
    let photo_sets = pairs
        .iter()
        .filter_map(|pair| {
            let (Some(before), Some(after)) = (&pair.before, &pair.after) else {
                return None;
            };
            Some(PhotoSetPayload {
                before: before.clone(),
                after: after.clone(),
                before_name: pair.before_name.clone(),
                after_name: pair.after_name.clone(),
            })
        })
        .collect();

    WebhookPayload {
        metadata: metadata.clone(),
        photo_sets,
    }
}

/// Sorts uploads by file name and pairs them two at a time as (before, after).
/// An odd trailing file becomes a pair with no `after`.
pub fn pair_by_filename(mut files: Vec<UploadedPhoto>) -> Vec<PhotoPair> {
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut pairs = Vec::with_capacity(files.len().div_ceil(2));
    let mut files = files.into_iter();
    while let Some(before) = files.next() {
        let after = files.next();
        pairs.push(PhotoPair {
            id: Uuid::new_v4(),
            before: Some(before.data_uri),
            before_name: Some(before.name),
            after_name: after.as_ref().map(|photo| photo.name.clone()),
            after: after.map(|photo| photo.data_uri),
        });
    }
    pairs
}

/// Appends freshly paired uploads to the existing non-empty pairs, keeping at
/// most [`MAX_PHOTO_PAIRS`].
pub fn merge_pairs(existing: &mut Vec<PhotoPair>, incoming: Vec<PhotoPair>) {
    existing.retain(|pair| pair.before.is_some() || pair.after.is_some());
    existing.extend(incoming);
    existing.truncate(MAX_PHOTO_PAIRS);
}
