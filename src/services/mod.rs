// Service exports
pub mod backend;
pub mod cache;
pub mod postgres;

pub use backend::RemoteEmbeddingBackend;
pub use cache::EmbeddingCache;
pub use postgres::{LedgerStats, PostgresClient, PostgresError, SampleRow};

use crate::core::embedding::Embedding;
use crate::core::store::{PreferenceData, ReferenceInput};

/// Assemble everything a preference snapshot is built from: the stored
/// profile, reference images resolved to bytes, feedback-labeled example
/// embeddings, and the keyword lists.
///
/// References whose files have gone missing are skipped with a warning
/// rather than failing the reload.
pub async fn gather_preference_data(
    db: &PostgresClient,
) -> Result<PreferenceData, PostgresError> {
    let profile = db.get_profile().await?;

    let mut references = Vec::new();
    for image in db.list_references().await? {
        match tokio::fs::read(&image.file_path).await {
            Ok(bytes) => references.push(ReferenceInput { image, bytes }),
            Err(e) => {
                tracing::warn!("cannot read reference image {}: {}", image.file_path, e);
            }
        }
    }

    let (raw_positives, raw_negatives) = db.labeled_examples().await?;
    let positive_examples = embed_stored(raw_positives);
    let negative_examples = embed_stored(raw_negatives);

    Ok(PreferenceData {
        profile,
        references,
        positive_examples,
        negative_examples,
        traits: db.list_traits().await?,
        negative_keywords: db.list_negative_keywords().await?,
        interests: db.list_interests().await?,
    })
}

fn embed_stored(raw: Vec<Vec<f32>>) -> Vec<Embedding> {
    raw.into_iter()
        .filter_map(|values| match Embedding::new(values) {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!("skipping stored example embedding: {}", e);
                None
            }
        })
        .collect()
}
