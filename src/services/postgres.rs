use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ClassificationResult, FeedbackKind, ModelVersion, PreferenceProfile, ReferenceImage,
    ScoringWeights, SharedInterest, VersionCounters,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A persisted classification sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRow {
    pub id: Uuid,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    pub result: ClassificationResult,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate statistics over the classification ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    #[serde(rename = "totalSamples")]
    pub total_samples: i64,
    #[serde(rename = "withFeedback")]
    pub with_feedback: i64,
    pub likes: i64,
    pub dislikes: i64,
    #[serde(rename = "superLikes")]
    pub super_likes: i64,
    pub matches: i64,
    #[serde(rename = "noMatches")]
    pub no_matches: i64,
    #[serde(rename = "avgConfidence")]
    pub avg_confidence: Option<f64>,
}

/// PostgreSQL client for preferences, the classification ledger, and the
/// model version registry.
///
/// Feedback counter updates run inside transactions with row locks so
/// concurrent submissions over the same version never lose increments.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    // ----- preference profile (singleton row) -----

    /// Fetch the preference profile, seeding the defaults on first use
    pub async fn get_profile(&self) -> Result<PreferenceProfile, PostgresError> {
        let query = r#"
            SELECT physical_weight, personality_weight, interest_weight,
                   min_score, super_like_score, age_min, age_max, updated_at
            FROM preference_profile
            WHERE id = 1
        "#;

        if let Some(row) = sqlx::query(query).fetch_optional(&self.pool).await? {
            return Ok(PreferenceProfile {
                physical_weight: row.get("physical_weight"),
                personality_weight: row.get("personality_weight"),
                interest_weight: row.get("interest_weight"),
                min_score: row.get("min_score"),
                super_like_score: row.get("super_like_score"),
                age_min: row.get("age_min"),
                age_max: row.get("age_max"),
                updated_at: row.get("updated_at"),
            });
        }

        let profile = PreferenceProfile::default();
        self.update_profile(&profile).await?;
        tracing::info!("seeded default preference profile");
        Ok(profile)
    }

    /// Upsert the singleton preference profile
    pub async fn update_profile(&self, profile: &PreferenceProfile) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO preference_profile (
                id, physical_weight, personality_weight, interest_weight,
                min_score, super_like_score, age_min, age_max, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                physical_weight = EXCLUDED.physical_weight,
                personality_weight = EXCLUDED.personality_weight,
                interest_weight = EXCLUDED.interest_weight,
                min_score = EXCLUDED.min_score,
                super_like_score = EXCLUDED.super_like_score,
                age_min = EXCLUDED.age_min,
                age_max = EXCLUDED.age_max,
                updated_at = NOW()
        "#;

        sqlx::query(query)
            .bind(profile.physical_weight)
            .bind(profile.personality_weight)
            .bind(profile.interest_weight)
            .bind(profile.min_score)
            .bind(profile.super_like_score)
            .bind(profile.age_min)
            .bind(profile.age_max)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ----- reference images -----

    pub async fn list_references(&self) -> Result<Vec<ReferenceImage>, PostgresError> {
        let query = r#"
            SELECT id, file_path, category, description, uploaded_at
            FROM reference_images
            ORDER BY uploaded_at
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| ReferenceImage {
                id: row.get("id"),
                file_path: row.get("file_path"),
                category: row.get("category"),
                description: row.get("description"),
                uploaded_at: row.get("uploaded_at"),
            })
            .collect())
    }

    pub async fn add_reference(
        &self,
        file_path: &str,
        category: &str,
        description: Option<&str>,
    ) -> Result<ReferenceImage, PostgresError> {
        let query = r#"
            INSERT INTO reference_images (file_path, category, description)
            VALUES ($1, $2, $3)
            RETURNING id, uploaded_at
        "#;

        let row = sqlx::query(query)
            .bind(file_path)
            .bind(category)
            .bind(description)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("added reference image: {}", file_path);

        Ok(ReferenceImage {
            id: row.get("id"),
            file_path: file_path.to_string(),
            category: category.to_string(),
            description: description.map(str::to_string),
            uploaded_at: row.get("uploaded_at"),
        })
    }

    pub async fn remove_reference(&self, id: Uuid) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM reference_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ----- personality traits -----

    pub async fn list_traits(&self) -> Result<Vec<String>, PostgresError> {
        let rows = sqlx::query("SELECT label FROM personality_traits ORDER BY label")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("label")).collect())
    }

    pub async fn add_trait(&self, label: &str) -> Result<(), PostgresError> {
        sqlx::query("INSERT INTO personality_traits (label) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(label)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn remove_trait(&self, label: &str) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM personality_traits WHERE label = $1")
            .bind(label)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ----- negative keywords -----

    pub async fn list_negative_keywords(&self) -> Result<Vec<String>, PostgresError> {
        let rows = sqlx::query("SELECT keyword FROM negative_keywords ORDER BY keyword")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("keyword")).collect())
    }

    pub async fn add_negative_keyword(&self, keyword: &str) -> Result<(), PostgresError> {
        sqlx::query("INSERT INTO negative_keywords (keyword) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(keyword)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn remove_negative_keyword(&self, keyword: &str) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM negative_keywords WHERE keyword = $1")
            .bind(keyword)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ----- shared interests -----

    pub async fn list_interests(&self) -> Result<Vec<SharedInterest>, PostgresError> {
        let rows =
            sqlx::query("SELECT interest, is_dealbreaker FROM shared_interests ORDER BY interest")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|row| SharedInterest {
                interest: row.get("interest"),
                is_dealbreaker: row.get("is_dealbreaker"),
            })
            .collect())
    }

    pub async fn add_interest(
        &self,
        interest: &str,
        is_dealbreaker: bool,
    ) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO shared_interests (interest, is_dealbreaker)
            VALUES ($1, $2)
            ON CONFLICT (interest)
            DO UPDATE SET is_dealbreaker = EXCLUDED.is_dealbreaker
        "#;

        sqlx::query(query)
            .bind(interest)
            .bind(is_dealbreaker)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn remove_interest(&self, interest: &str) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM shared_interests WHERE interest = $1")
            .bind(interest)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ----- classification ledger -----

    /// Persist a classification sample, optionally with its subject
    /// embedding for later feedback-driven learning
    pub async fn insert_sample(
        &self,
        image_ref: &str,
        result: &ClassificationResult,
        embedding: Option<&[f32]>,
    ) -> Result<Uuid, PostgresError> {
        let query = r#"
            INSERT INTO classification_samples (
                image_ref, decision, is_match, confidence, result,
                embedding, model_version_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(image_ref)
            .bind(result.decision.as_str())
            .bind(result.is_match)
            .bind(result.confidence_score)
            .bind(Json(result))
            .bind(embedding)
            .bind(result.model_version_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("id"))
    }

    pub async fn get_sample(&self, id: Uuid) -> Result<SampleRow, PostgresError> {
        let query = r#"
            SELECT id, image_ref, result, user_feedback, created_at
            FROM classification_samples
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("sample {}", id)))?;

        sample_from_row(&row)
    }

    pub async fn history(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SampleRow>, PostgresError> {
        let query = r#"
            SELECT id, image_ref, result, user_feedback, created_at
            FROM classification_samples
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
        "#;

        let rows = sqlx::query(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(sample_from_row).collect()
    }

    /// Record (or re-label) feedback on a sample and move the active
    /// counters of its model version in the same transaction.
    pub async fn submit_feedback(
        &self,
        sample_id: Uuid,
        feedback: FeedbackKind,
    ) -> Result<SampleRow, PostgresError> {
        self.transition_feedback(sample_id, Some(feedback)).await
    }

    /// Withdraw feedback from a sample, restoring the version counters to
    /// their pre-submission values.
    pub async fn remove_feedback(&self, sample_id: Uuid) -> Result<SampleRow, PostgresError> {
        self.transition_feedback(sample_id, None).await
    }

    async fn transition_feedback(
        &self,
        sample_id: Uuid,
        new: Option<FeedbackKind>,
    ) -> Result<SampleRow, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let sample = sqlx::query(
            r#"
            SELECT user_feedback, model_version_id
            FROM classification_samples
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(sample_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| PostgresError::NotFound(format!("sample {}", sample_id)))?;

        let old: Option<FeedbackKind> = sample
            .get::<Option<String>, _>("user_feedback")
            .as_deref()
            .and_then(FeedbackKind::parse);
        let version_id: Option<i32> = sample.get("model_version_id");

        if old != new {
            if let Some(version_id) = version_id {
                let version = sqlx::query(
                    r#"
                    SELECT likes, dislikes, super_likes, total_predictions
                    FROM model_versions
                    WHERE id = $1
                    FOR UPDATE
                    "#,
                )
                .bind(version_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| PostgresError::NotFound(format!("model version {}", version_id)))?;

                let mut counters = VersionCounters {
                    likes: version.get("likes"),
                    dislikes: version.get("dislikes"),
                    super_likes: version.get("super_likes"),
                    total_predictions: version.get("total_predictions"),
                };
                counters.apply_transition(old, new);

                sqlx::query(
                    r#"
                    UPDATE model_versions
                    SET likes = $2, dislikes = $3, super_likes = $4, total_predictions = $5
                    WHERE id = $1
                    "#,
                )
                .bind(version_id)
                .bind(counters.likes)
                .bind(counters.dislikes)
                .bind(counters.super_likes)
                .bind(counters.total_predictions)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query("UPDATE classification_samples SET user_feedback = $2 WHERE id = $1")
                .bind(sample_id)
                .bind(new.map(|k| k.as_str()))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "feedback transition on sample {}: {:?} -> {:?}",
            sample_id,
            old.map(|k| k.as_str()),
            new.map(|k| k.as_str())
        );

        self.get_sample(sample_id).await
    }

    /// Subject embeddings of feedback-labeled samples, split into liked
    /// (like, super_like) and disliked sets for relative scoring
    pub async fn labeled_examples(&self) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>), PostgresError> {
        let query = r#"
            SELECT embedding, user_feedback
            FROM classification_samples
            WHERE user_feedback IS NOT NULL AND embedding IS NOT NULL
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        for row in rows {
            let embedding: Vec<f32> = row.get("embedding");
            match FeedbackKind::parse(row.get("user_feedback")) {
                Some(FeedbackKind::Like) | Some(FeedbackKind::SuperLike) => {
                    positives.push(embedding)
                }
                Some(FeedbackKind::Dislike) => negatives.push(embedding),
                None => {}
            }
        }

        Ok((positives, negatives))
    }

    /// Samples recorded before embedding persistence existed (or whose
    /// extraction failed), oldest first
    pub async fn samples_missing_embeddings(
        &self,
        limit: i64,
    ) -> Result<Vec<(Uuid, String)>, PostgresError> {
        let query = r#"
            SELECT id, image_ref
            FROM classification_samples
            WHERE embedding IS NULL
            ORDER BY created_at
            LIMIT $1
        "#;

        let rows = sqlx::query(query).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("image_ref")))
            .collect())
    }

    pub async fn store_sample_embedding(
        &self,
        id: Uuid,
        embedding: &[f32],
    ) -> Result<(), PostgresError> {
        sqlx::query("UPDATE classification_samples SET embedding = $2 WHERE id = $1")
            .bind(id)
            .bind(embedding)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn ledger_stats(&self) -> Result<LedgerStats, PostgresError> {
        let query = r#"
            SELECT
                COUNT(*) AS total_samples,
                COUNT(user_feedback) AS with_feedback,
                COUNT(*) FILTER (WHERE user_feedback = 'like') AS likes,
                COUNT(*) FILTER (WHERE user_feedback = 'dislike') AS dislikes,
                COUNT(*) FILTER (WHERE user_feedback = 'super_like') AS super_likes,
                COUNT(*) FILTER (WHERE is_match) AS matches,
                COUNT(*) FILTER (WHERE NOT is_match) AS no_matches,
                AVG(confidence) AS avg_confidence
            FROM classification_samples
        "#;

        let row = sqlx::query(query).fetch_one(&self.pool).await?;

        Ok(LedgerStats {
            total_samples: row.get("total_samples"),
            with_feedback: row.get("with_feedback"),
            likes: row.get("likes"),
            dislikes: row.get("dislikes"),
            super_likes: row.get("super_likes"),
            matches: row.get("matches"),
            no_matches: row.get("no_matches"),
            avg_confidence: row.get("avg_confidence"),
        })
    }

    // ----- model version registry -----

    pub async fn list_versions(&self) -> Result<Vec<ModelVersion>, PostgresError> {
        let query = r#"
            SELECT id, version_number, backend, weights, is_active,
                   likes, dislikes, super_likes, total_predictions, created_at
            FROM model_versions
            ORDER BY version_number
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(version_from_row).collect())
    }

    pub async fn get_active_version(&self) -> Result<Option<ModelVersion>, PostgresError> {
        let query = r#"
            SELECT id, version_number, backend, weights, is_active,
                   likes, dislikes, super_likes, total_predictions, created_at
            FROM model_versions
            WHERE is_active
        "#;

        let row = sqlx::query(query).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(version_from_row))
    }

    /// Register a new version with zeroed counters. It starts inactive;
    /// promotion is a separate step.
    pub async fn create_version(
        &self,
        backend: &str,
        weights: &ScoringWeights,
    ) -> Result<ModelVersion, PostgresError> {
        let query = r#"
            INSERT INTO model_versions (version_number, backend, weights, is_active)
            SELECT COALESCE(MAX(version_number), 0) + 1, $1, $2, FALSE
            FROM model_versions
            RETURNING id, version_number, backend, weights, is_active,
                      likes, dislikes, super_likes, total_predictions, created_at
        "#;

        let row = sqlx::query(query)
            .bind(backend)
            .bind(Json(weights))
            .fetch_one(&self.pool)
            .await?;

        let version = version_from_row(&row);
        tracing::info!("created model version {}", version.version_number);
        Ok(version)
    }

    /// Promote a version to active. Exactly one version is active at any
    /// time; the swap happens in one transaction.
    pub async fn activate_version(&self, id: i32) -> Result<ModelVersion, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM model_versions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(PostgresError::NotFound(format!("model version {}", id)));
        }

        sqlx::query("UPDATE model_versions SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE model_versions SET is_active = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("activated model version {}", id);

        self.get_active_version()
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("model version {}", id)))
    }

    /// Fetch the active version, creating and activating an initial one
    /// when the registry is empty
    pub async fn ensure_active_version(
        &self,
        backend: &str,
        weights: &ScoringWeights,
    ) -> Result<ModelVersion, PostgresError> {
        if let Some(version) = self.get_active_version().await? {
            return Ok(version);
        }

        let version = self.create_version(backend, weights).await?;
        self.activate_version(version.id).await
    }
}

fn sample_from_row(row: &sqlx::postgres::PgRow) -> Result<SampleRow, PostgresError> {
    let Json(mut result): Json<ClassificationResult> = row.get("result");
    // The column is authoritative over whatever was serialized at insert
    result.user_feedback = row
        .get::<Option<String>, _>("user_feedback")
        .as_deref()
        .and_then(FeedbackKind::parse);

    Ok(SampleRow {
        id: row.get("id"),
        image_ref: row.get("image_ref"),
        result,
        created_at: row.get("created_at"),
    })
}

fn version_from_row(row: &sqlx::postgres::PgRow) -> ModelVersion {
    let Json(weights): Json<ScoringWeights> = row.get("weights");

    ModelVersion {
        id: row.get("id"),
        version_number: row.get("version_number"),
        backend: row.get("backend"),
        weights,
        is_active: row.get("is_active"),
        likes: row.get("likes"),
        dislikes: row.get("dislikes"),
        super_likes: row.get("super_likes"),
        total_predictions: row.get("total_predictions"),
        created_at: row.get("created_at"),
    }
}
