// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Stations (prices, opening hours, services)
//! - Users (profile, favorites, embedded price alerts)

use crate::db::{check_version, collections, Store, Versioned};
use crate::error::AppError;
use crate::models::{Station, User};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;
use serde::{de::DeserializeOwned, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts unauthenticated connections; skip credential lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── Generic document helpers ────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send + DeserializeOwned,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Version-checked write inside a transaction.
    ///
    /// The stored document is read, its version compared against the
    /// caller's, and the bumped record written in the same transaction so
    /// that a concurrent commit makes this one fail instead of being lost.
    async fn save_versioned<T>(&self, collection: &str, record: &T) -> Result<T, AppError>
    where
        T: Versioned + Serialize + DeserializeOwned + Sync + Send,
    {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read through the transaction so a concurrent commit to this
        // document aborts ours instead of being overwritten.
        let current: Option<T> = self
            .client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(record.id())
            .await
            .map_err(|e| transaction_error(T::KIND, record.id(), "read", e))?;

        let Some(current) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "{} {} not found",
                T::KIND,
                record.id()
            )));
        };

        if let Err(e) = check_version(record, current.version()) {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        let next = record.next_version(current.version());

        self.client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(next.id())
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add {} to transaction: {}", T::KIND, e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| transaction_error(T::KIND, record.id(), "commit", e))?;

        tracing::debug!(
            kind = T::KIND,
            id = next.id(),
            version = next.version(),
            "Document saved"
        );

        Ok(next)
    }
}

/// Contention on a document read in a transaction aborts it; report that as
/// a version conflict rather than a database failure.
fn transaction_error(kind: &str, id: &str, step: &str, e: FirestoreError) -> AppError {
    match e {
        FirestoreError::DatabaseError(ref db_err) if db_err.public.code == "Aborted" => {
            AppError::Conflict(format!("{} {} was modified concurrently: {}", kind, id, e))
        }
        e => AppError::Database(format!(
            "Transaction {} failed for {} {}: {}",
            step, kind, id, e
        )),
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Station Operations ──────────────────────────────────────

    async fn list_stations(&self) -> Result<Vec<Station>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::STATIONS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_active_stations(&self) -> Result<Vec<Station>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::STATIONS)
            .filter(|q| q.for_all([q.field("isActive").eq(true)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_station(&self, id: &str) -> Result<Option<Station>, AppError> {
        self.get_doc(collections::STATIONS, id).await
    }

    async fn insert_station(&self, station: &Station) -> Result<Station, AppError> {
        if self.get_station(&station.id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Station {} already exists",
                station.id
            )));
        }
        self.put_doc(collections::STATIONS, &station.id, station)
            .await?;
        Ok(station.clone())
    }

    async fn save_station(&self, station: &Station) -> Result<Station, AppError> {
        self.save_versioned(collections::STATIONS, station).await
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// Email uniqueness is checked before the write, not enforced by Firestore.
    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        self.put_doc(collections::USERS, &user.id, user).await?;
        Ok(user.clone())
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        self.save_versioned(collections::USERS, user).await
    }

    async fn list_alert_subscribers(&self) -> Result<Vec<User>, AppError> {
        // Firestore can't filter on a field inside an array of maps, so the
        // active-alert check happens here.
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("preferences.notifications.email").eq(true)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users
            .into_iter()
            .filter(|u| u.wants_alert_emails())
            .collect())
    }
}
