// ABOUTME: Photo service: upload, edit, delete, details, likes and the dashboard feed
// ABOUTME: Blobs go to the blob store; rows and tag links change inside one transaction

use std::collections::BTreeSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::entities::{pet, pet_photo, pet_photo_tag};
use crate::error::{AppError, Result};
use crate::storage::{Storage, now_millis};
use crate::types::{EditPhotoRequest, NewPhoto, PhotoView};
use crate::validators::{self, FieldErrors, MAX_PHOTO_SIZE};

/// Checks every tagged pet exists; returns the deduplicated set.
async fn resolve_tags<C: ConnectionTrait>(db: &C, tagged: &[Uuid]) -> Result<BTreeSet<Uuid>> {
    let wanted: BTreeSet<Uuid> = tagged.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(wanted);
    }

    let found = pet::Entity::find()
        .filter(pet::Column::Id.is_in(wanted.iter().copied()))
        .count(db)
        .await?;
    if found as usize != wanted.len() {
        return Err(AppError::Reference(
            "One or more tagged pets do not exist".to_string(),
        ));
    }
    Ok(wanted)
}

async fn insert_tags<C: ConnectionTrait>(db: &C, photo_id: Uuid, pets: &BTreeSet<Uuid>) -> Result<()> {
    if pets.is_empty() {
        return Ok(());
    }
    let links = pets.iter().map(|pet_id| pet_photo_tag::ActiveModel {
        photo_id: Set(photo_id),
        pet_id: Set(*pet_id),
    });
    pet_photo_tag::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

const TAGS_REQUIRED: &str = "Tag at least one pet.";

fn dangling_on_foreign_key(err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::Reference("One or more tagged pets do not exist".to_string())
        }
        _ => AppError::Database(err),
    }
}

impl Storage {
    pub async fn add_photo(&self, uploader: Uuid, upload: NewPhoto) -> Result<pet_photo::Model> {
        let mut errors = FieldErrors::new();
        if upload.blob.is_empty() {
            errors.push("photo", "The submitted file is empty.");
        } else {
            errors.check("photo", [validators::max_file_size(upload.blob.len(), MAX_PHOTO_SIZE)]);
        }
        if upload.tagged_pets.is_empty() {
            errors.push("tagged_pets", TAGS_REQUIRED);
        }
        errors.finish()?;

        let tags = resolve_tags(&self.db, &upload.tagged_pets).await?;

        let reference = self.blobs.store(&upload.blob).await?;

        match self.insert_photo(uploader, &reference, upload.description, &tags).await {
            Ok(photo) => {
                tracing::info!(
                    photo_id = %photo.id,
                    %uploader,
                    bytes = upload.blob.len(),
                    tags = tags.len(),
                    "Added photo"
                );
                Ok(photo)
            }
            Err(err) => {
                self.discard_blobs([reference]).await;
                Err(err)
            }
        }
    }

    async fn insert_photo(
        &self,
        uploader: Uuid,
        reference: &str,
        description: Option<String>,
        tags: &BTreeSet<Uuid>,
    ) -> Result<pet_photo::Model> {
        let txn = self.db.begin().await?;

        let photo = pet_photo::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(uploader),
            photo: Set(reference.to_string()),
            description: Set(description),
            published_at: Set(now_millis()),
            likes: Set(0),
        }
        .insert(&txn)
        .await?;

        insert_tags(&txn, photo.id, tags)
            .await
            .map_err(|e| match e {
                AppError::Database(db) => dangling_on_foreign_key(db),
                other => other,
            })?;

        txn.commit().await?;
        Ok(photo)
    }

    pub async fn get_photo(&self, photo_id: Uuid) -> Result<pet_photo::Model> {
        pet_photo::Entity::find_by_id(photo_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("photo {}", photo_id)))
    }

    fn ensure_uploader(photo: &pet_photo::Model, actor: Uuid) -> Result<()> {
        if photo.user_id != actor {
            return Err(AppError::Forbidden(format!(
                "user {} did not upload photo {}",
                actor, photo.id
            )));
        }
        Ok(())
    }

    /// Replaces the description and the full tag set, which may not be empty.
    pub async fn edit_photo(
        &self,
        photo_id: Uuid,
        actor: Uuid,
        edit: &EditPhotoRequest,
    ) -> Result<pet_photo::Model> {
        let existing = self.get_photo(photo_id).await?;
        Self::ensure_uploader(&existing, actor)?;
        if edit.tagged_pets.is_empty() {
            return Err(AppError::field("tagged_pets", TAGS_REQUIRED));
        }

        let txn = self.db.begin().await?;
        let tags = resolve_tags(&txn, &edit.tagged_pets).await?;

        pet_photo_tag::Entity::delete_many()
            .filter(pet_photo_tag::Column::PhotoId.eq(photo_id))
            .exec(&txn)
            .await?;
        insert_tags(&txn, photo_id, &tags).await?;

        let mut active: pet_photo::ActiveModel = existing.into();
        active.description = Set(edit.description.clone());
        let photo = active.update(&txn).await?;

        txn.commit().await?;
        Ok(photo)
    }

    pub async fn delete_photo(&self, photo_id: Uuid, actor: Uuid) -> Result<()> {
        let existing = self.get_photo(photo_id).await?;
        Self::ensure_uploader(&existing, actor)?;

        let txn = self.db.begin().await?;
        pet_photo_tag::Entity::delete_many()
            .filter(pet_photo_tag::Column::PhotoId.eq(photo_id))
            .exec(&txn)
            .await?;
        pet_photo::Entity::delete_by_id(photo_id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(%photo_id, %actor, "Deleted photo");
        self.discard_blobs([existing.photo]).await;
        Ok(())
    }

    /// Photo with its tagged pets resolved in one query.
    pub async fn get_photo_details(&self, photo_id: Uuid, viewer: Option<Uuid>) -> Result<PhotoView> {
        let photo = self.get_photo(photo_id).await?;
        let tagged = photo
            .find_related(pet::Entity)
            .order_by_asc(pet::Column::Name)
            .all(&self.db)
            .await?;
        Ok(PhotoView::new(photo, tagged, viewer))
    }

    /// Adds one like per call, for anyone, with no per-user dedup. The
    /// increment happens in the store so concurrent likes are never lost.
    pub async fn like(&self, photo_id: Uuid) -> Result<i32> {
        let txn = self.db.begin().await?;

        let updated = pet_photo::Entity::update_many()
            .col_expr(
                pet_photo::Column::Likes,
                Expr::col(pet_photo::Column::Likes).add(1),
            )
            .filter(pet_photo::Column::Id.eq(photo_id))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::NotFound(format!("photo {}", photo_id)));
        }

        let likes = pet_photo::Entity::find_by_id(photo_id)
            .one(&txn)
            .await?
            .map(|photo| photo.likes)
            .ok_or_else(|| AppError::NotFound(format!("photo {}", photo_id)))?;

        txn.commit().await?;

        tracing::debug!(%photo_id, likes, "Liked photo");
        Ok(likes)
    }

    /// Every photo, newest first, with tagged pets loaded eagerly.
    pub async fn list_feed(&self, viewer: Option<Uuid>) -> Result<Vec<PhotoView>> {
        let photos = pet_photo::Entity::find()
            .order_by_desc(pet_photo::Column::PublishedAt)
            .order_by_desc(pet_photo::Column::Id)
            .all(&self.db)
            .await?;

        let tagged = photos
            .load_many_to_many(pet::Entity, pet_photo_tag::Entity, &self.db)
            .await?;

        Ok(photos
            .into_iter()
            .zip(tagged)
            .map(|(photo, pets)| PhotoView::new(photo, pets, viewer))
            .collect())
    }

    pub async fn read_photo_blob(&self, photo_id: Uuid) -> Result<Vec<u8>> {
        let photo = self.get_photo(photo_id).await?;
        self.blobs.read(&photo.photo).await
    }
}
