// ABOUTME: Profile service: profile page view with derived likes, edit and account deletion
// ABOUTME: Account deletion removes tags, photos, pets, profile and user in one transaction

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{pet, pet_photo, pet_photo_tag, profile, user};
use crate::error::{AppError, Result};
use crate::storage::{Storage, today};
use crate::types::{PetView, ProfileFields, ProfileView};
use crate::validators::{self, FieldErrors, NAME_MAX_LENGTH, NAME_MIN_LENGTH};

fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1920, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Birth years offered for a profile stop at last year.
fn latest_birth_date(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year() - 1, 12, 31).unwrap_or(today)
}

pub fn validate_profile_fields(errors: &mut FieldErrors, fields: &ProfileFields, today: NaiveDate) {
    for (field, value) in [("first_name", &fields.first_name), ("last_name", &fields.last_name)] {
        let value = value.trim();
        errors.check(
            field,
            [
                validators::length_between(value, NAME_MIN_LENGTH, NAME_MAX_LENGTH),
                validators::only_letters(value),
            ],
        );
    }

    errors.check("profile_picture", [validators::http_url(fields.profile_picture.trim())]);

    if let Some(email) = &fields.email {
        errors.check("email", [validators::email(email)]);
    }

    if let Some(dob) = fields.date_of_birth {
        errors.check(
            "date_of_birth",
            [
                validators::min_date(dob, earliest_birth_date()),
                validators::max_date(dob, latest_birth_date(today)),
            ],
        );
    }
}

/// Row counts removed by an account deletion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletedAccount {
    pub photos: u64,
    pub pets: u64,
}

impl Storage {
    pub async fn get_profile(&self, profile_id: Uuid, viewer: Option<Uuid>) -> Result<ProfileView> {
        let (profile, user) = profile::Entity::find_by_id(profile_id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", profile_id)))?;
        let username = user.map(|u| u.username).unwrap_or_default();

        let pets = self.list_pets(profile_id).await?;

        let total_likes = self.total_likes_for_pets(&pets).await?;

        Ok(ProfileView {
            is_owner: viewer == Some(profile.user_id),
            user_id: profile.user_id,
            username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_picture: profile.profile_picture,
            date_of_birth: profile.date_of_birth,
            email: profile.email,
            gender: profile.gender,
            description: profile.description,
            pets: pets.into_iter().map(PetView::from).collect(),
            total_likes,
        })
    }

    /// Sums likes over the distinct photos tagging any of `pets`; a photo
    /// tagging several of them counts once.
    async fn total_likes_for_pets(&self, pets: &[pet::Model]) -> Result<i64> {
        if pets.is_empty() {
            return Ok(0);
        }
        let pet_ids: Vec<Uuid> = pets.iter().map(|p| p.id).collect();

        let photo_ids: HashSet<Uuid> = pet_photo_tag::Entity::find()
            .filter(pet_photo_tag::Column::PetId.is_in(pet_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|tag| tag.photo_id)
            .collect();
        if photo_ids.is_empty() {
            return Ok(0);
        }

        let photos = pet_photo::Entity::find()
            .filter(pet_photo::Column::Id.is_in(photo_ids))
            .all(&self.db)
            .await?;

        Ok(photos.iter().map(|p| i64::from(p.likes)).sum())
    }

    pub async fn edit_profile(
        &self,
        profile_id: Uuid,
        actor: Uuid,
        fields: &ProfileFields,
    ) -> Result<profile::Model> {
        if actor != profile_id {
            return Err(AppError::Forbidden(format!(
                "user {} cannot edit profile {}",
                actor, profile_id
            )));
        }

        let mut errors = FieldErrors::new();
        validate_profile_fields(&mut errors, fields, today());
        errors.finish()?;

        let existing = profile::Entity::find_by_id(profile_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", profile_id)))?;

        let mut active: profile::ActiveModel = existing.into();
        active.first_name = Set(fields.first_name.trim().to_string());
        active.last_name = Set(fields.last_name.trim().to_string());
        active.profile_picture = Set(fields.profile_picture.trim().to_string());
        active.date_of_birth = Set(fields.date_of_birth);
        active.email = Set(fields.email.clone());
        active.gender = Set(fields.gender);
        active.description = Set(fields.description.clone());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes the account: tag links, then photos (every photo tagging one of
    /// the user's pets and every photo they uploaded), then pets, profile and
    /// user. Not reversible.
    pub async fn delete_profile(&self, profile_id: Uuid, actor: Uuid) -> Result<DeletedAccount> {
        if actor != profile_id {
            return Err(AppError::Forbidden(format!(
                "user {} cannot delete profile {}",
                actor, profile_id
            )));
        }

        let txn = self.db.begin().await?;

        let user = user::Entity::find_by_id(profile_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", profile_id)))?;

        let pet_ids: Vec<Uuid> = pet::Entity::find()
            .filter(pet::Column::UserId.eq(user.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut photo_ids: HashSet<Uuid> = HashSet::new();
        if !pet_ids.is_empty() {
            photo_ids.extend(
                pet_photo_tag::Entity::find()
                    .filter(pet_photo_tag::Column::PetId.is_in(pet_ids.clone()))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|tag| tag.photo_id),
            );
        }
        photo_ids.extend(
            pet_photo::Entity::find()
                .filter(pet_photo::Column::UserId.eq(user.id))
                .all(&txn)
                .await?
                .into_iter()
                .map(|photo| photo.id),
        );
        let photo_ids: Vec<Uuid> = photo_ids.into_iter().collect();

        let blob_refs: Vec<String> = if photo_ids.is_empty() {
            Vec::new()
        } else {
            pet_photo::Entity::find()
                .filter(pet_photo::Column::Id.is_in(photo_ids.clone()))
                .all(&txn)
                .await?
                .into_iter()
                .map(|photo| photo.photo)
                .collect()
        };

        let mut deleted = DeletedAccount::default();

        if !photo_ids.is_empty() {
            pet_photo_tag::Entity::delete_many()
                .filter(pet_photo_tag::Column::PhotoId.is_in(photo_ids.clone()))
                .exec(&txn)
                .await?;
            deleted.photos = pet_photo::Entity::delete_many()
                .filter(pet_photo::Column::Id.is_in(photo_ids))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        if !pet_ids.is_empty() {
            pet_photo_tag::Entity::delete_many()
                .filter(pet_photo_tag::Column::PetId.is_in(pet_ids))
                .exec(&txn)
                .await?;
        }
        deleted.pets = pet::Entity::delete_many()
            .filter(pet::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?
            .rows_affected;

        profile::Entity::delete_by_id(user.id).exec(&txn).await?;
        user::Entity::delete_by_id(user.id).exec(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            user_id = %user.id,
            photos = deleted.photos,
            pets = deleted.pets,
            "Deleted account"
        );

        self.discard_blobs(blob_refs).await;
        Ok(deleted)
    }
}
