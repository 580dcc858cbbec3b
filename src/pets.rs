// ABOUTME: Pet service: add, edit and delete pets scoped to their owner
// ABOUTME: Enforces unique pet names per owner and plausible birth dates

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{pet, pet_photo_tag};
use crate::error::{AppError, Result, conflict_on_unique};
use crate::storage::{Storage, today};
use crate::types::PetFields;
use crate::validators::{self, FieldErrors, PET_NAME_MAX_LENGTH};

const DUPLICATE_PET: &str = "Pet with this User and Name already exists.";

fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn validate_pet_fields(fields: &PetFields, today: NaiveDate) -> Result<()> {
    let mut errors = FieldErrors::new();
    errors.check(
        "name",
        [validators::length_between(fields.name.trim(), 1, PET_NAME_MAX_LENGTH)],
    );
    if let Some(dob) = fields.date_of_birth {
        errors.check(
            "date_of_birth",
            [
                validators::min_date(dob, earliest_birth_date()),
                validators::max_date(dob, today),
            ],
        );
    }
    errors.finish()
}

impl Storage {
    pub async fn add_pet(&self, owner: Uuid, fields: &PetFields) -> Result<pet::Model> {
        validate_pet_fields(fields, today())?;
        let name = fields.name.trim().to_string();

        let txn = self.db.begin().await?;

        let duplicate = pet::Entity::find()
            .filter(pet::Column::UserId.eq(owner))
            .filter(pet::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(AppError::Conflict(DUPLICATE_PET.to_string()));
        }

        let pet = pet::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner),
            name: Set(name),
            pet_type: Set(fields.pet_type),
            date_of_birth: Set(fields.date_of_birth),
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_PET))?;

        txn.commit().await?;

        tracing::info!(pet_id = %pet.id, %owner, name = %pet.name, "Added pet");
        Ok(pet)
    }

    pub async fn get_pet(&self, pet_id: Uuid) -> Result<pet::Model> {
        pet::Entity::find_by_id(pet_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pet {}", pet_id)))
    }

    pub async fn list_pets(&self, owner: Uuid) -> Result<Vec<pet::Model>> {
        Ok(pet::Entity::find()
            .filter(pet::Column::UserId.eq(owner))
            .order_by_asc(pet::Column::Name)
            .all(&self.db)
            .await?)
    }

    fn ensure_pet_owner(pet: &pet::Model, actor: Uuid) -> Result<()> {
        if pet.user_id != actor {
            return Err(AppError::Forbidden(format!(
                "user {} does not own pet {}",
                actor, pet.id
            )));
        }
        Ok(())
    }

    pub async fn edit_pet(&self, pet_id: Uuid, actor: Uuid, fields: &PetFields) -> Result<pet::Model> {
        let existing = self.get_pet(pet_id).await?;
        Self::ensure_pet_owner(&existing, actor)?;
        validate_pet_fields(fields, today())?;
        let name = fields.name.trim().to_string();

        let txn = self.db.begin().await?;

        if name != existing.name {
            let duplicate = pet::Entity::find()
                .filter(pet::Column::UserId.eq(actor))
                .filter(pet::Column::Name.eq(name.as_str()))
                .one(&txn)
                .await?;
            if duplicate.is_some() {
                return Err(AppError::Conflict(DUPLICATE_PET.to_string()));
            }
        }

        let mut active: pet::ActiveModel = existing.into();
        active.name = Set(name);
        active.pet_type = Set(fields.pet_type);
        active.date_of_birth = Set(fields.date_of_birth);
        let pet = active
            .update(&txn)
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_PET))?;

        txn.commit().await?;
        Ok(pet)
    }

    /// Removes the pet and its tag links; photos that tagged it stay.
    pub async fn delete_pet(&self, pet_id: Uuid, actor: Uuid) -> Result<()> {
        let existing = self.get_pet(pet_id).await?;
        Self::ensure_pet_owner(&existing, actor)?;

        let txn = self.db.begin().await?;
        let untagged = pet_photo_tag::Entity::delete_many()
            .filter(pet_photo_tag::Column::PetId.eq(pet_id))
            .exec(&txn)
            .await?
            .rows_affected;
        pet::Entity::delete_by_id(pet_id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(%pet_id, %actor, untagged, "Deleted pet");
        Ok(())
    }
}
