// ABOUTME: Pet photo entity with blob reference, description, publication time and likes
// ABOUTME: Uploaded by one user and tagging any number of pets

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pet_photos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo: String, // Blob store reference
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub published_at: i64, // Unix millis, immutable
    pub likes: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::pet_photo_tag::Entity")]
    Tags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::pet_photo_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl Related<super::pet::Entity> for Entity {
    fn to() -> RelationDef {
        super::pet_photo_tag::Relation::Pet.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::pet_photo_tag::Relation::PetPhoto.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
