// ABOUTME: Pet entity owned by a single user, unique by (owner, name)
// ABOUTME: Tagged in pet photos through the pet_photo_tags join table

use chrono::Datelike;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PetType {
    #[sea_orm(string_value = "Cat")]
    Cat,
    #[sea_orm(string_value = "Dog")]
    Dog,
    #[sea_orm(string_value = "Bunny")]
    Bunny,
    #[sea_orm(string_value = "Parrot")]
    Parrot,
    #[sea_orm(string_value = "Fish")]
    Fish,
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub pet_type: PetType,
    pub date_of_birth: Option<Date>,
}

impl Model {
    /// Calendar-year difference, not elapsed time.
    pub fn age(&self) -> Option<i32> {
        self.age_in(chrono::Utc::now().year())
    }

    pub fn age_in(&self, year: i32) -> Option<i32> {
        self.date_of_birth.map(|dob| year - dob.year())
    }
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

impl Related<super::pet_photo::Entity> for Entity {
    fn to() -> RelationDef {
        super::pet_photo_tag::Relation::PetPhoto.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::pet_photo_tag::Relation::Pet.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
