// ABOUTME: Initial migration creating users, profiles, pets, pet photos and photo tags
// ABOUTME: Sets up foreign keys, the per-owner pet name index and the tag link primary key

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string_len(25).not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::DateJoined).big_integer().not_null())
                    .col(ColumnDef::new(Users::IsStaff).boolean().not_null().default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::UserId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::FirstName).string_len(30).not_null())
                    .col(ColumnDef::new(Profiles::LastName).string_len(30).not_null())
                    .col(ColumnDef::new(Profiles::ProfilePicture).string().not_null())
                    .col(ColumnDef::new(Profiles::DateOfBirth).date())
                    .col(ColumnDef::new(Profiles::Email).string())
                    .col(ColumnDef::new(Profiles::Gender).string_len(16))
                    .col(ColumnDef::new(Profiles::Description).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_user_id")
                            .from(Profiles::Table, Profiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Pets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Pets::Name).string_len(30).not_null())
                    .col(ColumnDef::new(Pets::PetType).string_len(16).not_null())
                    .col(ColumnDef::new(Pets::DateOfBirth).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pets_user_id")
                            .from(Pets::Table, Pets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_pets_owner_name_unique")
                            .table(Pets::Table)
                            .col(Pets::UserId)
                            .col(Pets::Name)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PetPhotos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PetPhotos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PetPhotos::UserId).uuid().not_null())
                    .col(ColumnDef::new(PetPhotos::Photo).string().not_null())
                    .col(ColumnDef::new(PetPhotos::Description).text())
                    .col(ColumnDef::new(PetPhotos::PublishedAt).big_integer().not_null())
                    .col(ColumnDef::new(PetPhotos::Likes).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pet_photos_user_id")
                            .from(PetPhotos::Table, PetPhotos::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PetPhotoTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PetPhotoTags::PhotoId).uuid().not_null())
                    .col(ColumnDef::new(PetPhotoTags::PetId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(PetPhotoTags::PhotoId)
                            .col(PetPhotoTags::PetId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pet_photo_tags_photo_id")
                            .from(PetPhotoTags::Table, PetPhotoTags::PhotoId)
                            .to(PetPhotos::Table, PetPhotos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pet_photo_tags_pet_id")
                            .from(PetPhotoTags::Table, PetPhotoTags::PetId)
                            .to(Pets::Table, Pets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pet_photos_published_at")
                    .table(PetPhotos::Table)
                    .col(PetPhotos::PublishedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PetPhotoTags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PetPhotos::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Pets::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    DateJoined,
    IsStaff,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    UserId,
    FirstName,
    LastName,
    ProfilePicture,
    DateOfBirth,
    Email,
    Gender,
    Description,
}

#[derive(DeriveIden)]
enum Pets {
    Table,
    Id,
    UserId,
    Name,
    PetType,
    DateOfBirth,
}

#[derive(DeriveIden)]
enum PetPhotos {
    Table,
    Id,
    UserId,
    Photo,
    Description,
    PublishedAt,
    Likes,
}

#[derive(DeriveIden)]
enum PetPhotoTags {
    Table,
    PhotoId,
    PetId,
}
