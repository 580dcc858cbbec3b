// ABOUTME: SeaORM entities module for database models and relationships
// ABOUTME: Exports users, profiles, pets, pet photos and the photo/pet tag links

pub mod user;
pub mod profile;
pub mod pet;
pub mod pet_photo;
pub mod pet_photo_tag;
