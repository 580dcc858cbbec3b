// ABOUTME: Type definitions for API commands, responses and read-side views
// ABOUTME: Commands are what the presentation boundary hands to the services

use std::{fmt::Display, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use uuid::Uuid;

use crate::entities::{pet, pet_photo, profile::Gender, pet::PetType};

/// Optional form values arrive as strings; blank or whitespace-only input
/// means the field was left empty.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

// Account commands

/// Sign-up form: credentials plus the profile fields, all at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
}

impl RegisterRequest {
    pub fn new(username: &str, password: &str, profile: ProfileFields) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            password_confirmation: password.to_string(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_picture: profile.profile_picture,
            date_of_birth: profile.date_of_birth,
            email: profile.email,
            gender: profile.gender,
            description: profile.description,
        }
    }

    pub fn profile(&self) -> ProfileFields {
        ProfileFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
            date_of_birth: self.date_of_birth,
            email: self.email.clone(),
            gender: self.gender,
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

// Profile, pet and photo commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetFields {
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<NaiveDate>,
}

/// Upload as decoded from the multipart form.
#[derive(Debug, Default)]
pub struct NewPhoto {
    pub blob: Vec<u8>,
    pub description: Option<String>,
    pub tagged_pets: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPhotoRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tagged_pets: Vec<Uuid>,
}

// Views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
}

impl From<pet::Model> for PetView {
    fn from(pet: pet::Model) -> Self {
        let age = pet.age();
        Self {
            id: pet.id,
            owner_id: pet.user_id,
            name: pet.name,
            pet_type: pet.pet_type,
            date_of_birth: pet.date_of_birth,
            age,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub pets: Vec<PetView>,
    pub total_likes: i64,
    pub is_owner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoView {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub image_url: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub likes: i32,
    pub tagged_pets: Vec<PetView>,
    pub is_owner: bool,
}

impl PhotoView {
    pub fn new(photo: pet_photo::Model, tagged: Vec<pet::Model>, viewer: Option<Uuid>) -> Self {
        Self {
            is_owner: viewer == Some(photo.user_id),
            image_url: format!("/photo/{}/image", photo.id),
            id: photo.id,
            uploader_id: photo.user_id,
            description: photo.description,
            published_at: photo.published_at,
            likes: photo.likes,
            tagged_pets: tagged.into_iter().map(PetView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub pet_photos: Vec<PhotoView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: i32,
}

/// Success envelope: where the client should go next plus the affected resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct Redirect<T> {
    pub redirect_to: String,
    pub data: T,
}

impl<T> Redirect<T> {
    pub fn to(target: impl Into<String>, data: T) -> Self {
        Self {
            redirect_to: target.into(),
            data,
        }
    }
}
