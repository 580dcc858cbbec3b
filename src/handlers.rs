// ABOUTME: HTTP endpoints for the dashboard, profiles, pets and pet photos
// ABOUTME: Maps requests to service calls against the acting user and wraps results with a redirect target

use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::header,
    response::{Html, IntoResponse, Json, Redirect as HttpRedirect, Response},
};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use uuid::Uuid;

use crate::auth_helpers::AuthUser;
use crate::error::{AppError, JsonBody, Result};
use crate::types::{
    EditPhotoRequest, FeedResponse, LikeResponse, NewPhoto, PetFields, PetView, PhotoView,
    ProfileFields, ProfileView, Redirect,
};
use crate::{AppState, auth_helpers, session};

const LANDING_PAGE: &str = "<!doctype html>\n<html><head><title>Petstagram</title></head>\
<body><h1>Petstagram</h1><p>Share photos of your pets. \
<a href=\"/dashboard\">Browse the dashboard</a>.</p></body></html>";

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    if auth_helpers::current_viewer(&jar, &state).is_some() {
        return HttpRedirect::to("/dashboard").into_response();
    }
    Html(LANDING_PAGE).into_response()
}

pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Result<Json<FeedResponse>> {
    let viewer = auth_helpers::current_viewer(&jar, &state);
    let pet_photos = state.storage.list_feed(viewer).await?;
    Ok(Json(FeedResponse { pet_photos }))
}

// Profiles

pub async fn profile_details(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<ProfileView>> {
    let viewer = auth_helpers::current_viewer(&jar, &state);
    Ok(Json(state.storage.get_profile(profile_id, viewer).await?))
}

pub async fn edit_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    WithRejection(Json(fields), _): JsonBody<ProfileFields>,
) -> Result<Json<Redirect<ProfileView>>> {
    let actor = user.id();
    state.storage.edit_profile(profile_id, actor, &fields).await?;
    let view = state.storage.get_profile(profile_id, Some(actor)).await?;
    Ok(Json(Redirect::to(format!("/profile/{}", profile_id), view)))
}

pub async fn delete_profile(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(profile_id): Path<Uuid>,
) -> Result<(CookieJar, Json<Redirect<serde_json::Value>>)> {
    let actor = user.id();
    let deleted = state.storage.delete_profile(profile_id, actor).await?;
    state.sessions.remove_user_sessions(actor);

    let jar = jar.add(session::create_logout_cookie(state.cookie_secure));
    Ok((
        jar,
        Json(Redirect::to(
            "/",
            serde_json::json!({
                "deleted_photos": deleted.photos,
                "deleted_pets": deleted.pets,
            }),
        )),
    ))
}

// Pets

pub async fn add_pet(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(fields), _): JsonBody<PetFields>,
) -> Result<Json<Redirect<PetView>>> {
    let owner = user.id();
    let pet = state.storage.add_pet(owner, &fields).await?;
    Ok(Json(Redirect::to("/dashboard", PetView::from(pet))))
}

pub async fn edit_pet(
    user: AuthUser,
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
    WithRejection(Json(fields), _): JsonBody<PetFields>,
) -> Result<Json<Redirect<PetView>>> {
    let actor = user.id();
    let pet = state.storage.edit_pet(pet_id, actor, &fields).await?;
    Ok(Json(Redirect::to(format!("/profile/{}", actor), PetView::from(pet))))
}

pub async fn delete_pet(
    user: AuthUser,
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Redirect<serde_json::Value>>> {
    let actor = user.id();
    state.storage.delete_pet(pet_id, actor).await?;
    Ok(Json(Redirect::to(
        format!("/profile/{}", actor),
        serde_json::json!({"success": true}),
    )))
}

// Photos

fn malformed_form(err: MultipartError) -> AppError {
    AppError::field("form", err.body_text())
}

async fn read_upload(mut multipart: Multipart) -> Result<NewPhoto> {
    let mut upload = NewPhoto::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                upload.blob = field.bytes().await.map_err(malformed_form)?.to_vec();
            }
            "description" => {
                let text = field.text().await.map_err(malformed_form)?;
                if !text.trim().is_empty() {
                    upload.description = Some(text);
                }
            }
            "tagged_pets" => {
                let text = field.text().await.map_err(malformed_form)?;
                let pet_id = Uuid::parse_str(text.trim()).map_err(|_| {
                    AppError::field("tagged_pets", format!("'{}' is not a valid pet id", text.trim()))
                })?;
                upload.tagged_pets.push(pet_id);
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(upload)
}

pub async fn add_photo(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Redirect<PhotoView>>> {
    let uploader = user.id();
    let upload = read_upload(multipart).await?;

    let photo = state.storage.add_photo(uploader, upload).await?;
    let view = state.storage.get_photo_details(photo.id, Some(uploader)).await?;
    Ok(Json(Redirect::to("/dashboard", view)))
}

pub async fn photo_details(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<PhotoView>> {
    let viewer = auth_helpers::current_viewer(&jar, &state);
    Ok(Json(state.storage.get_photo_details(photo_id, viewer).await?))
}

fn sniff_image_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

pub async fn photo_image(State(state): State<AppState>, Path(photo_id): Path<Uuid>) -> Result<Response> {
    let bytes = state.storage.read_photo_blob(photo_id).await?;
    let content_type = sniff_image_type(&bytes);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Open to anonymous callers and not deduplicated per user.
pub async fn like_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<Redirect<LikeResponse>>> {
    let likes = state.storage.like(photo_id).await?;
    Ok(Json(Redirect::to(
        format!("/photo/{}", photo_id),
        LikeResponse { likes },
    )))
}

pub async fn edit_photo(
    user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
    WithRejection(Json(edit), _): JsonBody<EditPhotoRequest>,
) -> Result<Json<Redirect<PhotoView>>> {
    let actor = user.id();
    state.storage.edit_photo(photo_id, actor, &edit).await?;
    let view = state.storage.get_photo_details(photo_id, Some(actor)).await?;
    Ok(Json(Redirect::to(format!("/photo/{}", photo_id), view)))
}

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<Json<Redirect<serde_json::Value>>> {
    let actor = user.id();
    state.storage.delete_photo(photo_id, actor).await?;
    Ok(Json(Redirect::to(
        "/dashboard",
        serde_json::json!({"success": true}),
    )))
}
