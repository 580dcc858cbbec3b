// ABOUTME: Tests for the storage-backed services against a migrated SQLite database
// ABOUTME: Covers accounts, profiles, pets, photos, likes, the feed and cascading account deletion

#[cfg(test)]
mod tests {
    use super::super::entities::{pet, pet::PetType, pet_photo, pet_photo_tag, profile, user};
    use super::super::error::AppError;
    use super::super::storage::*;
    use super::super::types::*;
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

    async fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        use sea_orm::Database;
        use sea_orm_migration::MigratorTrait;

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url).await.unwrap();

        crate::migration::Migrator::up(&db, None).await.unwrap();

        let blobs = crate::blob_store::FsBlobStore::new(temp_dir.path().join("media"))
            .await
            .unwrap();
        let storage = Storage::with_parts(db, Arc::new(blobs));
        (storage, temp_dir)
    }

    fn profile_fields(first_name: &str) -> ProfileFields {
        ProfileFields {
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            profile_picture: "https://example.com/me.png".to_string(),
            date_of_birth: None,
            email: Some(format!("{}@example.com", first_name.to_lowercase())),
            gender: None,
            description: Some("Loves pets".to_string()),
        }
    }

    fn registration(username: &str) -> RegisterRequest {
        RegisterRequest::new(username, "s3cret-pass", profile_fields("Alice"))
    }

    // Skips Argon2 so tests that only need an account stay fast
    async fn create_test_user(storage: &Storage, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            username: Set(username.to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            date_joined: Set(now_millis()),
            is_staff: Set(false),
        }
        .insert(&storage.db)
        .await
        .unwrap();

        profile::ActiveModel {
            user_id: Set(id),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            profile_picture: Set("https://example.com/p.png".to_string()),
            date_of_birth: Set(None),
            email: Set(None),
            gender: Set(None),
            description: Set(None),
        }
        .insert(&storage.db)
        .await
        .unwrap();

        id
    }

    fn pet_fields(name: &str, pet_type: PetType) -> PetFields {
        PetFields {
            name: name.to_string(),
            pet_type,
            date_of_birth: None,
        }
    }

    fn upload(tagged_pets: Vec<Uuid>) -> NewPhoto {
        NewPhoto {
            blob: PNG.to_vec(),
            description: Some("At the park".to_string()),
            tagged_pets,
        }
    }

    fn media_files(temp_dir: &TempDir) -> usize {
        std::fs::read_dir(temp_dir.path().join("media")).unwrap().count()
    }

    #[tokio::test]
    async fn test_register_creates_user_and_profile() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = storage.register(&registration("alice")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.is_staff);
        assert_ne!(user.password_hash, "s3cret-pass");

        let profile = profile::Entity::find_by_id(user.id)
            .one(&storage.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.first_name, "Alice");
        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let (storage, _temp_dir) = create_test_storage().await;
        create_test_user(&storage, "alice").await;

        let result = storage.register(&registration("alice")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(user::Entity::find().count(&storage.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_fields_without_writing() {
        let (storage, _temp_dir) = create_test_storage().await;

        let mut req = registration("alice");
        req.first_name = "Anna2".to_string();
        req.password_confirmation = "something-else".to_string();

        let err = storage.register(&req).await.unwrap_err();
        let fields: Vec<&str> = err.field_errors().iter().map(|f| f.field.as_str()).collect();
        assert!(fields.contains(&"first_name"));
        assert!(fields.contains(&"password_confirmation"));

        assert_eq!(user::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(profile::Entity::find().count(&storage.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_does_not_reveal_unknown_users() {
        let (storage, _temp_dir) = create_test_storage().await;
        let user = storage.register(&registration("alice")).await.unwrap();

        let ok = storage.authenticate("alice", "s3cret-pass").await.unwrap();
        assert_eq!(ok.id, user.id);

        let wrong_password = storage.authenticate("alice", "nope-nope-nope").await;
        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));

        let unknown_user = storage.authenticate("mallory", "s3cret-pass").await;
        assert!(matches!(unknown_user, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (storage, _temp_dir) = create_test_storage().await;
        let user = storage.register(&registration("alice")).await.unwrap();

        let err = storage
            .change_password(user.id, "wrong-old-pass", "brand-new-pass", "brand-new-pass")
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "old_password");

        storage
            .change_password(user.id, "s3cret-pass", "brand-new-pass", "brand-new-pass")
            .await
            .unwrap();

        assert!(storage.authenticate("alice", "brand-new-pass").await.is_ok());
        assert!(storage.authenticate("alice", "s3cret-pass").await.is_err());
    }

    #[tokio::test]
    async fn test_profile_is_owner_depends_on_viewer() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        let as_alice = storage.get_profile(alice, Some(alice)).await.unwrap();
        assert!(as_alice.is_owner);
        assert_eq!(as_alice.username, "alice");

        let as_bob = storage.get_profile(alice, Some(bob)).await.unwrap();
        assert!(!as_bob.is_owner);

        let anonymous = storage.get_profile(alice, None).await.unwrap();
        assert!(!anonymous.is_owner);
    }

    #[tokio::test]
    async fn test_edit_profile_requires_owner() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        let result = storage.edit_profile(alice, bob, &profile_fields("Mallory")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let updated = storage
            .edit_profile(alice, alice, &profile_fields("Alicia"))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alicia");

        let mut bad = profile_fields("Alicia");
        bad.profile_picture = "not a url".to_string();
        let err = storage.edit_profile(alice, alice, &bad).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "profile_picture");
    }

    #[tokio::test]
    async fn test_profile_birth_year_must_be_before_this_year() {
        use chrono::Datelike;

        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;

        let mut fields = profile_fields("Alice");
        fields.date_of_birth = chrono::NaiveDate::from_ymd_opt(today().year(), 1, 1);
        let err = storage.edit_profile(alice, alice, &fields).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "date_of_birth");

        fields.date_of_birth = chrono::NaiveDate::from_ymd_opt(today().year() - 1, 12, 31);
        let updated = storage.edit_profile(alice, alice, &fields).await.unwrap();
        assert_eq!(updated.date_of_birth, fields.date_of_birth);

        fields.date_of_birth = chrono::NaiveDate::from_ymd_opt(1919, 12, 31);
        assert!(storage.edit_profile(alice, alice, &fields).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_pet_name_per_owner() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        storage
            .add_pet(alice, &pet_fields("Rex", PetType::Dog))
            .await
            .unwrap();

        let again = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let for_bob = storage.add_pet(bob, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        assert_eq!(for_bob.user_id, bob);
    }

    #[tokio::test]
    async fn test_edit_pet_rules() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        storage.add_pet(alice, &pet_fields("Tom", PetType::Cat)).await.unwrap();

        let by_bob = storage.edit_pet(rex.id, bob, &pet_fields("Max", PetType::Dog)).await;
        assert!(matches!(by_bob, Err(AppError::Forbidden(_))));

        let mut future = pet_fields("Rex", PetType::Dog);
        future.date_of_birth = Some(today() + chrono::Duration::days(1));
        let err = storage.edit_pet(rex.id, alice, &future).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "date_of_birth");

        let clash = storage.edit_pet(rex.id, alice, &pet_fields("Tom", PetType::Dog)).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let mut renamed = pet_fields("Max", PetType::Other);
        renamed.date_of_birth = chrono::NaiveDate::from_ymd_opt(2015, 3, 1);
        let max = storage.edit_pet(rex.id, alice, &renamed).await.unwrap();
        assert_eq!(max.name, "Max");
        assert_eq!(max.pet_type, PetType::Other);
        assert_eq!(max.age_in(2024), Some(9));
    }

    #[tokio::test]
    async fn test_delete_pet_keeps_photos() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let photo = storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();

        let by_bob = storage.delete_pet(rex.id, bob).await;
        assert!(matches!(by_bob, Err(AppError::Forbidden(_))));

        storage.delete_pet(rex.id, alice).await.unwrap();

        assert!(storage.get_pet(rex.id).await.is_err());
        let details = storage.get_photo_details(photo.id, None).await.unwrap();
        assert!(details.tagged_pets.is_empty());
        assert_eq!(pet_photo_tag::Entity::find().count(&storage.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversized_photo_rejected_before_any_write() {
        let (storage, temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;

        let mut big = upload(vec![]);
        big.blob = vec![0u8; 6 * 1024 * 1024];

        let err = storage.add_photo(alice, big).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "photo");
        assert_eq!(pet_photo::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(media_files(&temp_dir), 0);
    }

    #[tokio::test]
    async fn test_photo_with_unknown_pet_is_a_reference_error() {
        let (storage, temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;

        let result = storage.add_photo(alice, upload(vec![Uuid::new_v4()])).await;
        assert!(matches!(result, Err(AppError::Reference(_))));
        assert_eq!(pet_photo::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(media_files(&temp_dir), 0);
    }

    #[tokio::test]
    async fn test_photo_must_tag_a_pet() {
        let (storage, temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();

        let err = storage.add_photo(alice, upload(vec![])).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "tagged_pets");
        assert_eq!(pet_photo::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(media_files(&temp_dir), 0);

        let photo = storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();
        let untag = EditPhotoRequest {
            description: None,
            tagged_pets: vec![],
        };
        let err = storage.edit_photo(photo.id, alice, &untag).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "tagged_pets");

        let details = storage.get_photo_details(photo.id, None).await.unwrap();
        assert_eq!(details.tagged_pets.len(), 1);
        assert_eq!(details.description.as_deref(), Some("At the park"));
    }

    #[tokio::test]
    async fn test_photo_tags_are_a_set() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let tom = storage.add_pet(alice, &pet_fields("Tom", PetType::Cat)).await.unwrap();

        let photo = storage
            .add_photo(alice, upload(vec![rex.id, tom.id, rex.id]))
            .await
            .unwrap();
        assert_eq!(photo.likes, 0);

        let details = storage.get_photo_details(photo.id, Some(alice)).await.unwrap();
        assert!(details.is_owner);
        let names: Vec<&str> = details.tagged_pets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Rex", "Tom"]);

        assert_eq!(storage.read_photo_blob(photo.id).await.unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_edit_and_delete_photo_require_uploader() {
        let (storage, temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let tom = storage.add_pet(alice, &pet_fields("Tom", PetType::Cat)).await.unwrap();

        let photo = storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();

        let edit = EditPhotoRequest {
            description: Some("Sleepy".to_string()),
            tagged_pets: vec![tom.id],
        };
        let by_bob = storage.edit_photo(photo.id, bob, &edit).await;
        assert!(matches!(by_bob, Err(AppError::Forbidden(_))));

        let edited = storage.edit_photo(photo.id, alice, &edit).await.unwrap();
        assert_eq!(edited.description.as_deref(), Some("Sleepy"));
        assert_eq!(edited.published_at, photo.published_at);
        let details = storage.get_photo_details(photo.id, Some(bob)).await.unwrap();
        assert!(!details.is_owner);
        assert_eq!(details.tagged_pets.len(), 1);
        assert_eq!(details.tagged_pets[0].id, tom.id);

        assert!(matches!(
            storage.delete_photo(photo.id, bob).await,
            Err(AppError::Forbidden(_))
        ));
        storage.delete_photo(photo.id, alice).await.unwrap();

        assert!(matches!(
            storage.get_photo(photo.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(pet_photo_tag::Entity::find().count(&storage.db).await.unwrap(), 0);
        assert_eq!(media_files(&temp_dir), 0);
    }

    #[tokio::test]
    async fn test_like_increments_every_call() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let photo = storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();

        assert_eq!(storage.like(photo.id).await.unwrap(), 1);
        assert_eq!(storage.like(photo.id).await.unwrap(), 2);
        assert_eq!(storage.like(photo.id).await.unwrap(), 3);

        assert!(matches!(
            storage.like(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_likes_are_not_lost() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let photo = storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();
        storage.like(photo.id).await.unwrap();

        let storage = Arc::new(storage);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move { storage.like(photo.id).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let photo = storage.get_photo(photo.id).await.unwrap();
        assert_eq!(photo.likes, 21);
    }

    #[tokio::test]
    async fn test_total_likes_count_each_photo_once() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let tom = storage.add_pet(alice, &pet_fields("Tom", PetType::Cat)).await.unwrap();
        let fido = storage.add_pet(bob, &pet_fields("Fido", PetType::Dog)).await.unwrap();

        let both = storage.add_photo(alice, upload(vec![rex.id, tom.id])).await.unwrap();
        let only_tom = storage.add_photo(bob, upload(vec![tom.id])).await.unwrap();
        let bobs = storage.add_photo(bob, upload(vec![fido.id])).await.unwrap();

        for _ in 0..3 {
            storage.like(both.id).await.unwrap();
        }
        for _ in 0..2 {
            storage.like(only_tom.id).await.unwrap();
        }
        for _ in 0..7 {
            storage.like(bobs.id).await.unwrap();
        }

        let view = storage.get_profile(alice, None).await.unwrap();
        assert_eq!(view.total_likes, 5);
        assert_eq!(view.pets.len(), 2);

        let bob_view = storage.get_profile(bob, None).await.unwrap();
        assert_eq!(bob_view.total_likes, 7);
    }

    #[tokio::test]
    async fn test_feed_is_newest_first() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(storage.add_photo(alice, upload(vec![rex.id])).await.unwrap().id);
            // Distinct publication timestamps
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }

        let feed = storage.list_feed(Some(alice)).await.unwrap();
        let feed_ids: Vec<Uuid> = feed.iter().map(|p| p.id).collect();
        ids.reverse();
        assert_eq!(feed_ids, ids);
        assert!(feed.iter().all(|p| p.is_owner && p.tagged_pets.len() == 1));
    }

    #[tokio::test]
    async fn test_delete_profile_cascades() {
        let (storage, temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;

        let rex = storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();
        let fido = storage.add_pet(bob, &pet_fields("Fido", PetType::Dog)).await.unwrap();

        storage.add_photo(alice, upload(vec![rex.id])).await.unwrap();
        storage.add_photo(alice, upload(vec![fido.id])).await.unwrap();
        storage.add_photo(bob, upload(vec![rex.id, fido.id])).await.unwrap();
        let survivor = storage.add_photo(bob, upload(vec![fido.id])).await.unwrap();

        let deleted = storage.delete_profile(alice, alice).await.unwrap();
        assert_eq!(deleted.pets, 1);
        assert_eq!(deleted.photos, 3);

        assert!(user::Entity::find_by_id(alice).one(&storage.db).await.unwrap().is_none());
        assert!(profile::Entity::find_by_id(alice).one(&storage.db).await.unwrap().is_none());
        let alice_pets = pet::Entity::find()
            .filter(pet::Column::UserId.eq(alice))
            .count(&storage.db)
            .await
            .unwrap();
        assert_eq!(alice_pets, 0);
        let alice_photos = pet_photo::Entity::find()
            .filter(pet_photo::Column::UserId.eq(alice))
            .count(&storage.db)
            .await
            .unwrap();
        assert_eq!(alice_photos, 0);

        let remaining: Vec<Uuid> = pet_photo::Entity::find()
            .all(&storage.db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(remaining, vec![survivor.id]);
        assert_eq!(pet_photo_tag::Entity::find().count(&storage.db).await.unwrap(), 1);
        assert_eq!(media_files(&temp_dir), 1);

        assert!(matches!(
            storage.get_profile(alice, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(storage.get_profile(bob, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_profile_requires_owner() {
        let (storage, _temp_dir) = create_test_storage().await;
        let alice = create_test_user(&storage, "alice").await;
        let bob = create_test_user(&storage, "bob").await;
        storage.add_pet(alice, &pet_fields("Rex", PetType::Dog)).await.unwrap();

        let result = storage.delete_profile(alice, bob).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        assert!(user::Entity::find_by_id(alice).one(&storage.db).await.unwrap().is_some());
        assert_eq!(pet::Entity::find().count(&storage.db).await.unwrap(), 1);
    }
}
