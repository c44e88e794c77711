use music_catalog::{
    models::{NewAlbum, NewSong, NewUser, User, UserChanges},
    repository::{Repository, SqliteRepository},
};

// --- Test Context and Setup ---

async fn setup() -> SqliteRepository {
    SqliteRepository::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database with migrations")
}

// --- Test Data Helpers ---

async fn create_test_user(repo: &SqliteRepository, username: &str) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: Some("Full Name".to_string()),
        artistic_name: format!("{username} project"),
        password_hash: "$argon2id$placeholder".to_string(),
    })
    .await
    .expect("Failed to insert user")
}

fn album(name: &str, year: i32) -> NewAlbum {
    NewAlbum {
        name: name.to_string(),
        year,
    }
}

fn song(title: &str) -> NewSong {
    NewSong {
        title: title.to_string(),
        duration: "3:00".to_string(),
    }
}

// --- Tests ---

#[tokio::test]
async fn test_user_lookup_and_uniqueness_checks() {
    let repo = setup().await;
    let ana = create_test_user(&repo, "ana").await;

    assert_eq!(repo.get_user(ana.id).await.unwrap(), Some(ana.clone()));
    assert!(repo.get_user(ana.id + 1).await.unwrap().is_none());

    let account = repo.get_account(ana.id).await.unwrap().unwrap();
    assert_eq!(account.user, ana);
    assert_eq!(account.password, "$argon2id$placeholder");
    assert!(account.is_active);

    assert!(repo.username_taken("ana", None).await.unwrap());
    assert!(!repo.username_taken("ana", Some(ana.id)).await.unwrap());
    assert!(!repo.username_taken("bruno", None).await.unwrap());
    assert!(repo.email_taken("ana@example.com", None).await.unwrap());
    assert!(!repo.email_taken("ana@example.com", Some(ana.id)).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_username_violates_constraint() {
    let repo = setup().await;
    create_test_user(&repo, "ana").await;

    let result = repo
        .create_user(NewUser {
            username: "ana".to_string(),
            email: "other@example.com".to_string(),
            full_name: None,
            artistic_name: "x".to_string(),
            password_hash: "x".to_string(),
        })
        .await;

    let Err(sqlx::Error::Database(err)) = result else {
        panic!("expected a database constraint error");
    };
    assert!(err.is_unique_violation());
    assert!(err.message().contains("users.username"), "{}", err.message());
}

#[tokio::test]
async fn test_update_user_only_touches_given_fields() {
    let repo = setup().await;
    let ana = create_test_user(&repo, "ana").await;

    let updated = repo
        .update_user(
            ana.id,
            UserChanges {
                artistic_name: Some("Renamed".to_string()),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.artistic_name, "Renamed");
    assert_eq!(updated.full_name.as_deref(), Some("Full Name"));
    assert_eq!(updated.username, "ana");

    let cleared = repo
        .update_user(
            ana.id,
            UserChanges {
                full_name: Some(None),
                password_hash: Some("$argon2id$new".to_string()),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.full_name, None);
    assert_eq!(cleared.artistic_name, "Renamed");

    let account = repo.get_account(ana.id).await.unwrap().unwrap();
    assert_eq!(account.password, "$argon2id$new");

    let missing = repo
        .update_user(999, UserChanges::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_albums_are_listed_in_creation_order_with_owner() {
    let repo = setup().await;
    let ana = create_test_user(&repo, "ana").await;
    let bruno = create_test_user(&repo, "bruno").await;

    repo.create_album(album("A", 2000), ana.id).await.unwrap();
    repo.create_album(album("B", 2001), bruno.id).await.unwrap();
    repo.create_album(album("C", 2002), ana.id).await.unwrap();

    assert_eq!(repo.count_albums().await.unwrap(), 3);

    let page = repo.list_albums(2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "A");
    assert_eq!(page[0].user, ana);
    assert_eq!(page[1].user, bruno);

    let rest = repo.list_albums(2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].name, "C");
}

#[tokio::test]
async fn test_album_for_unknown_user_violates_foreign_key() {
    let repo = setup().await;

    assert!(repo.create_album(album("Orphan", 2000), 42).await.is_err());
}

#[tokio::test]
async fn test_songs_are_scoped_and_paged() {
    let repo = setup().await;
    let ana = create_test_user(&repo, "ana").await;
    let first = repo.create_album(album("A", 2000), ana.id).await.unwrap();
    let second = repo.create_album(album("B", 2001), ana.id).await.unwrap();

    for title in ["one", "two", "three"] {
        repo.create_song(first.id, song(title)).await.unwrap();
    }
    repo.create_song(second.id, song("elsewhere")).await.unwrap();

    assert_eq!(repo.count_songs(first.id).await.unwrap(), 3);
    assert_eq!(repo.count_songs(second.id).await.unwrap(), 1);

    let titles: Vec<String> = repo
        .list_songs(first.id, 2, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|song| song.title)
        .collect();
    assert_eq!(titles, ["three"]);
}

#[tokio::test]
async fn test_delete_user_cascades_to_albums_and_songs() {
    let repo = setup().await;
    let ana = create_test_user(&repo, "ana").await;
    let bruno = create_test_user(&repo, "bruno").await;
    let gone = repo.create_album(album("Gone", 2000), ana.id).await.unwrap();
    let kept = repo.create_album(album("Kept", 2001), bruno.id).await.unwrap();
    repo.create_song(gone.id, song("lost")).await.unwrap();
    repo.create_song(kept.id, song("safe")).await.unwrap();

    assert!(repo.delete_user(ana.id).await.unwrap());
    assert!(!repo.delete_user(ana.id).await.unwrap());

    assert!(repo.get_album(gone.id).await.unwrap().is_none());
    assert_eq!(repo.count_songs(gone.id).await.unwrap(), 0);
    assert_eq!(repo.count_albums().await.unwrap(), 1);
    assert_eq!(repo.count_songs(kept.id).await.unwrap(), 1);
}
