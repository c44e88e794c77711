use crate::{
    AppState,
    auth::{self, AuthUser, TokenType},
    error::{ApiError, ApiResult, FieldErrors},
    models::{
        AccessToken, Album, AlbumPayload, LoginPayload, NewUser, RefreshPayload, Song,
        SongPayload, TokenPair, User, UserPayload,
    },
    pagination::{Page, PageRequest},
    password::{hash_password, verify_password},
    payload::{Payload, parse_payload},
    permissions::{Access, ensure_account_owner},
    repository::RepositoryState,
    validation::{NOT_UNIQUE, USERNAME_TAKEN, UserDraft, Validator},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
};

// --- Albums ---

/// list_albums
///
/// [Public Route] Lists every album, oldest first, two per page, each with its owner nested.
#[utoipa::path(
    get,
    path = "/api/albums/",
    params(("page" = Option<String>, Query, description = "1-based page number or `last`")),
    responses(
        (status = 200, description = "One page of albums", body = Page<Album>),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_albums(
    _viewer: Option<AuthUser>,
    State(state): State<AppState>,
    paging: PageRequest,
) -> ApiResult<Json<Page<Album>>> {
    let count = state.repo.count_albums().await?;
    let pagination = paging.resolve(count)?;
    let albums = state
        .repo
        .list_albums(pagination.limit, pagination.offset)
        .await?;
    Ok(Json(paging.page(count, pagination, albums)))
}

/// create_album
///
/// [Authenticated Route] Creates an album owned by the requesting user.
/// The owner always comes from the `AuthUser` extractor, never from the body.
#[utoipa::path(
    post,
    path = "/api/albums/",
    request_body = AlbumPayload,
    responses(
        (status = 201, description = "Created", body = Album),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_album(
    AuthUser {
        id: user_id,
        username,
    }: AuthUser,
    State(state): State<AppState>,
    Payload(payload): Payload<AlbumPayload>,
) -> ApiResult<(StatusCode, Json<Album>)> {
    let new_album = payload.validate()?;
    let album = state.repo.create_album(new_album, user_id).await?;
    tracing::info!(album_id = album.id, user_id, %username, "album created");
    Ok((StatusCode::CREATED, Json(album)))
}

// --- Songs ---

/// list_songs
///
/// [Public Route] Lists the songs of one album, two per page.
/// An unknown album id is not an error: its song list is simply empty.
#[utoipa::path(
    get,
    path = "/api/albums/{id}/songs/",
    params(
        ("id" = i64, Path, description = "Album ID"),
        ("page" = Option<String>, Query, description = "1-based page number or `last`")
    ),
    responses(
        (status = 200, description = "One page of songs", body = Page<Song>),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_songs(
    _viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
    paging: PageRequest,
) -> ApiResult<Json<Page<Song>>> {
    let count = state.repo.count_songs(album_id).await?;
    let pagination = paging.resolve(count)?;
    let songs = state
        .repo
        .list_songs(album_id, pagination.limit, pagination.offset)
        .await?;
    Ok(Json(paging.page(count, pagination, songs)))
}

/// create_song
///
/// [Authenticated Route] Adds a song to the album in the path.
/// The body is validated first; only a valid song is checked against the album table.
#[utoipa::path(
    post,
    path = "/api/albums/{id}/songs/",
    params(("id" = i64, Path, description = "Album ID")),
    request_body = SongPayload,
    responses(
        (status = 201, description = "Created", body = Song),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Album not found")
    )
)]
pub async fn create_song(
    AuthUser {
        id: user_id,
        username,
    }: AuthUser,
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
    Payload(payload): Payload<SongPayload>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let new_song = payload.validate()?;

    let album = state
        .repo
        .get_album(album_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let song = state.repo.create_song(album.id, new_song).await?;
    tracing::info!(song_id = song.id, album_id, user_id, %username, "song created");
    Ok((StatusCode::CREATED, Json(song)))
}

// --- Users ---

/// register_user
///
/// [Public Route] Creates an account. Username and email must be unused; the password is
/// stored as an argon2 hash and never returned.
#[utoipa::path(
    post,
    path = "/api/users/",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Field errors")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Payload(payload): Payload<UserPayload>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let mut validator = Validator::default();
    let draft = payload.clean(&mut validator, false);
    check_unique(&state.repo, &mut validator, &draft, None).await?;
    validator.finish()?;

    let UserDraft {
        username: Some(username),
        email: Some(email),
        full_name,
        artistic_name: Some(artistic_name),
        password: Some(password),
    } = draft
    else {
        return Err(ApiError::Internal(
            "validated registration is missing a required field".to_string(),
        ));
    };

    let user = state
        .repo
        .create_user(NewUser {
            username,
            email,
            full_name: full_name.flatten(),
            artistic_name,
            password_hash: hash_password(&password)?,
        })
        .await
        .map_err(unique_violation)?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_user
///
/// [Public Route] Retrieves an account's public fields.
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    _viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = state.repo.get_user(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

/// update_user
///
/// [Owner Route] `PATCH` updates the submitted fields; `PUT` requires every writable field.
///
/// *Order*: the target must exist (404), then the requester must own it (401/403), and only
/// then is the body read and validated.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    viewer: Option<AuthUser>,
    method: Method,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<User>> {
    let target = state.repo.get_user(id).await?.ok_or(ApiError::NotFound)?;
    ensure_account_owner(viewer.as_ref(), target.id, Access::from(&method))?;

    let payload: UserPayload = parse_payload(&body)?;
    let partial = method == Method::PATCH;

    let mut validator = Validator::default();
    let draft = payload.clean(&mut validator, partial);
    check_unique(&state.repo, &mut validator, &draft, Some(target.id)).await?;
    validator.finish()?;

    let password_hash = draft.password.as_deref().map(hash_password).transpose()?;
    let user = state
        .repo
        .update_user(target.id, draft.into_changes(password_hash))
        .await
        .map_err(unique_violation)?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(user_id = user.id, partial, "user updated");
    Ok(Json(user))
}

/// delete_user
///
/// [Owner Route] Deletes an account together with its albums and their songs.
#[utoipa::path(
    delete,
    path = "/api/users/{id}/",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    viewer: Option<AuthUser>,
    method: Method,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let target = state.repo.get_user(id).await?.ok_or(ApiError::NotFound)?;
    ensure_account_owner(viewer.as_ref(), target.id, Access::from(&method))?;

    if state.repo.delete_user(target.id).await? {
        tracing::info!(user_id = target.id, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Records uniqueness failures for the username/email in `draft` that passed field validation.
async fn check_unique(
    repo: &RepositoryState,
    validator: &mut Validator,
    draft: &UserDraft,
    exclude: Option<i64>,
) -> ApiResult<()> {
    if let Some(username) = &draft.username {
        if repo.username_taken(username, exclude).await? {
            validator.add("username", USERNAME_TAKEN);
        }
    }
    if let Some(email) = &draft.email {
        if repo.email_taken(email, exclude).await? {
            validator.add("email", NOT_UNIQUE);
        }
    }
    Ok(())
}

/// Maps a UNIQUE constraint hit by a concurrent writer, after `check_unique` passed, onto the
/// same field error the pre-check reports.
fn unique_violation(err: sqlx::Error) -> ApiError {
    let field = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let constraint = db.message();
            if constraint.contains("users.username") {
                Some(("username", USERNAME_TAKEN))
            } else if constraint.contains("users.email") {
                Some(("email", NOT_UNIQUE))
            } else {
                None
            }
        }
        _ => None,
    };

    match field {
        Some((field, message)) => {
            tracing::warn!(field, "unique constraint raced the availability check");
            ApiError::Validation(FieldErrors::from([(
                field.to_string(),
                vec![message.to_string()],
            )]))
        }
        None => ApiError::Database(err),
    }
}

// --- Tokens ---

/// login
///
/// [Public Route] Exchanges a username/password pair for an access/refresh token pair.
/// Unknown usernames, wrong passwords and inactive accounts share one generic error.
#[utoipa::path(
    post,
    path = "/api/users/login/",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Field errors"),
        (status = 401, description = "No active account found with the given credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Payload(payload): Payload<LoginPayload>,
) -> ApiResult<Json<TokenPair>> {
    let credentials = payload.validate()?;

    let account = state
        .repo
        .find_account_by_username(&credentials.username)
        .await?
        .filter(|account| account.is_active)
        .filter(|account| verify_password(&credentials.password, &account.password))
        .ok_or_else(|| {
            tracing::info!(username = %credentials.username, "login rejected");
            ApiError::InvalidCredentials
        })?;

    let tokens = auth::issue_token_pair(&state.config, account.user.id)?;
    tracing::info!(user_id = account.user.id, "login succeeded");
    Ok(Json(tokens))
}

/// refresh_token
///
/// [Public Route] Exchanges a valid refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/api/users/login/refresh/",
    request_body = RefreshPayload,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Token is invalid or expired")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Payload(payload): Payload<RefreshPayload>,
) -> ApiResult<Json<AccessToken>> {
    let token = payload.validate()?;

    let claims = auth::decode_token(&state.config, &token, TokenType::Refresh).map_err(|e| {
        tracing::debug!("rejected refresh token: {e}");
        ApiError::InvalidRefreshToken
    })?;

    state
        .repo
        .get_account(claims.user_id)
        .await?
        .filter(|account| account.is_active)
        .ok_or(ApiError::InvalidRefreshToken)?;

    let access = auth::issue_token(&state.config, claims.user_id, TokenType::Access)?;
    Ok(Json(AccessToken { access }))
}
