use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info};

use crate::auth::token::{expired_session_cookie, session_cookie, session_token, MaybeIdentity};
use crate::error::{PageError, RequestError, ValidationError};
use crate::models::resource::{CreatePostForm, ResourceId};
use crate::models::session::Identity;
use crate::models::status::StatusForm;
use crate::models::upvote::{UpvoteRequest, UpvoteResponse};
use crate::models::user::CredentialsForm;
use crate::server::constants::{
    ABOUT_TEMPLATE, ADMIN_TEMPLATE, CREATE_POST_TEMPLATE, LOGIN_TEMPLATE, PROFILE_TEMPLATE,
    REGISTER_TEMPLATE,
};
use crate::server::state::AppState;
use crate::server::views::Page;
use crate::services::{accounts, feed, posts, upvote as upvotes};

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/profile", get(profile))
        .route("/admin", get(admin))
        .route("/logout", get(logout))
        .route("/create_post", get(create_post_form).post(create_post))
        .route("/update_post/:post_id", post(update_post))
        .route("/upvote", post(upvote))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.server.address.clone();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("starting server on: {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Re-renders a form with the failure spelled out for the user.
fn form_error(template: &'static str, e: RequestError) -> Response {
    if let RequestError::DataStoreUnavailable(inner) = &e {
        error!("submission of {template} failed: {inner}");
    }
    (e.status(), Page::form(template, Some(e.public_message()))).into_response()
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    identity: MaybeIdentity,
) -> Result<Page, RequestError> {
    let posts = feed::list_posts(state.stores.data.as_ref(), state.config.feed.concurrency()).await?;
    Ok(Page::index(posts, identity.username()))
}

pub async fn about() -> Page {
    Page::new(ABOUT_TEMPLATE)
}

pub async fn login_form() -> Page {
    Page::form(LOGIN_TEMPLATE, None)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    if let Err(e) = state.check_auth_attempt(&form.username) {
        return form_error(LOGIN_TEMPLATE, e);
    }
    let result = accounts::login(
        state.stores.auth.as_ref(),
        form,
        &state.config.admin.emails,
    )
    .await;
    match result {
        Ok(identity) => start_session(&state, jar, identity, "/profile"),
        Err(e) => form_error(LOGIN_TEMPLATE, e),
    }
}

pub async fn register_form() -> Page {
    Page::form(REGISTER_TEMPLATE, None)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    if let Err(e) = state.check_auth_attempt(&form.username) {
        return form_error(REGISTER_TEMPLATE, e);
    }
    match accounts::register(&state.stores, form, &state.config.admin.emails).await {
        Ok(identity) => start_session(&state, jar, identity, "/create_post"),
        Err(e) => form_error(REGISTER_TEMPLATE, e),
    }
}

fn start_session(state: &AppState, jar: CookieJar, identity: Identity, to: &str) -> Response {
    let token = state.sessions.create(identity);
    let cookie = session_cookie(token, state.config.session.secure_cookie);
    (jar.add(cookie), Redirect::to(to)).into_response()
}

pub async fn profile(identity: MaybeIdentity) -> Result<Page, PageError> {
    let identity = identity.require_login()?;
    Ok(Page::new(PROFILE_TEMPLATE).with("username", identity.username))
}

pub async fn admin(identity: MaybeIdentity) -> Result<Page, PageError> {
    identity.require_admin()?;
    Ok(Page::new(ADMIN_TEMPLATE))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    identity: MaybeIdentity,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), PageError> {
    identity.require_login()?;
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }
    Ok((jar.remove(expired_session_cookie()), Redirect::to("/")))
}

pub async fn create_post_form(identity: MaybeIdentity) -> Result<Page, PageError> {
    identity.require_login()?;
    Ok(Page::form(CREATE_POST_TEMPLATE, None))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    identity: MaybeIdentity,
    form: Result<Form<CreatePostForm>, FormRejection>,
) -> Result<Response, PageError> {
    let identity = identity.require_login()?;
    let Form(form) = form.map_err(ValidationError::from)?;
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return Ok(form_error(CREATE_POST_TEMPLATE, e.into())),
    };
    let store = state.store_for(&identity);
    posts::create_post(store.as_ref(), identity.user_id, request).await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    identity: MaybeIdentity,
    post_id: Result<Path<ResourceId>, PathRejection>,
    form: Result<Form<StatusForm>, FormRejection>,
) -> Result<Redirect, PageError> {
    let identity = identity.require_login()?;
    let Path(post_id) = post_id.map_err(ValidationError::from)?;
    let Form(form) = form.map_err(ValidationError::from)?;
    let report = form.into_report()?;
    let store = state.store_for(&identity);
    posts::update_status(store.as_ref(), post_id, report).await?;
    Ok(Redirect::to("/"))
}

pub async fn upvote(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<UpvoteRequest>, JsonRejection>,
) -> Result<Json<UpvoteResponse>, RequestError> {
    let Json(payload) = payload.map_err(ValidationError::from)?;
    let store = state.store_for(&identity);
    let upvotes =
        upvotes::record_upvote(store.as_ref(), payload.resource_id, identity.user_id).await?;
    Ok(Json(UpvoteResponse {
        success: true,
        upvotes,
    }))
}
