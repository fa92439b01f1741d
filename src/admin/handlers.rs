use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{MailingRequest, MailingResponse};
use crate::{
    auth::{dto::PublicUser, extractors::AuthUser},
    error::{ApiError, ApiResult},
    extract::AppJson,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/mailing", post(mailing))
}

#[instrument(skip(state, claims))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.list().await?;
    info!(admin_id = claims.user_id, count = users.len(), "users listed");
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, claims, body))]
pub async fn mailing(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<MailingRequest>,
) -> ApiResult<Json<MailingResponse>> {
    if body.subject.trim().is_empty() {
        return Err(ApiError::BadRequest("Subject must not be empty".into()));
    }

    let users = state.users.list().await?;
    let (mut sent, mut failed) = (0, 0);
    for user in &users {
        match state.mailer.send(&user.email, &body.subject, &body.body).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(error = %format!("{e:#}"), user_id = user.id, "mailing delivery failed");
                failed += 1;
            }
        }
    }

    info!(admin_id = claims.user_id, sent, failed, "mailing finished");
    Ok(Json(MailingResponse {
        message: "Mailing finished".into(),
        sent,
        failed,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{auth::claims::Role, testing::Harness};

    #[tokio::test]
    async fn regular_users_are_forbidden() {
        let h = Harness::new();
        let (_, token) = h.seed_user("lena", Role::User);

        let (status, body) = h.send(Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Insufficient permissions");

        let (status, _) = h
            .send(
                Method::POST,
                "/admin/mailing",
                Some(&token),
                Some(json!({ "subject": "hi", "body": "there" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(h.mailer.sent().is_empty());

        let (status, _) = h.send(Method::GET, "/admin/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_lists_users_without_secrets() {
        let h = Harness::new();
        let (admin, token) = h.seed_user("root", Role::Admin);
        let (user, _) = h.seed_user("mike", Role::User);

        let (status, body) = h.send(Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["id"], admin.id);
        assert_eq!(users[0]["role"], "ADMIN");
        assert_eq!(users[1]["id"], user.id);
        assert_eq!(users[1]["isActivated"], true);
        assert!(users[1].get("passwordHash").is_none());
        assert!(users[1].get("password_hash").is_none());
        assert!(users[1].get("activationLink").is_none());
    }

    #[tokio::test]
    async fn mailing_reaches_everyone_and_counts_failures() {
        let h = Harness::new();
        let (_, token) = h.seed_user("root", Role::Admin);
        h.seed_user("nina", Role::User);
        h.seed_user("oscar", Role::User);
        h.mailer.fail_next();

        let (status, body) = h
            .send(
                Method::POST,
                "/admin/mailing",
                Some(&token),
                Some(json!({ "subject": "Maintenance", "body": "<p>Down at noon</p>" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], 2);
        assert_eq!(body["failed"], 1);

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.subject == "Maintenance"));
    }

    #[tokio::test]
    async fn mailing_requires_subject() {
        let h = Harness::new();
        let (_, token) = h.seed_user("root", Role::Admin);

        let (status, _) = h
            .send(
                Method::POST,
                "/admin/mailing",
                Some(&token),
                Some(json!({ "subject": " ", "body": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
