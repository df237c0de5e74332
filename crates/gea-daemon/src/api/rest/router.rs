//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Room for multipart framing around a maximum-size file
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    let api_routes = Router::new()
        // Health and catalog
        .route("/health", get(handlers::health_check))
        .route("/phases", get(handlers::list_phases))
        // Session
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        // Users and profile
        .route("/users", get(handlers::list_users))
        .route("/users", post(handlers::create_user))
        .route("/users/:id/toggle-active", post(handlers::toggle_user_active))
        .route("/users/:id/certification", put(handlers::set_certification))
        .route("/profile", get(handlers::get_profile))
        .route("/profile", put(handlers::update_profile))
        .route("/profile/password", put(handlers::change_password))
        // GLABs
        .route("/glabs", get(handlers::list_glabs))
        .route("/glabs", post(handlers::create_glab))
        .route("/glabs/:id", get(handlers::get_glab))
        .route("/glabs/:id/status", put(handlers::update_glab_status))
        .route("/glabs/:id/license-payment", post(handlers::record_license_payment))
        // Clients
        .route("/clients", get(handlers::list_clients))
        .route("/clients", post(handlers::create_client))
        .route("/clients/:id", get(handlers::get_client))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/pending-reviews", get(handlers::pending_reviews))
        .route("/projects/:id", get(handlers::get_project))
        .route("/projects/:id/readiness", get(handlers::project_readiness))
        .route("/projects/:id/advance", post(handlers::advance_project))
        .route("/projects/:id/review", put(handlers::review_project))
        .route("/projects/:id/fees", put(handlers::update_fees))
        .route("/projects/:id/payments/:kind", post(handlers::record_payment))
        .route("/projects/:id/remittance", post(handlers::record_remittance))
        // Assignments
        .route("/projects/:id/assessors", post(handlers::assign_assessor))
        .route("/projects/:id/assessors/:user_id", delete(handlers::remove_assessor))
        .route("/projects/:id/experts", post(handlers::assign_expert))
        .route("/projects/:id/committee", post(handlers::assign_committee))
        // Checklists
        .route("/projects/:id/checklist", get(handlers::list_checklist))
        .route("/projects/:id/checklist", post(handlers::add_custom_item))
        .route("/checklist/:id/toggle", post(handlers::toggle_checklist_item))
        .route("/projects/:id/quality-checklist", get(handlers::list_quality_checklist))
        .route("/quality-checklist/:id/toggle", post(handlers::toggle_quality_item))
        // Documents and templates
        .route("/projects/:id/documents", get(handlers::list_documents))
        .route("/projects/:id/documents", post(handlers::upload_document))
        .route("/documents/pending", get(handlers::pending_documents))
        .route("/documents/:id/review", put(handlers::review_document))
        .route("/documents/:id/download", get(handlers::download_document))
        .route("/templates", get(handlers::list_templates))
        .route("/templates", post(handlers::upload_template))
        .route("/templates/:id/download", get(handlers::download_template))
        // Chat
        .route("/projects/:id/messages", get(handlers::list_messages))
        .route("/projects/:id/messages", post(handlers::post_message))
        // Notifications
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/unread-count", get(handlers::unread_count))
        .route("/notifications/read-all", post(handlers::mark_all_notifications_read))
        .route("/notifications/:id/read", post(handlers::mark_notification_read))
        // Announcements
        .route("/announcements", get(handlers::list_announcements))
        .route("/announcements", post(handlers::create_announcement))
        .route("/announcements/:id", delete(handlers::delete_announcement))
        // CPD
        .route("/cpd", get(handlers::list_cpd_logs))
        .route("/cpd", post(handlers::create_cpd_log))
        .route("/cpd/:id/evidence", post(handlers::upload_cpd_evidence))
        .route("/cpd/:id/evidence", get(handlers::download_cpd_evidence))
        .route("/cpd/:id/review", put(handlers::review_cpd_log))
        // Dashboard and reminders
        .route("/dashboard", get(handlers::dashboard))
        .route("/reminders", get(handlers::list_reminders))
        .route("/reminders/scan", post(handlers::run_reminder_scan));

    // Build router with middleware
    let mut app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if state.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::ensure_admin;
    use crate::config::{BootstrapConfig, ReminderConfig};
    use crate::files::FileStore;
    use crate::scheduler::ReminderScheduler;
    use crate::storage::{AdvanceCommit, InMemoryStorage, ProjectStorage, Storage};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use gea_types::{PhaseLog, ProjectId, UserId};
    use gea_workflow::checklist::{seed_phase, seed_quality};
    use gea_workflow::FeeCalculator;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        test_app_with(gea_workflow::upload::DEFAULT_MAX_UPLOAD_BYTES).await.0
    }

    /// App plus a handle on its storage, with the given upload cap
    async fn test_app_with(max_upload_bytes: u64) -> (Router, Arc<InMemoryStorage>) {
        let memory = Arc::new(InMemoryStorage::new());
        let storage: Arc<dyn Storage> = memory.clone();
        ensure_admin(storage.as_ref(), &BootstrapConfig::default())
            .await
            .unwrap();
        let root = std::env::temp_dir().join(format!("gea-api-{}", uuid::Uuid::new_v4()));
        let files = Arc::new(FileStore::new(root.join("uploads"), root.join("templates")));
        let (scheduler, _rx) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());
        let state = AppState::new(storage, files, FeeCalculator::new(1_500).unwrap(), scheduler)
            .with_max_upload_bytes(max_upload_bytes);
        (create_router(state), memory)
    }

    const BOUNDARY: &str = "gea-test-boundary";

    fn upload_request(
        uri: &str,
        token: &str,
        slot_key: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"slot_key\"\r\n\r\n{slot}\r\n\
                 --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                slot = slot_key,
                name = filename,
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn upload(
        app: &Router,
        token: &str,
        project_id: &str,
        slot_key: &str,
        filename: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let uri = format!("/api/v1/projects/{}/documents", project_id);
        let request = upload_request(&uri, token, slot_key, filename, bytes);
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Walk a project forward in storage, seeding each phase on the way
    async fn move_to_phase(storage: &InMemoryStorage, project_id: &str, to: u8) {
        let id: ProjectId = project_id.parse().unwrap();
        let mut project = storage.get_project(&id).await.unwrap().unwrap();
        while project.current_phase.number() < to {
            let expected = project.current_phase;
            project.current_phase = expected.next().unwrap();
            project.review.reset();
            storage
                .commit_advance(AdvanceCommit {
                    checklist: seed_phase(id, project.current_phase),
                    quality: seed_quality(id, project.current_phase),
                    log: PhaseLog::advanced(
                        id,
                        expected,
                        project.current_phase,
                        UserId::generate(),
                        Utc::now(),
                    ),
                    project: project.clone(),
                    expected,
                })
                .await
                .unwrap();
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// GLAB plus an administrator for it; returns (glab id, admin token)
    async fn glab_with_admin(
        app: &Router,
        admin: &str,
        license: &str,
        username: &str,
    ) -> (String, String) {
        let (status, glab) = send(
            app,
            "POST",
            "/api/v1/glabs",
            Some(admin),
            Some(json!({
                "name": format!("Lab {}", license),
                "license_number": license,
                "country": "Kenya",
                "contact_email": format!("{}@lab.test", username),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", glab);
        let glab_id = glab["id"].as_str().unwrap().to_string();

        let (status, user) = send(
            app,
            "POST",
            "/api/v1/users",
            Some(admin),
            Some(json!({
                "username": username,
                "email": format!("{}@lab.test", username),
                "password": "lab-password",
                "role": "glab_admin",
                "glab_id": glab_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", user);

        let token = login(app, username, "lab-password").await;
        (glab_id, token)
    }

    async fn project_for(app: &Router, glab_token: &str) -> Value {
        let (status, client) = send(
            app,
            "POST",
            "/api/v1/clients",
            Some(glab_token),
            Some(json!({ "name": "Client Co", "country": "Kenya" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", client);

        let (status, project) = send(
            app,
            "POST",
            "/api/v1/projects",
            Some(glab_token),
            Some(json!({
                "client_id": client["id"],
                "fees": { "kind": "flat", "total": 1_000_000 },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", project);
        project
    }

    async fn complete_checklist(app: &Router, token: &str, project_id: &str, phase: u64) {
        let (status, items) = send(
            app,
            "GET",
            &format!("/api/v1/projects/{}/checklist?phase={}", project_id, phase),
            Some(token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        for item in items.as_array().unwrap() {
            if item["completed"].as_bool() == Some(true) {
                continue;
            }
            let (status, toggled) = send(
                app,
                "POST",
                &format!("/api/v1/checklist/{}/toggle", item["id"].as_str().unwrap()),
                Some(token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(toggled["completed"], json!(true));
        }
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
    }

    #[tokio::test]
    async fn test_login_and_unauthorized_access() {
        let app = test_app().await;

        let (status, body) = send(&app, "GET", "/api/v1/projects", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], json!("UNAUTHORIZED"));

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app, "admin", "admin123").await;
        let (status, me) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["role"], json!("gea_admin"));
        assert!(me.get("password_hash").is_none());

        let (status, _) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert!(status.is_success());
        let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_project_reference_and_fee_split() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-042", "labadmin").await;

        let project = project_for(&app, &lab).await;
        let year = chrono::Utc::now().format("%Y").to_string();
        assert_eq!(
            project["reference_number"],
            json!(format!("GL-042-{}-0001", year))
        );
        assert_eq!(project["current_phase"], json!(1));
        assert_eq!(project["split"]["gea_fee"], json!(150_000));
        assert_eq!(project["split"]["glab_revenue"], json!(850_000));

        let second = project_for(&app, &lab).await;
        assert_eq!(
            second["reference_number"],
            json!(format!("GL-042-{}-0002", year))
        );
    }

    #[tokio::test]
    async fn test_advance_requires_checklist_and_approval() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-100", "labadmin").await;
        let project = project_for(&app, &lab).await;
        let id = project["id"].as_str().unwrap().to_string();
        let advance_uri = format!("/api/v1/projects/{}/advance", id);

        let (status, body) = send(&app, "POST", &advance_uri, Some(&lab), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], json!("PHASE_BLOCKED"));
        assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));

        complete_checklist(&app, &lab, &id, 1).await;

        // Checklist complete, GEA verdict still pending
        let (status, body) = send(&app, "POST", &advance_uri, Some(&lab), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], json!("PHASE_BLOCKED"));

        let (status, reviewed) = send(
            &app,
            "PUT",
            &format!("/api/v1/projects/{}/review", id),
            Some(&admin),
            Some(json!({ "decision": "approved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["review"]["status"], json!("approved"));

        let (status, body) = send(&app, "POST", &advance_uri, Some(&lab), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["advanced"], json!(true));
        assert_eq!(body["from"], json!(1));
        assert_eq!(body["to"], json!(2));
        assert_eq!(body["project"]["review"]["status"], json!("pending"));

        let (status, detail) = send(
            &app,
            "GET",
            &format!("/api/v1/projects/{}", id),
            Some(&lab),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["current_phase"], json!(2));
        assert!(detail["checklist"]
            .as_array()
            .unwrap()
            .iter()
            .any(|item| item["phase"] == json!(2)));
        assert_eq!(detail["history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_gea_cannot_toggle_operational_checklist() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-200", "labadmin").await;
        let project = project_for(&app, &lab).await;

        let (_, items) = send(
            &app,
            "GET",
            &format!("/api/v1/projects/{}/checklist", project["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
        let item_id = items[0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/checklist/{}/toggle", item_id),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], json!("FORBIDDEN"));
    }

    #[tokio::test]
    async fn test_other_glab_cannot_see_project() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab_a) = glab_with_admin(&app, &admin, "GL-A", "lab-a").await;
        let (_, lab_b) = glab_with_admin(&app, &admin, "GL-B", "lab-b").await;
        let project = project_for(&app, &lab_a).await;
        let id = project["id"].as_str().unwrap();

        let uri = format!("/api/v1/projects/{}", id);
        let (status, _) = send(&app, "GET", &uri, Some(&lab_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/projects/{}/advance", id),
            Some(&lab_b),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, listed) = send(&app, "GET", "/api/v1/projects", Some(&lab_b), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_phase_advance_notifies_glab_admin() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-300", "labadmin").await;
        let project = project_for(&app, &lab).await;
        let id = project["id"].as_str().unwrap().to_string();

        complete_checklist(&app, &lab, &id, 1).await;
        send(
            &app,
            "PUT",
            &format!("/api/v1/projects/{}/review", id),
            Some(&admin),
            Some(json!({ "decision": "approved" })),
        )
        .await;

        // Advanced by GEA so the GLAB admin is not the actor
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/projects/{}/advance", id),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, count) = send(
            &app,
            "GET",
            "/api/v1/notifications/unread-count",
            Some(&lab),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(count["unread"].as_u64().unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_document_upload_checks_slot_type_and_size() {
        let (app, _) = test_app_with(64).await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-400", "labadmin").await;
        let project = project_for(&app, &lab).await;
        let id = project["id"].as_str().unwrap().to_string();

        let (status, doc) =
            upload(&app, &lab, &id, "enrollment_form", "Enrollment Form.pdf", b"%PDF-1.4").await;
        assert_eq!(status, StatusCode::CREATED, "{}", doc);
        assert_eq!(doc["slot_key"], json!("enrollment_form"));
        assert_eq!(doc["phase"], json!(1));
        assert_eq!(doc["status"], json!("pending"));
        assert_eq!(doc["original_filename"], json!("Enrollment_Form.pdf"));

        let (status, body) = upload(&app, &lab, &id, "enrollment_form", "run.exe", b"MZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

        // Slot of a later phase, then no slot at all
        let (status, body) = upload(&app, &lab, &id, "coi_declaration", "a.pdf", b"%PDF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        let (status, body) = upload(&app, &lab, &id, "no_such_slot", "a.pdf", b"%PDF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

        let (status, body) =
            upload(&app, &lab, &id, "readiness_checklist", "big.pdf", &[b'x'; 65]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{}", body);
        assert_eq!(body["code"], json!("PAYLOAD_TOO_LARGE"));

        let (status, listed) = send(
            &app,
            "GET",
            &format!("/api/v1/projects/{}/documents", id),
            Some(&lab),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_glab_cannot_read_client_or_document() {
        let app = test_app().await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab_a) = glab_with_admin(&app, &admin, "GL-C", "lab-c").await;
        let (_, lab_b) = glab_with_admin(&app, &admin, "GL-D", "lab-d").await;
        let project = project_for(&app, &lab_a).await;
        let id = project["id"].as_str().unwrap().to_string();

        let (status, doc) = upload(&app, &lab_a, &id, "enrollment_form", "form.pdf", b"%PDF").await;
        assert_eq!(status, StatusCode::CREATED, "{}", doc);
        let download_uri = format!("/api/v1/documents/{}/download", doc["id"].as_str().unwrap());
        let client_uri = format!("/api/v1/clients/{}", project["client_id"].as_str().unwrap());

        let (status, _) = send(&app, "GET", &client_uri, Some(&lab_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, "GET", &download_uri, Some(&lab_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, client) = send(&app, "GET", &client_uri, Some(&lab_a), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(client["name"], json!("Client Co"));

        let request = Request::builder()
            .uri(&download_uri)
            .header("authorization", format!("Bearer {}", lab_a))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_advance_in_final_phase_is_a_warning() {
        let (app, storage) = test_app_with(1024).await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-500", "labadmin").await;
        let project = project_for(&app, &lab).await;
        let id = project["id"].as_str().unwrap().to_string();
        move_to_phase(&storage, &id, 8).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/projects/{}/advance", id),
            Some(&lab),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["advanced"], json!(false));
        assert_eq!(body["from"], json!(8));
        assert_eq!(body["to"], json!(8));
        assert!(body["warning"].as_str().is_some_and(|w| !w.is_empty()));
        assert_eq!(body["project"]["current_phase"], json!(8));
    }

    #[tokio::test]
    async fn test_engagement_phase_waits_for_initial_payment() {
        let (app, storage) = test_app_with(1024).await;
        let admin = login(&app, "admin", "admin123").await;
        let (_, lab) = glab_with_admin(&app, &admin, "GL-600", "labadmin").await;
        let project = project_for(&app, &lab).await;
        let id = project["id"].as_str().unwrap().to_string();
        let advance_uri = format!("/api/v1/projects/{}/advance", id);

        move_to_phase(&storage, &id, 4).await;
        complete_checklist(&app, &lab, &id, 4).await;
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/projects/{}/review", id),
            Some(&admin),
            Some(json!({ "decision": "approved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", &advance_uri, Some(&lab), None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", body);
        assert_eq!(body["code"], json!("PHASE_BLOCKED"));
        assert_eq!(
            body["details"],
            json!([{ "kind": "payment_missing", "gate": "initial_payment" }])
        );

        let (status, paid) = send(
            &app,
            "POST",
            &format!("/api/v1/projects/{}/payments/initial", id),
            Some(&lab),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", paid);
        assert!(!paid["payments"]["initial_received_at"].is_null());

        let (status, body) = send(&app, "POST", &advance_uri, Some(&lab), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["from"], json!(4));
        assert_eq!(body["to"], json!(5));
    }
}
