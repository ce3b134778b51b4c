//! HTTP-level tests against a mocked backend
//!
//! These tests use wiremock to stand in for the REST backend and check what
//! actually goes over the wire:
//! - Authorization header handling
//! - Session invalidation on 401
//! - Local validation and field translation
//! - Auth flows
//! - Multipart uploads

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use cmms::client::{ApiClient, ClientError};
use cmms::config::ApiConfig;
use cmms::models::{Credentials, TicketStatus};
use cmms::services::maps::{MapImage, NewSiteMap};
use cmms::services::tickets::NewTicket;
use cmms::services::{
    AuthService, ListParams, LocationService, MapService, TicketService, WorkOrderService,
};
use cmms::session::{SessionEvent, SessionStore};

// ============= Helper Functions =============

fn setup(server: &MockServer) -> (ApiClient, Arc<SessionStore>) {
    let session = Arc::new(SessionStore::in_memory());
    let config = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        timeout_secs: 5,
    };
    let api = ApiClient::new(&config, session.clone()).unwrap();
    (api, session)
}

fn ticket_json(id: &str) -> Value {
    json!({
        "id": id,
        "title": "Leak",
        "description": "Water on the floor",
        "status": "open",
        "priority": 2,
        "created_at": "2025-10-24T14:10:00Z",
        "requester": {"id": "u1", "full_name": "Ana Souza", "email": "ana@example.com"},
        "asset": null
    })
}

fn page_json(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results
    })
}

async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

// ============= Outbound hook =============

#[tokio::test]
async fn test_bearer_token_attached_when_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![ticket_json("t1")])))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("tok-1", None).unwrap();

    let page = TicketService::new(api).list(&ListParams::new()).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].status, TicketStatus::Open);
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (api, _session) = setup(&server);
    let page = LocationService::new(api)
        .list(&ListParams::new())
        .await
        .unwrap();
    assert!(page.is_empty());

    let requests = received(&server).await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_list_params_become_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/work-orders/"))
        .and(query_param("page", "2"))
        .and(query_param("status", "in_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 31,
            "next": null,
            "previous": "http://backend/api/work-orders/?page=1",
            "results": [{"id": "w1", "title": "Check motor", "status": "in_progress"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let params = ListParams::new().page(2).filter("status", "in_progress");
    let page = WorkOrderService::new(api).list(&params).await.unwrap();

    assert_eq!(page.count, 31);
    assert_eq!(page.results[0].title, "Check motor");
}

// ============= Inbound hook =============

#[tokio::test]
async fn test_401_clears_session_and_reports_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("stale", Some("refresh")).unwrap();
    let mut events = session.subscribe();

    let auth = AuthService::new(api, session.clone());
    let err = auth.fetch_user_profile().await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(session.load().is_none());
    assert!(session.load_refresh().is_none());
    assert!(session.load_profile().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
}

#[tokio::test]
async fn test_concurrent_401s_clear_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("tok", Some("refresh")).unwrap();
    let mut events = session.subscribe();

    let service = TicketService::new(api);
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.list(&ListParams::new()).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ClientError::SessionExpired)));
    }

    assert!(session.load().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_server_error_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/t1/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("tok", None).unwrap();

    let err = TicketService::new(api).get_by_id("t1").await.unwrap_err();
    match err {
        ClientError::Server { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // Only a 401 touches the session
    assert_eq!(session.load().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_client_error_status_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let err = TicketService::new(api).get_by_id("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, ClientError::Status { .. }));
}

#[tokio::test]
async fn test_backend_down_is_network_error() {
    let session = Arc::new(SessionStore::in_memory());
    // Nothing listens on the discard port
    let api = ApiClient::new(&ApiConfig::new("http://127.0.0.1:9/api"), session).unwrap();

    let err = TicketService::new(api)
        .list(&ListParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}

#[tokio::test]
async fn test_unbuildable_request_is_config_error() {
    let session = Arc::new(SessionStore::in_memory());
    session.save("tok", None).unwrap();
    let api = ApiClient::new(&ApiConfig::new("not a url"), session.clone()).unwrap();

    let err = TicketService::new(api)
        .list(&ListParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestConfig(_)), "{:?}", err);
    assert_eq!(err.status(), None);
    assert_eq!(session.load().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let err = TicketService::new(api)
        .list(&ListParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

// ============= Resource services =============

#[tokio::test]
async fn test_create_ticket_validation_sends_nothing() {
    let server = MockServer::start().await;
    let (api, _) = setup(&server);

    let err = TicketService::new(api)
        .create(&json!({"title": "", "description": "x"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_create_ticket_translates_asset_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tickets/"))
        .and(body_json(json!({"title": "A", "description": "B", "asset_id": "u1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(ticket_json("t9")))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let service = TicketService::new(api);
    let created = service
        .create(&json!({"title": "A", "description": "B", "assetId": "u1"}))
        .await
        .unwrap();
    assert_eq!(created.id, "t9");

    let requests = received(&server).await;
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("assetId").is_none());
}

#[tokio::test]
async fn test_typed_ticket_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tickets/"))
        .and(body_json(json!({"title": "Leak", "description": "Water", "asset_id": "a-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(ticket_json("t2")))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let ticket = NewTicket {
        title: "Leak".to_string(),
        description: "Water".to_string(),
        priority: None,
        asset_id: Some("a-1".to_string()),
    };
    TicketService::new(api).create(&ticket).await.unwrap();
}

#[tokio::test]
async fn test_get_ticket_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/abc/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json("abc")))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let service = TicketService::new(api);

    let err = service.get_by_id("").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let ticket = service.get_by_id("abc").await.unwrap();
    assert_eq!(ticket.id, "abc");
    assert_eq!(received(&server).await.len(), 1);
}

#[tokio::test]
async fn test_update_and_delete_work_order() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/work-orders/w1/"))
        .and(body_json(json!({"status": "on_hold", "assigned_to_id": "u7"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "w1",
            "title": "Check motor",
            "status": "on_hold"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/work-orders/w1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let service = WorkOrderService::new(api);

    let updated = service
        .update("w1", &json!({"status": "on_hold", "assignedToId": "u7"}))
        .await
        .unwrap();
    assert_eq!(updated.status.as_str(), "on_hold");

    service.delete("w1").await.unwrap();
    assert!(service.update("", &json!({})).await.is_err());
}

#[tokio::test]
async fn test_create_location_translates_pin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/"))
        .and(body_json(json!({"name": "Boiler room", "map": "m1", "x_coordinate": 10, "y_coordinate": 20})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "l1",
            "name": "Boiler room",
            "map": "m1",
            "x_coordinate": 10,
            "y_coordinate": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = setup(&server);
    let location = LocationService::new(api)
        .create(&json!({"name": "Boiler room", "mapId": "m1", "xCoordinate": 10, "yCoordinate": 20}))
        .await
        .unwrap();
    assert_eq!(location.x_coordinate, Some(10));
}

#[tokio::test]
async fn test_map_upload_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/maps/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "m1",
            "name": "Plant A",
            "image_url": "http://backend/media/maps/plant-a.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("tok", None).unwrap();

    let map = MapService::new(api)
        .create(NewSiteMap {
            name: "Plant A".to_string(),
            image: MapImage::new("plant-a.png", vec![0x89, b'P', b'N', b'G']),
        })
        .await
        .unwrap();
    assert_eq!(map.id, "m1");

    let requests = received(&server).await;
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"), "{}", content_type);
    assert_eq!(requests[0].headers.get("authorization").unwrap(), "Bearer tok");

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#"name="name""#));
    assert!(body.contains("Plant A"));
    assert!(body.contains(r#"filename="plant-a.png""#));
    assert!(body.contains("image/png"));
}

// ============= Auth =============

#[tokio::test]
async fn test_login_persists_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .and(body_json(json!({"email": "ana@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "acc-1",
            "refresh": "ref-1"
        })))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    let mut events = session.subscribe();
    let auth = AuthService::new(api, session.clone());

    let tokens = auth
        .login(&Credentials::new("ana@example.com", "pw"))
        .await
        .unwrap();

    assert_eq!(tokens.access.as_deref(), Some("acc-1"));
    assert_eq!(session.load().as_deref(), Some("acc-1"));
    assert_eq!(session.load_refresh().as_deref(), Some("ref-1"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn);
}

#[tokio::test]
async fn test_login_without_access_token_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"refresh": "ref-only"})))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    let mut events = session.subscribe();
    let auth = AuthService::new(api, session.clone());

    let tokens = auth.login(&Credentials::new("a@b.c", "pw")).await.unwrap();
    assert!(tokens.access.is_none());
    assert!(session.load().is_none());
    assert!(session.load_refresh().is_none());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    let auth = AuthService::new(api, session.clone());

    let err = auth.login(&Credentials::new("a@b.c", "bad")).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(session.load().is_none());
}

#[tokio::test]
async fn test_login_wrong_password_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("existing", Some("ref")).unwrap();
    let mut events = session.subscribe();
    let auth = AuthService::new(api, session.clone());

    let err = auth.login(&Credentials::new("a@b.c", "wrong")).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials(ref body) if body.contains("No active account")));
    assert!(!err.is_session_expired());
    assert_eq!(err.status(), Some(401));

    assert_eq!(session.load().as_deref(), Some("existing"));
    assert_eq!(session.load_refresh().as_deref(), Some("ref"));
    assert!(events.try_recv().is_err());

    // The credential exchange never carries the stored bearer token
    let requests = received(&server).await;
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_fetch_user_profile_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "ana@example.com",
            "full_name": "Ana Souza",
            "role": "technician"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("acc", None).unwrap();
    let auth = AuthService::new(api, session.clone());

    let profile = auth.fetch_user_profile().await.unwrap();
    assert_eq!(profile.full_name, "Ana Souza");
    assert_eq!(auth.current_user(), Some(profile));
}

#[tokio::test]
async fn test_logout_then_requests_are_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(Vec::new())))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("acc", Some("ref")).unwrap();
    let mut events = session.subscribe();

    let auth = AuthService::new(api.clone(), session.clone());
    auth.logout();
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    assert!(session.session().is_none());

    TicketService::new(api).list(&ListParams::new()).await.unwrap();
    let requests = received(&server).await;
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_remote_posts_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .and(body_json(json!({"refresh": "ref"})))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("acc", Some("ref")).unwrap();

    AuthService::new(api, session.clone()).logout_remote().await;
    assert!(session.session().is_none());
}

#[tokio::test]
async fn test_logout_remote_swallows_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (api, session) = setup(&server);
    session.save("acc", Some("ref")).unwrap();

    AuthService::new(api, session.clone()).logout_remote().await;
    assert!(session.load().is_none());
}
