use serde_json::json;
use std::time::Duration;

use verifyglobal::client::{
    ClientError, ConnectionStatus, ConnectivityReport, CredentialStore, FallbackPolicy,
    RequestExecutor, StatusMonitor, TransportRoute, TransportRouter, VerifyGlobalService,
};
use verifyglobal::upstream::ApiVersion;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, header, method, path, query_param},
};

fn service_for(server: &MockServer, store: CredentialStore) -> VerifyGlobalService {
    let router = TransportRouter::new(
        format!("{}/api/saltedge", server.uri()),
        format!("{}/relay-a", server.uri()),
        format!("{}/relay-b", server.uri()),
    );
    VerifyGlobalService::new(
        RequestExecutor::new(router, store, FallbackPolicy::default()),
        ApiVersion::V6,
    )
}

#[tokio::test]
async fn demo_mode_connectivity_is_obstructed() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store.set_demo_mode(true);
    let service = service_for(&server, store);

    assert_eq!(service.connection_status(), ConnectionStatus::Shadow);
    assert_eq!(service.test_connection().await, ConnectivityReport::Obstructed);
}

#[tokio::test]
async fn connectivity_with_real_data_is_verified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, CredentialStore::in_memory());
    let report = service.test_connection().await;

    assert_eq!(
        report,
        ConnectivityReport::Verified {
            route: TransportRoute::Internal
        }
    );
    assert!(report.is_verified());
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({"outcome": "verified", "route": "internal"})
    );
}

#[tokio::test]
async fn connectivity_reports_upstream_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/relay-a/customers"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"class": "WrongClientToken", "message": "bad key"}})),
        )
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store.set_active_route(TransportRoute::RelayA);
    store.set_credentials("app", "secret");
    let service = service_for(&server, store);

    assert_eq!(
        service.test_connection().await,
        ConnectivityReport::Rejected {
            status: 401,
            message: "bad key".to_string()
        }
    );
}

#[tokio::test]
async fn relay_without_credentials_is_misconfigured() {
    let server = MockServer::start().await;
    let store = CredentialStore::in_memory();
    store.set_active_route(TransportRoute::RelayB);
    let service = service_for(&server, store);

    assert!(matches!(
        service.test_connection().await,
        ConnectivityReport::Misconfigured { .. }
    ));
}

#[tokio::test]
async fn connectivity_does_not_pass_on_fallback_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>404</html>"))
        .mount(&server)
        .await;

    let service = service_for(&server, CredentialStore::in_memory());

    assert!(matches!(
        service.test_connection().await,
        ConnectivityReport::Unreachable { .. }
    ));
    // Ordinary calls on the same service still fall back.
    let customers = service.get_customers().await.unwrap();
    assert_eq!(customers["data"][0]["id"], "demo_user_v6");
}

#[tokio::test]
async fn relay_connect_session_uses_upstream_path_and_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/relay-a/connections/connect"))
        .and(header("App-id", "app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"connect_url": "https://connect", "expires_at": "2026-01-01T00:00:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store.set_active_route(TransportRoute::RelayA);
    store.set_credentials("app", "secret");
    let service = service_for(&server, store);

    let body = service
        .create_connect_session("c1", Some("https://dash"))
        .await
        .unwrap();
    assert_eq!(body["data"]["connect_url"], "https://connect");

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["data"]["customer_id"], "c1");
    assert_eq!(sent["data"]["attempt"]["return_to"], "https://dash");
}

#[tokio::test]
async fn internal_connect_session_sends_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saltedge/connect"))
        .and(wiremock::matchers::body_json(
            json!({"customer_id": "c1", "return_to": "https://dash"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, CredentialStore::in_memory());
    service
        .create_connect_session("c1", Some("https://dash"))
        .await
        .unwrap();
}

#[tokio::test]
async fn relay_status_is_built_locally() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store.set_active_route(TransportRoute::RelayB);
    store.set_credentials("app-id-1234567890", "secret-abcdefghij");
    let service = service_for(&server, store);

    let status = service.get_status().await.unwrap();
    assert_eq!(status["mode"], "proxy");
    assert_eq!(status["app_id"], true);
    assert_eq!(status["app_id_masked"], "app-...7890");
    assert!(!status.to_string().contains("abcdefghij"));
}

#[tokio::test]
async fn blank_arguments_fail_before_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let service = service_for(&server, CredentialStore::in_memory());

    assert!(matches!(
        service.create_customer("  ").await,
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        service.create_connect_session("", None).await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn select_customer_remembers_listed_customer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "c1", "identifier": "first@example.com"},
                {"id": "c2", "identifier": "second@example.com"}
            ]
        })))
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let service = service_for(&server, store.clone());

    let selected = service.select_customer("c2").await.unwrap().unwrap();
    assert_eq!(selected.identifier, "second@example.com");
    assert_eq!(store.active_customer().map(|c| c.id).as_deref(), Some("c2"));

    assert!(service.select_customer("missing").await.unwrap().is_none());
    assert_eq!(store.active_customer().map(|c| c.id).as_deref(), Some("c2"));
}

#[tokio::test]
async fn select_customer_accepts_entries_with_both_id_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "c7", "customer_id": "c7", "identifier": "both@example.com"}
            ]
        })))
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let service = service_for(&server, store.clone());

    let selected = service.select_customer("c7").await.unwrap();
    assert_eq!(selected.map(|c| c.identifier).as_deref(), Some("both@example.com"));
    assert_eq!(store.active_customer().map(|c| c.id).as_deref(), Some("c7"));
}

#[tokio::test]
async fn failed_connectivity_test_shows_error_status_until_a_test_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad key"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/saltedge/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let service = service_for(&server, store.clone());
    let monitor = StatusMonitor::new(store.clone(), Duration::from_millis(50));
    assert_eq!(monitor.current(), ConnectionStatus::Live);

    let report = service.test_connection().await;
    assert!(report.is_failure());
    assert_eq!(service.connection_status(), ConnectionStatus::Error);
    assert_eq!(monitor.refresh(), ConnectionStatus::Error);

    let report = service.test_connection().await;
    assert!(report.is_verified());
    assert_eq!(service.connection_status(), ConnectionStatus::Live);
    assert_eq!(monitor.refresh(), ConnectionStatus::Live);
}

#[tokio::test]
async fn demo_mode_result_does_not_flag_an_error() {
    let server = MockServer::start().await;
    let store = CredentialStore::in_memory();
    store.set_demo_mode(true);
    let service = service_for(&server, store);

    assert_eq!(service.test_connection().await, ConnectivityReport::Obstructed);
    assert_eq!(service.connection_status(), ConnectionStatus::Shadow);
}
