/// Integration tests for the entity store controller against a mocked API
use crm_client_core::dashboard::DashboardController;
use crm_client_core::errors::AppError;
use crm_client_core::gateway::Gateway;
use crm_client_core::models::EntityKind;
use crm_client_core::render::{
    Cell, DashboardView, MonthGrid, Renderer, Severity, SummaryPage, TableView,
};
use crm_client_core::shell::{ActivationToken, PageController};
use crm_client_core::store::EntityStore;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Captures renderer calls so tests can assert on what the host would show.
#[derive(Default)]
struct RecordingRenderer {
    tables: Mutex<Vec<TableView>>,
    dashboards: Mutex<Vec<DashboardView>>,
    alerts: Mutex<Vec<(Severity, String)>>,
}

impl Renderer for RecordingRenderer {
    fn render_table(&self, table: &TableView) {
        self.tables.lock().unwrap().push(table.clone());
    }
    fn render_month(&self, _: &MonthGrid) {}
    fn render_summary(&self, _: &SummaryPage) {}
    fn render_dashboard(&self, dashboard: &DashboardView) {
        self.dashboards.lock().unwrap().push(dashboard.clone());
    }
    fn notify(&self, severity: Severity, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
    fn session_expired(&self) {}
}

fn gateway_for(server: &MockServer) -> Arc<Gateway> {
    Arc::new(
        Gateway::new(
            server.uri(),
            Some("test-token".to_string()),
            Duration::from_secs(5),
        )
        .expect("client builds"),
    )
}

fn customers_fixture() -> serde_json::Value {
    json!([
        {
            "id": "c1",
            "status": "Active",
            "originalListName": "april-import",
            "originalListLabels": [{"name": "phoneNumber", "label": "Phone"}],
            "customFields": {"phoneNumber": "5551234567"},
        },
        {
            "id": "c2",
            "status": "Active",
            "originalListName": "april-import",
            "originalListLabels": [{"name": "phoneNumber", "label": "Phone"}],
            "customFields": {"phoneNumber": "5559876543"},
        },
        {
            "id": "c3",
            "status": "Closed",
            "originalListName": "walk-ins",
            "originalListLabels": [],
            "customFields": {},
        },
    ])
}

#[tokio::test]
async fn header_derives_one_phone_column_and_missing_cells_render_dash() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(customers_fixture()))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    let view = store.view();
    let phone_columns: Vec<_> = view.columns.iter().filter(|c| c.label == "Phone").collect();
    assert_eq!(phone_columns.len(), 1);
    assert_eq!(view.rows.len(), 3);

    match &view.rows[0].cells[0] {
        Cell::Phone { display, dial } => {
            assert_eq!(display, "********67");
            assert_eq!(dial, "5551234567");
        }
        other => panic!("expected phone cell, got {:?}", other),
    }
    assert_eq!(view.rows[2].cells[0], Cell::Missing);
}

#[tokio::test]
async fn failed_status_update_leaves_cache_and_surfaces_the_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "status": "Active"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/x/notes"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db exploded"})))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(
        EntityKind::Customer,
        gateway_for(&mock_server),
        renderer.clone(),
    );
    store.load().await.unwrap();

    let result = store.update_status("x", "Voice Mail").await;

    assert!(result.is_err());
    assert_eq!(store.cache()[0].status, "Active");
    let alerts = renderer.alerts.lock().unwrap();
    assert!(alerts
        .iter()
        .any(|(sev, msg)| *sev == Severity::Error && msg.contains("db exploded")));
}

#[tokio::test]
async fn successful_status_update_reflects_into_the_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/depositors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "status": "Active"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/depositors/d1/status"))
        .and(body_json(json!({"status": "Deposited"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Depositor, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    store.update_status("d1", "Deposited").await.unwrap();

    assert_eq!(store.cache()[0].status, "Deposited");
}

#[tokio::test]
async fn unknown_status_is_rejected_before_any_network_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "status": "Active"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/x/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    let result = store.update_status("x", "Bogus").await;

    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    assert_eq!(store.cache()[0].status, "Active");
}

#[tokio::test]
async fn status_only_save_omits_the_note_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "status": "Active"}
        ])))
        .mount(&mock_server)
        .await;
    // body_json matches exact JSON: a stray "note" key would not match
    Mock::given(method("POST"))
        .and(path("/customers/x/notes"))
        .and(body_json(json!({"status": "Call Back"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    store.save_note("x", None, "Call Back").await.unwrap();

    assert_eq!(store.cache()[0].status, "Call Back");
}

#[tokio::test]
async fn note_and_status_save_carries_both() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "status": "Active"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/x/notes"))
        .and(body_json(json!({"status": "Active", "note": "asked for a callback"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    store
        .save_note("x", Some("asked for a callback"), "Active")
        .await
        .unwrap();
}

#[tokio::test]
async fn transition_flushes_staged_note_then_reloads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "status": "Active"}
        ])))
        .expect(2) // initial load + post-transition reload
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/x/notes"))
        .and(body_json(json!({"status": "Active", "note": "moving to depositors"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/x/move-to-depositors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    store.stage_note("x", "moving to depositors");
    store.move_to_depositors("x").await.unwrap();
}

#[tokio::test]
async fn transitions_unsupported_by_the_kind_are_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "l1", "status": "New"}
        ])))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Lead, gateway_for(&mock_server), renderer);
    store.load().await.unwrap();

    assert!(matches!(
        store.release("l1").await,
        Err(AppError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn cancelled_activation_discards_the_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(customers_fixture()))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut store = EntityStore::new(EntityKind::Customer, gateway_for(&mock_server), renderer);

    let token = ActivationToken::new();
    token.cancel();
    store.activate(token).await.unwrap();

    assert!(store.cache().is_empty());
}

#[tokio::test]
async fn expired_session_surfaces_from_load() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let gateway = gateway_for(&mock_server);
    let mut store = EntityStore::new(EntityKind::Customer, gateway.clone(), renderer);

    let err = store.load().await.unwrap_err();

    assert!(matches!(err.root(), AppError::SessionExpired));
    assert!(!gateway.has_session());
}

#[tokio::test]
async fn dashboard_renders_api_precomputed_stats() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dashboard/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalLeads": 200,
            "statusBreakdown": {"Qualified": 50, "New": 120},
            "monthlyTrends": [
                {"year": 2024, "month": 3, "count": 80},
                {"year": 2024, "month": 4, "count": 120},
            ],
        })))
        .mount(&mock_server)
        .await;

    let renderer = Arc::new(RecordingRenderer::default());
    let mut dashboard = DashboardController::new(gateway_for(&mock_server), renderer.clone());
    dashboard.load().await.unwrap();

    let dashboards = renderer.dashboards.lock().unwrap();
    let view = dashboards.last().unwrap();
    assert_eq!(view.total_leads, 200);
    assert_eq!(view.qualified_rate, 25);
    assert_eq!(view.growth, Some(50));
    // Fixed badge order, zero-filled for statuses the API did not mention
    assert_eq!(view.badges[0], ("New".to_string(), 120));
    assert_eq!(view.badges[1], ("No Answer".to_string(), 0));
}
