use axum::http::StatusCode;
use salesgrid::api;
use salesgrid::config::Config;
use salesgrid::datasource::{DataSourceError, MockMarketplace, MockSheetSource};
use salesgrid::domain::{Order, RowSchema};
use salesgrid::OrdersPipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn order(id: i64, item_id: &str, price: i64) -> Order {
    serde_json::from_value(json!({
        "id": id,
        "status": "paid",
        "date_created": "2024-05-01T12:00:00.000-03:00",
        "total_amount": price,
        "order_items": [{
            "item": {"id": item_id, "title": format!("Item {}", item_id)},
            "quantity": 1,
            "unit_price": price,
            "full_unit_price": price,
            "sale_fee": 100
        }]
    }))
    .unwrap()
}

fn cost_row(id: &str, cost: &str) -> Vec<String> {
    let mut row = vec![id.to_string()];
    row.extend(std::iter::repeat(String::new()).take(11));
    row.push(cost.to_string());
    row
}

fn setup_app(token: Option<&str>) -> axum::Router {
    let market = MockMarketplace::new().with_orders(vec![
        order(2000001, "MLA1", 40000),
        order(2000002, "MLA9", 15000),
    ]);
    let rows = vec![
        cost_row("MLA1", "$ 20.000"),
        cost_row("MLA2", "1.500,25"),
        cost_row("MLA3", "abc"),
    ];
    let mut with_header = vec![vec!["ITEM_ID".to_string()]];
    with_header.extend(rows.clone());
    let sheet = MockSheetSource::new()
        .with_range("Comparador!A2:M", rows)
        .with_range("Comparador!A1:M50", with_header);
    let config = Config {
        meli_access_token: token.map(str::to_string),
        ..Default::default()
    };
    let pipeline = OrdersPipeline::new(Arc::new(market), config).with_cost_sheet(Arc::new(sheet));
    api::create_router(api::AppState::new(Arc::new(pipeline)))
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body)
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health_and_ready() {
    let (status, body) = request(setup_app(Some("APP_USR-1")), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "ok");

    let (status, _) = request(setup_app(Some("APP_USR-1")), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(setup_app(None), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&body)["status"], "unconfigured");
}

#[tokio::test]
async fn test_orders_response_shape() {
    let (status, body) = request(
        setup_app(Some("APP_USR-1")),
        "/orders?from=2024-05-01&to=2024-05-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    assert_eq!(body["from"], "2024-05-01");
    assert_eq!(body["to"], "2024-05-01");
    assert_eq!(body["mode"], "created");
    assert_eq!(body["count"], 2);

    let headers: Vec<String> = serde_json::from_value(body["headers"].clone()).unwrap();
    assert_eq!(headers, RowSchema::new(false).headers());

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].as_array().unwrap().len(), headers.len());
    assert_eq!(rows[0][0], 2000001);
    assert_eq!(rows[0][1], "2024-05-01 12:00:00");
}

#[tokio::test]
async fn test_orders_csv_download() {
    let (status, body) = request(
        setup_app(Some("APP_USR-1")),
        "/orders.csv?from=2024-05-01&to=2024-05-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with('\u{feff}'));
    let lines: Vec<&str> = text.trim_start_matches('\u{feff}').split("\r\n").collect();
    assert!(lines[0].starts_with('"'));
    assert!(lines[1].starts_with("\"=\"\"2000001\"\"\""));
    assert_eq!(lines.iter().filter(|l| !l.is_empty()).count(), 3);
}

#[tokio::test]
async fn test_orders_csv_headers() {
    let app = setup_app(Some("APP_USR-1"));
    let req = axum::http::Request::builder()
        .uri("/orders.csv?from=2024-05-01&to=2024-05-03")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let content_type = resp.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/csv"));
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert_eq!(
        disposition,
        "attachment; filename=\"orders_2024-05-01_2024-05-03.csv\""
    );
}

#[tokio::test]
async fn test_orders_rejects_bad_queries() {
    let (status, body) = request(
        setup_app(Some("APP_USR-1")),
        "/orders?from=2024-05-02&to=2024-05-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());

    let (status, _) = request(setup_app(Some("APP_USR-1")), "/orders?mode=closed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_query_params_get_a_json_error() {
    for uri in [
        "/orders?pageSize=abc",
        "/orders.csv?includeShipment=maybe",
        "/debug/missing_costs?maxPages=-1",
    ] {
        let (status, body) = request(setup_app(Some("APP_USR-1")), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(json_body(&body)["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn test_orders_without_token_is_a_server_error() {
    let (status, body) = request(setup_app(None), "/orders?from=2024-05-01&to=2024-05-01").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .contains("access token"));
}

#[tokio::test]
async fn test_debug_costs() {
    let (status, body) = request(setup_app(Some("APP_USR-1")), "/debug/costs").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["sample"][0][0], "MLA1");
    assert_eq!(body["sample"][1][1], 1500.25);

    let (status, body) = request(setup_app(Some("APP_USR-1")), "/debug/costs/MLA1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["cost"], 20000.0);

    let (status, _) = request(setup_app(Some("APP_USR-1")), "/debug/costs/MLA3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_missing_costs() {
    let (status, body) = request(
        setup_app(Some("APP_USR-1")),
        "/debug/missing_costs?from=2024-05-01&to=2024-05-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["missingCount"], 1);
    assert_eq!(body["missing"][0]["id"], "MLA9");
    assert_eq!(body["missing"][0]["title"], "Item MLA9");
}

#[tokio::test]
async fn test_debug_costs_raw() {
    let (status, body) = request(setup_app(Some("APP_USR-1")), "/debug/costs_raw").await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["sheet"], "Comparador");
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["row"], 1);
    assert_eq!(rows[0]["A"], "ITEM_ID");
    assert!(rows[0]["M"].is_null());
    assert_eq!(rows[0]["parsed"]["num"], 0.0);
    assert_eq!(rows[1]["A"], "MLA1");
    assert_eq!(rows[1]["M"], "$ 20.000");
    assert_eq!(rows[1]["parsed"]["cleaned"], "20000");
    assert_eq!(rows[1]["parsed"]["num"], 20000.0);
    assert_eq!(rows[3]["parsed"]["raw"], "abc");
    assert_eq!(rows[3]["parsed"]["num"], 0.0);
}

fn taxed_order(id: i64) -> Order {
    serde_json::from_value(json!({
        "id": id,
        "status": "paid",
        "date_created": "2024-05-01T12:00:00.000-03:00",
        "taxes": {"amount": 150, "currency_id": "ARS"},
        "order_items": [],
        "payments": [{
            "id": 77,
            "status": "approved",
            "taxes_amount": "42.5",
            "fee_details": [{"type": "mercadopago_fee", "amount": 300}]
        }]
    }))
    .unwrap()
}

fn taxes_app(market: MockMarketplace) -> axum::Router {
    let config = Config {
        meli_access_token: Some("APP_USR-1".to_string()),
        ..Default::default()
    };
    let pipeline = OrdersPipeline::new(Arc::new(market), config);
    api::create_router(api::AppState::new(Arc::new(pipeline)))
}

#[tokio::test]
async fn test_debug_taxes() {
    let market = MockMarketplace::new()
        .with_order(taxed_order(3000001))
        .with_payments_error(
            3000001,
            DataSourceError::HttpError {
                status: 403,
                message: "forbidden".to_string(),
            },
        );
    let (status, body) = request(taxes_app(market), "/debug/taxes?id=3000001").await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["order_id"], 3000001);
    let taxes = &body["orderTaxes"];
    assert_eq!(taxes["order_taxes_amount"], 150.0);
    assert_eq!(taxes["order_taxes_obj"]["currency_id"], "ARS");
    assert_eq!(taxes["payments_taxes_amounts"], json!([42.5]));
    assert_eq!(taxes["payments_taxes_raw"][0]["id"], 77);
    assert_eq!(
        taxes["payments_taxes_raw"][0]["fee_details"][0]["type"],
        "mercadopago_fee"
    );
    assert_eq!(body["samplePayment"]["id"], 77);
}

#[tokio::test]
async fn test_debug_taxes_rejects_missing_or_unknown_ids() {
    let market = || MockMarketplace::new().with_order(taxed_order(3000001));

    let (status, body) = request(taxes_app(market()), "/debug/taxes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());

    let (status, _) = request(taxes_app(market()), "/debug/taxes?id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(taxes_app(market()), "/debug/taxes?id=42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
