use super::*;
use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde_json::{json, Value};
use shared::{
    domain::Cursor,
    protocol::{BaseQuery, METRIC_REPORT_QUERY},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct GraphqlServerState {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    reply: Arc<Mutex<(u16, Value)>>,
}

async fn handle_graphql(
    State(state): State<GraphqlServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (axum::http::StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().await.push((authorization, body));
    let (status, reply) = state.reply.lock().await.clone();
    (
        axum::http::StatusCode::from_u16(status).expect("status"),
        Json(reply),
    )
}

async fn spawn_graphql_server(status: u16, reply: Value) -> (Url, GraphqlServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = GraphqlServerState {
        requests: Arc::new(Mutex::new(Vec::new())),
        reply: Arc::new(Mutex::new((status, reply))),
    };
    let app = Router::new()
        .route("/graphql", post(handle_graphql))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let endpoint = Url::parse(&format!("http://{addr}/graphql")).expect("endpoint");
    (endpoint, state)
}

fn report_reply() -> Value {
    json!({
        "data": {
            "metricReport": {
                "headers": ["Product Name", "Revenue"],
                "rows": [["Widget", "19.999"]],
                "pageInfo": {
                    "hasNextPage": true,
                    "hasPreviousPage": false,
                    "startCursor": "c1",
                    "endCursor": "c1"
                }
            }
        }
    })
}

fn executor(endpoint: Url) -> GraphqlQueryExecutor {
    GraphqlQueryExecutor::new(endpoint, Some(Duration::from_secs(5))).expect("executor")
}

#[tokio::test]
async fn posts_query_with_bearer_token_and_input_variables() {
    let (endpoint, state) = spawn_graphql_server(200, report_reply()).await;
    let variables = QueryVariables::forward(BaseQuery::default(), 10, Cursor::new("c0"));

    let report = executor(endpoint)
        .execute(METRIC_REPORT_QUERY, &variables, &AccessToken::new("abc"))
        .await
        .expect("report");

    assert_eq!(report.headers, vec!["Product Name", "Revenue"]);
    assert_eq!(report.page_info.end_cursor, Some(Cursor::new("c1")));

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    let (authorization, body) = &requests[0];
    assert_eq!(authorization.as_deref(), Some("Bearer abc"));
    assert_eq!(body["query"], METRIC_REPORT_QUERY);
    assert_eq!(body["variables"]["input"]["first"], 10);
    assert_eq!(body["variables"]["input"]["after"], "c0");
    assert_eq!(body["variables"]["input"]["timeRange"]["relative"], "PREVIOUS_MONTH");
}

#[tokio::test]
async fn graphql_errors_become_query_errors() {
    let reply = json!({
        "data": null,
        "errors": [{ "message": "unknown metric" }, { "message": "bad range" }]
    });
    let (endpoint, _state) = spawn_graphql_server(200, reply).await;

    let err = executor(endpoint)
        .execute(
            METRIC_REPORT_QUERY,
            &QueryVariables::initial(BaseQuery::default(), 10),
            &AccessToken::new("abc"),
        )
        .await
        .expect_err("query error");

    assert_eq!(err, ReportError::Query("unknown metric; bad range".into()));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unauthorized_status_is_an_auth_error() {
    let (endpoint, _state) = spawn_graphql_server(401, json!({})).await;

    let err = executor(endpoint)
        .execute(
            METRIC_REPORT_QUERY,
            &QueryVariables::initial(BaseQuery::default(), 10),
            &AccessToken::new("expired"),
        )
        .await
        .expect_err("auth error");

    assert!(matches!(err, ReportError::Auth(_)));
}

#[tokio::test]
async fn server_error_status_is_a_transport_error() {
    let (endpoint, _state) = spawn_graphql_server(502, json!({})).await;

    let err = executor(endpoint)
        .execute(
            METRIC_REPORT_QUERY,
            &QueryVariables::initial(BaseQuery::default(), 10),
            &AccessToken::new("abc"),
        )
        .await
        .expect_err("transport error");

    assert!(matches!(err, ReportError::Transport(message) if message.contains("502")));
}

#[tokio::test]
async fn missing_metric_report_is_a_transport_error() {
    let (endpoint, _state) = spawn_graphql_server(200, json!({ "data": {} })).await;

    let err = executor(endpoint)
        .execute(
            METRIC_REPORT_QUERY,
            &QueryVariables::initial(BaseQuery::default(), 10),
            &AccessToken::new("abc"),
        )
        .await
        .expect_err("transport error");

    assert!(matches!(err, ReportError::Transport(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let endpoint = Url::parse(&format!("http://{addr}/graphql")).expect("endpoint");

    let err = executor(endpoint)
        .execute(
            METRIC_REPORT_QUERY,
            &QueryVariables::initial(BaseQuery::default(), 10),
            &AccessToken::new("abc"),
        )
        .await
        .expect_err("transport error");

    assert_eq!(err.kind(), shared::error::ErrorKind::Transport);
}

#[tokio::test]
async fn controller_pages_through_graphql_endpoint() {
    let (endpoint, state) = spawn_graphql_server(200, report_reply()).await;
    let controller = crate::PaginationController::new(
        Arc::new(executor(endpoint)),
        AccessToken::new("abc"),
    );

    controller
        .load_initial(&BaseQuery::default())
        .await
        .expect("initial load");
    let view = controller.view_model().await.expect("view model");
    assert_eq!(view.rows[0].get("revenue"), Some("$20.00"));

    *state.reply.lock().await = (503, json!({}));
    let err = controller
        .page_forward(&BaseQuery::default())
        .await
        .expect_err("failure");
    assert!(matches!(err, crate::ControllerError::Fetch(ReportError::Transport(_))));
    assert_eq!(controller.view_model().await, Some(view));

    let requests = state.requests.lock().await;
    assert_eq!(requests[1].1["variables"]["input"]["after"], "c1");
}
