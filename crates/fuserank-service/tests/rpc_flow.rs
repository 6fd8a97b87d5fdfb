use fuserank_engine::{ModelSpec, RerankConfig};
use fuserank_service::RerankServer;
use fuserank_service::protocol::RpcRequest;
use serde_json::{Value, json};

fn test_server() -> RerankServer {
    let mut config = RerankConfig::default();
    config.models = vec![ModelSpec::new("lexical-bm25"), ModelSpec::new("lexical-overlap")];
    config.top_n = 10;
    config.final_k = 2;
    RerankServer::with_config(config).expect("server")
}

fn rerank_request(id: u64, query: &str, contents: &[&str]) -> RpcRequest {
    RpcRequest {
        id: Some(json!(id)),
        method: "rerank".to_string(),
        params: json!({
            "query": query,
            "candidates": contents
                .iter()
                .enumerate()
                .map(|(idx, content)| json!({
                    "id": format!("doc-{idx}"),
                    "content": content,
                    "rank": idx + 1,
                }))
                .collect::<Vec<_>>(),
        }),
    }
}

#[test]
fn rerank_flow_returns_ranked_results() {
    let server = test_server();
    let response = server.handle_request(rerank_request(
        1,
        "parallel scoring cache",
        &[
            "gardening tips for early spring",
            "the parallel scoring cache fuses model scores",
            "parallel scoring without the overhead",
        ],
    ));

    assert_eq!(response["id"], 1);
    let results = response["result"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "doc-1");
    assert_eq!(results[0]["rerank_rank"], 1);
    assert_eq!(results[1]["rerank_rank"], 2);
    assert_eq!(response["result"]["count"], 2);
}

#[test]
fn repeated_request_is_served_identically_from_cache() {
    let server = test_server();
    let request = || {
        rerank_request(
            7,
            "reciprocal rank fusion",
            &["rank fusion overview", "fusion of reciprocal ranks", "unrelated"],
        )
    };
    let first = server.handle_request(request());
    let second = server.handle_request(request());
    assert_eq!(first, second);

    let stats = server.handle_request(RpcRequest {
        id: Some(json!(8)),
        method: "stats".to_string(),
        params: Value::Null,
    });
    let cache = &stats["result"]["cache"];
    assert_eq!(cache["backend"], "volatile");
    assert_eq!(cache["hits"], 1);
    assert_eq!(cache["misses"], 1);
}

#[test]
fn request_config_overrides_but_inherits_models() {
    let server = test_server();
    let response = server.handle_request(RpcRequest {
        id: Some(json!(2)),
        method: "rerank".to_string(),
        params: json!({
            "query": "alpha beta",
            "candidates": [
                {"id": "a", "content": "alpha beta gamma"},
                {"id": "b", "content": "alpha alone"},
                {"id": "c", "content": "nothing relevant"},
            ],
            "config": {"final_k": 1, "top_n": 5},
        }),
    });

    let results = response["result"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "a");
}

#[test]
fn invalid_request_config_is_an_error() {
    let server = test_server();
    let response = server.handle_request(RpcRequest {
        id: Some(json!(3)),
        method: "rerank".to_string(),
        params: json!({
            "query": "q",
            "candidates": [{"id": "a", "content": "text"}],
            "config": {"final_k": 10, "top_n": 5},
        }),
    });
    assert_eq!(response["error"]["code"], -32603);
}

#[test]
fn missing_query_is_invalid_params() {
    let server = test_server();
    let response = server.handle_request(RpcRequest {
        id: Some(json!(4)),
        method: "rerank".to_string(),
        params: json!({"candidates": []}),
    });
    assert_eq!(response["error"]["code"], -32602);
}

#[test]
fn unknown_method_is_rejected() {
    let server = test_server();
    let response = server.handle_request(RpcRequest {
        id: Some(json!(5)),
        method: "retrieve".to_string(),
        params: Value::Null,
    });
    assert_eq!(response["error"]["code"], -32601);
}

#[test]
fn stats_reports_request_metrics() {
    let server = test_server();
    let _ = server.handle_request(rerank_request(1, "query terms", &["query terms here"]));

    let stats = server.handle_request(RpcRequest {
        id: Some(json!(6)),
        method: "stats".to_string(),
        params: Value::Null,
    });
    assert_eq!(stats["result"]["metrics"]["rerank"]["ok"], 1);
    assert_eq!(stats["result"]["models"][0], "lexical-bm25");
    assert!(stats["result"]["uptime_ms"].as_u64().is_some());
}
