//! Round-trips the control plane's three HTTP endpoints over a real
//! socket, exercising the path a planner client actually takes.

use probeplan::probe::control_plane::ResetLedger;
use probeplan::probe::runtime::ProbeRuntime;
use std::sync::Arc;
use std::thread;

fn spawn_server() -> (String, Arc<ProbeRuntime>) {
    let runtime = Arc::new(ProbeRuntime::new());
    let ledger = Arc::new(ResetLedger::new());
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server_runtime = runtime.clone();
    thread::spawn(move || {
        let _ = probeplan::probe::control_plane::serve("127.0.0.1", port, server_runtime, ledger);
    });
    thread::sleep(std::time::Duration::from_millis(150));
    (format!("http://127.0.0.1:{port}"), runtime)
}

#[tokio::test]
async fn status_reflects_hits_recorded_by_the_runtime() {
    let (base_url, runtime) = spawn_server();
    runtime.hits().hit_by_class_method("com.example.Widget", "compute");

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base_url}/__probe/status"))
        .query(&[("key", "com.example.Widget#compute")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["hitCount"], 1);
}

#[tokio::test]
async fn reset_zeroes_the_key_and_records_an_epoch() {
    let (base_url, runtime) = spawn_server();
    runtime.hits().hit_by_class_method("com.example.Widget", "compute");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/__probe/reset"))
        .json(&serde_json::json!({"key": "com.example.Widget#compute"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(runtime.hits().get_count("com.example.Widget#compute"), 0);
}

#[tokio::test]
async fn actuate_then_status_shows_the_new_mode() {
    let (base_url, _runtime) = spawn_server();
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/__probe/actuate"))
        .json(&serde_json::json!({
            "mode": "actuate",
            "targetKey": "com.example.Widget#compute:10",
            "returnBoolean": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["mode"], "actuate");
    assert_eq!(body["actuateTargetKey"], "com.example.Widget#compute:10");
}

#[tokio::test]
async fn status_without_a_key_is_rejected() {
    let (base_url, _runtime) = spawn_server();
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base_url}/__probe/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
