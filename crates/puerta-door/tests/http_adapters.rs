//! Integration tests for the network adapters against fake devices.
//!
//! Each test starts a small axum server on a random local port that speaks
//! just enough of the Hue bridge or Wemo SOAP protocol.
//!
//! Run with: cargo test --package puerta-door --test http_adapters

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use puerta_door::hue::{HueConfig, HueDoor};
use puerta_door::wemo::{WemoConfig, WemoDoor};
use puerta_door::{DoorActuator, DoorController, DoorError, DoorState, signals};
use serde_json::{Value, json};

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    addr
}

// ============================================================================
// Hue bridge
// ============================================================================

#[derive(Clone, Default)]
struct Bridge {
    on: Arc<Mutex<bool>>,
    writes: Arc<Mutex<Vec<bool>>>,
    link_pressed: Arc<Mutex<bool>>,
}

fn unauthorized() -> Json<Value> {
    Json(json!([{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]))
}

async fn get_light(State(bridge): State<Bridge>, Path((user, _id)): Path<(String, String)>) -> Json<Value> {
    if user != "paired" {
        return unauthorized();
    }
    let on = *bridge.on.lock().unwrap();
    Json(json!({"state": {"on": on, "reachable": true}, "name": "Front door"}))
}

async fn put_state(
    State(bridge): State<Bridge>,
    Path((user, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    if user != "paired" {
        return unauthorized();
    }
    let on = body["on"].as_bool().unwrap();
    *bridge.on.lock().unwrap() = on;
    bridge.writes.lock().unwrap().push(on);
    let mut success = serde_json::Map::new();
    success.insert(format!("/lights/{id}/state/on"), json!(on));
    Json(json!([{ "success": success }]))
}

async fn list_lights(Path(user): Path<String>) -> Json<Value> {
    if user != "paired" {
        return unauthorized();
    }
    Json(json!({
        "2": {"name": "Garage", "type": "On/Off plug-in unit", "productname": "Hue smart plug"},
        "1": {"name": "Front door", "type": "On/Off plug-in unit", "productname": "Hue smart plug"},
    }))
}

async fn create_user(State(bridge): State<Bridge>) -> Json<Value> {
    if *bridge.link_pressed.lock().unwrap() {
        Json(json!([{"success": {"username": "paired"}}]))
    } else {
        Json(json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]))
    }
}

async fn fake_bridge() -> (Bridge, SocketAddr) {
    let bridge = Bridge::default();
    let router = Router::new()
        .route("/api", post(create_user))
        .route("/api/{user}/lights", get(list_lights))
        .route("/api/{user}/lights/{id}", get(get_light))
        .route("/api/{user}/lights/{id}/state", put(put_state))
        .with_state(bridge.clone());
    let addr = serve(router).await;
    (bridge, addr)
}

fn hue_door(addr: SocketAddr, username: &str) -> HueDoor {
    HueDoor::new(
        HueConfig::new(addr.to_string())
            .username(username)
            .device("1")
            .hold_ms(10),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hue_open_cycle() {
    let (bridge, addr) = fake_bridge().await;
    let door = hue_door(addr, "paired");

    assert!(!door.is_open().await.unwrap());

    let (signals, watch) = signals::channel();
    door.open(signals).await;

    assert!(watch.started.await.unwrap().is_ok());
    assert!(watch.finished.await.unwrap().is_ok());
    assert_eq!(*bridge.writes.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn test_hue_unpaired_user() {
    let (_bridge, addr) = fake_bridge().await;
    let door = hue_door(addr, "stranger");

    assert!(matches!(
        door.is_open().await,
        Err(DoorError::PairingRequired { .. })
    ));
}

#[tokio::test]
async fn test_hue_pairing() {
    let (bridge, addr) = fake_bridge().await;
    let door = HueDoor::new(HueConfig::new(addr.to_string())).unwrap();

    assert!(matches!(
        door.pair("puerta#test").await,
        Err(DoorError::PairingRequired { .. })
    ));

    *bridge.link_pressed.lock().unwrap() = true;
    assert_eq!(door.pair("puerta#test").await.unwrap(), "paired");
}

#[tokio::test]
async fn test_hue_lists_lights_in_id_order() {
    let (_bridge, addr) = fake_bridge().await;
    let door = hue_door(addr, "paired");

    let lights = door.lights().await.unwrap();
    let ids: Vec<_> = lights.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(lights[0].name, "Front door");
    assert_eq!(lights[0].product, "Hue smart plug");
}

#[tokio::test]
async fn test_hue_through_controller() {
    let (bridge, addr) = fake_bridge().await;
    let controller = DoorController::new(puerta_door::AnyDoor::Hue(hue_door(addr, "paired")));

    controller.request_entry("alice").await.unwrap();

    for _ in 0..200 {
        if controller.state() == DoorState::Idle {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(controller.state(), DoorState::Idle);
    assert!(!*bridge.on.lock().unwrap());
}

// ============================================================================
// Wemo switch
// ============================================================================

#[derive(Clone, Default)]
struct Switch {
    state: Arc<Mutex<String>>,
    actions: Arc<Mutex<Vec<String>>>,
    broken: Arc<Mutex<bool>>,
}

async fn basic_event(State(switch): State<Switch>, headers: HeaderMap, body: String) -> (StatusCode, String) {
    if *switch.broken.lock().unwrap() {
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }

    let action = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    switch.actions.lock().unwrap().push(action.clone());

    if action.ends_with("#SetBinaryState\"") {
        let value = if body.contains("<BinaryState>1</BinaryState>") { "1" } else { "0" };
        *switch.state.lock().unwrap() = value.to_string();
    }

    let state = switch.state.lock().unwrap().clone();
    (
        StatusCode::OK,
        format!("<s:Envelope><s:Body><u:Response><BinaryState>{state}</BinaryState></u:Response></s:Body></s:Envelope>"),
    )
}

async fn fake_switch(initial: &str) -> (Switch, SocketAddr) {
    let switch = Switch::default();
    *switch.state.lock().unwrap() = initial.to_string();
    let router = Router::new()
        .route("/upnp/control/basicevent1", post(basic_event))
        .with_state(switch.clone());
    let addr = serve(router).await;
    (switch, addr)
}

fn wemo_door(addr: SocketAddr) -> WemoDoor {
    WemoDoor::new(WemoConfig::new(addr.ip().to_string()).port(addr.port()).hold_ms(10)).unwrap()
}

#[tokio::test]
async fn test_wemo_open_cycle() {
    let (switch, addr) = fake_switch("0").await;
    let door = wemo_door(addr);

    assert!(!door.is_open().await.unwrap());

    let (signals, watch) = signals::channel();
    door.open(signals).await;

    assert!(watch.started.await.unwrap().is_ok());
    assert!(watch.finished.await.unwrap().is_ok());

    let actions = switch.actions.lock().unwrap().clone();
    assert_eq!(
        actions,
        vec![
            "\"urn:Belkin:service:basicevent:1#GetBinaryState\"",
            "\"urn:Belkin:service:basicevent:1#SetBinaryState\"",
            "\"urn:Belkin:service:basicevent:1#SetBinaryState\"",
        ]
    );
    assert_eq!(*switch.state.lock().unwrap(), "0");
}

#[tokio::test]
async fn test_wemo_reports_open() {
    let (_switch, addr) = fake_switch("1").await;
    assert!(wemo_door(addr).is_open().await.unwrap());
}

#[tokio::test]
async fn test_wemo_unknown_state_is_protocol_error() {
    let (_switch, addr) = fake_switch("x").await;
    assert!(matches!(
        wemo_door(addr).is_open().await,
        Err(DoorError::Protocol { .. })
    ));
}

#[tokio::test]
async fn test_wemo_server_error_is_communication_error() {
    let (switch, addr) = fake_switch("0").await;
    *switch.broken.lock().unwrap() = true;

    let (signals, watch) = signals::channel();
    wemo_door(addr).open(signals).await;

    assert!(matches!(
        watch.started.await.unwrap(),
        Err(DoorError::Communication { .. })
    ));
}
