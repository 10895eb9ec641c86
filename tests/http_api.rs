//! End-to-end tests over the HTTP surface: router dispatch, drain-once
//! semantics, not-ready degradation, and fault containment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;

use sim_metrics::collector::Collector;
use sim_metrics::config::Config;
use sim_metrics::handlers::AppState;
use sim_metrics::invoke::{update_channel, UpdateHandle};
use sim_metrics::record::Event;
use sim_metrics::server::{create_router, MetricsServer};
use sim_metrics::snapshot::{
    FactionSnapshot, FloatingObjectSnapshot, GridSize, GridSnapshot, LoadGauges, Position,
    ProcessCounters, ServerGauges, SnapshotProvider, VoxelSnapshot,
};

/// Host stub: toggleable readiness, optional update loop, optional faulting
/// grid read.
struct StubHost {
    ready: AtomicBool,
    panic_in_grids: bool,
    update_loop: Option<UpdateHandle>,
}

impl StubHost {
    fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
            panic_in_grids: false,
            update_loop: None,
        }
    }

    fn not_ready() -> Self {
        Self {
            ready: AtomicBool::new(false),
            panic_in_grids: false,
            update_loop: None,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl SnapshotProvider for StubHost {
    fn server_gauges(&self) -> Option<ServerGauges> {
        self.is_ready().then(|| ServerGauges {
            version: "1.203.630".into(),
            server_name: "Test Server".into(),
            world_name: "Test World".into(),
            sim_speed: 0.98,
            cpu_load: 31.5,
            total_time_secs: 3600,
            players: 4,
            max_players: 16,
            used_pcu: 12_000,
            max_pcu: 300_000,
            mod_count: 3,
            plugin_count: 2,
        })
    }

    fn process_counters(&self) -> Option<ProcessCounters> {
        self.is_ready().then(|| ProcessCounters {
            private_memory_size: 100,
            paged_memory_size: 200,
            virtual_memory_size: 300,
            working_set_size: 400,
            gen0_collections: 10,
            gen1_collections: 5,
            gen2_collections: 1,
        })
    }

    fn load_gauges(&self) -> Option<LoadGauges> {
        self.is_ready().then(LoadGauges::default)
    }

    fn grids(&self) -> Vec<GridSnapshot> {
        if self.panic_in_grids {
            panic!("entity list iterator invalidated");
        }
        if !self.is_ready() {
            return Vec::new();
        }
        vec![GridSnapshot {
            display_name: "Test Grid".into(),
            entity_id: 1,
            grid_size: GridSize::Large,
            blocks_count: 10,
            mass: 1000.0,
            position: Position { x: 1.0, y: 2.0, z: 3.0 },
            linear_speed: 0.0,
            distance_to_player: 42.5,
            owner_id: 9,
            owner_name: "owner".into(),
            is_powered: true,
            is_concealed: true,
            pcu: 100,
            conveyor_inventory_blocks: 3,
            conveyor_endpoint_blocks: 5,
        }]
    }

    fn asteroids(&self) -> Vec<VoxelSnapshot> {
        Vec::new()
    }

    fn planets(&self) -> Vec<VoxelSnapshot> {
        Vec::new()
    }

    fn floating_objects(&self) -> Vec<FloatingObjectSnapshot> {
        Vec::new()
    }

    fn factions(&self) -> Vec<FactionSnapshot> {
        if !self.is_ready() {
            return Vec::new();
        }
        vec![FactionSnapshot {
            faction_id: 7,
            tag: "TST".into(),
            name: "Testers".into(),
            member_count: 4,
            is_npc: false,
        }]
    }

    fn update_loop(&self) -> Option<UpdateHandle> {
        self.update_loop.clone()
    }
}

struct Fixture {
    router: Router,
    collector: Collector,
}

fn fixture(host: StubHost) -> Fixture {
    let provider: Arc<dyn SnapshotProvider> = Arc::new(host);
    let collector = Collector::attach(provider.clone(), &Config::default());
    let state = AppState {
        provider,
        core: collector.core(),
        sync_read_timeout: Duration::from_millis(500),
    };
    Fixture {
        router: create_router(state),
        collector,
    }
}

async fn get_json(router: &Router, path: &str) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn server_before_ready_is_zeroed_not_an_error() {
    let mut fx = fixture(StubHost::not_ready());

    let body = get_json(&fx.router, "/metrics/v1/server").await;
    assert_eq!(body["IsReady"], false);
    assert_eq!(body["Players"], 0);
    assert_eq!(body["UsedPCU"], 0);
    assert_eq!(body["ServerName"], "");
    assert_eq!(body["SaveDuration"], 0);

    fx.collector.detach().await;
}

#[tokio::test]
async fn server_when_ready_reports_gauges() {
    let mut fx = fixture(StubHost::ready());

    let body = get_json(&fx.router, "/metrics/v1/server").await;
    assert_eq!(body["IsReady"], true);
    assert_eq!(body["ServerName"], "Test Server");
    assert_eq!(body["Players"], 4);
    assert_eq!(body["UsedPCU"], 12000);
    assert_eq!(body["ModCount"], 3);

    fx.collector.detach().await;
}

#[tokio::test]
async fn events_drain_once() {
    let mut fx = fixture(StubHost::ready());
    let core = fx.collector.core();

    core.events.push_front(Event::new(
        "session",
        "Player 1 joined",
        ["player", "joined"],
    ));
    core.events.push_front(Event::new("gc", "gc pass", ["gc"]));

    let body = get_json(&fx.router, "/metrics/v1/events").await;
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    for event in events {
        assert!(event["SecondsInThePast"].as_f64().unwrap() >= 0.0);
    }
    // Most recent first.
    assert_eq!(events[0]["Type"], "gc");
    assert_eq!(events[1]["Type"], "session");
    assert_eq!(events[1]["Tags"], serde_json::json!(["player", "joined"]));

    // Drained: an immediate second scrape sees nothing.
    let body = get_json(&fx.router, "/metrics/v1/events").await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    fx.collector.detach().await;
}

#[tokio::test]
async fn save_duration_accumulates_across_saves() {
    let mut fx = fixture(StubHost::ready());
    let hooks = fx.collector.hooks();

    for _ in 0..2 {
        hooks.save_started();
        tokio::time::sleep(Duration::from_millis(50)).await;
        hooks.save_finished();
    }

    let body = get_json(&fx.router, "/metrics/v1/server").await;
    assert!(body["SaveDuration"].as_u64().unwrap() >= 100);

    // Reads do not reset the counter.
    let body = get_json(&fx.router, "/metrics/v1/server").await;
    assert!(body["SaveDuration"].as_u64().unwrap() >= 100);

    fx.collector.detach().await;
}

#[tokio::test]
async fn concurrent_scrapes_receive_disjoint_events() {
    let mut fx = fixture(StubHost::ready());
    let core = fx.collector.core();

    const TOTAL: usize = 2_000;
    for i in 0..TOTAL {
        core.events
            .push_front(Event::new("session", format!("event {i}"), ["test"]));
    }

    let (a, b) = tokio::join!(
        get_json(&fx.router, "/metrics/v1/events"),
        get_json(&fx.router, "/metrics/v1/events"),
    );
    let a = a.as_array().unwrap();
    let b = b.as_array().unwrap();
    assert_eq!(a.len() + b.len(), TOTAL);

    let mut texts: Vec<&str> = a
        .iter()
        .chain(b.iter())
        .map(|e| e["Text"].as_str().unwrap())
        .collect();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), TOTAL);

    fx.collector.detach().await;
}

#[tokio::test]
async fn players_endpoint_reports_lifecycle_kinds() {
    let mut fx = fixture(StubHost::ready());
    let hooks = fx.collector.hooks();

    hooks.player_joined(11);
    hooks.player_banned(11);
    hooks.identity_created(12);

    let body = get_json(&fx.router, "/metrics/v1/players").await;
    let players = body.as_array().unwrap();
    assert_eq!(players.len(), 3);
    assert_eq!(players[0]["Kind"], "new-identity");
    assert_eq!(players[1]["Kind"], "banned");
    assert_eq!(players[2]["Kind"], "joined");
    assert_eq!(players[2]["PlayerId"], 11);

    fx.collector.detach().await;
}

#[tokio::test]
async fn grids_use_the_host_update_loop() {
    let (queue, handle) = update_channel();
    let mut host = StubHost::ready();
    host.update_loop = Some(handle);

    let pump = std::thread::spawn(move || {
        for _ in 0..400 {
            queue.run_pending();
            std::thread::sleep(Duration::from_millis(5));
        }
    });

    let mut fx = fixture(host);
    let body = get_json(&fx.router, "/metrics/v1/session/grids").await;
    let grids = body.as_array().unwrap();
    assert_eq!(grids.len(), 1);
    assert_eq!(grids[0]["DisplayName"], "Test Grid");
    assert_eq!(grids[0]["IsConcealed"], true);
    assert_eq!(grids[0]["Position"]["X"], 1.0);
    assert_eq!(grids[0]["DistanceToPlayer"], 42.5);
    assert_eq!(grids[0]["ConveyorEndpointBlocks"], 5);

    pump.join().unwrap();
    fx.collector.detach().await;
}

#[tokio::test]
async fn grids_degrade_to_empty_when_loop_never_answers() {
    let (queue, handle) = update_channel();
    let mut host = StubHost::ready();
    host.update_loop = Some(handle);
    // Queue exists but nothing pumps it; keep it alive so the read times
    // out instead of failing fast.
    let _queue = queue;

    let collector_host: Arc<dyn SnapshotProvider> = Arc::new(host);
    let mut collector = Collector::attach(collector_host.clone(), &Config::default());
    let state = AppState {
        provider: collector_host,
        core: collector.core(),
        sync_read_timeout: Duration::from_millis(50),
    };
    let router = create_router(state);

    let body = get_json(&router, "/metrics/v1/session/grids").await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    collector.detach().await;
}

#[tokio::test]
async fn faulting_handler_yields_empty_body_and_server_survives() {
    let mut host = StubHost::ready();
    host.panic_in_grids = true;
    let mut fx = fixture(host);

    let response = fx
        .router
        .clone()
        .oneshot(
            Request::get("/metrics/v1/session/grids")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());

    // Other endpoints still answer on the same router.
    let body = get_json(&fx.router, "/metrics/v1/server").await;
    assert_eq!(body["IsReady"], true);

    fx.collector.detach().await;
}

#[tokio::test]
async fn unknown_paths_answer_empty_200() {
    let mut fx = fixture(StubHost::ready());

    for path in [
        "/metrics/v1/session/voxels",
        "/metrics/v2/server",
        "/favicon.ico",
    ] {
        let response = fx
            .router
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    fx.collector.detach().await;
}

#[tokio::test]
async fn process_endpoint_includes_script_block_counts() {
    let mut fx = fixture(StubHost::ready());
    let hooks = fx.collector.hooks();
    hooks.script_block_added(1, true);
    hooks.script_block_added(2, false);

    let body = get_json(&fx.router, "/metrics/v1/process").await;
    assert_eq!(body["Gen0Collections"], 10);
    assert_eq!(body["ProgrammableBlocks"], 2);
    assert_eq!(body["ProgrammableBlocksEnabled"], 1);

    fx.collector.detach().await;
}

#[tokio::test]
async fn session_lists_are_empty_before_ready() {
    let mut fx = fixture(StubHost::not_ready());

    for path in [
        "/metrics/v1/session/grids",
        "/metrics/v1/session/asteroids",
        "/metrics/v1/session/planets",
        "/metrics/v1/session/floatingObjects",
        "/metrics/v1/session/factions",
        "/metrics/v1/load",
    ] {
        let body = get_json(&fx.router, path).await;
        assert_eq!(body.as_array().unwrap().len(), 0, "{path}");
    }

    fx.collector.detach().await;
}

#[tokio::test]
async fn stop_abandons_requests_after_grace_period() {
    let (queue, handle) = update_channel();
    let mut host = StubHost::ready();
    host.update_loop = Some(handle);
    // Nothing pumps the queue; keep it alive so the parked read waits for
    // its full timeout instead of failing fast.
    let _queue = queue;

    let provider: Arc<dyn SnapshotProvider> = Arc::new(host);
    let mut collector = Collector::attach(provider.clone(), &Config::default());
    let state = AppState {
        provider,
        core: collector.core(),
        sync_read_timeout: Duration::from_secs(30),
    };

    let mut config = Config::default();
    config.server.shutdown_grace_ms = 100;
    let server = MetricsServer::new(&config);
    let addr = server
        .start("127.0.0.1:0".parse().unwrap(), state)
        .await
        .unwrap();

    // Park a request in the synchronized grid read and give it time to
    // reach the handler.
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /metrics/v1/session/grids HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Stop must honor the grace period, then give up on the stuck request
    // rather than waiting out its 30s read timeout.
    let begin = Instant::now();
    server.stop().await.unwrap();
    let elapsed = begin.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "stopped early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "stop hung: {elapsed:?}");

    drop(stream);
    collector.detach().await;
}

#[tokio::test]
async fn factions_endpoint_projects_fields() {
    let mut fx = fixture(StubHost::ready());

    let body = get_json(&fx.router, "/metrics/v1/session/factions").await;
    let factions = body.as_array().unwrap();
    assert_eq!(factions.len(), 1);
    assert_eq!(factions[0]["Tag"], "TST");
    assert_eq!(factions[0]["MemberCount"], 4);
    assert_eq!(factions[0]["IsNpc"], false);

    fx.collector.detach().await;
}
