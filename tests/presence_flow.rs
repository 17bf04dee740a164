//! End-to-end resolve-and-build flow: per-client state files on disk
//! through the resolver into the presence engine.

use std::time::{SystemTime, UNIX_EPOCH};

use beacond_core::presence::build_presence;
use beacond_core::session::SessionStore;
use beacond_core::tiers::TierData;
use beacond_core::Config;
use session_beacon::daemon::build_presence_config;
use session_beacon::resolver::find_latest_state;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[test]
fn resolve_then_build_produces_presence_for_active_session() {
    let dir = tempfile::tempdir().unwrap();
    let now = unix_now();
    let session_start = now - 1200;

    std::fs::write(
        dir.path().join("state.code.json"),
        format!(
            concat!(
                r#"{{"$version":1,"sessionId":"s-1","sessionStart":{start},"#,
                r#""lastActivity":{now},"project":"demo","branch":"main","#,
                r#""cwd":"/work/demo","client":"claude-code","stopped":false}}"#
            ),
            start = session_start,
            now = now
        ),
    )
    .unwrap();

    let state = find_latest_state(&SessionStore::new(), dir.path()).unwrap();
    assert_eq!(state.project, "demo");

    let cfg = Config::default();
    let pcfg = build_presence_config(&cfg, &TierData::builtin(), &state.client);
    let presence =
        build_presence(&state, &pcfg, 0.0, 0, "claude-opus-4-6", None).expect("active session");

    assert!(presence.details.contains("demo"));
    assert!(presence.details.contains("main"));
    assert_eq!(presence.timestamps.start, session_start);
    assert_eq!(presence.assets.small_image, "opus");
}

#[test]
fn resolver_prefers_most_recent_of_several_clients() {
    let dir = tempfile::tempdir().unwrap();
    let now = unix_now();

    for (client, offset) in [("alpha", 30), ("bravo", 10), ("charlie", 20)] {
        std::fs::write(
            dir.path().join(format!("state.{client}.json")),
            format!(
                r#"{{"$version":1,"client":"{client}","project":"{client}-proj","lastActivity":{},"stopped":false}}"#,
                now - offset
            ),
        )
        .unwrap();
    }

    let state = find_latest_state(&SessionStore::new(), dir.path()).unwrap();
    assert_eq!(state.client, "bravo");
}

#[test]
fn stopped_session_yields_no_presence() {
    let dir = tempfile::tempdir().unwrap();
    let now = unix_now();

    std::fs::write(
        dir.path().join("state.code.json"),
        format!(
            r#"{{"$version":1,"project":"demo","lastActivity":{now},"client":"claude-code","stopped":true}}"#
        ),
    )
    .unwrap();

    let state = find_latest_state(&SessionStore::new(), dir.path()).unwrap();
    let cfg = Config::default();
    let pcfg = build_presence_config(&cfg, &TierData::builtin(), &state.client);
    assert!(build_presence(&state, &pcfg, 0.0, 0, "", None).is_none());
}
