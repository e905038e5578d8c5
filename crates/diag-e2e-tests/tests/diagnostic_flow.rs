//! E2E tests for the happy path: init, then tools dispatched by name.

mod helpers;

use serde_json::json;

use diag_elm327::SessionState;
use diag_protocol::{DiagnosticSnapshot, DtcCategory};
use helpers::TestHarness;

/// Init runs the full AT sequence, then a snapshot reads every sub-read in
/// a fixed order and the JSON payload round-trips into the shared type.
#[tokio::test(start_paused = true)]
async fn e2e_init_then_snapshot() {
    let h = TestHarness::running_engine();
    h.mock.reply("03", "43 01 71 01 33 00 00");
    h.mock.reply("07", "NO DATA");

    assert_eq!(h.ready().await, "ELM327 v1.5");
    assert_eq!(
        h.mock.commands(),
        ["ATZ", "ATE0", "ATL0", "ATH0", "ATS0", "ATSP0", "ATAT1"]
    );
    assert_eq!(h.session.state(), SessionState::Ready);

    let result = h.run("diagnostic_snapshot", json!({})).await.unwrap();
    assert!(result.success, "{:?}", result.error);

    let snapshot: DiagnosticSnapshot = serde_json::from_value(result.data.unwrap()).unwrap();
    assert!(snapshot.is_complete());

    let codes: Vec<&str> = snapshot
        .dtcs
        .as_deref()
        .unwrap()
        .iter()
        .map(|d| d.code.as_str())
        .collect();
    assert_eq!(codes, ["P0171", "P0133"]);
    assert_eq!(snapshot.pending_dtcs.as_deref(), Some(&[][..]));
    assert_eq!(snapshot.readings.len(), 8);
    assert_eq!(snapshot.readings[0].name, "engine_rpm");
    assert_eq!(snapshot.readings[0].value, 1726.0);
    assert_eq!(snapshot.readings[2].value, 30.0);
    assert_eq!(snapshot.battery_voltage, Some(12.6));

    assert_eq!(
        h.obd_commands(),
        ["03", "07", "010C", "010D", "0105", "0104", "0111", "010F", "0110", "012F", "ATRV"]
    );
}

/// Read, clear with confirmation, re-read: the codes are gone.
#[tokio::test(start_paused = true)]
async fn e2e_read_clear_reread() {
    let h = TestHarness::new();
    h.mock
        .reply_sequence("03", &["43 01 71 C1 23 00 00", "43 00 00 00 00 00 00"]);
    h.mock.reply("04", "44");
    h.ready().await;

    let before = h.run("read_dtcs", json!({})).await.unwrap();
    assert!(before.success);
    let data = before.data.unwrap();
    assert_eq!(data["count"], 2);
    assert_eq!(data["dtcs"][1]["code"], "U0123");
    let dtcs: Vec<diag_protocol::Dtc> = serde_json::from_value(data["dtcs"].clone()).unwrap();
    assert_eq!(dtcs[1].category, DtcCategory::Network);

    let refused = h.run("clear_dtcs", json!({})).await.unwrap();
    assert!(!refused.success);
    assert_eq!(h.mock.count("04"), 0);

    let cleared = h.run("clear_dtcs", json!({ "confirm": true })).await.unwrap();
    assert!(cleared.success);

    let after = h.run("read_dtcs", json!({})).await.unwrap();
    assert!(after.success);
    assert_eq!(after.data.unwrap()["count"], 0);
    assert_eq!(after.summary.unwrap(), "No stored DTCs found");

    assert_eq!(h.obd_commands(), ["03", "04", "03"]);
}

/// Monitor samples each PID once per tick and reduces them.
#[tokio::test(start_paused = true)]
async fn e2e_monitor_reduces_samples() {
    let h = TestHarness::new();
    h.mock
        .reply_sequence("0105", &["41 05 6E", "41 05 70", "41 05 73"]);
    h.mock.reply("010C", "41 0C 1A F8");
    h.ready().await;

    let result = h
        .run(
            "monitor_pids",
            json!({ "pids": ["coolant_temp", "0x0C"], "duration_secs": 3, "interval_ms": 1000 }),
        )
        .await
        .unwrap();
    assert!(result.success);

    let data = result.data.unwrap();
    assert_eq!(data[0]["count"], 3);
    assert_eq!(data[0]["min"], 70.0);
    assert_eq!(data[0]["max"], 75.0);
    let avg = data[0]["avg"].as_f64().unwrap();
    assert!((avg - 72.33).abs() < 0.01);
    assert_eq!(data[1]["name"], "engine_rpm");
    assert_eq!(data[1]["min"], 1726.0);

    assert_eq!(h.mock.count("0105"), 3);
    assert_eq!(h.mock.count("010C"), 3);
}

/// Wait succeeds on the first reading that satisfies the condition.
#[tokio::test(start_paused = true)]
async fn e2e_wait_for_warm_engine() {
    let h = TestHarness::new();
    h.mock
        .reply_sequence("0105", &["41 05 50", "41 05 6E", "41 05 82"]);
    h.ready().await;

    let result = h
        .run(
            "wait_for_condition",
            json!({ "pid": 5, "operator": ">=", "value": 90, "timeout_secs": 30, "interval_ms": 500 }),
        )
        .await
        .unwrap();

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["met"], true);
    assert_eq!(data["sample"]["value"], 90.0);
    assert_eq!(h.mock.count("0105"), 3);
}

/// VIN and voltage tools against the same session.
#[tokio::test(start_paused = true)]
async fn e2e_identity_reads() {
    let h = TestHarness::new();
    h.mock.reply(
        "0902",
        "SEARCHING...\r49 02 01 00 00 00 31\r49 02 02 47 31 4A 43\r49 02 03 35 34 34 34\r49 02 04 52 37 32 35\r49 02 05 32 33 36 37",
    );
    h.mock.reply("ATRV", "12.3V");
    h.ready().await;

    let vin = h.run("read_vin", json!({})).await.unwrap();
    assert!(vin.success, "{:?}", vin.error);
    assert_eq!(vin.data.unwrap()["vin"], "1G1JC5444R7252367");

    let volts = h.run("read_voltage", json!({})).await.unwrap();
    assert!(volts.success);
    assert_eq!(volts.data.unwrap()["voltage"], 12.3);
}
