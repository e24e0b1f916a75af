//! Integration tests for capture, export, and scripted replay.

use std::time::Duration;

use bwtemu::device::{DeviceEvent, RunOutcome};
use bwtemu::models::script::parse_script;
use bwtemu::models::EventType;
use bwtemu::services::{
    compile_script, export_recording_text, ButtonRegistry, DirectoryScriptSource, SaveOutcome,
    ScriptSource,
};
use tokio::time::{sleep, Instant};

mod fixtures;
use fixtures::{temp_config, test_emulator, two_clicks};

#[tokio::test(start_paused = true)]
async fn test_capture_export_and_run_as_script() {
    let (config, _temp_dir) = temp_config();
    let source = DirectoryScriptSource::open(config.paths.scripts_dir().unwrap()).unwrap();
    let (emulator, _transport) = test_emulator();

    emulator.start_recording();
    emulator.press_down("_slate1_1").unwrap();
    sleep(Duration::from_millis(40)).await;
    emulator.press_up("_slate1_1").unwrap();
    sleep(Duration::from_millis(200)).await;
    emulator.press_down("_button_alt").unwrap();
    sleep(Duration::from_millis(60)).await;
    emulator.press_up("_button_alt").unwrap();

    let outcome = emulator.stop_recording(Some("  practice  ")).unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            index: 0,
            name: "practice".to_string()
        }
    );

    let recording = emulator.recording(0).unwrap();
    source
        .store_script("practice", &export_recording_text(&recording))
        .unwrap();
    assert_eq!(
        source.list_scripts().unwrap(),
        vec!["practice", "sample_script"]
    );

    let mut rx = emulator.subscribe();
    let start = Instant::now();
    let handle = emulator.run_script(&source, "practice").unwrap();

    let mut timeline = Vec::new();
    loop {
        match rx.recv().await.unwrap() {
            DeviceEvent::ButtonActive { id } => timeline.push((start.elapsed().as_millis(), id)),
            DeviceEvent::ButtonInactive { id } => {
                timeline.push((start.elapsed().as_millis(), format!("{id} up")));
            }
            DeviceEvent::PlaybackFinished { name } => {
                assert_eq!(name, "practice");
                break;
            }
            _ => {}
        }
    }

    assert_eq!(
        timeline,
        vec![
            (0, "_slate1_1".to_string()),
            (40, "_slate1_1 up".to_string()),
            (240, "_button_alt".to_string()),
            (300, "_button_alt up".to_string()),
        ]
    );
    assert_eq!(handle.wait().await, RunOutcome::Completed);
}

#[test]
fn test_export_then_compile_preserves_entries() {
    let (emulator, _transport) = test_emulator();
    let index = emulator.import_recording("clicks", two_clicks()).unwrap();
    let recording = emulator.recording(index).unwrap();

    let text = export_recording_text(&recording);
    let actions = parse_script("clicks", &text).unwrap();
    let compiled = compile_script(&actions, &ButtonRegistry::with_default_layout(), 35);

    assert_eq!(compiled, recording.entries);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_script_leaves_nothing_held() {
    let (config, temp_dir) = temp_config();
    fixtures::write_script(
        &temp_dir.path().join("scripts"),
        "long_hold",
        "hold button_right 0\nrelease button_right 5000\n",
    );
    let source = DirectoryScriptSource::new(config.paths.scripts_dir().unwrap());
    let (emulator, transport) = test_emulator();
    emulator.run();

    let handle = emulator.run_script(&source, "long_hold").unwrap();
    sleep(Duration::from_millis(450)).await;
    assert_eq!(emulator.held_buttons(), vec!["_button_right"]);

    handle.cancel();
    assert_eq!(handle.wait().await, RunOutcome::Cancelled);
    assert!(emulator.held_buttons().is_empty());

    // Let the replication burst drain, then nothing more is sent.
    sleep(Duration::from_millis(400)).await;
    let sent = transport.joined().matches("fn").count();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.joined().matches("fn").count(), sent);
}

#[tokio::test(start_paused = true)]
async fn test_refused_playback_does_not_disturb_capture() {
    let (emulator, _transport) = test_emulator();
    emulator.import_recording("take", two_clicks()).unwrap();

    emulator.start_recording();
    assert!(emulator.play(0).is_err());
    emulator.press_down("_jumbo3").unwrap();
    emulator.press_up("_jumbo3").unwrap();
    emulator.stop_recording(None);

    let summaries = emulator.recordings();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].name, "Recording 2");
    let recording = emulator.recording(1).unwrap();
    let types: Vec<EventType> = recording.entries.iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![EventType::Down, EventType::Up]);
}
