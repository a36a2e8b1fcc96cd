
use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar, temp_dir};

#[test]
fn toggle_lock_flips_both_ways() {
    let workspace = temp_dir("tutorhub-toggle");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Week 10 starts locked; two toggles land it back where it began.
    let unlocked = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "materials.toggleLock",
        json!({ "weekNo": 10 }),
    );
    assert_eq!(unlocked.get("locked").and_then(|v| v.as_bool()), Some(false));

    let relocked = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "materials.toggleLock",
        json!({ "weekNo": 10 }),
    );
    assert_eq!(relocked.get("locked").and_then(|v| v.as_bool()), Some(true));

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "materials.toggleLock",
        json!({ "weekNo": 51 }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn view_is_guarded_by_the_lock() {
    let workspace = temp_dir("tutorhub-view-guard");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "materials.view",
        json!({ "weekNo": 20 }),
    );
    assert_eq!(code, "locked");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "materials.toggleLock",
        json!({ "weekNo": 20 }),
    );
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "materials.view",
        json!({ "weekNo": 20 }),
    );
    assert_eq!(view.get("weekNo").and_then(|v| v.as_i64()), Some(20));
    assert_eq!(view.get("label").and_then(|v| v.as_str()), Some("Week 20"));

    // Locking again closes the view.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "materials.toggleLock",
        json!({ "weekNo": 20 }),
    );
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "materials.view",
        json!({ "weekNo": 20 }),
    );
    assert_eq!(code, "locked");
}
