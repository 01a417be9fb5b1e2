use std::{fs, path::Path, process::Command};

use serde_json::{json, Value};
use treasure_hunt_world::{Maze, DEFAULT_LAYOUT};

struct Outcome {
    success: bool,
    json: Value,
}

fn run(dir: &Path, args: &[&str]) -> Outcome {
    let output = Command::new(env!("CARGO_BIN_EXE_treasure-hunt"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("binary runs");
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let json = serde_json::from_str(stdout.trim()).unwrap_or_else(|error| {
        panic!(
            "stdout is not JSON ({error}): {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    });
    Outcome {
        success: output.status.success(),
        json,
    }
}

#[test]
fn dimensions_are_available_before_initialize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let outcome = run(dir.path(), &["dims"]);

    assert!(outcome.success);
    assert_eq!(outcome.json, json!({ "rows": 7, "cols": 7 }));
    assert!(!dir.path().join("state.json").exists());
}

#[test]
fn primitives_before_initialize_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    let calls: [&[&str]; 4] = [&["pos"], &["look"], &["scan"], &["move", "Q"]];
    for args in calls {
        let outcome = run(dir.path(), args);
        assert!(!outcome.success, "{args:?} succeeded");
        assert_eq!(outcome.json["error"], "not_initialized", "{args:?}");
    }
}

#[test]
fn state_carries_across_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path();

    let outcome = run(dir, &["init", "--start", "1,1"]);
    assert!(outcome.success);
    assert_eq!(outcome.json, json!({ "ok": true, "position": [1, 1] }));

    let outcome = run(dir, &["look"]);
    assert_eq!(
        outcome.json,
        json!({ "N": true, "S": false, "E": false, "W": true })
    );

    let outcome = run(dir, &["move", "N"]);
    assert!(outcome.success);
    assert_eq!(
        outcome.json,
        json!({ "ok": false, "hit": "wall", "position": [1, 1] })
    );

    let outcome = run(dir, &["move", "E"]);
    assert_eq!(
        outcome.json,
        json!({ "ok": true, "position": [1, 2], "cell": "empty" })
    );

    let outcome = run(dir, &["scan"]);
    assert_eq!(outcome.json, json!({ "cell": "empty", "position": [1, 2] }));

    let _ = run(dir, &["move", "W"]);
    let outcome = run(dir, &["scan"]);
    assert_eq!(outcome.json, json!({ "cell": "start", "position": [1, 1] }));

    let outcome = run(dir, &["move", "Q"]);
    assert!(!outcome.success);
    assert_eq!(outcome.json["error"], "invalid_direction");

    let outcome = run(dir, &["pos"]);
    assert_eq!(outcome.json, json!({ "position": [1, 1] }));

    let state: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("state.json")).expect("state file"))
            .expect("state is JSON");
    assert_eq!(state["initialized"], true);
    assert_eq!(state["position"], json!([1, 1]));
}

#[test]
fn explore_then_grade_passes_from_the_canonical_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path();

    let outcome = run(dir, &["explore", "--start", "1,1"]);
    assert!(outcome.success);
    assert_eq!(outcome.json["start"], json!([1, 1]));
    let open_cells = Maze::parse(DEFAULT_LAYOUT)
        .expect("built-in layout")
        .open_cells()
        .len();
    assert_eq!(outcome.json["cells_visited"], json!(open_cells));
    assert_eq!(
        fs::read_to_string(dir.join("map.txt")).expect("map artifact"),
        DEFAULT_LAYOUT
    );

    let outcome = run(dir, &["grade"]);
    assert!(outcome.success);
    assert_eq!(outcome.json["passed"], true);
}

#[test]
fn grade_reports_the_first_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tampered = DEFAULT_LAYOUT.replacen("#S..T.#", "#S....#", 1);
    fs::write(dir.path().join("map.txt"), tampered).expect("write map");

    let outcome = run(dir.path(), &["grade"]);

    assert!(!outcome.success);
    assert_eq!(outcome.json["passed"], false);
    assert_eq!(
        outcome.json["mismatch"],
        json!({ "row": 1, "column": 4, "expected": "T", "found": "." })
    );
}

#[test]
fn grade_without_a_map_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let outcome = run(dir.path(), &["grade"]);

    assert!(!outcome.success);
    assert_eq!(outcome.json["feedback"], "Missing map.txt");
}

#[test]
fn configuration_file_is_picked_up_from_the_working_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path();
    fs::write(
        dir.join("treasure-hunt.toml"),
        "state = \"run.json\"\nmap = \"found.txt\"\nstart = [5, 5]\n",
    )
    .expect("write config");

    let outcome = run(dir, &["init"]);
    assert_eq!(outcome.json, json!({ "ok": true, "position": [5, 5] }));
    assert!(dir.join("run.json").exists());
    assert!(!dir.join("state.json").exists());

    let outcome = run(dir, &["explore"]);
    assert!(outcome.success);
    assert!(dir.join("found.txt").exists());
}

#[test]
fn custom_layouts_are_read_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path();
    fs::write(dir.join("small.txt"), "#####\n#S.T#\n#####\n").expect("write layout");

    let outcome = run(dir, &["--layout", "small.txt", "dims"]);
    assert_eq!(outcome.json, json!({ "rows": 3, "cols": 5 }));

    let outcome = run(dir, &["--layout", "small.txt", "explore", "--start", "1,1"]);
    assert!(outcome.success);
    assert_eq!(
        fs::read_to_string(dir.join("map.txt")).expect("map artifact"),
        "#####\n#S.T#\n#####\n"
    );

    let outcome = run(dir, &["--layout", "small.txt", "grade"]);
    assert_eq!(outcome.json["passed"], true);
}

#[test]
fn state_written_for_another_layout_is_rejected_until_reinitialized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path();
    fs::write(dir.join("square.txt"), "####\n#..#\n#..#\n####\n").expect("write layout");

    let outcome = run(dir, &["--layout", "square.txt", "init", "--start", "2,2"]);
    assert_eq!(outcome.json, json!({ "ok": true, "position": [2, 2] }));

    let calls: [&[&str]; 3] = [&["look"], &["scan"], &["move", "N"]];
    for args in calls {
        let outcome = run(dir, args);
        assert!(!outcome.success, "{args:?} succeeded");
        assert_eq!(outcome.json["error"], "inconsistent_state", "{args:?}");
    }

    let outcome = run(dir, &["init", "--start", "1,1"]);
    assert!(outcome.success);
    let outcome = run(dir, &["scan"]);
    assert_eq!(outcome.json, json!({ "cell": "start", "position": [1, 1] }));
}
