//! Batch rewriting: failure isolation, determinism across thread counts,
//! report-only handling of the application manifest.

mod fixtures;

use fixtures::{manifest, Workspace, NEEDS_EXPORTED};
use manifest_fixup::{CancelToken, Dispatcher, FileStatus, ManifestBatch, ManifestRole};
use std::fs;
use std::path::PathBuf;

const MALFORMED: &str = "<manifest>\n  <application>\n    <activity>\n  </application>\n</manifest>\n";

fn library_batch(ws: &Workspace) -> (Vec<PathBuf>, PathBuf) {
    let mut files = Vec::new();
    for lib in ["core", "share", "sync", "push"] {
        files.push(ws.write(&format!("libs/{}/AndroidManifest.xml", lib), NEEDS_EXPORTED));
    }
    let broken = ws.write("libs/broken/AndroidManifest.xml", MALFORMED);
    files.insert(2, broken.clone());
    (files, broken)
}

#[test]
fn test_one_malformed_file_does_not_stop_the_batch() {
    let ws = Workspace::new();
    let (files, broken) = library_batch(&ws);

    let dispatcher = Dispatcher::new(4, 21, CancelToken::new()).unwrap();
    let report = dispatcher.dispatch(&ManifestBatch::new(files.clone(), None));

    assert_eq!(report.files.len(), 5);
    assert_eq!(report.rewritten, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.file(&broken).unwrap().status, FileStatus::Failed);
    assert!(report.file(&broken).unwrap().message.is_some());

    // Each good file is fully rewritten, the broken one fully untouched.
    for path in &files {
        let contents = fs::read_to_string(path).unwrap();
        if path == &broken {
            assert_eq!(contents, MALFORMED);
        } else {
            assert!(contents.contains(r#"<receiver android:name=".Boot" android:exported="true">"#));
            assert!(contents.contains(r#"android:minSdkVersion="21""#));
        }
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        assert!(!PathBuf::from(temp).exists());
    }
}

#[test]
fn test_results_do_not_depend_on_parallelism() {
    let mut outputs = Vec::new();
    for jobs in [1, 2, 8] {
        let ws = Workspace::new();
        let (files, _) = library_batch(&ws);
        let dispatcher = Dispatcher::new(jobs, 21, CancelToken::new()).unwrap();
        let report = dispatcher.dispatch(&ManifestBatch::new(files.clone(), None));

        let statuses: Vec<FileStatus> = report.files.iter().map(|f| f.status).collect();
        let contents: Vec<String> = files.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
        outputs.push((statuses, contents));
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_second_run_changes_nothing() {
    let ws = Workspace::new();
    let (files, _) = library_batch(&ws);
    let dispatcher = Dispatcher::new(0, 21, CancelToken::new()).unwrap();

    dispatcher.dispatch(&ManifestBatch::new(files.clone(), None));
    let report = dispatcher.dispatch(&ManifestBatch::new(files, None));

    assert_eq!(report.rewritten, 0);
    assert_eq!(report.unchanged, 4);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_primary_manifest_is_reported_last_and_never_written() {
    let ws = Workspace::new();
    let lib = ws.write("libs/share/AndroidManifest.xml", &manifest("library.xml"));
    let app = ws.write("app/src/main/AndroidManifest.xml", &manifest("library.xml"));

    let dispatcher = Dispatcher::new(2, 21, CancelToken::new()).unwrap();
    let report = dispatcher.dispatch(
        &ManifestBatch::new(vec![lib.clone(), app.clone(), lib.clone()], Some(app.clone()))
            .for_variant("freeRelease"),
    );

    assert_eq!(report.files.len(), 2);
    let primary = report.files.last().unwrap();
    assert_eq!(primary.role, ManifestRole::Primary);
    assert_eq!(primary.status, FileStatus::Violations);
    let names: Vec<Option<&str>> = primary
        .violations
        .iter()
        .map(|v| v.component.as_deref())
        .collect();
    assert_eq!(names, vec![Some(".ShareActivity"), Some(".BootReceiver")]);

    assert_eq!(ws.read("app/src/main/AndroidManifest.xml"), manifest("library.xml"));
    assert_ne!(ws.read("libs/share/AndroidManifest.xml"), manifest("library.xml"));
    assert!(report.to_human().contains("violation"));
}

#[test]
fn test_missing_files_are_skipped() {
    let ws = Workspace::new();
    let present = ws.write("libs/a/AndroidManifest.xml", NEEDS_EXPORTED);
    let absent = ws.path("libs/b/AndroidManifest.xml");

    let dispatcher = Dispatcher::new(1, 0, CancelToken::new()).unwrap();
    let report = dispatcher.dispatch(&ManifestBatch::new(vec![present, absent.clone()], Some(ws.path("app/AndroidManifest.xml"))));

    assert_eq!(report.rewritten, 1);
    assert_eq!(report.skipped, 2);
    assert!(!report.has_failures());
    assert!(!absent.exists());
}
