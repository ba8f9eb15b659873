use seqrun_scan::{
    ARRAY_BASED, EntryKind, FindOptions, RunValidator, SequencerRegistry, SequencerTypeSpec,
    ValidatedRun, WarningKind, find,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RUN_FILES: &[&str] = &[
    "RunInfo.xml",
    "RunParameters.xml",
    "SampleSheet.csv",
    "RTAComplete.txt",
];

fn write_files(dir: &Path, files: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in files {
        fs::write(dir.join(name), "x").unwrap();
    }
}

/// Four levels of nesting with a file at each level.
fn create_deep_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let mut dir = temp.path().to_path_buf();
    for level in 1..=4 {
        dir = dir.join(format!("level{level}"));
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(format!("file{level}.txt")), "data").unwrap();
    }
    temp
}

fn create_run_root() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("runs/220103_M00001_0003_000000000-C3D4E"), RUN_FILES);
    write_files(&temp.path().join("runs/220101_M00001_0001_000000000-A1B2C"), RUN_FILES);
    write_files(&temp.path().join("archive/2021/211231_M00001_0099_000000000-Z9Y8X"), RUN_FILES);
    write_files(&temp.path().join("runs/220104_M00001_0004_000000000-D4E5F"), &RUN_FILES[..3]);
    temp
}

#[test]
fn test_depth_bounds_hold_for_all_entries() {
    let temp = create_deep_tree();

    for min in 0..=4usize {
        for max in min..=5usize {
            let options = FindOptions::builder()
                .root(temp.path())
                .min_depth(min)
                .max_depth(max)
                .build()
                .unwrap();

            let depths: Vec<usize> = find(options).unwrap().map(|e| e.depth).collect();
            assert!(
                depths.iter().all(|d| (min..=max).contains(d)),
                "depths {depths:?} outside [{min}, {max}]"
            );
            // The deepest level holds level4 (depth 4) and file4.txt (depth 5).
            assert!(depths.contains(&min));
            assert!(depths.contains(&max.min(5)));
        }
    }
}

#[test]
fn test_depth_is_relative_to_root() {
    let temp = create_deep_tree();
    let file4 = find(FindOptions::new(temp.path()))
        .unwrap()
        .find(|e| e.file_name() == Some("file4.txt"))
        .unwrap();

    assert_eq!(file4.depth, 5);
    assert_eq!(file4.kind, EntryKind::File);
}

#[test]
fn test_excluded_dirs_are_neither_yielded_nor_descended() {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("keep"), &["a.txt"]);
    write_files(&temp.path().join("skip"), &["b.txt"]);
    write_files(&temp.path().join("keep/skip/deeper"), &["c.txt"]);
    #[cfg(unix)]
    {
        write_files(&temp.path().join("target"), &["t.txt"]);
        fs::create_dir(temp.path().join("keep/links")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("target"), temp.path().join("keep/links/skip"))
            .unwrap();
    }

    let options = FindOptions::builder()
        .root(temp.path())
        .exclude_dir("skip")
        .build()
        .unwrap();

    let paths: Vec<PathBuf> = find(options).unwrap().map(|e| e.into_path()).collect();

    assert!(paths.contains(&temp.path().join("keep/a.txt")));
    assert!(
        paths
            .iter()
            .all(|p| !p.components().any(|c| c.as_os_str() == "skip")),
        "excluded directory leaked: {paths:?}"
    );
}

#[test]
fn test_siblings_in_lexicographic_order() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b.txt"), "b").unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join("C.txt"), "c").unwrap();

    let options = FindOptions::builder()
        .root(temp.path())
        .file_type(EntryKind::File)
        .build()
        .unwrap();

    let names: Vec<String> = find(options)
        .unwrap()
        .filter_map(|e| e.file_name().map(str::to_string))
        .collect();

    // Byte order: uppercase sorts before lowercase.
    assert_eq!(names, vec!["C.txt", "a.txt", "b.txt"]);
}

#[test]
fn test_early_stop_yields_prefix() {
    let temp = create_deep_tree();
    let all: Vec<_> = find(FindOptions::new(temp.path())).unwrap().collect();
    let first_three: Vec<_> = find(FindOptions::new(temp.path())).unwrap().take(3).collect();

    assert_eq!(first_three, all[..3]);
}

#[cfg(unix)]
#[test]
fn test_symlinks_reported_but_not_followed_by_default() {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("dir1"), &["file1.txt"]);
    fs::create_dir(temp.path().join("dir2")).unwrap();
    std::os::unix::fs::symlink(temp.path().join("dir1"), temp.path().join("dir2/link_to_dir1")).unwrap();
    std::os::unix::fs::symlink(
        temp.path().join("dir1/file1.txt"),
        temp.path().join("dir2/link_to_file1.txt"),
    )
    .unwrap();

    let links = FindOptions::builder()
        .root(temp.path())
        .file_type(EntryKind::Symlink)
        .build()
        .unwrap();
    assert_eq!(find(links).unwrap().count(), 2);

    let files = FindOptions::builder()
        .root(temp.path())
        .file_type(EntryKind::File)
        .build()
        .unwrap();
    let files: Vec<_> = find(files).unwrap().map(|e| e.into_path()).collect();
    assert_eq!(files, vec![temp.path().join("dir1/file1.txt")]);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_terminates() {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("a/b"), &["file.txt"]);
    std::os::unix::fs::symlink(temp.path(), temp.path().join("a/b/back_to_root")).unwrap();

    let options = FindOptions::builder()
        .root(temp.path())
        .follow_links(true)
        .build()
        .unwrap();

    let mut walk = find(options).unwrap();
    let entries: Vec<_> = walk.by_ref().collect();

    assert!(entries.len() < 10);
    assert!(entries.iter().any(|e| e.file_name() == Some("file.txt")));
    assert!(
        walk.warnings()
            .iter()
            .any(|w| w.kind == WarningKind::SymlinkLoop)
    );
}

#[cfg(unix)]
#[test]
fn test_aliased_directory_descended_once() {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("target"), &["file.txt"]);
    std::os::unix::fs::symlink(temp.path().join("target"), temp.path().join("alias1")).unwrap();
    std::os::unix::fs::symlink(temp.path().join("target"), temp.path().join("alias2")).unwrap();

    let options = FindOptions::builder()
        .root(temp.path())
        .file_type(EntryKind::File)
        .follow_links(true)
        .build()
        .unwrap();

    let mut walk = find(options).unwrap();
    let files: Vec<_> = walk.by_ref().map(|e| e.into_path()).collect();

    assert_eq!(files, vec![temp.path().join("alias1/file.txt")]);
    let revisits = walk
        .warnings()
        .iter()
        .filter(|w| w.kind == WarningKind::AlreadyVisited)
        .count();
    assert_eq!(revisits, 2);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let restricted = temp.path().join("restricted");
    write_files(&restricted, &["hidden.txt"]);
    fs::write(temp.path().join("visible.txt"), "ok").unwrap();
    fs::set_permissions(&restricted, fs::Permissions::from_mode(0o300)).unwrap();

    // Privileged users can read regardless of mode; nothing to test then.
    if fs::read_dir(&restricted).is_ok() {
        fs::set_permissions(&restricted, fs::Permissions::from_mode(0o700)).unwrap();
        return;
    }

    let options = FindOptions::builder()
        .root(temp.path())
        .file_type(EntryKind::File)
        .build()
        .unwrap();
    let mut walk = find(options).unwrap();
    let files: Vec<_> = walk.by_ref().map(|e| e.into_path()).collect();
    let warnings = walk.take_warnings();

    fs::set_permissions(&restricted, fs::Permissions::from_mode(0o700)).unwrap();

    assert_eq!(files, vec![temp.path().join("visible.txt")]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::PermissionDenied);
}

#[test]
fn test_complete_run_accepted_and_rejected_without_indicator() {
    let temp = TempDir::new().unwrap();
    write_files(temp.path(), RUN_FILES);
    let validator = RunValidator::default();

    assert!(validator.is_valid_run(temp.path(), ARRAY_BASED, None).unwrap());

    fs::remove_file(temp.path().join("RTAComplete.txt")).unwrap();
    assert!(!validator.is_valid_run(temp.path(), ARRAY_BASED, None).unwrap());
}

#[test]
fn test_unknown_sequencer_type_is_error() {
    let temp = TempDir::new().unwrap();
    write_files(temp.path(), RUN_FILES);

    let err = RunValidator::default()
        .is_valid_run(temp.path(), "sanger", None)
        .unwrap_err();
    assert_eq!(err.id, "sanger");
}

#[test]
fn test_find_sequencer_runs_walk_order() {
    let temp = create_run_root();

    let runs: Vec<PathBuf> = RunValidator::default()
        .find_sequencer_runs(temp.path(), ARRAY_BASED, None)
        .unwrap()
        .map(ValidatedRun::into_path)
        .collect();

    assert_eq!(
        runs,
        vec![
            temp.path().join("archive/2021/211231_M00001_0099_000000000-Z9Y8X"),
            temp.path().join("runs/220101_M00001_0001_000000000-A1B2C"),
            temp.path().join("runs/220103_M00001_0003_000000000-C3D4E"),
        ]
    );
}

#[test]
fn test_find_sequencer_runs_is_idempotent() {
    let temp = create_run_root();
    let validator = RunValidator::default();

    let first: Vec<_> = validator
        .find_sequencer_runs(temp.path(), ARRAY_BASED, None)
        .unwrap()
        .collect();
    let second: Vec<_> = validator
        .find_sequencer_runs(temp.path(), ARRAY_BASED, None)
        .unwrap()
        .collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_find_sequencer_runs_missing_root_is_empty() {
    let temp = TempDir::new().unwrap();
    let runs = RunValidator::default()
        .find_sequencer_runs(&temp.path().join("missing"), ARRAY_BASED, None)
        .unwrap();
    assert_eq!(runs.count(), 0);
}

#[test]
fn test_custom_type_with_pattern_and_depth() {
    let temp = TempDir::new().unwrap();
    write_files(&temp.path().join("20240101_AV001_run"), &["RunManifest.csv", "RunUploaded.json"]);
    write_files(&temp.path().join("scratch"), &["RunManifest.csv", "RunUploaded.json"]);
    write_files(
        &temp.path().join("nested/20240102_AV001_run"),
        &["RunManifest.csv", "RunUploaded.json"],
    );

    let registry = SequencerRegistry::empty()
        .with_spec(
            SequencerTypeSpec::new("aviti", ["RunManifest.csv"], "RunUploaded.json")
                .with_dir_pattern("20*_AV*")
                .with_max_depth(1),
        )
        .unwrap();

    let runs: Vec<PathBuf> = RunValidator::new(registry)
        .find_sequencer_runs(temp.path(), "aviti", None)
        .unwrap()
        .map(ValidatedRun::into_path)
        .collect();

    assert_eq!(runs, vec![temp.path().join("20240101_AV001_run")]);
}

#[test]
fn test_nanopore_runs() {
    let temp = TempDir::new().unwrap();
    write_files(
        &temp.path().join("exp1/sample1/20240101_1200_MN12345_FAX00001_abcdef12"),
        &["final_summary.txt", "sequencing_summary.txt"],
    );
    write_files(
        &temp.path().join("exp1/sample2/20240101_1300_MN12345_FAX00002_abcdef13"),
        &["sequencing_summary.txt"],
    );

    let runs: Vec<_> = RunValidator::default()
        .find_sequencer_runs(temp.path(), "nanopore", None)
        .unwrap()
        .collect();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].sequencer_type(), "nanopore");
    assert_eq!(runs[0].completion_indicator(), "final_summary.txt");
}

#[cfg(unix)]
#[test]
fn test_symlinked_run_directory_is_discovered() {
    let storage = TempDir::new().unwrap();
    let run = storage.path().join("220101_M00001_0001_000000000-A1B2C");
    write_files(&run, RUN_FILES);
    write_files(&run.join("Data/Intensities"), &["s.locs"]);

    let watch = TempDir::new().unwrap();
    std::os::unix::fs::symlink(&run, watch.path().join("linked_run")).unwrap();
    std::os::unix::fs::symlink(run.join("RunInfo.xml"), watch.path().join("RunInfo.xml")).unwrap();

    let mut runs = RunValidator::default()
        .find_sequencer_runs(watch.path(), ARRAY_BASED, None)
        .unwrap();
    let found: Vec<PathBuf> = runs.by_ref().map(ValidatedRun::into_path).collect();

    assert_eq!(found, vec![watch.path().join("linked_run")]);
    // The linked file is not a candidate and the link is not descended into.
    assert_eq!(runs.rejected_count(), 0);
}
