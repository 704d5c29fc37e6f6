mod common;

use std::fs;

use anyhow::Result;
use common::{sizes, test_curve, write_run};
use tfr_core::{Catalog, CatalogConfig, DiscoveryError, RunFile, SizeCount, WILDCARD};

fn populated_root() -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_run(root, "Ant LexDQN | Sparse", "run1", &sizes(256, 32), &test_curve(10.0))?;
    write_run(root, "Ant LexDQN | Sparse", "run2", &sizes(256, 32), &test_curve(20.0))?;
    write_run(root, "Ant LexDQN | Sparse", "run3", &sizes(512, 64), &test_curve(30.0))?;
    write_run(root, "Ant DQN | Dense", "run1", &sizes(256, 64), &test_curve(40.0))?;
    // Crashed run, excluded by default
    write_run(root, "Ant DQN | Dense.crashed", "run1", &sizes(128, 16), &test_curve(1.0))?;
    // Stray file at the root is ignored
    fs::write(root.join("notes"), "not a run")?;
    Ok(dir)
}

#[test]
fn test_scan_discovers_runs_and_facets() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());

    let summary = catalog.scan(dir.path())?;
    assert_eq!(summary.sessions, 4);
    assert_eq!(summary.model_tags, vec!["Ant DQN", "Ant LexDQN"]);
    assert_eq!(summary.reward_tags, vec!["Dense", "Sparse"]);

    assert_eq!(catalog.all_model_tags(), vec!["Ant DQN", "Ant LexDQN", WILDCARD]);
    assert_eq!(catalog.all_reward_tags(), vec!["Dense", "Sparse", WILDCARD]);
    assert_eq!(catalog.reward_tags_for("LexDQN"), vec!["Sparse", WILDCARD]);
    assert_eq!(
        catalog.sizes_for("LexDQN", "Sparse"),
        &[
            SizeCount { hidden: 256, batch: 32, count: 2 },
            SizeCount { hidden: 512, batch: 64, count: 1 },
        ]
    );
    assert!(catalog.sizes_for("LexDQN", "Dense").is_empty());

    // Tag folders are visited in name order
    let session = &catalog.sessions()[0];
    assert_eq!(session.model_tags, "Ant DQN");
    assert_eq!(session.model_key, "DQN");
    assert!(session.events_path.is_absolute());
    assert!(session.params_path.ends_with("run1/seed0/run.params"));
    assert_eq!(session.label(), "DQN\nDense [256,64]");

    assert!(!catalog.entries_changed());
    Ok(())
}

#[test]
fn test_scan_without_exclusion_keeps_dotted_folders() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());

    let summary = catalog.scan_with(dir.path(), false)?;
    assert_eq!(summary.sessions, 5);
    assert!(summary.reward_tags.contains(&"Dense.crashed".to_string()));
    Ok(())
}

#[test]
fn test_rescan_is_idempotent() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());

    catalog.scan(dir.path())?;
    let first_index = catalog.index().clone();
    let first_sessions = catalog.sessions().to_vec();

    catalog.scan(dir.path())?;
    assert_eq!(catalog.index(), &first_index);
    assert_eq!(catalog.sessions(), first_sessions.as_slice());
    Ok(())
}

#[test]
fn test_malformed_tree_aborts_scan_and_keeps_previous_state() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());
    catalog.scan(dir.path())?;

    write_run(dir.path(), "NoDelimiterHere", "run1", &sizes(256, 32), &test_curve(1.0))?;
    let err = catalog.scan(dir.path()).unwrap_err();
    assert!(matches!(err, DiscoveryError::MalformedTagFolder { .. }));
    assert_eq!(catalog.sessions().len(), 4);
    Ok(())
}

#[test]
fn test_run_missing_event_log_aborts_scan() -> Result<()> {
    let dir = populated_root()?;
    let run = write_run(dir.path(), "Ant PPO | Sparse", "run1", &sizes(256, 32), &[])?;
    fs::remove_file(run.join("seed0/logs/events.out.tfevents.0"))?;

    let mut catalog = Catalog::new(CatalogConfig::default());
    let err = catalog.scan(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::AmbiguousRunFile { what: RunFile::EventLog, found: 0, .. }
    ));
    assert!(catalog.sessions().is_empty());
    Ok(())
}

#[test]
fn test_import_single_run_with_two_dumps_fails_cleanly() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());
    catalog.scan(dir.path())?;
    let before = catalog.sessions().to_vec();

    let run = write_run(dir.path(), "Ant LexDQN | Sparse", "run4", &sizes(256, 32), &test_curve(5.0))?;
    fs::write(run.join("seed0/copy.params"), sizes(512, 64))?;

    let err = catalog.import_single_run(&run).unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::AmbiguousRunFile { what: RunFile::ParamsDump, found: 2, .. }
    ));
    assert_eq!(catalog.sessions(), before.as_slice());
    assert!(!catalog.take_entries_changed());
    Ok(())
}

#[test]
fn test_import_single_run_updates_index_like_a_rebuild() -> Result<()> {
    let dir = populated_root()?;
    let mut catalog = Catalog::new(CatalogConfig::default());
    catalog.scan(dir.path())?;

    let run = write_run(dir.path(), "Ant LexDQN | Sparse", "run4", &sizes(512, 64), &test_curve(5.0))?;
    let session = catalog.import_single_run(&run)?;
    assert_eq!(session.hidden_size(), 512);

    assert_eq!(catalog.sessions().len(), 5);
    assert_eq!(catalog.sizes_for("LexDQN", "Sparse")[1].count, 2);
    assert!(catalog.take_entries_changed());
    assert!(!catalog.take_entries_changed());

    // Same content as scanning the updated tree from scratch
    let mut fresh = Catalog::new(CatalogConfig::default());
    fresh.scan(dir.path())?;
    assert_eq!(
        catalog.sizes_for("LexDQN", "Sparse"),
        fresh.sizes_for("LexDQN", "Sparse")
    );
    assert_eq!(catalog.all_model_tags(), fresh.all_model_tags());

    // Re-importing the same run does not duplicate it
    catalog.import_single_run(&run)?;
    assert_eq!(catalog.sessions().len(), 5);
    Ok(())
}

#[test]
fn test_import_single_run_needs_tag_folder_parent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let run = write_run(dir.path(), "plain", "run1", &sizes(256, 32), &test_curve(1.0))?;

    let mut catalog = Catalog::new(CatalogConfig::default());
    assert!(matches!(
        catalog.import_single_run(&run),
        Err(DiscoveryError::MalformedTagFolder { .. })
    ));
    assert!(catalog.sessions().is_empty());
    Ok(())
}

#[test]
fn test_import_tag_folder() -> Result<()> {
    let dir = populated_root()?;
    let other = tempfile::tempdir()?;
    write_run(other.path(), "Ant PPO | Shaped", "a", &sizes(64, 8), &test_curve(2.0))?;
    write_run(other.path(), "Ant PPO | Shaped", "b", &sizes(64, 8), &test_curve(3.0))?;

    let mut catalog = Catalog::new(CatalogConfig::default());
    catalog.scan(dir.path())?;
    assert_eq!(catalog.import_tag_folder(&other.path().join("Ant PPO | Shaped"))?, 2);

    assert_eq!(catalog.sessions().len(), 6);
    assert_eq!(
        catalog.sizes_for("PPO", "Shaped"),
        &[SizeCount { hidden: 64, batch: 8, count: 2 }]
    );
    assert!(catalog.all_model_tags().contains(&"Ant PPO".to_string()));
    assert!(catalog.take_entries_changed());
    Ok(())
}

#[test]
fn test_import_tag_folder_is_all_or_nothing() -> Result<()> {
    let other = tempfile::tempdir()?;
    write_run(other.path(), "Ant PPO | Shaped", "a", &sizes(64, 8), &test_curve(2.0))?;
    let broken = write_run(other.path(), "Ant PPO | Shaped", "b", &sizes(64, 8), &test_curve(3.0))?;
    fs::remove_file(broken.join("seed0/run.params"))?;

    let mut catalog = Catalog::new(CatalogConfig::default());
    assert!(catalog
        .import_tag_folder(&other.path().join("Ant PPO | Shaped"))
        .is_err());
    assert!(catalog.sessions().is_empty());
    assert!(catalog.index().is_empty());
    Ok(())
}
