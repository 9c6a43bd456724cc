//! Protocol tests against a scripted stand-in for the matching engine.
//!
//! The fake engine is a `/bin/sh` script that plays the banner/marker
//! protocol and records every command it receives, so ordering and
//! cache-skip behavior are observable from the outside.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ontoalign_core::AlignError;
use ontoalign_engine::{EngineConfig, EnginePaths, MatchingEngine};

/// Write an executable fake-engine script that logs commands to `cmd_log`
/// and produces the artifacts the protocol promises.
fn write_fake_engine(dir: &Path, cmd_log: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
# fake matching engine: args (heap, -jar, jar, ontologies) are ignored
echo "Matcha CLI activated"
while read line; do
  echo "$line" >> "{log}"
  set -- $line
  case "$1" in
    Matchers)
      echo "Matchers set" ;;
    Match)
      printf 'Src\tTgt\tCandidates\na\tx\t0\nb\ty\t0\n' > "$3"
      echo "Finished matching" ;;
    Negatives)
      printf 'Src\tTgt\tLabel\na\ty\t0.0\n' > "$3"
      echo "Finished generating negatives" ;;
    Score)
      printf 'Src\tTgt\tLM\tWM\na\tx\t0.9\t0.8\nb\ty\t0.7\t0.6\n' > "$3"
      echo "Finished calculating scores"
      exit 0 ;;
  esac
done
"#,
        log = cmd_log.display()
    );
    write_script(dir, "fake_engine.sh", &script)
}

fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn config(dir: &Path, launcher: PathBuf) -> EngineConfig {
    EngineConfig {
        install_dir: dir.to_path_buf(),
        jar_path: dir.join("engine.jar"),
        java_path: launcher,
        max_heap: "512m".to_string(),
        matchers: vec!["LM".to_string(), "WM".to_string()],
        threshold: 0.1,
        cardinality: 3,
        cache_ok: true,
    }
}

fn ontology(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "<owl/>").unwrap();
    path
}

fn received_commands(cmd_log: &Path) -> Vec<String> {
    std::fs::read_to_string(cmd_log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn full_run_issues_commands_in_protocol_order() {
    let dir = tempfile::tempdir().unwrap();
    let cmd_log = dir.path().join("commands.log");
    let launcher = write_fake_engine(dir.path(), &cmd_log);

    let source = ontology(dir.path(), "source.owl");
    let target = ontology(dir.path(), "target.owl");
    let reference = dir.path().join("refs.tsv");
    std::fs::write(&reference, "Src\tTgt\tLabel\na\tx\t1.0\n").unwrap();

    let out = dir.path().join("out");
    let paths = EnginePaths::new(&out);
    let engine = MatchingEngine::new(config(dir.path(), launcher));

    let scores = engine
        .compute_scores(&source, &target, Some(reference.as_path()), &paths)
        .unwrap();
    assert!(scores.is_file());
    assert!(paths.pairs.is_file());

    let cmds = received_commands(&cmd_log);
    let pos = |prefix: &str| {
        cmds.iter()
            .position(|c| c.starts_with(prefix))
            .unwrap_or_else(|| panic!("no `{prefix}` command in {cmds:?}"))
    };
    assert!(pos("Matchers") < pos("Match "));
    assert!(pos("Match ") < pos("Negatives "));
    assert!(pos("Negatives ") < pos("Score "));
}

#[test]
fn existing_candidates_file_skips_the_match_command() {
    let dir = tempfile::tempdir().unwrap();
    let cmd_log = dir.path().join("commands.log");
    let launcher = write_fake_engine(dir.path(), &cmd_log);

    let source = ontology(dir.path(), "source.owl");
    let target = ontology(dir.path(), "target.owl");

    let out = dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let paths = EnginePaths::new(&out);
    std::fs::write(&paths.candidates, "Src\tTgt\tCandidates\na\tx\t0\n").unwrap();

    let engine = MatchingEngine::new(config(dir.path(), launcher));
    engine
        .compute_scores(&source, &target, None, &paths)
        .unwrap();

    let cmds = received_commands(&cmd_log);
    assert!(cmds.iter().any(|c| c.starts_with("Matchers")));
    assert!(!cmds.iter().any(|c| c.starts_with("Match ")));
    assert!(!cmds.iter().any(|c| c.starts_with("Negatives ")));
}

#[test]
fn cached_score_table_short_circuits_the_whole_driver() {
    let dir = tempfile::tempdir().unwrap();
    let source = ontology(dir.path(), "source.owl");
    let target = ontology(dir.path(), "target.owl");

    let out = dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let paths = EnginePaths::new(&out);
    std::fs::write(&paths.scores, "Src\tTgt\tLM\na\tx\t0.9\n").unwrap();

    // a launcher that cannot exist: reaching the spawn would fail loudly
    let engine = MatchingEngine::new(config(dir.path(), dir.path().join("no_such_engine")));
    let scores = engine
        .compute_scores(&source, &target, None, &paths)
        .unwrap();
    assert_eq!(scores, paths.scores);
}

#[test]
fn nonzero_exit_during_a_step_is_an_engine_failure() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = write_script(
        dir.path(),
        "dying_engine.sh",
        "#!/bin/sh\necho \"Matcha CLI activated\"\nread line\nexit 3\n",
    );

    let source = ontology(dir.path(), "source.owl");
    let target = ontology(dir.path(), "target.owl");
    let out = dir.path().join("out");
    let paths = EnginePaths::new(&out);

    let engine = MatchingEngine::new(config(dir.path(), launcher));
    let err = engine
        .compute_scores(&source, &target, None, &paths)
        .unwrap_err();
    match err {
        AlignError::EngineProcess { log_file } => assert_eq!(log_file, paths.log),
        other => panic!("expected EngineProcess, got {other:?}"),
    }
}

#[test]
fn marker_without_artifact_is_a_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    // responds to every command but never writes any file
    let launcher = write_script(
        dir.path(),
        "hollow_engine.sh",
        r#"#!/bin/sh
echo "Matcha CLI activated"
while read line; do
  set -- $line
  case "$1" in
    Matchers) echo "Matchers set" ;;
    Match) echo "Finished matching" ;;
  esac
done
"#,
    );

    let source = ontology(dir.path(), "source.owl");
    let target = ontology(dir.path(), "target.owl");
    let out = dir.path().join("out");
    let paths = EnginePaths::new(&out);

    let engine = MatchingEngine::new(config(dir.path(), launcher));
    let err = engine
        .compute_scores(&source, &target, None, &paths)
        .unwrap_err();
    match err {
        AlignError::MissingArtifact { path } => assert_eq!(path, paths.candidates),
        other => panic!("expected MissingArtifact, got {other:?}"),
    }
}
