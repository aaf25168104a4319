//! End-to-end dispatch over real files.

use std::path::{Path, PathBuf};

use ibmi_pipeline::{run, run_with_config, InputSpec, Kind, Mode, PipelineConfig};

const CL: &str = "\
             PGM        PARM(&CUST)
             DCL        VAR(&CUST) TYPE(*CHAR) LEN(10)
             CALL       PGM(ORDLOAD) PARM(&CUST)
             ENDPGM
";

const RPG: &str = "**FREE\ndcl-s total packed(9:2);\ntotal = 0;\n";

const SQL: &str = "SELECT A, B FROM SALES.ORDERS;\nCREATE TABLE T (ID INTEGER NOT NULL);\n";

const DSPF: &str = "     A          R PROMPT\n     A            CUSTNO         5S 0I  3 10\n";

fn fixture(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn mixed(dir: &Path) -> Vec<InputSpec> {
    vec![
        InputSpec::auto(fixture(dir, "ORDERS.clle", CL)),
        InputSpec::auto(fixture(dir, "TOTALS.rpgle", RPG)),
        InputSpec::auto(fixture(dir, "SCHEMA.sql", SQL)),
        InputSpec::auto(fixture(dir, "PROMPT.dspf", DSPF)),
        InputSpec::auto(dir.join("MISSING.clle")),
    ]
}

#[test]
fn combined_mode_runs_the_matching_analyzer() {
    let dir = tempfile::tempdir().unwrap();
    let result = run(&mixed(dir.path()), Mode::Combined);
    assert_eq!(
        (result.cl.len(), result.rpg.len(), result.db2.len(), result.dspf.len()),
        (2, 1, 1, 1)
    );
    assert!(result.cl[1].ast.is_none());
    assert!(result.skipped.is_empty());
}

#[test]
fn merged_diagnostics_follow_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("GONE.sql");
    let inputs = vec![
        InputSpec::new(dir.path().join("FIRST.clle"), Kind::Cl),
        InputSpec::auto(fixture(dir.path(), "OK.sql", SQL)),
        InputSpec::new(&missing, Kind::Db2),
    ];
    let result = run(&inputs, Mode::Combined);
    assert_eq!(result.diagnostics.len(), 2);
    assert!(result.diagnostics[0].file.ends_with("FIRST.clle"));
    assert!(result.diagnostics[1].file.ends_with("GONE.sql"));
    assert!(result.diagnostics.iter().all(|d| d.is_error() && d.line == 0));
    assert!(result.has_errors());
}

#[test]
fn repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = mixed(dir.path());
    let config = PipelineConfig {
        max_workers: Some(3),
        ..PipelineConfig::default()
    };
    let first = run_with_config(&inputs, &config);
    let second = run_with_config(&inputs, &config);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.skipped, second.skipped);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn forced_mode_overrides_only_unresolved_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let sql = fixture(dir.path(), "SCHEMA.sql", SQL);
    let unknown = fixture(dir.path(), "NOTES", "just some text\n");
    let inputs = vec![InputSpec::auto(&sql), InputSpec::auto(&unknown)];

    let result = run(&inputs, Mode::Rpg);
    assert!(result.db2.is_empty());
    assert_eq!(result.rpg.len(), 1);
    assert_eq!(result.rpg[0].path, unknown.display().to_string());
    assert_eq!(result.skipped, vec![sql.clone()]);

    let result = run(&inputs, Mode::Combined);
    assert_eq!(result.db2.len(), 1);
    assert_eq!(result.skipped, vec![unknown]);
}

#[test]
fn content_sniffing_resolves_extensionless_members() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        InputSpec::auto(fixture(dir.path(), "CLMEMBER", CL)),
        InputSpec::auto(fixture(dir.path(), "RPGMEMBER", RPG)),
        InputSpec::auto(fixture(dir.path(), "SQLMEMBER", SQL)),
        InputSpec::auto(fixture(dir.path(), "DSPMEMBER", DSPF)),
    ];
    let result = run(&inputs, Mode::Auto);
    assert_eq!(
        (result.cl.len(), result.rpg.len(), result.db2.len(), result.dspf.len()),
        (1, 1, 1, 1)
    );
    assert!(result.skipped.is_empty());
}

#[test]
fn sniffing_load_failure_runs_no_analyzer() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("NOWHERE");
    let result = run(&[InputSpec::auto(&missing)], Mode::Rpg);
    assert_eq!(result.analyzed_count(), 0);
    assert_eq!(result.skipped, vec![missing]);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message.contains("not found"));
}

#[test]
fn fallback_only_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        grammar: false,
        ..PipelineConfig::default()
    };
    let result = run_with_config(&[InputSpec::auto(fixture(dir.path(), "S.sql", SQL))], &config);
    let script = result.db2[0].ast.as_ref().unwrap();
    assert_eq!(script.statements.len(), 2);
}
