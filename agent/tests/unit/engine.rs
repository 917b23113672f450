//! Reconcile passes and store-independent engine behavior.

use crontopus_agent::application::services::{EngineOptions, ReconciliationEngine};
use crontopus_agent::domain::error::SchedulerError;
use crontopus_agent::domain::job::JobEntry;
use crontopus_agent::domain::reconcile::{Anomaly, Operation};
use crontopus_agent::infra::CrontabStore;

use crate::mocks::{FakeCrontab, Reply, ScriptedRunner};

fn engine(fake: &FakeCrontab) -> ReconciliationEngine<CrontabStore<&FakeCrontab>> {
    ReconciliationEngine::new(CrontabStore::new(fake))
}

fn job(id: &str, schedule: &str, command: &str) -> JobEntry {
    JobEntry::new(id, schedule, command)
}

const MIXED: &str = "MAILTO=ops@example.com\n\
0 1 * * * old # CRONTOPUS:stale\n\
0 2 * * * v1 # CRONTOPUS:keep\n\
0 3 * * * same # CRONTOPUS:same\n\
30 4 * * * /usr/local/bin/rotate\n";

fn desired() -> Vec<JobEntry> {
    vec![
        job("keep", "0 2 * * *", "v2"),
        job("same", "0 3 * * *", "same"),
        job("new", "0 4 * * *", "fresh"),
    ]
}

#[tokio::test]
async fn test_reconcile_converges_mixed_table() {
    let fake = FakeCrontab::with_table(MIXED);
    let engine = engine(&fake);

    let report = engine.reconcile(&desired()).await.expect("reconcile");

    assert_eq!(report.deleted, vec!["stale"]);
    assert_eq!(report.updated, vec!["keep"]);
    assert_eq!(report.created, vec!["new"]);
    assert_eq!(report.unchanged, 1);
    assert!(report.is_success());
    assert_eq!(report.changes(), 3);
    assert_eq!(
        fake.table(),
        "MAILTO=ops@example.com\n\
         0 2 * * * v2 # CRONTOPUS:keep\n\
         0 3 * * * same # CRONTOPUS:same\n\
         30 4 * * * /usr/local/bin/rotate\n\
         0 4 * * * fresh # CRONTOPUS:new\n"
    );

    let listed = engine.list().await.expect("list");
    assert_eq!(listed, desired());
}

#[tokio::test]
async fn test_reconcile_applies_delete_then_update_then_create() {
    let fake = FakeCrontab::with_table(MIXED);
    let engine = engine(&fake);

    engine.reconcile(&desired()).await.expect("reconcile");

    let installs = fake.installs();
    assert_eq!(installs.len(), 3);
    assert!(!installs[0].contains("CRONTOPUS:stale"));
    assert!(installs[0].contains("v1 # CRONTOPUS:keep"));
    assert!(installs[1].contains("v2 # CRONTOPUS:keep"));
    assert!(!installs[1].contains("CRONTOPUS:new"));
    assert!(installs[2].contains("fresh # CRONTOPUS:new"));
}

#[tokio::test]
async fn test_second_reconcile_is_a_no_op() {
    let fake = FakeCrontab::with_table(MIXED);
    let engine = engine(&fake);
    engine.reconcile(&desired()).await.expect("first pass");
    let installs = fake.installs().len();

    let report = engine.reconcile(&desired()).await.expect("second pass");

    assert_eq!(report.changes(), 0);
    assert_eq!(report.unchanged, 3);
    assert_eq!(fake.installs().len(), installs);
}

#[tokio::test]
async fn test_reconcile_to_empty_removes_only_managed_lines() {
    let fake = FakeCrontab::with_table(MIXED);
    let engine = engine(&fake);

    let report = engine.reconcile(&[]).await.expect("reconcile");

    assert_eq!(report.deleted, vec!["stale", "keep", "same"]);
    assert_eq!(
        fake.table(),
        "MAILTO=ops@example.com\n30 4 * * * /usr/local/bin/rotate\n"
    );
}

#[tokio::test]
async fn test_plan_is_read_only() {
    let fake = FakeCrontab::with_table(MIXED);
    let engine = engine(&fake);

    let plan = engine.plan(&desired()).await.expect("plan");

    assert!(plan.has_drift());
    assert_eq!(plan.delete, vec!["stale"]);
    assert_eq!(plan.update.len(), 1);
    assert_eq!(plan.create.len(), 1);
    assert!(fake.installs().is_empty());
    assert_eq!(fake.table(), MIXED);
}

#[tokio::test]
async fn test_failing_entry_does_not_abort_the_pass() {
    let fake = FakeCrontab::empty();
    fake.reject_containing("broken", "\"-\":1: bad command\nerrors in crontab file, can't install.\n");
    let engine = engine(&fake);

    let report = engine
        .reconcile(&[
            job("bad", "0 1 * * *", "broken"),
            job("good", "0 2 * * *", "fine"),
        ])
        .await
        .expect("reconcile");

    assert_eq!(report.created, vec!["good"]);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.id, "bad");
    assert_eq!(failure.operation, Operation::Create);
    assert!(failure.error.contains("bad command"), "{}", failure.error);
    assert!(!report.is_success());
    assert_eq!(fake.table(), "0 2 * * * fine # CRONTOPUS:good\n");
}

#[tokio::test]
async fn test_invalid_desired_entry_is_reported_not_installed() {
    let fake = FakeCrontab::empty();
    let engine = engine(&fake);

    let report = engine
        .reconcile(&[
            job("ok", "@daily", "run"),
            job("two-lines", "@daily", "a\nb"),
        ])
        .await
        .expect("reconcile");

    assert_eq!(report.created, vec!["ok"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "two-lines");
    assert!(!fake.table().contains("two-lines"));
}

#[tokio::test]
async fn test_unavailable_tool_aborts_reconcile() {
    let fake = FakeCrontab::with_table(MIXED);
    fake.set_unavailable();
    let engine = engine(&fake);

    let err = engine.reconcile(&desired()).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Unavailable { .. }), "{err:?}");
}

#[tokio::test]
async fn test_tool_lost_mid_pass_aborts_reconcile() {
    let runner = ScriptedRunner::new()
        .on(
            "crontab -l",
            Reply::Ok(b"0 1 * * * old # CRONTOPUS:stale\n".to_vec()),
        )
        .on("crontab -", Reply::Missing);
    let engine = ReconciliationEngine::new(CrontabStore::new(&runner));

    let err = engine
        .reconcile(&[job("new", "@daily", "x")])
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    let writes = runner.calls().iter().filter(|c| *c == "crontab -").count();
    assert_eq!(writes, 1, "no further steps after the tool disappears");
}

#[tokio::test]
async fn test_duplicate_desired_ids_last_definition_wins() {
    let fake = FakeCrontab::empty();
    let engine = engine(&fake);

    let report = engine
        .reconcile(&[
            job("dup", "0 1 * * *", "first"),
            job("other", "0 2 * * *", "other"),
            job("dup", "0 5 * * *", "second"),
        ])
        .await
        .expect("reconcile");

    assert_eq!(
        report.anomalies,
        vec![Anomaly::DuplicateDesired {
            id: "dup".to_string(),
            occurrences: 2,
        }]
    );
    assert_eq!(
        fake.table(),
        "0 5 * * * second # CRONTOPUS:dup\n0 2 * * * other # CRONTOPUS:other\n"
    );
}

#[tokio::test]
async fn test_duplicate_managed_id_converges_to_one_entry() {
    let fake = FakeCrontab::with_table(
        "0 1 * * * a # CRONTOPUS:twice\n# keep me\n0 2 * * * b # CRONTOPUS:twice\n",
    );
    let engine = engine(&fake);
    let desired = vec![job("twice", "0 9 * * *", "c")];

    let report = engine.reconcile(&desired).await.expect("reconcile");

    assert!(report.anomalies.contains(&Anomaly::DuplicateManaged {
        id: "twice".to_string(),
        occurrences: 2,
    }));
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.updated, vec!["twice"]);
    assert_eq!(fake.table(), "0 9 * * * c # CRONTOPUS:twice\n# keep me\n");
    assert_eq!(engine.list().await.expect("list"), desired);

    let again = engine.reconcile(&desired).await.expect("second pass");
    assert_eq!(again.changes(), 0);
    assert!(again.anomalies.is_empty());
}

#[tokio::test]
async fn test_identical_duplicate_copies_are_collapsed() {
    let line = "@daily backup # CRONTOPUS:dup\n";
    let fake = FakeCrontab::with_table(&format!("{line}{line}"));
    let engine = engine(&fake);
    let desired = vec![job("dup", "@daily", "backup")];

    assert!(engine.plan(&desired).await.expect("plan").has_drift());
    let report = engine.reconcile(&desired).await.expect("reconcile");

    assert!(report.is_success());
    assert_eq!(fake.table(), line);
    assert_eq!(engine.list().await.expect("list"), desired);
}

#[tokio::test]
async fn test_external_edit_during_reconcile_is_a_failure_not_a_clobber() {
    let fake = FakeCrontab::with_table("0 1 * * * a # CRONTOPUS:one\n");
    // Read 1 plans, read 2 snapshots the remove, read 3 verifies it.
    fake.edit_after_read(2, "0 1 * * * a # CRONTOPUS:one\n@reboot /opt/user-added\n");
    let engine = engine(&fake);

    let report = engine.reconcile(&[]).await.expect("reconcile");

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("modified externally"));
    assert!(fake.installs().is_empty());
    assert!(fake.table().contains("/opt/user-added"));
}

#[tokio::test]
async fn test_scripted_read_failure_surfaces_raw_diagnostic() {
    let runner = ScriptedRunner::new().on(
        "crontab -l",
        Reply::Exit(1, "crontab: your UID isn't in the passwd file.\n".to_string()),
    );
    let engine = ReconciliationEngine::new(CrontabStore::new(&runner));

    let err = engine.list().await.unwrap_err();
    match err {
        SchedulerError::NativeRejection { code, output, .. } => {
            assert_eq!(code, 1);
            assert_eq!(output, "crontab: your UID isn't in the passwd file.\n");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_without_verification_writes_after_single_read() {
    let runner = ScriptedRunner::new()
        .on("crontab -l", Reply::Ok(Vec::new()))
        .on("crontab -", Reply::Ok(Vec::new()));
    let engine = ReconciliationEngine::with_options(
        CrontabStore::new(&runner),
        EngineOptions {
            verify_before_write: false,
        },
    );

    engine.add(&job("a", "@hourly", "tick")).await.expect("add");

    assert_eq!(runner.calls(), vec!["crontab -l", "crontab -"]);
    assert_eq!(
        runner.stdin_of("crontab -"),
        vec!["@hourly tick # CRONTOPUS:a\n"]
    );
}
