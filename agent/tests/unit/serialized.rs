//! Serialized access to one engine.

use crontopus_agent::application::services::{
    AddOutcome, ReconciliationEngine, SerializedEngine,
};
use crontopus_agent::domain::job::JobEntry;
use crontopus_agent::infra::CrontabStore;

use crate::mocks::FakeCrontab;

fn serialized(fake: &FakeCrontab) -> SerializedEngine<CrontabStore<&FakeCrontab>> {
    SerializedEngine::new(ReconciliationEngine::new(CrontabStore::new(fake)))
}

#[tokio::test]
async fn test_concurrent_adds_both_land() {
    let fake = FakeCrontab::with_table("0 3 * * * /usr/bin/backup.sh\n");
    let engine = serialized(&fake);
    let other = engine.clone();

    let a = JobEntry::new("a", "@daily", "first");
    let b = JobEntry::new("b", "@hourly", "second");
    let (ra, rb) = tokio::join!(engine.add(&a), other.add(&b));

    assert_eq!(ra.expect("add a"), AddOutcome::Created);
    assert_eq!(rb.expect("add b"), AddOutcome::Created);
    let listed = engine.list().await.expect("list");
    assert_eq!(listed.len(), 2);
    assert!(fake.table().starts_with("0 3 * * * /usr/bin/backup.sh\n"));
}

#[tokio::test]
async fn test_concurrent_add_and_remove_do_not_conflict() {
    let fake = FakeCrontab::with_table("@daily old # CRONTOPUS:old\n");
    let engine = serialized(&fake);

    let new = JobEntry::new("new", "@weekly", "fresh");
    let (removed, added) = tokio::join!(engine.remove("old"), engine.add(&new));

    assert!(removed.expect("remove"));
    assert_eq!(added.expect("add"), AddOutcome::Created);
    assert_eq!(fake.table(), "@weekly fresh # CRONTOPUS:new\n");
}

#[tokio::test]
async fn test_reconcile_if_drifted_skips_converged_store() {
    let fake = FakeCrontab::empty();
    let engine = serialized(&fake);
    let desired = vec![JobEntry::new("a", "@daily", "run")];

    let first = engine
        .reconcile_if_drifted(&desired)
        .await
        .expect("first pass");
    assert_eq!(first.map(|r| r.created), Some(vec!["a".to_string()]));

    let installs = fake.installs().len();
    let second = engine
        .reconcile_if_drifted(&desired)
        .await
        .expect("second pass");
    assert!(second.is_none());
    assert_eq!(fake.installs().len(), installs);
}

#[tokio::test]
async fn test_get_returns_managed_entry() {
    let fake = FakeCrontab::with_table("*/5 * * * * echo hi # CRONTOPUS:job-1\n");
    let engine = serialized(&fake);

    let found = engine.get("job-1").await.expect("get");
    assert_eq!(found, Some(JobEntry::new("job-1", "*/5 * * * *", "echo hi")));
    assert_eq!(engine.get("missing").await.expect("get"), None);
}
