//! Engine operations against the Task Scheduler store.

use crontopus_agent::application::services::{AddOutcome, ReconciliationEngine};
use crontopus_agent::domain::error::SchedulerError;
use crontopus_agent::domain::job::JobEntry;
use crontopus_agent::domain::task::render_task_xml;
use crontopus_agent::infra::TaskSchedulerStore;

use crate::mocks::FakeSchtasks;

const FOREIGN_TASK: &str = r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo><Author>CONTOSO\admin</Author><Documentation>0 3 * * *</Documentation></RegistrationInfo>
  <Triggers><CalendarTrigger><StartBoundary>2024-01-01T03:00:00</StartBoundary><ScheduleByDay><DaysInterval>1</DaysInterval></ScheduleByDay></CalendarTrigger></Triggers>
  <Actions Context="Author"><Exec><Command>C:\backup\run.exe</Command><Arguments>--full</Arguments></Exec></Actions>
</Task>"#;

fn engine(fake: &FakeSchtasks) -> ReconciliationEngine<TaskSchedulerStore<&FakeSchtasks>> {
    ReconciliationEngine::new(TaskSchedulerStore::new(fake))
}

fn job(id: &str, schedule: &str, command: &str) -> JobEntry {
    JobEntry::new(id, schedule, command)
}

#[tokio::test]
async fn test_add_creates_task_in_managed_folder() {
    let fake = FakeSchtasks::new();
    fake.insert("\\Backup", FOREIGN_TASK);
    let engine = engine(&fake);
    let entry = job("job-1", "*/5 * * * *", "cmd.exe /c echo hi").with_name("Say hi");

    assert_eq!(engine.add(&entry).await.expect("add"), AddOutcome::Created);

    assert_eq!(
        fake.mutations(),
        vec!["schtasks /Create /TN \\Crontopus\\job-1 /XML <file> /F".to_string()]
    );
    let xml = fake.xml("\\Crontopus\\job-1").expect("task created");
    assert!(xml.contains("<Source>CRONTOPUS:job-1</Source>"));
    assert!(xml.contains("<Description>Say hi</Description>"));
    assert!(xml.contains("<Command>cmd.exe</Command>"));
    assert_eq!(fake.xml("\\Backup").as_deref(), Some(FOREIGN_TASK));

    assert_eq!(engine.list().await.expect("list"), vec![entry]);
}

#[tokio::test]
async fn test_remove_deletes_only_the_managed_task() {
    let fake = FakeSchtasks::new();
    fake.insert("\\Backup", FOREIGN_TASK);
    let engine = engine(&fake);
    engine
        .add(&job("job-1", "@daily", "a.exe"))
        .await
        .expect("add");

    assert!(engine.remove("job-1").await.expect("remove"));
    assert_eq!(fake.paths(), vec!["\\Backup".to_string()]);
    assert_eq!(fake.xml("\\Backup").as_deref(), Some(FOREIGN_TASK));
}

#[tokio::test]
async fn test_remove_absent_task_issues_no_delete() {
    let fake = FakeSchtasks::new();
    assert!(!engine(&fake).remove("ghost").await.expect("remove"));
    assert!(fake.mutations().is_empty());
}

#[tokio::test]
async fn test_update_recreates_changed_task_only() {
    let fake = FakeSchtasks::new();
    let engine = engine(&fake);
    engine.add(&job("a", "@daily", "a.exe")).await.expect("add a");
    engine.add(&job("b", "@hourly", "b.exe")).await.expect("add b");

    let outcome = engine
        .add(&job("a", "30 2 * * *", "a.exe --v2"))
        .await
        .expect("update a");

    assert_eq!(outcome, AddOutcome::Updated);
    let mutations = fake.mutations();
    assert_eq!(mutations.len(), 3);
    assert_eq!(
        mutations[2],
        "schtasks /Create /TN \\Crontopus\\a /XML <file> /F"
    );
    let listed = engine.list().await.expect("list");
    assert!(listed.contains(&job("a", "30 2 * * *", "a.exe --v2")));
    assert!(listed.contains(&job("b", "@hourly", "b.exe")));
}

#[tokio::test]
async fn test_task_with_mismatched_marker_is_foreign() {
    let fake = FakeSchtasks::new();
    // Copied by hand from another job: the marker names a different id.
    let copied = render_task_xml(&job("job-1", "@daily", "a.exe")).expect("xml");
    fake.insert("\\Crontopus\\job-2", &copied);
    let engine = engine(&fake);

    assert!(engine.list().await.expect("list").is_empty());
    assert!(!engine.remove("job-2").await.expect("remove"));
    assert!(fake.mutations().is_empty());
}

#[tokio::test]
async fn test_utf16_native_output_is_decoded() {
    let fake = FakeSchtasks::new();
    let xml = render_task_xml(&job("job-1", "0 9 * * 1,5", "a.exe -x")).expect("xml");
    fake.insert("\\Crontopus\\job-1", &xml);
    fake.answer_utf16();

    assert_eq!(
        engine(&fake).list().await.expect("list"),
        vec![job("job-1", "0 9 * * 1,5", "a.exe -x")]
    );
}

#[tokio::test]
async fn test_untranslatable_schedule_is_rejected_before_schtasks() {
    let fake = FakeSchtasks::new();
    let err = engine(&fake)
        .add(&job("a", "0 0 1 1 *", "a.exe"))
        .await
        .expect_err("unsupported");
    assert!(matches!(err, SchedulerError::InvalidEntry { .. }));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_native_rejection_is_surfaced() {
    let fake = FakeSchtasks::new();
    fake.reject_containing(
        "evil.exe",
        "ERROR: Access is denied.\r\n",
    );
    let err = engine(&fake)
        .add(&job("a", "@daily", "evil.exe"))
        .await
        .expect_err("rejected");
    match err {
        SchedulerError::NativeRejection { output, .. } => {
            assert_eq!(output, "ERROR: Access is denied.\r\n");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(fake.paths().is_empty());
}

#[tokio::test]
async fn test_discover_skips_system_and_managed_tasks() {
    let fake = FakeSchtasks::new();
    fake.insert("\\Backup", FOREIGN_TASK);
    fake.insert("\\Microsoft\\Windows\\Defrag\\ScheduledDefrag", FOREIGN_TASK);
    let engine = engine(&fake);
    engine.add(&job("a", "@daily", "a.exe")).await.expect("add");

    let found = engine.discover().await.expect("discover");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "\\Backup");
    assert_eq!(found[0].schedule, "0 3 * * *");
    assert_eq!(found[0].command, "C:\\backup\\run.exe --full");
}

#[tokio::test]
async fn test_custom_folder() {
    let fake = FakeSchtasks::new();
    let engine = ReconciliationEngine::new(TaskSchedulerStore::with_folder(&fake, "\\Ops\\Jobs\\"));
    engine.add(&job("a", "@hourly", "a.exe")).await.expect("add");
    assert_eq!(fake.paths(), vec!["\\Ops\\Jobs\\a".to_string()]);
    assert_eq!(engine.list().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_ids_differing_only_in_case_are_rejected() {
    let fake = FakeSchtasks::new();
    fake.ignore_case();
    let engine = engine(&fake);
    let original = job("Backup", "@daily", "a.exe");
    engine.add(&original).await.expect("add");

    let err = engine
        .add(&job("backup", "@hourly", "b.exe"))
        .await
        .expect_err("case-only clash");

    match err {
        SchedulerError::InvalidEntry { id, reason } => {
            assert_eq!(id, "backup");
            assert!(reason.contains("'Backup'"), "{reason}");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fake.mutations().len(), 1);
    assert_eq!(fake.paths(), vec!["\\Crontopus\\Backup".to_string()]);
    assert_eq!(engine.list().await.expect("list"), vec![original]);
}

#[tokio::test]
async fn test_reconcile_reports_case_clash_and_keeps_first_id() {
    let fake = FakeSchtasks::new();
    fake.ignore_case();
    let engine = engine(&fake);
    let first = job("Backup", "@daily", "a.exe");

    let report = engine
        .reconcile(&[first.clone(), job("backup", "@hourly", "b.exe")])
        .await
        .expect("reconcile");

    assert_eq!(report.created, vec!["Backup"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "backup");
    assert_eq!(engine.list().await.expect("list"), vec![first]);
}
