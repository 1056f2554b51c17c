//! End-to-end job runs through real child processes.

#![cfg(unix)]

mod common;

use common::harness::{wait_for_history, wait_for_terminal};
use common::remote::IncomeMode;
use common::{FakeRemote, TestHarness};

use reportd::config::SecretSource;
use reportd::runner::FileSize;
use reportd::{CreateJobOptions, JobStatus, ReportFormat};

#[tokio::test]
async fn test_csv_job_completes_and_is_recorded() {
    let harness = TestHarness::new();
    let manager = harness.manager();

    let created = manager.create_job(ReportFormat::Csv, CreateJobOptions::default());
    assert_eq!(created.status, JobStatus::Processing);
    assert_eq!(created.current_step.number, 1);
    assert_eq!(created.current_step.total, 4);

    let job = wait_for_terminal(&manager, &created.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error, None);
    assert_eq!(job.progress.percentage, 100);
    assert_eq!(job.current_step.total, 4);
    assert!(job.timing.end_time.is_some());

    let file_name = job.result.file_name.clone().unwrap();
    assert!(file_name.ends_with(".csv"));
    assert_eq!(job.result.record_count, Some(1));
    assert_eq!(job.result.file_size, Some(FileSize::Bytes(8)));
    assert_eq!(
        job.result.download_url.as_deref(),
        Some("/downloads/relatorio.csv")
    );
    assert!(harness.downloads_dir().join(&file_name).is_file());

    let entry = wait_for_history(&manager, &job.job_id).await;
    assert_eq!(entry.status, JobStatus::Completed);
    assert_eq!(entry.file_name.as_deref(), Some("relatorio.csv"));
    assert_eq!(entry.record_count, Some(1));
    assert_eq!(entry.error, None);
}

#[tokio::test]
async fn test_ingest_failure_aborts_job() {
    let harness = TestHarness::new();
    harness.write_script("ingest.sh", "echo 'bad input file' >&2\nexit 3\n");
    harness.write_script("generate.sh", "touch should_not_exist\n");
    let manager = harness.manager();

    let created = manager.create_job(ReportFormat::Txt, CreateJobOptions::default());
    let job = wait_for_terminal(&manager, &created.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.clone().unwrap();
    assert!(error.contains("Backend Insert"), "{error}");
    assert!(error.contains("exit code 3"), "{error}");
    assert!(error.contains("bad input file"), "{error}");
    assert!(job.result.is_empty());
    assert_eq!(job.progress.percentage, 0);
    assert!(!harness.root().join("backend/should_not_exist").exists());

    let entry = wait_for_history(&manager, &job.job_id).await;
    assert_eq!(entry.status, JobStatus::Failed);
    assert_eq!(entry.error.as_deref(), Some(error.as_str()));
    assert_eq!(entry.file_name, None);
}

#[tokio::test]
async fn test_generation_without_result_object_fails() {
    let harness = TestHarness::new();
    harness.write_script("generate.sh", "echo 'done, no json here'\n");
    let manager = harness.manager();

    let created = manager.create_job(ReportFormat::Xls, CreateJobOptions::default());
    let job = wait_for_terminal(&manager, &created.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("Invalid output from Report Generation"));
    assert!(job.result.is_empty());
    assert_eq!(job.progress.percentage, 50);
}

#[tokio::test]
async fn test_missing_report_script_fails_at_generation() {
    let mut harness = TestHarness::new();
    harness.settings.scripts.generate = None;
    let manager = harness.manager();

    let created = manager.create_job(ReportFormat::Csv, CreateJobOptions::default());
    let job = wait_for_terminal(&manager, &created.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Missing required setting: REPORT_SCRIPT")
    );
    assert_eq!(job.current_step.number, 3);
}

#[tokio::test]
async fn test_sync_before_run_fetches_then_generates() {
    let remote = FakeRemote::start(IncomeMode::Paginated).await;
    let mut harness = TestHarness::new();
    harness.settings.remote.base_url = Some(remote.base_url());
    harness.settings.remote.token = SecretSource::from_value("abc");
    harness.settings.remote.page_size = 2;
    let manager = harness.manager();

    let options = CreateJobOptions {
        sync_before_run: true,
    };
    let created = manager.create_job(ReportFormat::Csv, options);
    assert_eq!(created.current_step.total, 5);

    let job = wait_for_terminal(&manager, &created.job_id).await;
    assert_eq!(job.status, JobStatus::Completed, "{:?}", job.error);
    assert_eq!(job.current_step.total, 5);
    assert!(harness.root().join("data/SI_DATAPAGTO.json").is_file());

    let entry = wait_for_history(&manager, &job.job_id).await;
    assert!(entry.sync_before_run);
}

#[tokio::test]
async fn test_sync_failure_fails_job_before_scripts() {
    let remote = FakeRemote::start(IncomeMode::ServerError).await;
    let mut harness = TestHarness::new();
    harness.settings.remote.base_url = Some(remote.base_url());
    harness.settings.remote.token = SecretSource::from_value("abc");
    harness.write_script("ingest.sh", "touch ingest_ran\n");
    let manager = harness.manager();

    let options = CreateJobOptions {
        sync_before_run: true,
    };
    let created = manager.create_job(ReportFormat::Csv, options);
    let job = wait_for_terminal(&manager, &created.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("500"));
    assert_eq!(job.progress.percentage, 0);
    assert!(!harness.root().join("backend/ingest_ran").exists());
}
