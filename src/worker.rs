use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, error, debug};

use crate::catalog::Job;
use crate::config::RunConfig;
use crate::dispatcher::{self, JobAction};
use crate::error::JobError;
use crate::fileops::ImageDecoder;
use crate::logger::JobLogger;

/// Колбэк прогресса: (завершено, всего)
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Ошибка одной задачи вместе с самой задачей
#[derive(Debug)]
pub struct JobFailure {
    pub job: Job,
    pub error: JobError,
}

/// Отчет воркера о завершенной задаче
#[derive(Debug)]
struct JobReport {
    job: Job,
    outcome: Result<JobAction, JobError>,
}

/// Итог запуска. Ошибки идут в порядке поступления, не в порядке обхода
#[derive(Debug)]
pub struct RunResult {
    pub processed_count: usize,
    pub converted_count: usize,
    pub copied_count: usize,
    pub skipped_count: usize,
    pub failures: Vec<JobFailure>,
    pub total_duration: Duration,
}

impl RunResult {
    /// Создает пустой результат
    pub fn empty() -> Self {
        Self {
            processed_count: 0,
            converted_count: 0,
            copied_count: 0,
            skipped_count: 0,
            failures: Vec::new(),
            total_duration: Duration::ZERO,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record(&mut self, report: JobReport) {
        self.processed_count += 1;
        match report.outcome {
            Ok(JobAction::Converted { .. }) => self.converted_count += 1,
            Ok(JobAction::Copied { .. }) => self.copied_count += 1,
            Ok(JobAction::Skipped) => self.skipped_count += 1,
            Err(error) => self.failures.push(JobFailure { job: report.job, error }),
        }
    }
}

/// Фиксированный пул воркеров над общей очередью задач
pub struct WorkerPool {
    worker_count: usize,
    decoder: Arc<dyn ImageDecoder>,
    progress: Option<ProgressCallback>,
}

impl WorkerPool {
    /// Создает пул; количество воркеров не меньше одного
    pub fn new(worker_count: usize, decoder: Arc<dyn ImageDecoder>) -> Self {
        let worker_count = worker_count.max(1);
        info!("Creating worker pool with {} workers", worker_count);

        Self {
            worker_count,
            decoder,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Возвращает количество воркеров
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Прогоняет все задачи до конца. Ошибка одной задачи не отменяет остальные
    pub async fn run(&self, jobs: Vec<Job>, config: &RunConfig) -> RunResult {
        let total = jobs.len();
        let start_time = Instant::now();

        info!("Starting processing of {} jobs on {} workers", total, self.worker_count());

        if jobs.is_empty() {
            return RunResult::empty();
        }

        // Очередь заполняется целиком до старта воркеров и сразу закрывается
        let (job_tx, job_rx) = mpsc::unbounded_channel::<Job>();
        for job in jobs {
            if job_tx.send(job).is_err() {
                error!("Job queue closed before seeding finished");
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<JobReport>();
        let config = Arc::new(config.clone());

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.worker_count);

        for worker_id in 0..self.worker_count {
            let job_rx = Arc::clone(&job_rx);
            let report_tx = report_tx.clone();
            let config = Arc::clone(&config);
            let decoder = Arc::clone(&self.decoder);

            handles.push(tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    // Блокировка держится только на время взятия задачи
                    let next = job_rx.lock().await.recv().await;
                    let Some(job) = next else { break };

                    let report = run_job(job, Arc::clone(&config), Arc::clone(&decoder)).await;

                    if let Err(e) = report_tx.send(report) {
                        error!("Failed to send job report: {}", e);
                    }
                }

                debug!("Worker {} finished", worker_id);
            }));
        }

        // Получатель узнает о конце, когда все воркеры уронят свои отправители
        drop(report_tx);

        // Единственный потребитель отчетов: счетчик растет строго по одному
        let mut result = RunResult::empty();

        while let Some(report) = report_rx.recv().await {
            result.record(report);

            let completed = result.processed_count;
            debug!("Progress: {}/{}", completed, total);
            if let Some(progress) = &self.progress {
                progress(completed, total);
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker join error: {}", e);
            }
        }

        result.total_duration = start_time.elapsed();

        info!(
            "Completed {} jobs ({} failed) in {:?}",
            result.processed_count,
            result.failures.len(),
            result.total_duration
        );

        result
    }
}

/// Выполняет одну задачу в blocking-пуле tokio
async fn run_job(job: Job, config: Arc<RunConfig>, decoder: Arc<dyn ImageDecoder>) -> JobReport {
    let task_job = job.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let logger = JobLogger::start_processing(&task_job);
        let outcome = dispatcher::process(&task_job, &config, decoder.as_ref());

        match &outcome {
            Ok(action) => logger.log_success(action),
            Err(e) => logger.log_error(e),
        }

        outcome
    })
    .await
    .unwrap_or_else(|e| {
        Err(JobError::Aborted {
            path: job.source_path.clone(),
            reason: e.to_string(),
        })
    });

    JobReport { job, outcome }
}
