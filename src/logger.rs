use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn, error, debug};
use tracing_subscriber::EnvFilter;
use crate::catalog::Job;
use crate::config::{exit_codes, RunConfig, DEFAULT_LOG_FILTER, QUIET_LOG_FILTER};
use crate::dispatcher::JobAction;
use crate::error::{JobError, LoggingError, LoggingResult};
use crate::fileops;
use crate::worker::RunResult;

/// Инициализирует систему логирования. `RUST_LOG` имеет приоритет над
/// фильтром по умолчанию
pub fn initialize_logging(quiet: bool) -> LoggingResult<()> {
    let default_filter = if quiet { QUIET_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|_| LoggingError::InvalidFilter {
            filter: default_filter.to_string(),
        })?,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggingError::InitializationFailed)?;

    debug!("Logging initialized with default filter '{}'", default_filter);

    Ok(())
}

/// Логирование одной задачи от старта до результата
pub struct JobLogger {
    name: String,
    start_time: Instant,
}

impl JobLogger {
    /// Создает новый экземпляр и логирует начало обработки файла
    pub fn start_processing(job: &Job) -> Self {
        let name = job.display_name();
        debug!("START processing {}", name);

        Self {
            name,
            start_time: Instant::now(),
        }
    }

    /// Логирует успешное завершение обработки
    pub fn log_success(&self, action: &JobAction) {
        let duration = format_duration(self.start_time.elapsed());
        match action {
            JobAction::Converted { output, original_deleted } => {
                debug!(
                    "CONVERTED: {} -> {} ({}){}",
                    self.name,
                    file_name(output),
                    duration,
                    if *original_deleted { ", original deleted" } else { "" }
                );
            }
            JobAction::Copied { output } => {
                debug!("COPIED: {} -> {} ({})", self.name, output.display(), duration);
            }
            JobAction::Skipped => {
                debug!("SKIPPED: {}", self.name);
            }
        }
    }

    /// Логирует ошибку обработки файла
    pub fn log_error(&self, error: &JobError) {
        warn!("ERROR: {} ({})", self.name, format_duration(self.start_time.elapsed()));
        debug!("ERRMSG: {}", error);
    }
}

/// Сводка запуска для консоли; по ней же вычисляется код выхода
pub struct RunSummary {
    pub total_files: usize,
    pub convertible_files: usize,
    pub processed: usize,
    pub converted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub dry_run: bool,
    pub total_duration: Duration,
    pub failed_files: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Собирает сводку из результата пула
    pub fn from_run(result: &RunResult, total_files: usize, convertible_files: usize, dry_run: bool) -> Self {
        Self {
            total_files,
            convertible_files,
            processed: result.processed_count,
            converted: result.converted_count,
            copied: result.copied_count,
            skipped: result.skipped_count,
            dry_run,
            total_duration: result.total_duration,
            failed_files: result
                .failures
                .iter()
                .map(|f| (f.error.path().clone(), f.error.to_string()))
                .collect(),
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_files.len()
    }

    /// Выводит финальный отчет в консоль и лог
    pub fn print_final_report(&self) {
        info!("=== PROCESSING COMPLETED ===");
        info!(
            "Processed: {} of {} (converted {}, copied {}, skipped {}, failed {})",
            self.processed, self.total_files, self.converted, self.copied, self.skipped, self.failed()
        );
        info!("Total time: {}", format_duration(self.total_duration));

        for (input, message) in &self.failed_files {
            error!("  ✗ {}: {}", input.display(), message);
        }

        println!("\n=== SUMMARY{} ===", if self.dry_run { " (dry run)" } else { "" });
        println!("Files found:      {} ({} HEIC)", self.total_files, self.convertible_files);
        println!("Processed:        {}", self.processed);
        println!("Converted:        {}", self.converted);
        println!("Copied:           {}", self.copied);
        println!("Skipped:          {}", self.skipped);
        println!("Failed:           {}", self.failed());
        println!("Total time:       {}", format_duration(self.total_duration));

        if !self.failed_files.is_empty() {
            println!("\nErrors occurred:");
            for (_, message) in &self.failed_files {
                println!("  ✗ {}", message);
            }
        }
    }

    /// Возвращает соответствующий код выхода программы
    pub fn exit_code(&self) -> i32 {
        if self.failed_files.is_empty() {
            exit_codes::SUCCESS
        } else {
            exit_codes::COMPLETED_WITH_ERRORS
        }
    }
}

/// Логирует информацию о запуске
pub fn log_startup_info(config: &RunConfig) {
    info!("=== HEIC2JPEG STARTED at {} ===", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("Mode: {}", config.mode);
    info!("Source directory: {}", config.source_root.display());
    if let Some(dest) = &config.dest_root {
        info!("Destination directory: {}", dest.display());
    }
    info!("Workers: {}", config.worker_count);
    info!("JPEG quality: {}", config.quality);
    info!("Dry run: {}, delete originals: {}", config.dry_run, config.delete_originals);

    if fileops::NATIVE_HEIF {
        info!("Decoder: {}", fileops::decoder_description());
    } else {
        warn!("Decoder: {}", fileops::decoder_description());
    }
}

/// Логирует информацию о найденных файлах
pub fn log_files_found(file_count: usize, convertible_count: usize) {
    if file_count == 0 {
        warn!("{}", crate::config::messages::NO_FILES_FOUND);
    } else {
        info!("Found {} files ({} HEIC)", file_count, convertible_count);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().to_string()
}

/// Длительность для отчета: миллисекунды, секунды с десятыми или м:сс
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{:.1}s", duration.as_secs_f64());
    }

    format!("{}:{:02} min", secs / 60, secs % 60)
}
