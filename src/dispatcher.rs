use std::path::{Path, PathBuf};
use tracing::debug;
use crate::catalog::Job;
use crate::config::{Mode, RunConfig, OUTPUT_EXTENSION};
use crate::error::JobResult;
use crate::fileops::{self, ImageDecoder};

/// Что было сделано с файлом
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    Converted { output: PathBuf, original_deleted: bool },
    Copied { output: PathBuf },
    Skipped,
}

/// Обрабатывает одну задачу согласно режиму запуска.
///
/// Ошибки FileOps возвращаются как есть: путь и причина уже внутри.
pub fn process(job: &Job, config: &RunConfig, decoder: &dyn ImageDecoder) -> JobResult<JobAction> {
    let convertible = job.is_convertible();

    match config.mode {
        Mode::InPlace => {
            if !convertible {
                return Ok(JobAction::Skipped);
            }

            let output = replace_extension(&job.source_path);
            convert(job, &output, config, decoder)?;

            if config.delete_originals {
                fileops::delete_file(&job.source_path, config.dry_run)?;
            }
            let original_deleted = config.delete_originals && !config.dry_run;

            Ok(JobAction::Converted { output, original_deleted })
        }

        // Некодируемые файлы в этом режиме не попадают в назначение
        Mode::ConvertToDestination => {
            if !convertible {
                return Ok(JobAction::Skipped);
            }

            let output = replace_extension(&destination_path(job, config));
            convert(job, &output, config, decoder)?;

            Ok(JobAction::Converted { output, original_deleted: false })
        }

        Mode::CopyAndConvert => {
            let destination = destination_path(job, config);

            if convertible {
                let output = replace_extension(&destination);
                convert(job, &output, config, decoder)?;
                Ok(JobAction::Converted { output, original_deleted: false })
            } else {
                fileops::copy_file_verbatim(&job.source_path, &destination, config.dry_run)?;
                Ok(JobAction::Copied { output: destination })
            }
        }
    }
}

/// Путь задачи в зеркальном дереве назначения (для InPlace это сам источник)
pub fn destination_path(job: &Job, config: &RunConfig) -> PathBuf {
    match &config.dest_root {
        Some(dest_root) if config.mode.requires_destination() => dest_root.join(&job.relative_path),
        _ => job.source_path.clone(),
    }
}

/// Заменяет последнее расширение на `.jpg` независимо от регистра исходного
pub fn replace_extension(path: &Path) -> PathBuf {
    path.with_extension(OUTPUT_EXTENSION)
}

fn convert(job: &Job, output: &Path, config: &RunConfig, decoder: &dyn ImageDecoder) -> JobResult<()> {
    debug!("Converting {} -> {}", job.source_path.display(), output.display());

    // Декодирование выполняется и при dry run
    let image = decoder.decode(&job.source_path)?;
    fileops::encode_image(&image, output, config.quality, config.dry_run)
}
