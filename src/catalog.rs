use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use tracing::debug;
use crate::config::CONVERTIBLE_EXTENSIONS;
use crate::error::{CatalogError, CatalogResult};

/// Один файл источника вместе с путем относительно корня обхода
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
}

impl Job {
    pub fn new(source_path: PathBuf, relative_path: PathBuf) -> Self {
        Self { source_path, relative_path }
    }

    /// Подлежит ли файл конвертации
    pub fn is_convertible(&self) -> bool {
        is_convertible(&self.source_path)
    }

    /// Возвращает имя файла для отображения
    pub fn display_name(&self) -> String {
        self.relative_path.display().to_string()
    }
}

/// Рекурсивно собирает все обычные файлы под `root`.
///
/// Ошибки на отдельных записях молча пропускаются; фатален только
/// недоступный корень. Порядок стабилен: записи сортируются по имени.
pub fn enumerate(root: &Path) -> CatalogResult<Vec<Job>> {
    debug!("Enumerating files in: {}", root.display());

    let mut jobs = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(CatalogError::Enumeration {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_path = relative.to_path_buf();
        jobs.push(Job::new(entry.into_path(), relative_path));
    }

    debug!("Found {} files", jobs.len());
    Ok(jobs)
}

/// `.heic` / `.heif` в любом регистре
pub fn is_convertible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            CONVERTIBLE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

pub fn count_convertible(jobs: &[Job]) -> usize {
    jobs.iter().filter(|job| job.is_convertible()).count()
}
