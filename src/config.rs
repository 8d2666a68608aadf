use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::{ConfigError, ConfigResult};

/// Режим обработки дерева файлов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// JPEG кладется рядом с оригиналом
    InPlace,
    /// В зеркальное дерево назначения попадают только сконвертированные файлы
    ConvertToDestination,
    /// Полная копия дерева, HEIC конвертируются по пути
    CopyAndConvert,
}

impl Mode {
    /// Выбор режима по номеру пункта меню (1, 2, 3)
    pub fn from_choice(choice: u32) -> Option<Self> {
        match choice {
            1 => Some(Mode::InPlace),
            2 => Some(Mode::ConvertToDestination),
            3 => Some(Mode::CopyAndConvert),
            _ => None,
        }
    }

    /// Нужна ли для режима директория назначения
    pub fn requires_destination(&self) -> bool {
        !matches!(self, Mode::InPlace)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::InPlace => "in-place",
            Mode::ConvertToDestination => "convert",
            Mode::CopyAndConvert => "copy",
        };
        f.write_str(name)
    }
}

/// Параметры одного запуска. Создается один раз, дальше только читается
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub quality: u8,
    pub worker_count: usize,
    pub dry_run: bool,
    pub delete_originals: bool,
    pub source_root: PathBuf,
    pub dest_root: Option<PathBuf>,
}

impl RunConfig {
    /// Валидирует параметры и собирает конфигурацию запуска
    pub fn new(
        mode: Mode,
        source_root: &Path,
        dest_root: Option<PathBuf>,
        quality: i64,
        worker_count: usize,
        dry_run: bool,
        delete_originals: bool,
    ) -> ConfigResult<Self> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(ConfigError::InvalidQuality { quality });
        }

        if worker_count == 0 || worker_count > MAX_WORKERS {
            return Err(ConfigError::invalid_workers(worker_count, MAX_WORKERS));
        }

        match (mode.requires_destination(), dest_root.is_some()) {
            (true, false) => {
                return Err(ConfigError::DestinationRequired { mode: mode.to_string() });
            }
            (false, true) => {
                return Err(ConfigError::DestinationNotAllowed { mode: mode.to_string() });
            }
            _ => {}
        }

        if !source_root.exists() {
            return Err(ConfigError::source_not_found(source_root.to_path_buf()));
        }

        if !source_root.is_dir() {
            return Err(ConfigError::invalid_arg(
                format!("Source path is not a directory: {}", source_root.display())
            ));
        }

        let source_root = source_root.canonicalize()
            .map_err(|_| ConfigError::invalid_arg(
                format!("Cannot resolve source path: {}", source_root.display())
            ))?;

        if let Some(dest) = &dest_root {
            if dest.exists() && !dest.is_dir() {
                return Err(ConfigError::invalid_arg(
                    format!("Destination path exists but is not a directory: {}", dest.display())
                ));
            }

            // Несуществующее назначение не может совпадать с источником
            if let Ok(resolved) = dest.canonicalize() {
                if resolved == source_root {
                    return Err(ConfigError::DestinationIsSource { path: resolved });
                }
            }
        }

        Ok(Self {
            mode,
            quality: quality as u8,
            worker_count,
            dry_run,
            delete_originals,
            source_root,
            dest_root,
        })
    }

    /// Количество воркеров по умолчанию (количество CPU ядер)
    pub fn default_worker_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS)
    }
}

// Константы приложения

/// Качество JPEG по умолчанию
pub const DEFAULT_QUALITY: i64 = 90;

pub const MIN_QUALITY: i64 = 1;
pub const MAX_QUALITY: i64 = 100;

/// Максимально допустимое количество воркеров
pub const MAX_WORKERS: usize = 64;

/// Расширения конвертируемых файлов (в нижнем регистре)
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Расширение выходных файлов
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Префикс временных файлов рядом с финальным выходом
pub const TEMP_FILE_PREFIX: &str = ".heic2jpeg-";

/// Фильтр логирования по умолчанию
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Фильтр логирования в тихом режиме
pub const QUIET_LOG_FILTER: &str = "warn";

/// Коды возврата приложения
pub mod exit_codes {
    /// Успешное завершение
    pub const SUCCESS: i32 = 0;

    /// Критическая ошибка (неправильные аргументы, источник недоступен и т.д.)
    pub const CRITICAL_ERROR: i32 = 1;

    /// Завершено с ошибками в отдельных файлах
    pub const COMPLETED_WITH_ERRORS: i32 = 2;
}

/// Сообщения для пользователя
pub mod messages {
    pub const GATHERING_FILES: &str = "Gathering files...";

    pub const PROCESSING_STARTED: &str = "Starting conversion...";

    pub const NO_FILES_FOUND: &str = "No files found in the source directory.";

    pub const NO_CONVERTIBLE_FILES: &str = "No HEIC files found. Nothing to convert in place.";

    pub const ALL_DONE: &str = "All done!";

    pub const CANCELLED: &str = "Cancelled.";
}
