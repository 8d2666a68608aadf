use std::path::PathBuf;
use thiserror::Error;

/// Основной тип ошибки для всего приложения
#[derive(Error, Debug)]
pub enum Heic2JpegError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ошибки конфигурации и CLI аргументов
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Source directory does not exist: {path}")]
    SourceDirectoryNotFound { path: PathBuf },

    #[error("Invalid worker count: {count} (must be > 0 and <= {max})")]
    InvalidWorkerCount { count: usize, max: usize },

    #[error("Invalid JPEG quality: {quality} (must be between 1 and 100)")]
    InvalidQuality { quality: i64 },

    #[error("Destination directory is required for mode '{mode}'")]
    DestinationRequired { mode: String },

    #[error("Destination directory is not used by mode '{mode}'")]
    DestinationNotAllowed { mode: String },

    #[error("Destination directory is the source directory: {path}")]
    DestinationIsSource { path: PathBuf },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Ошибка обхода исходного дерева (фатальна для всего запуска)
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot enumerate source directory {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Ошибки обработки одного файла; не прерывают остальные задачи
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Cannot encode JPEG {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot copy {src} -> {dst}: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Processing of {path} aborted: {reason}")]
    Aborted { path: PathBuf, reason: String },
}

/// Ошибки системы логирования
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {filter}")]
    InvalidFilter { filter: String },

    #[error("Log subscriber initialization failed")]
    InitializationFailed,
}

/// Type aliases для упрощения использования
pub type Result<T> = std::result::Result<T, Heic2JpegError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type JobResult<T> = std::result::Result<T, JobError>;
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

/// Helper функции для создания ошибок с контекстом
impl ConfigError {
    pub fn source_not_found(path: PathBuf) -> Self {
        Self::SourceDirectoryNotFound { path }
    }

    pub fn invalid_workers(count: usize, max: usize) -> Self {
        Self::InvalidWorkerCount { count, max }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }
}

impl JobError {
    pub fn decode(path: impl Into<PathBuf>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Decode { path: path.into(), source: source.into() }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    /// Путь, к которому относится ошибка (для отчета)
    pub fn path(&self) -> &PathBuf {
        match self {
            JobError::Decode { path, .. } => path,
            JobError::Encode { path, .. } => path,
            JobError::Write { path, .. } => path,
            JobError::Copy { src, .. } => src,
            JobError::Delete { path, .. } => path,
            JobError::Aborted { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_carries_path_and_cause() {
        let err = JobError::write(
            "/out/a.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(err.path(), &PathBuf::from("/out/a.jpg"));
        let message = err.to_string();
        assert!(message.contains("/out/a.jpg"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_config_error_converts_into_app_error() {
        let err: Heic2JpegError = ConfigError::invalid_workers(0, 64).into();
        assert!(err.to_string().contains("Invalid worker count: 0"));
    }
}
