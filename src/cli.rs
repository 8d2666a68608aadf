use clap::error::ErrorKind;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use crate::config::{Mode, RunConfig, DEFAULT_QUALITY};
use crate::error::ConfigResult;

const LONG_ABOUT: &str = "\
Converts HEIC/HEIF images to JPEG across a whole directory tree.

Modes:
  --inplace   JPEGs are written next to the originals; the tree keeps its layout
  --convert   Only HEIC files are converted into the destination tree;
              other files are not copied
  --copy      The whole tree is copied to the destination, HEIC files
              are converted along the way

Run without arguments, or with an unrecognised subcommand, for the guided mode.";

#[cfg(feature = "heif")]
const DECODER_NOTE: &str = "HEIC/HEIF decoding: libheif (native).";

#[cfg(not(feature = "heif"))]
const DECODER_NOTE: &str = "HEIC/HEIF decoding: NOT AVAILABLE. This build has no libheif and only \
decodes files whose content the image crate recognises. Rebuild with the default features.";

/// HEIC -> JPEG converter
#[derive(Parser, Debug)]
#[command(
    name = "heic2jpeg",
    version = env!("CARGO_PKG_VERSION"),
    about = "Batch HEIC to JPEG converter that preserves folder structure",
    long_about = LONG_ABOUT,
    after_help = DECODER_NOTE
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run non-interactively with flags
    Cli(CliArgs),
    /// Step-by-step interactive mode (default)
    Guided,
}

/// Флаги неинтерактивного режима
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("mode").required(true).args(["inplace", "convert", "copy"])))]
pub struct CliArgs {
    /// Convert in place, next to the originals
    #[arg(long)]
    pub inplace: bool,

    /// Convert HEIC files into the destination tree
    #[arg(long)]
    pub convert: bool,

    /// Copy the whole tree into the destination, converting HEIC files
    #[arg(long)]
    pub copy: bool,

    /// Source directory
    #[arg(short, long, value_name = "DIR")]
    pub source: PathBuf,

    /// Destination directory (for --convert and --copy)
    #[arg(short, long, value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_QUALITY, allow_negative_numbers = true)]
    pub quality: i64,

    /// Number of parallel workers (default: CPU cores)
    #[arg(short, long, value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Simulate without changing any files
    #[arg(long)]
    pub dry_run: bool,

    /// Delete HEIC originals after successful in-place conversion
    #[arg(long)]
    pub delete_originals: bool,

    /// Reduce output (no progress bar, warnings only)
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Парсит аргументы командной строки
    pub fn parse_args() -> Self {
        Self::parse_or_guided(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Неизвестная подкоманда запускает интерактивный режим
    pub fn parse_or_guided<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(cli) => Ok(cli),
            Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
                eprintln!("Unrecognised command, starting guided mode.");
                Ok(Self { command: Some(Command::Guided) })
            }
            Err(e) => Err(e),
        }
    }
}

impl CliArgs {
    /// Выбранный режим; группа аргументов гарантирует ровно один флаг
    pub fn mode(&self) -> Mode {
        if self.inplace {
            Mode::InPlace
        } else if self.convert {
            Mode::ConvertToDestination
        } else {
            Mode::CopyAndConvert
        }
    }

    /// Валидирует аргументы и собирает конфигурацию запуска
    pub fn validate_and_normalize(self) -> ConfigResult<RunConfig> {
        let workers = self.workers.unwrap_or_else(RunConfig::default_worker_count);

        RunConfig::new(
            self.mode(),
            &self.source,
            self.destination,
            self.quality,
            workers,
            self.dry_run,
            self.delete_originals,
        )
    }
}

/// Выводит информацию о конфигурации
pub fn print_config_info(config: &RunConfig) {
    println!("Configuration:");
    println!("  Mode:             {}", config.mode);
    println!("  Source:           {}", config.source_root.display());
    if let Some(dest) = &config.dest_root {
        println!("  Destination:      {}", dest.display());
    }
    println!("  Workers:          {}", config.worker_count);
    println!("  JPEG quality:     {}", config.quality);
    println!("  Dry run:          {}", config.dry_run);
    println!("  Delete originals: {}", config.delete_originals);
    println!();
}
