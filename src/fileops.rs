use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use tracing::debug;
use crate::config::TEMP_FILE_PREFIX;
use crate::error::{JobError, JobResult};

/// Декодер конвертируемого формата. Реализации должны быть безопасны
/// для одновременного вызова из нескольких воркеров
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> JobResult<DynamicImage>;
}

/// Декодер на базе определения формата по содержимому (`image`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SniffingDecoder;

impl ImageDecoder for SniffingDecoder {
    fn decode(&self, path: &Path) -> JobResult<DynamicImage> {
        let reader = ImageReader::open(path)
            .map_err(|e| JobError::decode(path, e))?
            .with_guessed_format()
            .map_err(|e| JobError::decode(path, e))?;

        reader.decode().map_err(|e| JobError::decode(path, e))
    }
}

/// Декодер HEIC/HEIF через libheif: основное изображение контейнера в RGB
#[cfg(feature = "heif")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HeifDecoder;

#[cfg(feature = "heif")]
impl ImageDecoder for HeifDecoder {
    fn decode(&self, path: &Path) -> JobResult<DynamicImage> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let path_str = path
            .to_str()
            .ok_or_else(|| JobError::decode(path, "path is not valid UTF-8"))?;

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_file(path_str).map_err(|e| JobError::decode(path, e))?;
        let handle = ctx.primary_image_handle().map_err(|e| JobError::decode(path, e))?;
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| JobError::decode(path, e))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| JobError::decode(path, "missing interleaved RGB plane"))?;

        let row_len = plane.width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        image::RgbImage::from_raw(plane.width, plane.height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| JobError::decode(path, "decoded plane has unexpected size"))
    }
}

/// Собран ли нативный декодер HEIC/HEIF
pub const NATIVE_HEIF: bool = cfg!(feature = "heif");

/// Краткое описание декодера текущей сборки для справки и лога
pub fn decoder_description() -> &'static str {
    if NATIVE_HEIF {
        "libheif (native HEIC/HEIF)"
    } else {
        "content sniffing only: built without libheif, real HEIC/HEIF files will fail to decode"
    }
}

/// Декодер по умолчанию для текущей сборки
pub fn default_decoder() -> std::sync::Arc<dyn ImageDecoder> {
    #[cfg(feature = "heif")]
    {
        std::sync::Arc::new(HeifDecoder)
    }
    #[cfg(not(feature = "heif"))]
    {
        std::sync::Arc::new(SniffingDecoder)
    }
}

/// Пишет JPEG атомарно: временный файл рядом с целевым, fsync, rename.
///
/// При `dry_run` файловая система не трогается. При любой ошибке временный
/// файл удаляется и целевой путь остается нетронутым.
pub fn encode_image(image: &DynamicImage, output_path: &Path, quality: u8, dry_run: bool) -> JobResult<()> {
    if dry_run {
        debug!("Dry run: skipping write of {}", output_path.display());
        return Ok(());
    }

    let parent = parent_dir(output_path);
    fs::create_dir_all(parent).map_err(|e| JobError::write(parent, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| JobError::write(output_path, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);

        // В JPEG нет альфа-канала
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|source| JobError::Encode {
                path: output_path.to_path_buf(),
                source,
            })?;

        writer.flush().map_err(|e| JobError::write(output_path, e))?;
    }

    temp.as_file().sync_all().map_err(|e| JobError::write(output_path, e))?;
    temp.persist(output_path).map_err(|e| JobError::write(output_path, e.error))?;

    debug!("Wrote {}", output_path.display());
    Ok(())
}

/// Побайтовое копирование без сохранения метаданных
pub fn copy_file_verbatim(src: &Path, dst: &Path, dry_run: bool) -> JobResult<()> {
    if dry_run {
        debug!("Dry run: skipping copy {} -> {}", src.display(), dst.display());
        return Ok(());
    }

    let copy_error = |source: io::Error| JobError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    };

    // File::create обнулил бы источник раньше, чем его прочитают
    if is_same_file(src, dst) {
        return Err(copy_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source and destination are the same file",
        )));
    }

    fs::create_dir_all(parent_dir(dst)).map_err(copy_error)?;

    let mut input = File::open(src).map_err(copy_error)?;
    let mut output = File::create(dst).map_err(copy_error)?;
    io::copy(&mut input, &mut output).map_err(copy_error)?;
    output.sync_all().map_err(copy_error)?;

    debug!("Copied {} -> {}", src.display(), dst.display());
    Ok(())
}

pub fn delete_file(path: &Path, dry_run: bool) -> JobResult<()> {
    if dry_run {
        debug!("Dry run: skipping delete of {}", path.display());
        return Ok(());
    }

    fs::remove_file(path).map_err(|source| JobError::Delete {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Deleted {}", path.display());
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{sample_image, write_image_file};
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_sniffing_decoder_reads_payload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.heic");
        write_image_file(&path);

        let img = SniffingDecoder.decode(&path).unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
    }

    #[test]
    fn test_decode_garbage_fails_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.heic");
        fs::write(&path, b"definitely not an image").unwrap();

        let err = SniffingDecoder.decode(&path).unwrap_err();
        assert!(matches!(err, JobError::Decode { .. }));
        assert_eq!(err.path(), &path);
    }

    #[test]
    fn test_default_decoder_rejects_truncated_container() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.heic");
        // Один только заголовок ftyp без данных изображения
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypheic\0\0\0\0mif1heic");
        fs::write(&path, &bytes).unwrap();

        let err = default_decoder().decode(&path).unwrap_err();
        assert!(matches!(err, JobError::Decode { .. }));
        assert_eq!(err.path(), &path);
    }

    #[test]
    fn test_decoder_description_matches_build() {
        assert_eq!(NATIVE_HEIF, cfg!(feature = "heif"));
        assert_eq!(decoder_description().contains("libheif (native"), NATIVE_HEIF);
    }

    #[test]
    fn test_decode_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.heic");

        assert!(matches!(SniffingDecoder.decode(&path), Err(JobError::Decode { .. })));
    }

    #[test]
    fn test_encode_writes_valid_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("nested/dir/img.jpg");

        encode_image(&sample_image(), &output, 80, false).unwrap();

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (8, 6));
        assert_eq!(
            image::ImageFormat::from_path(&output).unwrap(),
            image::ImageFormat::Jpeg
        );
        // Временных файлов не остается
        assert_eq!(dir_entries(output.parent().unwrap()), vec![output.clone()]);
    }

    #[test]
    fn test_encode_replaces_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("img.jpg");
        fs::write(&output, b"stale").unwrap();

        encode_image(&sample_image(), &output, 90, false).unwrap();

        assert!(image::open(&output).is_ok());
    }

    #[test]
    fn test_encode_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("sub/img.jpg");

        for quality in [1, 50, 100] {
            encode_image(&sample_image(), &output, quality, true).unwrap();
        }

        assert!(dir_entries(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // Непустая директория на месте целевого файла: rename обязан упасть
        let output = temp_dir.path().join("img.jpg");
        fs::create_dir(&output).unwrap();
        fs::write(output.join("keep"), b"x").unwrap();

        let err = encode_image(&sample_image(), &output, 90, false).unwrap_err();

        assert!(matches!(err, JobError::Write { .. }));
        assert!(output.join("keep").exists());
        assert_eq!(dir_entries(temp_dir.path()), vec![output]);
    }

    #[test]
    fn test_concurrent_reader_never_sees_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("img.jpg");
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let output = output.clone();
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    if let Ok(bytes) = fs::read(&output) {
                        assert!(!bytes.is_empty());
                        assert!(image::load_from_memory(&bytes).is_ok());
                    }
                }
            })
        };

        for _ in 0..25 {
            encode_image(&sample_image(), &output, 75, false).unwrap();
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();
    }

    #[test]
    fn test_copy_is_byte_exact() {
        let temp_dir = TempDir::new().unwrap();
        let payloads: Vec<Vec<u8>> = vec![
            b"hello".to_vec(),
            vec![0u8; 1],
            (0..=255u8).cycle().take(200_000).collect(),
        ];

        for (i, payload) in payloads.iter().enumerate() {
            let src = temp_dir.path().join(format!("src-{}.bin", i));
            let dst = temp_dir.path().join(format!("out/sub/dst-{}.bin", i));
            fs::write(&src, payload).unwrap();

            copy_file_verbatim(&src, &dst, false).unwrap();

            assert_eq!(&fs::read(&dst).unwrap(), payload);
        }
    }

    #[test]
    fn test_copy_dry_run_and_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("out/dst.txt");
        fs::write(&src, b"data").unwrap();

        copy_file_verbatim(&src, &dst, true).unwrap();
        assert!(!temp_dir.path().join("out").exists());

        let missing = temp_dir.path().join("missing.txt");
        assert!(matches!(
            copy_file_verbatim(&missing, &dst, false),
            Err(JobError::Copy { .. })
        ));
    }

    #[test]
    fn test_copy_onto_itself_keeps_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("notes.txt");
        fs::write(&src, b"precious data").unwrap();

        let same = temp_dir.path().join(".").join("notes.txt");
        let err = copy_file_verbatim(&src, &same, false).unwrap_err();

        assert!(matches!(err, JobError::Copy { .. }));
        assert_eq!(fs::read(&src).unwrap(), b"precious data");
    }

    #[test]
    fn test_delete_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.heic");
        fs::write(&path, b"x").unwrap();

        delete_file(&path, true).unwrap();
        assert!(path.exists());

        delete_file(&path, false).unwrap();
        assert!(!path.exists());

        assert!(matches!(delete_file(&path, false), Err(JobError::Delete { .. })));
    }
}
