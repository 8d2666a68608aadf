use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use crate::catalog::{self, Job};
use crate::config::{messages, Mode, RunConfig, DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::error::Result;

/// Вопросы и ответы через произвольные reader/writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Задает вопрос; `None` означает конец ввода
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    pub fn ask_mode(&mut self) -> io::Result<Option<Mode>> {
        self.say("Choose conversion type:")?;
        self.say("1) In-place")?;
        self.say("2) Convert to destination")?;
        self.say("3) Copy + Convert")?;

        loop {
            let Some(answer) = self.ask("Enter choice: ")? else {
                return Ok(None);
            };
            match answer.parse().ok().and_then(Mode::from_choice) {
                Some(mode) => return Ok(Some(mode)),
                None => self.say("Please enter 1, 2 or 3.")?,
            }
        }
    }

    /// Пустой ответ дает `default`
    pub fn ask_yes_no(&mut self, prompt: &str, default: bool) -> io::Result<Option<bool>> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };

        loop {
            let Some(answer) = self.ask(&format!("{} {}: ", prompt, hint))? else {
                return Ok(None);
            };
            match answer.to_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }

    pub fn ask_quality(&mut self) -> io::Result<Option<i64>> {
        loop {
            let prompt = format!("JPEG quality ({}-{}) [{}]: ", MIN_QUALITY, MAX_QUALITY, DEFAULT_QUALITY);
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(DEFAULT_QUALITY));
            }
            match answer.parse::<i64>() {
                Ok(q) if (MIN_QUALITY..=MAX_QUALITY).contains(&q) => return Ok(Some(q)),
                _ => self.say("Quality must be a number between 1 and 100.")?,
            }
        }
    }

    /// Путь к директории; кавычки по краям (drag-and-drop в терминал) снимаются
    pub fn ask_directory(&mut self, prompt: &str, must_exist: bool) -> io::Result<Option<PathBuf>> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            let cleaned = answer.trim_matches(|c| c == '"' || c == '\'');
            if cleaned.is_empty() {
                self.say("Please enter a path.")?;
                continue;
            }

            let path = PathBuf::from(cleaned);
            if must_exist && !path.is_dir() {
                self.say(&format!("Not a directory: {}", path.display()))?;
                continue;
            }
            if !must_exist && path.exists() && !path.is_dir() {
                self.say(&format!("Exists but is not a directory: {}", path.display()))?;
                continue;
            }
            return Ok(Some(path));
        }
    }
}

/// Готовый к запуску план из интерактивного режима
#[derive(Debug)]
pub struct GuidedPlan {
    pub config: RunConfig,
    pub jobs: Vec<Job>,
}

/// Проводит пользователя по шагам. `None` означает отмену или отсутствие
/// работы; причина уже выведена пользователю
pub fn plan_guided_run<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    worker_count: usize,
) -> Result<Option<GuidedPlan>> {
    prompter.say("=======================================")?;
    prompter.say(" HEIC -> JPEG Converter")?;
    prompter.say("=======================================")?;

    let Some(mode) = prompter.ask_mode()? else {
        return cancelled(prompter);
    };

    let mut quality = DEFAULT_QUALITY;
    let mut dry_run = false;
    let mut delete_originals = false;

    let Some(advanced) = prompter.ask_yes_no("Configure advanced options?", false)? else {
        return cancelled(prompter);
    };
    if advanced {
        let Some(q) = prompter.ask_quality()? else {
            return cancelled(prompter);
        };
        quality = q;

        let Some(d) = prompter.ask_yes_no("Dry run?", false)? else {
            return cancelled(prompter);
        };
        dry_run = d;

        if mode == Mode::InPlace {
            let Some(del) = prompter.ask_yes_no("Delete originals after conversion?", false)? else {
                return cancelled(prompter);
            };
            delete_originals = del;
        }
    }

    let Some(source) = prompter.ask_directory("Source folder: ", true)? else {
        return cancelled(prompter);
    };
    // Задачи должны нести абсолютные пути, как и source_root в конфигурации
    let source = source.canonicalize()?;

    prompter.say(messages::GATHERING_FILES)?;
    let jobs = catalog::enumerate(&source)?;
    let convertible = catalog::count_convertible(&jobs);
    prompter.say(&format!("Found {} files ({} HEIC).", jobs.len(), convertible))?;

    if mode == Mode::InPlace && convertible == 0 {
        prompter.say(messages::NO_CONVERTIBLE_FILES)?;
        return Ok(None);
    }

    let destination = if mode.requires_destination() {
        let Some(dest) = prompter.ask_directory("Destination folder: ", false)? else {
            return cancelled(prompter);
        };
        Some(dest)
    } else {
        None
    };

    let Some(start) = prompter.ask_yes_no("Start processing now?", true)? else {
        return cancelled(prompter);
    };
    if !start {
        return cancelled(prompter);
    }

    let config = RunConfig::new(
        mode,
        &source,
        destination,
        quality,
        worker_count,
        dry_run,
        delete_originals,
    )?;

    Ok(Some(GuidedPlan { config, jobs }))
}

fn cancelled<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Option<GuidedPlan>> {
    prompter.say(messages::CANCELLED)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_script(script: &str) -> (Option<GuidedPlan>, String) {
        let mut output = Vec::new();
        let plan = {
            let mut prompter = Prompter::new(Cursor::new(script.as_bytes().to_vec()), &mut output);
            plan_guided_run(&mut prompter, 2).unwrap()
        };
        (plan, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_ask_mode_reprompts() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(b"7\nabc\n2\n".to_vec()), &mut output);

        assert_eq!(prompter.ask_mode().unwrap(), Some(Mode::ConvertToDestination));
        drop(prompter);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Please enter 1, 2 or 3.").count(), 2);
    }

    #[test]
    fn test_ask_quality_defaults_and_bounds() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(b"\n150\n0\n75\n".to_vec()), &mut output);

        assert_eq!(prompter.ask_quality().unwrap(), Some(DEFAULT_QUALITY));
        assert_eq!(prompter.ask_quality().unwrap(), Some(75));
    }

    #[test]
    fn test_end_of_input_cancels() {
        let (plan, text) = run_script("1\n");
        assert!(plan.is_none());
        assert!(text.contains(messages::CANCELLED));
    }

    #[test]
    fn test_in_place_without_heic_stops_early() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("b.jpg"), b"x").unwrap();

        let (plan, text) = run_script(&format!("1\nn\n{}\n", src.path().display()));

        assert!(plan.is_none());
        assert!(text.contains(messages::NO_CONVERTIBLE_FILES));
    }

    #[test]
    fn test_copy_plan_with_advanced_options() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a.heic"), b"x").unwrap();
        fs::write(src.path().join("b.txt"), b"x").unwrap();

        let script = format!(
            "3\ny\n70\ny\n\"{}\"\n{}\n\n",
            src.path().display(),
            dst.path().join("out").display()
        );
        let (plan, text) = run_script(&script);
        let plan = plan.unwrap();

        assert!(text.contains("Found 2 files (1 HEIC)."));
        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.config.mode, Mode::CopyAndConvert);
        assert_eq!(plan.config.quality, 70);
        assert!(plan.config.dry_run);
        assert!(!plan.config.delete_originals);
        assert_eq!(plan.config.worker_count, 2);
        assert_eq!(plan.config.dest_root, Some(dst.path().join("out")));
    }

    #[test]
    fn test_relative_source_yields_absolute_jobs() {
        let src = tempfile::Builder::new().prefix("guided-src-").tempdir_in(".").unwrap();
        write_nested(src.path());
        let relative = PathBuf::from(src.path().file_name().unwrap());
        assert!(relative.is_relative());

        let (plan, _) = run_script(&format!("1\nn\n{}\n\n", relative.display()));
        let plan = plan.unwrap();

        assert!(plan.config.source_root.is_absolute());
        assert_eq!(plan.jobs.len(), 2);
        for job in &plan.jobs {
            assert!(job.source_path.is_absolute());
            assert_eq!(job.source_path, plan.config.source_root.join(&job.relative_path));
        }
    }

    fn write_nested(root: &std::path::Path) {
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.heic"), b"x").unwrap();
        fs::write(root.join("sub/b.HEIF"), b"x").unwrap();
    }

    #[test]
    fn test_declining_start_cancels() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.heic"), b"x").unwrap();

        let (plan, text) = run_script(&format!("1\nn\n{}\nn\n", src.path().display()));

        assert!(plan.is_none());
        assert!(text.contains(messages::CANCELLED));
    }
}
