use crate::config::{LoggingConfig, Section};
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

const DEFAULT_KEY: &str = "default";

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

// -------- rotating file writers --------

type Rotating = Arc<Mutex<FileRotate<AppendCount>>>;

#[derive(Clone)]
struct FileHandle(Option<Rotating>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file.lock().write(buf),
            // no file for this target: drop
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Picks a log file by the longest matching target prefix, falling back to
/// the "default" section's file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<Rotating>,
    by_prefix: Vec<(String, Rotating)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<Rotating> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, file)| file.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        FileHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        FileHandle(self.resolve(meta.target()))
    }
}

/// Relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(section: &Section, base_dir: &Path) -> std::io::Result<Option<Rotating>> {
    if section.file.trim().is_empty() {
        return Ok(None);
    }
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        &path,
        AppendCount::new(section.max_backups.unwrap_or(3)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Some(Arc::new(Mutex::new(rot))))
}

// -------- target filters --------

fn console_targets(cfg: &LoggingConfig) -> Targets {
    targets_by(cfg, |s| Some(&s.console_level))
}

fn file_targets(cfg: &LoggingConfig) -> Targets {
    targets_by(cfg, |s| (!s.file.trim().is_empty()).then_some(&s.file_level))
}

fn targets_by(cfg: &LoggingConfig, level: impl Fn(&Section) -> Option<&String>) -> Targets {
    let default = cfg
        .get(DEFAULT_KEY)
        .and_then(&level)
        .map(|l| parse_level(l))
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(key, _)| key.as_str() != DEFAULT_KEY)
        .fold(Targets::new().with_default(default), |targets, (key, section)| {
            let lvl = level(section).map(|l| parse_level(l)).unwrap_or(LevelFilter::OFF);
            targets.with_target(key.clone(), lvl)
        })
}

fn build_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    // Sections sharing a path share one writer.
    let mut opened: HashMap<PathBuf, Rotating> = HashMap::new();

    for (key, section) in cfg {
        let path = resolve_log_path(&section.file, base_dir);
        let file = match opened.get(&path) {
            Some(file) => Some(file.clone()),
            None => match open_rotating(section, base_dir) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!(
                        "Failed to init log file for '{}': {} ({})",
                        key,
                        path.to_string_lossy(),
                        e
                    );
                    None
                }
            },
        };
        let Some(file) = file else { continue };
        opened.insert(path, file.clone());

        if key == DEFAULT_KEY {
            router.default = Some(file);
        } else {
            router.by_prefix.push((key.clone(), file));
        }
    }
    router
}

// -------- public init --------

/// Install the global subscriber.
/// - `cfg`: per-target sections; "default" covers everything else
/// - `base_dir`: resolves relative log file paths (usually server.home_dir)
///
/// Console output is human-readable and goes to stderr; files receive JSON
/// lines.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, prelude::*, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let console = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let router = build_router(cfg, base_dir);
    if router.is_empty() {
        let _ = Registry::default().with(console).try_init();
        return;
    }

    let file = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(router)
        .with_filter(file_targets(cfg));

    let _ = Registry::default().with(console).with(file).try_init();
}
