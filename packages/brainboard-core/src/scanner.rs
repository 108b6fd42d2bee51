/// Markdown vault scanner: the task source feeding the board.
///
/// Walks the vault for `.md` files and turns checkbox lines into task
/// items. A file whose frontmatter carries the tracking property becomes
/// a whole-file note item. The scan result is ephemeral and authoritative
/// for item existence; the store reconciles its maps against it.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;

use crate::config::{StoreConfig, DEFAULT_TRACKING_PROPERTY};
use crate::store::StoreError;
use crate::types::{BoardItem, ItemKind};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Restrict scanning to this subfolder of the root.
    pub task_dir: Option<String>,
    /// Frontmatter property marking a file as a board note.
    pub tracking_property: String,
    /// Only visit files modified within this many days. 0 disables the cutoff.
    pub recent_window_days: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            task_dir: None,
            tracking_property: DEFAULT_TRACKING_PROPERTY.to_string(),
            recent_window_days: 7,
        }
    }
}

impl From<&StoreConfig> for ScanOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            task_dir: config.task_dir.clone(),
            tracking_property: config.tracking_property().to_string(),
            recent_window_days: config.recent_window_days.unwrap_or(7),
        }
    }
}

fn task_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*- \[([ xX])\] (.+)$").expect("valid task line regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII word chars plus hiragana, katakana and common kanji.
    RE.get_or_init(|| {
        Regex::new(r"#[\w\x{3040}-\x{309f}\x{30a0}-\x{30ff}\x{4e00}-\x{9faf}]+")
            .expect("valid tag regex")
    })
}

/// Extract `#tags` from a piece of text.
pub fn extract_tags(text: &str) -> Vec<String> {
    tag_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse every checkbox line of a file's content into task items.
pub fn parse_tasks(content: &str, file_path: &str, ctime: i64, mtime: i64) -> Vec<BoardItem> {
    let mut items = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let Some(caps) = task_line_regex().captures(line) else {
            continue;
        };
        let completed = caps[1].eq_ignore_ascii_case("x");
        let text = caps[2].trim().to_string();
        let tags = extract_tags(&text);
        items.push(BoardItem {
            kind: ItemKind::Task,
            text,
            completed,
            file_path: file_path.to_string(),
            line: Some(idx as u32 + 1),
            tags,
            ctime,
            mtime,
        });
    }
    items
}

/// Whether a file's frontmatter block carries the tracking property, i.e.
/// the file itself is a board note.
pub fn has_tracking_property(content: &str, property: &str) -> bool {
    let Some(block) = frontmatter_block(content) else {
        return false;
    };
    let prefix = format!("{}:", property);
    block
        .lines()
        .any(|line| line.trim_start().starts_with(&prefix))
}

/// The lines between the opening and closing `---` of a frontmatter block.
pub(crate) fn frontmatter_block(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

/// Build the whole-file note item for a tracked file.
fn file_item(content: &str, file_path: &str, ctime: i64, mtime: i64) -> BoardItem {
    let text = Path::new(file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string());
    BoardItem {
        kind: ItemKind::File,
        text,
        completed: false,
        file_path: file_path.to_string(),
        line: None,
        tags: extract_tags(content),
        ctime,
        mtime,
    }
}

fn epoch_millis(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Scan the vault under `root` and return the current item list.
pub fn scan_vault(root: &Path, opts: &ScanOptions) -> Result<Vec<BoardItem>, StoreError> {
    let scan_root = match opts.task_dir.as_deref() {
        Some(dir) if !dir.is_empty() => root.join(dir),
        _ => root.to_path_buf(),
    };

    let cutoff = if opts.recent_window_days > 0 {
        epoch_millis(SystemTime::now()) - i64::from(opts.recent_window_days) * 86_400_000
    } else {
        i64::MIN
    };

    let mut files = Vec::new();
    collect_markdown_files(&scan_root, &mut files)?;
    files.sort();

    let mut items = Vec::new();
    for path in files {
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        let mtime = metadata.modified().map(epoch_millis).unwrap_or(0);
        if mtime < cutoff {
            continue;
        }
        let ctime = metadata.created().map(epoch_millis).unwrap_or(mtime);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("[brainboard.scanner.read] Skipping {:?}: {}", path, e);
                continue;
            }
        };

        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();

        if has_tracking_property(&content, &opts.tracking_property) {
            items.push(file_item(&content, &rel, ctime, mtime));
        }
        items.extend(parse_tasks(&content, &rel, ctime, mtime));
    }

    Ok(items)
}

fn collect_markdown_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        // Hidden directories hold the store itself and other tool state.
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_markdown_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}
