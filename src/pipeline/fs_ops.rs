use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Creates `p` and its parents. Safe to race with other workers creating the same tree.
pub fn ensure_dir<P: AsRef<Path>>(p: P) -> io::Result<()> {
    let p = p.as_ref();
    if p.is_dir() {
        return Ok(());
    }
    match fs::create_dir_all(p) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && p.is_dir() => Ok(()),
        other => other,
    }
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

/// Regular files under `root` whose extension is in `extensions`, sorted by path.
pub fn find_cursor_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

/// Mirrors `source` from `input_root` into `output_root`, swapping the extension.
pub fn mirrored_output_path(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    extension: &str,
) -> PathBuf {
    let relative = source.strip_prefix(input_root).unwrap_or(source);
    let relative = match relative.file_name() {
        Some(_) => relative.to_path_buf(),
        None => PathBuf::from("cursor"),
    };
    output_root.join(relative).with_extension(extension)
}

/// `<parent>/<name>_png` next to the input root.
pub fn default_output_dir(input_root: &Path) -> PathBuf {
    let name = input_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cursors".to_string());
    input_root.with_file_name(format!("{}_png", name))
}
