//! Corpus file loading.
//!
//! A corpus is a pair of line-aligned inputs: an annotation file (one
//! natural-language query per line) and a tree corpus (JSON lines, each a
//! serialized tree; or a directory of `.jsonl` shards, read in path
//! order). Per-record failures are returned in place so callers can keep
//! the annotation/tree pairing while counting and skipping bad records —
//! no single record ever aborts a batch.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::diagnostics::VyakaError;
use crate::tree::Tree;

/// Reads the annotation file: one query per line, order-preserving.
pub fn read_annotations(path: &Path) -> Result<Vec<String>, VyakaError> {
    let text = fs::read_to_string(path)
        .map_err(|e| VyakaError::io(format!("reading annotations {}", path.display()), e))?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Loads the tree corpus from a JSON-lines file or a shard directory.
///
/// Each element is either a tree or the per-record error that explains why
/// it could not be materialized (malformed JSON, invariant violations);
/// blank lines are skipped.
pub fn load_trees(path: &Path) -> Result<Vec<Result<Tree, VyakaError>>, VyakaError> {
    let mut records = Vec::new();
    for file in corpus_files(path)? {
        let text = fs::read_to_string(&file)
            .map_err(|e| VyakaError::io(format!("reading trees {}", file.display()), e))?;
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record_name = format!("{}:{}", file.display(), lineno + 1);
            let tree = serde_json::from_str::<Tree>(line)
                .map_err(|e| VyakaError::corpus(e.to_string(), &record_name, line));
            records.push(tree);
        }
    }
    Ok(records)
}

/// Resolves a corpus path: a file is used as-is; a directory is walked for
/// `.json`/`.jsonl` shards, sorted by path so shard order (and therefore
/// rule/vocab id assignment) is reproducible.
pub fn corpus_files(path: &Path) -> Result<Vec<PathBuf>, VyakaError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(VyakaError::io(
            format!("locating corpus {}", path.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("json") | Some("jsonl")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}
