//! Discovery of mate-pair files following the `_1`/`_2` suffix convention
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

const FORWARD_TAG: &str = "_1.";
const REVERSE_TAG: &str = "_2.";

/// Forward and reverse read files of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatePair {
    pub prefix: String,
    pub forward: PathBuf,
    pub reverse: PathBuf,
}

/// Name of the reverse mate for a forward file name like `S1_1.fastq`
pub fn mate_name(forward: &str) -> Option<(String, String)> {
    let idx = forward.rfind(FORWARD_TAG)?;
    let prefix = &forward[..idx];
    let ext = &forward[idx + FORWARD_TAG.len()..];
    if prefix.is_empty() || ext.is_empty() {
        return None;
    }
    Some((prefix.to_string(), format!("{}{}{}", prefix, REVERSE_TAG, ext)))
}

/// All complete mate pairs in `dir`, ordered by prefix.
///
/// A forward file without its reverse mate is silently left out.
pub fn discover_mate_pairs(dir: &Path) -> Result<Vec<MatePair>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }
    let mut pairs = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::file_io(dir, e))? {
        let path = entry.map_err(|e| Error::file_io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if let Some((prefix, mate)) = mate_name(filename) {
            let reverse = dir.join(&mate);
            if reverse.is_file() {
                pairs.insert(
                    prefix.clone(),
                    MatePair {
                        prefix,
                        forward: path.clone(),
                        reverse,
                    },
                );
            } else {
                debug!("No mate {} for {:?}, skipped", mate, path);
            }
        }
    }
    Ok(pairs.into_iter().map(|(_, pair)| pair).collect())
}

/// Shared leading part of two mate file names without the trailing `_`
pub fn common_prefix(a: &str, b: &str) -> String {
    let shared: String = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect();
    shared.trim_end_matches('_').to_string()
}
