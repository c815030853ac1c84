//! Invocation of the external overlap merger (FLASH) for one mate pair
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Why merging a mate pair failed
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    #[error("Could not run merger {binary:?}: {source}")]
    Spawn { binary: PathBuf, source: io::Error },

    #[error("Merger exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("Could not write merged reads to {file:?}: {source}")]
    Output { file: PathBuf, source: io::Error },
}

/// External merge binary with its overlap-length range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTool {
    pub binary: PathBuf,
    pub min_overlap: u32,
    pub max_overlap: u32,
}

impl MergeTool {
    pub fn new<P: Into<PathBuf>>(binary: P, min_overlap: u32, max_overlap: u32) -> Self {
        MergeTool {
            binary: binary.into(),
            min_overlap,
            max_overlap,
        }
    }

    /// Merge `r1`/`r2` and stream the merged reads into `out_fastq`
    pub fn merge_to_file(&self, r1: &Path, r2: &Path, out_fastq: &Path) -> Result<PathBuf, MergeError> {
        let out = File::create(out_fastq).map_err(|source| MergeError::Output {
            file: out_fastq.to_path_buf(),
            source,
        })?;
        let mut cmd = Command::new(&self.binary);
        cmd.arg(r1)
            .arg(r2)
            .arg("--to-stdout")
            .arg("-m")
            .arg(self.min_overlap.to_string())
            .arg("-M")
            .arg(self.max_overlap.to_string())
            .stdout(Stdio::from(out));
        self.run(cmd)?;
        info!("Merged reads written to {:?}", out_fastq);
        Ok(out_fastq.to_path_buf())
    }

    /// Merge `r1`/`r2` into `outdir`, the merger naming its outputs after `prefix`.
    ///
    /// Returns the path of the extended fragments file.
    pub fn merge_into_dir(
        &self,
        r1: &Path,
        r2: &Path,
        outdir: &Path,
        prefix: &str,
    ) -> Result<PathBuf, MergeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(r1)
            .arg(r2)
            .arg("-d")
            .arg(outdir)
            .arg("-o")
            .arg(prefix)
            .arg("--min-overlap")
            .arg(self.min_overlap.to_string())
            .arg("--max-overlap")
            .arg(self.max_overlap.to_string())
            .arg("--quiet");
        self.run(cmd)?;
        Ok(outdir.join(format!("{}.extendedFrags.fastq", prefix)))
    }

    fn run(&self, mut cmd: Command) -> Result<Output, MergeError> {
        debug!("Running {:?}", cmd);
        let output = cmd.output().map_err(|source| MergeError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::Exit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
