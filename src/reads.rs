//! Reading and writing sequence records, compressed or not
use bio::io::{fasta, fastq};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::errors::{Error, Result};

pub type FastaRecords = fasta::Records<io::BufReader<Box<dyn io::Read>>>;

/// Open a file, transparently decompressing gzip/bzip2/xz input
pub fn open_maybe_compressed(path: &Path) -> Result<Box<dyn io::Read>> {
    match niffler::from_path(path) {
        Ok((reader, _format)) => Ok(reader),
        // Too short to carry a magic number, so certainly plain text
        Err(niffler::Error::FileTooShort) => {
            let file = File::open(path).map_err(|e| Error::file_io(path, e))?;
            Ok(Box::new(file))
        }
        Err(source) => Err(Error::Decompress {
            file: path.to_path_buf(),
            source,
        }),
    }
}

pub fn open_fasta<P: AsRef<Path>>(path: P) -> Result<FastaRecords> {
    let reader = open_maybe_compressed(path.as_ref())?;
    Ok(fasta::Reader::new(reader).records())
}

/// Rewrite a FASTQ file as FASTA, dropping the qualities. Returns the record count.
pub fn fastq_to_fasta(fastq_path: &Path, fasta_path: &Path) -> Result<usize> {
    let reader = open_maybe_compressed(fastq_path)?;
    let out = File::create(fasta_path).map_err(|e| Error::file_io(fasta_path, e))?;
    let mut writer = fasta::Writer::new(io::BufWriter::new(out));
    let mut n = 0;
    for rec in fastq::Reader::new(reader).records() {
        let rec = rec.map_err(|e| Error::ParseRecord {
            file: fastq_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        writer
            .write(rec.id(), rec.desc(), rec.seq())
            .map_err(|e| Error::file_io(fasta_path, e))?;
        n += 1;
    }
    writer.flush().map_err(|e| Error::file_io(fasta_path, e))?;
    Ok(n)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_fastq_to_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("in.fastq");
        let fa = dir.path().join("out.fasta");
        fs::write(&fq, "@r1 merged\nACGTACGT\n+\nIIIIIIII\n@r2\nTTTT\n+\nIIII\n").unwrap();

        assert_eq!(fastq_to_fasta(&fq, &fa).unwrap(), 2);
        let records: Vec<_> = open_fasta(&fa).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "r1");
        assert_eq!(records[0].desc(), Some("merged"));
        assert_eq!(records[0].seq(), b"ACGTACGT");
        assert_eq!(records[1].seq(), b"TTTT");
    }

    #[test]
    fn test_empty_fasta_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("empty.fasta");
        fs::write(&fa, "").unwrap();
        assert_eq!(open_fasta(&fa).unwrap().count(), 0);
    }
}
