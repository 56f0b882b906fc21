//! Transparent decompression for gzip and zstd inputs.
//!
//! Compressed NDJSON dumps are common for archived logs; a recognized
//! extension (`.gz`/`.gzip` → gzip, `.zst`/`.zstd` → zstd) routes the file
//! through full in-memory decompression instead of the mmap path, and the
//! resulting owned buffer flows into the normal pipeline.

use anyhow::{Context, Result, bail};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Gzip,
    Zstd,
}

impl Codec {
    fn from_path(path: &str) -> Option<Codec> {
        if path.ends_with(".gz") || path.ends_with(".gzip") {
            Some(Codec::Gzip)
        } else if path.ends_with(".zst") || path.ends_with(".zstd") {
            Some(Codec::Zstd)
        } else {
            None
        }
    }
}

/// Does the path name a compressed file njq knows how to unpack?
pub fn is_compressed(path: &str) -> bool {
    Codec::from_path(path).is_some()
}

/// Decompress the whole file into an owned buffer.
pub fn decompress_file(path: &str) -> Result<Vec<u8>> {
    let Some(codec) = Codec::from_path(path) else {
        bail!("not a recognized compressed file: {path}");
    };
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open file: {path}"))?;
    let mut buf = Vec::new();
    match codec {
        Codec::Gzip => {
            flate2::read::GzDecoder::new(file)
                .read_to_end(&mut buf)
                .with_context(|| format!("failed to decompress gzip file: {path}"))?;
        }
        Codec::Zstd => {
            zstd::Decoder::new(file)
                .with_context(|| format!("failed to initialize zstd decoder for: {path}"))?
                .read_to_end(&mut buf)
                .with_context(|| format!("failed to decompress zstd file: {path}"))?;
        }
    }
    Ok(buf)
}
