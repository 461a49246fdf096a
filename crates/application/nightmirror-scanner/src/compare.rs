use crate::{Scanner, ScannerError};
use camino::Utf8Path;
use filetime::FileTime;
use nightmirror_core::ComparePolicy;
use std::fs;
use std::io::{self, BufReader, Read};

const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// The stat-level identity of a file: type, size and modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: FileTime,
}

impl Signature {
    pub fn of(meta: &fs::Metadata) -> Self {
        let kind = if meta.is_file() {
            EntryKind::File
        } else if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::Other
        };
        Self {
            kind,
            size: meta.len(),
            mtime: Scanner::mtime(meta),
        }
    }
}

/// Decide whether `destination` must be (re)written from `source`.
///
/// An absent destination always needs a sync. Otherwise the signatures are
/// compared; equal signatures mean "in sync" even if the bytes differ. With
/// [`ComparePolicy::Content`] a signature that differs only in mtime is
/// settled by reading both files.
pub fn needs_sync(
    source: &Utf8Path,
    destination: &Utf8Path,
    policy: ComparePolicy,
) -> Result<bool, ScannerError> {
    let dst_meta = match fs::metadata(destination) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let src = Signature::of(&fs::metadata(source)?);
    let dst = Signature::of(&dst_meta);

    if src == dst {
        return Ok(false);
    }

    match policy {
        ComparePolicy::Shallow => Ok(true),
        ComparePolicy::Content => {
            if src.kind != EntryKind::File || dst.kind != EntryKind::File || src.size != dst.size {
                return Ok(true);
            }
            Ok(!same_contents(source, destination)?)
        }
    }
}

/// Byte-for-byte equality of two files.
pub fn same_contents(a: &Utf8Path, b: &Utf8Path) -> Result<bool, ScannerError> {
    let mut ra = BufReader::new(fs::File::open(a)?);
    let mut rb = BufReader::new(fs::File::open(b)?);
    let mut buf_a = vec![0u8; CHUNK];
    let mut buf_b = vec![0u8; CHUNK];

    loop {
        let na = fill(&mut ra, &mut buf_a)?;
        let nb = fill(&mut rb, &mut buf_b)?;
        if na != nb || buf_a[..na] != buf_b[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
