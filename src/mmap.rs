use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};

/// Read-only view of the whole input file shared by all workers.
#[derive(Debug)]
pub struct Mmap {
    // empty files are never mapped
    map: Option<memmap2::Mmap>,
    _file: File,
}

impl Mmap {
    pub fn open(path: &Path) -> Result<Mmap> {
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        let len = file.metadata().map_err(|e| Error::open(path, e))?.len();
        let map = if len == 0 {
            None
        } else {
            // Safety: the map is read only and the input is assumed not to
            // change for the duration of a run.
            let map = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| Error::open(path, e))?;
            Some(map)
        };
        Ok(Mmap { map, _file: file })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.map {
            Some(map) => &map[..],
            None => &[],
        }
    }
}
