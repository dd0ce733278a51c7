use std::path::Path;
use std::path::PathBuf;

use rand::Rng;
use rand::RngCore;

use crate::error::Error;

/// Lists regular files in `dir`, sorted by name.
pub fn list_media<P>(dir: P) -> Result<Vec<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let mut files = vec![];
    for entry in std::fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Picks a file in `dir` uniformly at random.
pub fn pick_random_media<P, R>(dir: P, rng: &mut R) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
    R: RngCore + ?Sized,
{
    let dir = dir.as_ref();
    let mut files = list_media(dir)?;
    if files.is_empty() {
        return Err(Error::NoMedia(dir.display().to_string()));
    }
    let i = rng.random_range(0..files.len());
    tracing::debug!(?dir, index = i, nfiles = files.len(), "Picked media");
    Ok(files.swap_remove(i))
}

// </coverage:exclude>
