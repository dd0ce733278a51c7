use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

// A reader never sees a partially written thumbnail.
pub fn save_data<P>(data: &[u8], path: P) -> bool
where
    P: AsRef<Path>,
    P: std::fmt::Debug,
{
    match write_then_rename(data, path.as_ref()) {
        Ok(()) => {
            tracing::debug!(nwritten = data.len(), ?path, "Saved data");
            true
        }
        Err(err) => {
            tracing::error!(%err, ?path, "Failed to save data");
            false
        }
    }
}

fn write_then_rename(data: &[u8], path: &Path) -> std::io::Result<()> {
    let new_path = append_extension(path, "new");
    let mut file = std::fs::File::create(&new_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&new_path, path)
}

pub fn ensure_dir<P>(dir: P) -> std::io::Result<()>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    if !dir.is_dir() {
        tracing::info!(?dir, "Creating directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

// Removes every entry inside `dir`, keeping `dir` itself.
pub fn remove_contents<P>(dir: P) -> std::io::Result<usize>
where
    P: AsRef<Path>,
{
    let mut nremoved = 0;
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        nremoved += 1;
    }
    Ok(nremoved)
}

fn append_extension<P, S>(path: P, ext: S) -> PathBuf
where
    P: AsRef<Path>,
    S: AsRef<OsStr>,
{
    let path = path.as_ref();
    match path.extension() {
        Some(last_ext) => {
            let mut last_ext = last_ext.to_os_string();
            last_ext.push(".");
            last_ext.push(ext);
            path.with_extension(last_ext)
        }
        None => path.with_extension(ext),
    }
}

// </coverage:exclude>
