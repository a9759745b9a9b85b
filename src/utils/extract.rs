use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::symlink;
#[cfg(windows)]
use std::os::windows::fs::symlink_file as symlink;

use crate::errors::UnpackError;

pub struct ImageEntry {
    pub offset: u64,
    pub size: u32,
    pub name: String,
}

impl ImageEntry {
    pub fn new(offset: u64, size: u32, name: &str) -> Self {
        ImageEntry {
            offset,
            size,
            name: name.to_string(),
        }
    }
}

// zero sized entries still produce a file without touching the input
pub fn extract_image<R: Read + Seek>(
    input: &mut R,
    entry: &ImageEntry,
    output_dir: &Path,
) -> Result<(), UnpackError> {
    let output_path = output_dir.join(&entry.name);
    let failed = |source| UnpackError::ExtractImage {
        name: entry.name.clone(),
        source,
    };

    if entry.size == 0 {
        File::create(&output_path).map_err(failed)?;
        return Ok(());
    }

    input.seek(SeekFrom::Start(entry.offset)).map_err(failed)?;
    let mut output = File::create(&output_path).map_err(failed)?;

    let copied = io::copy(&mut input.take(u64::from(entry.size)), &mut output).map_err(failed)?;
    if copied < u64::from(entry.size) {
        return Err(UnpackError::truncated(&entry.name));
    }

    Ok(())
}

// links are relative so the output directory can be moved, failures only
// warn and the extracted files stand
pub fn create_ramdisk_symlinks(output_dir: &Path, links: &[(String, String)]) {
    let symlink_dir = output_dir.join("vendor-ramdisk-by-name");
    if let Err(e) = fs::create_dir_all(&symlink_dir) {
        eprintln!(
            "Warning: could not create symlink directory {}: {}",
            symlink_dir.display(),
            e
        );
        return;
    }

    for (output_name, ramdisk_name) in links {
        let link_path = symlink_dir.join(format!("ramdisk_{}", ramdisk_name));
        let target = Path::new("..").join(output_name);

        // repoint stale links from earlier runs
        let _ = fs::remove_file(&link_path);
        if let Err(e) = symlink(&target, &link_path) {
            eprintln!(
                "Warning: could not create symlink {}: {}",
                link_path.display(),
                e
            );
        }
    }
}
