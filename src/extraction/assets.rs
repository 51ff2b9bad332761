//! Packaged asset access.
//!
//! The extractor only needs two capabilities from the packaging system:
//! "does this asset exist" and "copy this asset to a file". [`AssetSource`]
//! captures exactly that, with two implementations:
//!
//! - [`DirectoryAssetSource`]: assets unpacked under a directory (development builds, tests)
//! - [`ApkAssetSource`]: assets stored under `assets/` inside an APK or zip archive

use super::ExtractionError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::sync::Mutex;
use zip::ZipArchive;

/// Read access to the application's packaged assets.
pub trait AssetSource: Send + Sync {
    /// Whether `path` (relative to the asset root, `/`-separated) exists.
    fn exists(&self, path: &str) -> bool;

    /// Copy the asset at `path` to `destination`.
    ///
    /// # Returns
    /// Number of bytes written
    fn copy_to(&self, path: &str, destination: &Utf8Path) -> Result<u64, ExtractionError>;
}

/// Assets laid out as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: Utf8PathBuf,
}

impl DirectoryAssetSource {
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl AssetSource for DirectoryAssetSource {
    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    fn copy_to(&self, path: &str, destination: &Utf8Path) -> Result<u64, ExtractionError> {
        let source_path = self.root.join(path);
        let mut source = File::open(&source_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ExtractionError::AssetNotFound(path.to_string())
            } else {
                copy_error(path, destination, e)
            }
        })?;

        write_atomically(destination, |out| io::copy(&mut source, out))
            .map_err(|e| copy_error(path, destination, e))
    }
}

/// Assets stored under `assets/` in an APK (zip) archive.
///
/// Zip entry reads need exclusive access to the archive, so reads are
/// serialized through a mutex.
pub struct ApkAssetSource {
    path: Utf8PathBuf,
    archive: Mutex<ZipArchive<File>>,
}

impl std::fmt::Debug for ApkAssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApkAssetSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ApkAssetSource {
    const ASSET_PREFIX: &'static str = "assets/";

    /// Open an archive for asset reads.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<Self, ExtractionError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ExtractionError::Archive {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let archive = ZipArchive::new(file).map_err(|e| ExtractionError::Archive {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!("Opened asset archive {} ({} entries)", path, archive.len());

        Ok(Self {
            path,
            archive: Mutex::new(archive),
        })
    }

    fn entry_name(path: &str) -> String {
        format!("{}{}", Self::ASSET_PREFIX, path)
    }
}

impl AssetSource for ApkAssetSource {
    fn exists(&self, path: &str) -> bool {
        match self.archive.lock() {
            Ok(archive) => archive.index_for_name(&Self::entry_name(path)).is_some(),
            Err(_) => false,
        }
    }

    fn copy_to(&self, path: &str, destination: &Utf8Path) -> Result<u64, ExtractionError> {
        let mut archive = self.archive.lock().map_err(|_| ExtractionError::Archive {
            path: self.path.clone(),
            message: "archive lock poisoned".to_string(),
        })?;

        let mut entry = archive
            .by_name(&Self::entry_name(path))
            .map_err(|e| match e {
                zip::result::ZipError::FileNotFound => {
                    ExtractionError::AssetNotFound(path.to_string())
                }
                other => ExtractionError::Archive {
                    path: self.path.clone(),
                    message: other.to_string(),
                },
            })?;

        write_atomically(destination, |out| io::copy(&mut entry, out))
            .map_err(|e| copy_error(path, destination, e))
    }
}

fn copy_error(asset: &str, destination: &Utf8Path, source: io::Error) -> ExtractionError {
    ExtractionError::Copy {
        asset: asset.to_string(),
        destination: destination.to_path_buf(),
        source,
    }
}

/// Write `destination` through a `.tmp` sibling that is renamed into place.
///
/// A crash mid-copy leaves only the temp file, never a truncated file under
/// the final name (which the fast path would otherwise trust).
pub(crate) fn write_atomically<F>(destination: &Utf8Path, write: F) -> io::Result<u64>
where
    F: FnOnce(&mut dyn Write) -> io::Result<u64>,
{
    let tmp_path = Utf8PathBuf::from(format!("{}.tmp", destination));

    let result = (|| -> io::Result<u64> {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let written = write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(written)
    })();

    match result {
        Ok(written) => {
            fs::rename(&tmp_path, destination)?;
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn utf8_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_directory_source_exists_and_copy() {
        let temp = TempDir::new().unwrap();
        let root = utf8_dir(&temp);
        fs::create_dir_all(root.join("locales")).unwrap();
        fs::write(root.join("locales/fr.pak"), b"bonjour").unwrap();

        let source = DirectoryAssetSource::new(&root);
        assert!(source.exists("locales/fr.pak"));
        assert!(!source.exists("locales/de.pak"));

        let dest = root.join("fr.pak@1");
        let written = source.copy_to("locales/fr.pak", &dest).unwrap();
        assert_eq!(written, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"bonjour");
        assert!(!Utf8PathBuf::from(format!("{}.tmp", dest)).exists());
    }

    #[test]
    fn test_directory_source_missing_asset() {
        let temp = TempDir::new().unwrap();
        let root = utf8_dir(&temp);
        let source = DirectoryAssetSource::new(&root);

        let err = source
            .copy_to("locales/xx.pak", &root.join("xx.pak"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::AssetNotFound(_)));
    }

    #[test]
    fn test_apk_source_reads_assets_prefix() {
        let temp = TempDir::new().unwrap();
        let root = utf8_dir(&temp);
        let apk_path = root.join("app.apk");

        let mut writer = zip::ZipWriter::new(File::create(&apk_path).unwrap());
        writer
            .start_file("assets/locales/en-US.pak", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"english").unwrap();
        writer.finish().unwrap();

        let source = ApkAssetSource::open(&apk_path).unwrap();
        assert!(source.exists("locales/en-US.pak"));
        assert!(!source.exists("assets/locales/en-US.pak"));

        let dest = root.join("en-US.pak@7");
        assert_eq!(source.copy_to("locales/en-US.pak", &dest).unwrap(), 7);
        assert_eq!(fs::read(&dest).unwrap(), b"english");

        let err = source.copy_to("locales/de.pak", &root.join("de.pak")).unwrap_err();
        assert!(matches!(err, ExtractionError::AssetNotFound(_)));
    }

    #[test]
    fn test_apk_source_rejects_non_archive() {
        let temp = TempDir::new().unwrap();
        let root = utf8_dir(&temp);
        let bogus = root.join("bogus.apk");
        fs::write(&bogus, b"not a zip").unwrap();

        assert!(matches!(
            ApkAssetSource::open(&bogus),
            Err(ExtractionError::Archive { .. })
        ));
    }
}
