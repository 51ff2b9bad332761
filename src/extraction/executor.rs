use super::{AssetSource, ExtractionError, ExtractionPlan};
use crate::metrics::Metrics;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

/// Data files older releases extracted next to the paks. They are only ever
/// deleted, never extracted.
pub const LEGACY_DATA_FILES: [&str; 2] = ["icudtl.dat", "snapshot_blob.bin"];

/// Summary of one executor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Every planned file was already present; no I/O beyond the listing.
    pub fast_path: bool,
    pub files_deleted: usize,
    pub files_copied: usize,
    pub bytes_copied: u64,
}

/// Snapshot of the file names present in the output directory.
#[derive(Debug, Clone, Default)]
pub struct OutputDirectoryState {
    names: HashSet<String>,
}

impl OutputDirectoryState {
    /// List the regular files directly inside `dir`.
    pub fn scan(dir: &Utf8Path) -> Result<Self, ExtractionError> {
        let list_error = |source| ExtractionError::ListDirectory {
            path: dir.to_path_buf(),
            source,
        };

        let mut names = HashSet::new();
        for entry in dir.read_dir_utf8().map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            if entry.file_type().map_err(list_error)?.is_file() {
                names.insert(entry.file_name().to_string());
            }
        }

        Ok(Self { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether every output name in `plan` is present.
    pub fn satisfies(&self, plan: &ExtractionPlan) -> bool {
        plan.output_names().all(|name| self.contains(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Makes the output directory match an [`ExtractionPlan`].
///
/// The executor itself is synchronous; [`ResourceExtractor`](super::ResourceExtractor)
/// runs it once per process on a background runner.
#[derive(Debug, Clone)]
pub struct ExtractionExecutor {
    output_dir: Utf8PathBuf,

    /// Directory holding [`LEGACY_DATA_FILES`] (the app data directory)
    legacy_dir: Utf8PathBuf,

    metrics: Arc<Metrics>,
}

impl ExtractionExecutor {
    pub fn new<P: AsRef<Utf8Path>, L: AsRef<Utf8Path>>(
        output_dir: P,
        legacy_dir: L,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            legacy_dir: legacy_dir.as_ref().to_path_buf(),
            metrics,
        }
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Run the plan.
    ///
    /// 1. Create the output directory if needed
    /// 2. If every planned file already exists, stop (fast path)
    /// 3. Otherwise delete every existing file plus the legacy data files
    /// 4. Copy each planned asset into place
    ///
    /// # Errors
    /// Any failure is fatal for the run. Copies already made are left in place;
    /// the next run sees the directory as incomplete and starts over.
    pub fn execute(
        &self,
        plan: &ExtractionPlan,
        assets: &dyn AssetSource,
    ) -> Result<ExtractionReport, ExtractionError> {
        let start = Instant::now();

        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir).map_err(|source| {
                ExtractionError::OutputDirectory {
                    path: self.output_dir.clone(),
                    source,
                }
            })?;
            tracing::debug!("Created output directory {}", self.output_dir);
        }

        let state = OutputDirectoryState::scan(&self.output_dir)?;

        if state.satisfies(plan) {
            tracing::debug!(
                "All {} planned pak(s) already present in {} - skipping extraction",
                plan.len(),
                self.output_dir
            );
            self.metrics.record_fast_path();
            return Ok(ExtractionReport {
                fast_path: true,
                ..ExtractionReport::default()
            });
        }

        let mut report = ExtractionReport {
            files_deleted: self.delete_stale_files(&state)?,
            ..ExtractionReport::default()
        };

        for entry in plan.entries() {
            let destination = self.output_dir.join(&entry.output_name);
            let bytes = assets.copy_to(&entry.asset_path, &destination)?;

            tracing::debug!(
                "Extracted {} -> {} ({} bytes)",
                entry.asset_path,
                destination,
                bytes
            );
            self.metrics.record_file_copied(bytes);
            report.files_copied += 1;
            report.bytes_copied += bytes;
        }

        tracing::info!(
            "Extraction finished in {:.2}s: {} copied ({} bytes), {} deleted",
            start.elapsed().as_secs_f64(),
            report.files_copied,
            report.bytes_copied,
            report.files_deleted
        );

        Ok(report)
    }

    fn delete_stale_files(&self, state: &OutputDirectoryState) -> Result<usize, ExtractionError> {
        let mut deleted = 0;

        let stale = state.names().map(|name| self.output_dir.join(name));
        let legacy = LEGACY_DATA_FILES
            .iter()
            .map(|name| self.legacy_dir.join(name))
            .filter(|path| path.exists());

        for path in stale.chain(legacy) {
            fs::remove_file(&path).map_err(|source| ExtractionError::DeleteStale {
                path: path.clone(),
                source,
            })?;
            tracing::debug!("Deleted stale file {}", path);
            self.metrics.record_file_deleted();
            deleted += 1;
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{DirectoryAssetSource, PlanEntry};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        assets_root: Utf8PathBuf,
        data_dir: Utf8PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let assets_root = root.join("assets");
        fs::create_dir_all(assets_root.join("locales")).unwrap();
        fs::write(assets_root.join("locales/en-US.pak"), b"en").unwrap();
        fs::write(assets_root.join("locales/fr.pak"), b"fr!").unwrap();
        let data_dir = root.join("data");
        Fixture {
            _temp: temp,
            assets_root,
            data_dir,
        }
    }

    fn plan(entries: &[(&str, &str)]) -> ExtractionPlan {
        let mut plan = ExtractionPlan::new();
        for (asset, output) in entries {
            plan.push(PlanEntry {
                asset_path: asset.to_string(),
                output_name: output.to_string(),
            });
        }
        plan
    }

    #[test]
    fn test_first_run_creates_dir_and_copies() {
        let f = fixture();
        let executor = ExtractionExecutor::new(
            f.data_dir.join("paks"),
            &f.data_dir,
            Arc::new(Metrics::new()),
        );
        let assets = DirectoryAssetSource::new(&f.assets_root);

        let report = executor
            .execute(&plan(&[("locales/fr.pak", "fr.pak@2")]), &assets)
            .unwrap();

        assert!(!report.fast_path);
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.bytes_copied, 3);
        assert_eq!(fs::read(f.data_dir.join("paks/fr.pak@2")).unwrap(), b"fr!");
    }

    #[test]
    fn test_second_run_takes_fast_path() {
        let f = fixture();
        let metrics = Arc::new(Metrics::new());
        let executor =
            ExtractionExecutor::new(f.data_dir.join("paks"), &f.data_dir, Arc::clone(&metrics));
        let assets = DirectoryAssetSource::new(&f.assets_root);
        let p = plan(&[("locales/en-US.pak", "en-US.pak@2")]);

        executor.execute(&p, &assets).unwrap();
        let report = executor.execute(&p, &assets).unwrap();

        assert!(report.fast_path);
        assert_eq!(report.files_copied, 0);
        assert_eq!(report.files_deleted, 0);
        assert_eq!(metrics.snapshot().fast_path_runs, 1);
    }

    #[test]
    fn test_version_change_deletes_everything_including_legacy() {
        let f = fixture();
        let paks = f.data_dir.join("paks");
        fs::create_dir_all(&paks).unwrap();
        fs::write(paks.join("fr.pak@1"), b"old").unwrap();
        fs::write(paks.join("en-US.pak@1"), b"old").unwrap();
        fs::write(f.data_dir.join("icudtl.dat"), b"legacy").unwrap();

        let executor = ExtractionExecutor::new(&paks, &f.data_dir, Arc::new(Metrics::new()));
        let assets = DirectoryAssetSource::new(&f.assets_root);

        let report = executor
            .execute(&plan(&[("locales/fr.pak", "fr.pak@2")]), &assets)
            .unwrap();

        assert_eq!(report.files_deleted, 3);
        assert!(!paks.join("fr.pak@1").exists());
        assert!(!paks.join("en-US.pak@1").exists());
        assert!(!f.data_dir.join("icudtl.dat").exists());
        assert!(paks.join("fr.pak@2").exists());
    }

    #[test]
    fn test_missing_asset_is_fatal() {
        let f = fixture();
        let executor = ExtractionExecutor::new(
            f.data_dir.join("paks"),
            &f.data_dir,
            Arc::new(Metrics::new()),
        );
        let assets = DirectoryAssetSource::new(&f.assets_root);

        let err = executor
            .execute(&plan(&[("locales/de.pak", "de.pak@2")]), &assets)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::AssetNotFound(_)));
    }

    #[test]
    fn test_uncreatable_output_dir_is_fatal() {
        let f = fixture();
        fs::create_dir_all(&f.data_dir).unwrap();
        let blocker = f.data_dir.join("paks");
        fs::write(&blocker, b"a file where the directory should be").unwrap();

        let executor = ExtractionExecutor::new(
            blocker.join("nested"),
            &f.data_dir,
            Arc::new(Metrics::new()),
        );
        let assets = DirectoryAssetSource::new(&f.assets_root);

        let err = executor
            .execute(&plan(&[("locales/fr.pak", "fr.pak@2")]), &assets)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::OutputDirectory { .. }));
    }
}
