//! Extraction planning: which asset goes to which output file name.

use super::AssetSource;
use crate::models::PackagingKind;
use camino::Utf8Path;
use indexmap::IndexSet;

/// Shared compressed-locale directory of monolithic packages.
pub const COMPRESSED_LOCALES_DIR: &str = "locales";

/// One asset to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Path inside the asset source, e.g. `locales/fr.pak`
    pub asset_path: String,

    /// File name inside the output directory: asset basename + version suffix
    pub output_name: String,
}

/// Ordered list of assets to extract. No two entries share an output name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionPlan {
    entries: Vec<PlanEntry>,
}

impl ExtractionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless its output name is already planned.
    ///
    /// # Returns
    /// `true` if the entry was added
    pub fn push(&mut self, entry: PlanEntry) -> bool {
        if self.entries.iter().any(|e| e.output_name == entry.output_name) {
            tracing::debug!("Skipping duplicate plan entry: {}", entry.output_name);
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.output_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns a resolved locale set into an [`ExtractionPlan`].
#[derive(Debug, Clone)]
pub struct ExtractionPlanner {
    packaging: PackagingKind,
    version_suffix: String,
}

impl ExtractionPlanner {
    pub fn new(packaging: PackagingKind, version_suffix: impl Into<String>) -> Self {
        Self {
            packaging,
            version_suffix: version_suffix.into(),
        }
    }

    /// Asset directory holding the pak for `locale`.
    ///
    /// Monolithic packages share `locales/`; bundles ship each language in its
    /// own split, `locales#lang_<language>/`.
    pub fn asset_dir(&self, locale: &str) -> String {
        match self.packaging {
            PackagingKind::Apk => COMPRESSED_LOCALES_DIR.to_string(),
            PackagingKind::Bundle => {
                let language = locale
                    .split(['-', '_'])
                    .next()
                    .unwrap_or(locale)
                    .to_ascii_lowercase();
                format!("{}#lang_{}", COMPRESSED_LOCALES_DIR, language)
            }
        }
    }

    pub fn asset_path(&self, locale: &str) -> String {
        format!("{}/{}.pak", self.asset_dir(locale), locale)
    }

    /// Output file name for an asset path: its basename plus the version suffix.
    pub fn output_name(&self, asset_path: &str) -> String {
        let basename = Utf8Path::new(asset_path).file_name().unwrap_or(asset_path);
        format!("{}{}", basename, self.version_suffix)
    }

    /// Build the plan for `locales`.
    ///
    /// The first locale's pak is probed in the asset source. If it is absent
    /// the package keeps its locales uncompressed and readable in place, and
    /// the plan is empty. That is a normal outcome, not an error.
    pub fn plan<S: AssetSource + ?Sized>(
        &self,
        locales: &IndexSet<String>,
        assets: &S,
    ) -> ExtractionPlan {
        let mut plan = ExtractionPlan::new();

        let Some(first) = locales.first() else {
            return plan;
        };

        let probe = self.asset_path(first);
        if !assets.exists(&probe) {
            tracing::debug!(
                "No compressed locale pak at {} - extraction not required",
                probe
            );
            return plan;
        }

        for locale in locales {
            let asset_path = self.asset_path(locale);
            let output_name = self.output_name(&asset_path);
            plan.push(PlanEntry {
                asset_path,
                output_name,
            });
        }

        tracing::info!(
            "Planned extraction of {} locale pak(s): {:?}",
            plan.len(),
            plan.output_names().collect::<Vec<_>>()
        );

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeAssets(HashSet<&'static str>);

    impl AssetSource for FakeAssets {
        fn exists(&self, path: &str) -> bool {
            self.0.contains(path)
        }

        fn copy_to(
            &self,
            path: &str,
            _destination: &camino::Utf8Path,
        ) -> Result<u64, crate::extraction::ExtractionError> {
            Err(crate::extraction::ExtractionError::AssetNotFound(path.to_string()))
        }
    }

    fn set(tags: &[&str]) -> IndexSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_apk_plan_single_locale() {
        let planner = ExtractionPlanner::new(PackagingKind::Apk, "@42");
        let assets = FakeAssets(["locales/es-LATAM.pak"].into_iter().collect());

        let plan = planner.plan(&set(&["es-LATAM"]), &assets);

        assert_eq!(
            plan.entries(),
            &[PlanEntry {
                asset_path: "locales/es-LATAM.pak".to_string(),
                output_name: "es-LATAM.pak@42".to_string(),
            }]
        );
    }

    #[test]
    fn test_bundle_uses_language_split_dir() {
        let planner = ExtractionPlanner::new(PackagingKind::Bundle, "@1");
        assert_eq!(planner.asset_path("pt-BR"), "locales#lang_pt/pt-BR.pak");

        let assets = FakeAssets(["locales#lang_pt/pt-BR.pak"].into_iter().collect());
        let plan = planner.plan(&set(&["pt-BR", "pt-PT"]), &assets);

        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.output_names().collect::<Vec<_>>(),
            vec!["pt-BR.pak@1", "pt-PT.pak@1"]
        );
    }

    #[test]
    fn test_failed_probe_yields_empty_plan() {
        let planner = ExtractionPlanner::new(PackagingKind::Apk, "@42");
        let assets = FakeAssets(HashSet::new());

        let plan = planner.plan(&set(&["fr"]), &assets);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_rejects_duplicate_output_names() {
        let mut plan = ExtractionPlan::new();
        let entry = PlanEntry {
            asset_path: "locales/fr.pak".to_string(),
            output_name: "fr.pak@1".to_string(),
        };

        assert!(plan.push(entry.clone()));
        assert!(!plan.push(PlanEntry {
            asset_path: "other/fr.pak".to_string(),
            ..entry
        }));
        assert_eq!(plan.len(), 1);
    }
}
