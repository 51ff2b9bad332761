//! Locale resolution: which packaged locale paks a UI language needs.
//!
//! Pure functions over strings - no I/O.

use super::ExtractionError;
use indexmap::IndexSet;
use regex::Regex;

/// Legacy Android language codes and the names the bundle uses for them.
const LEGACY_LANGUAGE_CODES: &[(&str, &str)] = &[
    ("iw", "he"),
    ("ji", "yi"),
    ("in", "id"),
    ("tl", "fil"),
    ("no", "nb"),
];

/// Resolves a device/UI language into the set of bundle locales to extract.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    /// Matches `ll`, `lll`, `ll-RR`, `ll_RR`, `ll-Script-RR`, `es-LATAM`, ...
    tag_pattern: Regex,

    fallback_locale: String,
}

impl LocaleResolver {
    pub fn new(fallback_locale: impl Into<String>) -> Self {
        Self {
            tag_pattern: Regex::new(r"^([A-Za-z]{2,3})(?:[-_][A-Za-z0-9]{1,8})*$")
                .expect("Invalid locale tag regex"),
            fallback_locale: fallback_locale.into(),
        }
    }

    pub fn fallback_locale(&self) -> &str {
        &self.fallback_locale
    }

    /// Reduce a language tag to the bundle's primary-language naming.
    ///
    /// `es-MX` → `es`, `pt_BR` → `pt`, `iw` → `he`. Malformed tags yield `None`.
    pub fn normalize_language(&self, tag: &str) -> Option<String> {
        let captures = self.tag_pattern.captures(tag.trim())?;
        let language = captures.get(1)?.as_str().to_ascii_lowercase();

        let mapped = LEGACY_LANGUAGE_CODES
            .iter()
            .find(|(legacy, _)| *legacy == language)
            .map(|(_, current)| (*current).to_string());

        Some(mapped.unwrap_or(language))
    }

    /// Select the bundle locales to extract for a UI language.
    ///
    /// # Arguments
    /// * `ui_language` - UI language override; empty means "use the device language"
    /// * `device_language` - Language of the device's default locale
    /// * `bundle_locales` - Locale tags packaged in the bundle, in build order
    ///
    /// # Returns
    /// Every bundle locale whose primary language matches, in bundle order. If
    /// none match, exactly the fallback locale. Never empty.
    ///
    /// # Errors
    /// [`ExtractionError::MissingFallbackLocale`] if the fallback is needed but
    /// was not packaged. The bundle build guarantees it exists, so this is a
    /// configuration error rather than a runtime condition.
    pub fn resolve(
        &self,
        ui_language: &str,
        device_language: &str,
        bundle_locales: &[String],
    ) -> Result<IndexSet<String>, ExtractionError> {
        let requested = if ui_language.trim().is_empty() {
            device_language
        } else {
            ui_language
        };

        let mut selected = IndexSet::new();

        if let Some(language) = self.normalize_language(requested) {
            for locale in bundle_locales {
                if self.normalize_language(locale).as_deref() == Some(language.as_str()) {
                    selected.insert(locale.clone());
                }
            }
            tracing::debug!(
                "Locale resolution: requested={}, language={}, matched={:?}",
                requested,
                language,
                selected
            );
        } else {
            tracing::warn!("Ignoring malformed language tag: {:?}", requested);
        }

        if selected.is_empty() {
            if !bundle_locales.iter().any(|l| l == &self.fallback_locale) {
                return Err(ExtractionError::MissingFallbackLocale {
                    locale: self.fallback_locale.clone(),
                });
            }
            tracing::info!(
                "No packaged locale for {:?}, falling back to {}",
                requested,
                self.fallback_locale
            );
            selected.insert(self.fallback_locale.clone());
        }

        Ok(selected)
    }
}

impl Default for LocaleResolver {
    fn default() -> Self {
        Self::new(crate::models::DEFAULT_FALLBACK_LOCALE)
    }
}
