//! Display-name localization.
//!
//! Rendering translations is the host application's concern; this module
//! only defines the seam and two small implementations.

use std::collections::HashMap;

use crate::models::DisplayName;

/// Resolves a display-name template to text.
pub trait Localizer: Send + Sync {
    fn localize(&self, name: &DisplayName) -> String;
}

/// Returns fixed text as-is and localization keys unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyLocalizer;

impl Localizer for KeyLocalizer {
    fn localize(&self, name: &DisplayName) -> String {
        match name {
            DisplayName::Fixed(text) => text.clone(),
            DisplayName::Localizable { key, .. } => key.clone(),
        }
    }
}

/// Dictionary-backed localizer keyed by (resource, key).
///
/// Missing entries fall back to the key.
#[derive(Debug, Default, Clone)]
pub struct DictionaryLocalizer {
    entries: HashMap<(String, String), String>,
}

impl DictionaryLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        resource: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.entries
            .insert((resource.into(), key.into()), text.into());
        self
    }
}

impl Localizer for DictionaryLocalizer {
    fn localize(&self, name: &DisplayName) -> String {
        match name {
            DisplayName::Fixed(text) => text.clone(),
            DisplayName::Localizable { resource, key } => self
                .entries
                .get(&(resource.clone(), key.clone()))
                .cloned()
                .unwrap_or_else(|| key.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_falls_back_to_key() {
        let localizer = DictionaryLocalizer::new().with_entry("Blog", "Posts", "Blog posts");

        assert_eq!(
            localizer.localize(&DisplayName::localizable("Blog", "Posts")),
            "Blog posts"
        );
        assert_eq!(
            localizer.localize(&DisplayName::localizable("Blog", "Tags")),
            "Tags"
        );
        assert_eq!(localizer.localize(&DisplayName::fixed("Raw")), "Raw");
    }
}
