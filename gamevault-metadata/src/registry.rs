//! Registry of metadata providers, ordered by descending priority.

use std::sync::{Arc, PoisonError, RwLock};

use gamevault_catalog::is_reserved_slug;

use crate::error::MetadataError;
use crate::provider::{MetadataProvider, ProviderRegistration};

/// The set of registered providers.
///
/// The list is re-sorted on every successful registration so that readers
/// always observe it highest priority first.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn MetadataProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider.
    ///
    /// Fails with `InvalidSlug` for a blank or reserved slug and with
    /// `Conflict` if the slug or the priority is already taken. A failed
    /// registration leaves the registry unchanged.
    pub fn register(&self, provider: Arc<dyn MetadataProvider>) -> Result<(), MetadataError> {
        let slug = provider.slug().trim().to_string();
        if slug.is_empty() || is_reserved_slug(&slug) {
            return Err(MetadataError::InvalidSlug(provider.slug().to_string()));
        }

        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        if providers.iter().any(|p| p.slug() == slug) {
            return Err(MetadataError::Conflict(format!(
                "provider '{}' is already registered",
                slug
            )));
        }
        if let Some(existing) = providers.iter().find(|p| p.priority() == provider.priority()) {
            return Err(MetadataError::Conflict(format!(
                "priority {} of '{}' is already used by '{}'",
                provider.priority(),
                slug,
                existing.slug()
            )));
        }

        log::debug!(
            "Registered metadata provider '{}' (priority {})",
            slug,
            provider.priority()
        );
        providers.push(provider);
        providers.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Ok(())
    }

    /// Look up a provider. A blank slug is rejected before the lookup.
    pub fn get_by_slug(&self, slug: &str) -> Result<Arc<dyn MetadataProvider>, MetadataError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(MetadataError::InvalidSlug(slug.to_string()));
        }
        self.read()
            .iter()
            .find(|p| p.slug() == slug)
            .cloned()
            .ok_or_else(|| MetadataError::ProviderNotFound(slug.to_string()))
    }

    /// All providers, highest priority first.
    pub fn providers(&self) -> Vec<Arc<dyn MetadataProvider>> {
        self.read().clone()
    }

    /// Enabled providers, highest priority first.
    pub fn enabled(&self) -> Vec<Arc<dyn MetadataProvider>> {
        self.read().iter().filter(|p| p.enabled()).cloned().collect()
    }

    pub fn priority_of(&self, slug: &str) -> Option<i32> {
        self.read()
            .iter()
            .find(|p| p.slug() == slug)
            .map(|p| p.priority())
    }

    pub fn registrations(&self) -> Vec<ProviderRegistration> {
        self.read().iter().map(|p| p.registration()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn MetadataProvider>>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }
}
