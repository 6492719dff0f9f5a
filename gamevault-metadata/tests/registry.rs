use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gamevault_catalog::GameMetadata;
use gamevault_metadata::*;

struct Stub {
    slug: &'static str,
    priority: i32,
    enabled: bool,
}

#[async_trait]
impl MetadataProvider for Stub {
    fn slug(&self) -> &str {
        self.slug
    }

    fn name(&self) -> &str {
        "Stub"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError> {
        Ok(vec![GameMetadata {
            title: Some(query.to_string()),
            ..GameMetadata::new(self.slug, "1")
        }])
    }

    async fn fetch_by_id(&self, id: &str) -> Result<GameMetadata, ProviderError> {
        Err(ProviderError::NotFound(id.to_string()))
    }
}

fn stub(slug: &'static str, priority: i32) -> Arc<dyn MetadataProvider> {
    Arc::new(Stub {
        slug,
        priority,
        enabled: true,
    })
}

fn slugs(registry: &ProviderRegistry) -> Vec<String> {
    registry.providers().iter().map(|p| p.slug().to_string()).collect()
}

#[test]
fn keeps_providers_sorted_by_descending_priority() {
    let registry = ProviderRegistry::new();
    registry.register(stub("mid", 5)).unwrap();
    registry.register(stub("low", -3)).unwrap();
    registry.register(stub("high", 50)).unwrap();
    assert_eq!(slugs(&registry), ["high", "mid", "low"]);
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.priority_of("mid"), Some(5));
    assert_eq!(registry.priority_of("nope"), None);
}

#[test]
fn duplicate_slug_conflicts() {
    let registry = ProviderRegistry::new();
    registry.register(stub("igdb", 1)).unwrap();
    let err = registry.register(stub("igdb", 2)).unwrap_err();
    assert!(matches!(err, MetadataError::Conflict(_)), "{err}");
    assert_eq!(registry.len(), 1);
}

#[test]
fn duplicate_priority_conflicts() {
    let registry = ProviderRegistry::new();
    registry.register(stub("a", 7)).unwrap();
    let err = registry.register(stub("b", 7)).unwrap_err();
    assert!(matches!(err, MetadataError::Conflict(_)), "{err}");
    assert_eq!(slugs(&registry), ["a"]);
}

#[test]
fn reserved_and_blank_slugs_are_rejected() {
    let registry = ProviderRegistry::new();
    for slug in ["user", "gamevault", "", "   "] {
        let err = registry.register(stub(slug, 1)).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidSlug(_)), "{slug:?}: {err}");
    }
    assert!(registry.is_empty());
}

#[test]
fn lookup_by_slug() {
    let registry = ProviderRegistry::new();
    registry.register(stub("yaml", 0)).unwrap();
    assert_eq!(registry.get_by_slug("yaml").unwrap().slug(), "yaml");
    assert!(matches!(
        registry.get_by_slug("  "),
        Err(MetadataError::InvalidSlug(_))
    ));
    assert!(matches!(
        registry.get_by_slug("igdb"),
        Err(MetadataError::ProviderNotFound(s)) if s == "igdb"
    ));
}

#[test]
fn enabled_filters_disabled_providers() {
    let registry = ProviderRegistry::new();
    registry.register(stub("on", 2)).unwrap();
    registry
        .register(Arc::new(Stub {
            slug: "off",
            priority: 3,
            enabled: false,
        }))
        .unwrap();
    let enabled: Vec<String> = registry.enabled().iter().map(|p| p.slug().to_string()).collect();
    assert_eq!(enabled, ["on"]);
    assert_eq!(registry.providers().len(), 2);
}

#[test]
fn registrations_reflect_overrides() {
    let registry = ProviderRegistry::new();
    let wrapped = RateLimited::new(stub("igdb", 1)).with_overrides(
        Some(false),
        Some(99),
        Some(Duration::from_millis(250)),
    );
    registry.register(Arc::new(wrapped)).unwrap();

    let regs = registry.registrations();
    assert_eq!(
        regs,
        vec![ProviderRegistration {
            slug: "igdb".to_string(),
            name: "Stub".to_string(),
            priority: 99,
            enabled: false,
            request_interval: Duration::from_millis(250),
        }]
    );
    assert!(registry.enabled().is_empty());
}

#[tokio::test]
async fn disabled_wrapper_refuses_calls() {
    let wrapped = RateLimited::new(stub("igdb", 1)).with_overrides(Some(false), None, None);
    assert!(matches!(
        wrapped.search("Game").await,
        Err(ProviderError::Disabled)
    ));

    let open = RateLimited::new(stub("igdb", 1));
    let results = open.search("Game").await.unwrap();
    assert_eq!(results[0].title.as_deref(), Some("Game"));
}
