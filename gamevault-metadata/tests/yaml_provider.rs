use std::fs;

use gamevault_metadata::providers::yaml::YAML_SLUG;
use gamevault_metadata::*;

fn sidecars() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("hollow-knight.yaml"),
        "title: Hollow Knight\ndescription: Bugs\ndevelopers:\n  - name: Team Cherry\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("hk-silksong.yml"),
        "title: Hollow Knight Silksong\n",
    )
    .unwrap();
    fs::write(dir.path().join("celeste.yaml"), "provider_data_id: cel\ntitle: Celeste\n").unwrap();
    fs::write(dir.path().join("readme.txt"), "not a record").unwrap();
    dir
}

#[tokio::test]
async fn search_ignores_case_and_ranks_exact_matches_first() {
    let dir = sidecars();
    let provider = YamlProvider::load(dir.path()).unwrap();
    assert_eq!(provider.len(), 3);
    assert_eq!(provider.slug(), YAML_SLUG);

    let titles: Vec<String> = provider
        .search("hollow KNIGHT")
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.title)
        .collect();
    assert_eq!(titles, ["Hollow Knight", "Hollow Knight Silksong"]);

    assert!(provider.search("zelda").await.unwrap().is_empty());
    assert!(provider.search("  ").await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_by_file_stem_or_explicit_id() {
    let dir = sidecars();
    let provider = YamlProvider::load(dir.path()).unwrap();

    let hk = provider.fetch_by_id("hollow-knight").await.unwrap();
    assert_eq!(hk.provider_slug, YAML_SLUG);
    assert_eq!(hk.developers[0].name, "Team Cherry");

    let celeste = provider.fetch_by_id("cel").await.unwrap();
    assert_eq!(celeste.title.as_deref(), Some("Celeste"));

    assert!(matches!(
        provider.fetch_by_id("celeste").await,
        Err(ProviderError::NotFound(id)) if id == "celeste"
    ));
}

#[test]
fn missing_directory_is_empty_and_bad_yaml_fails() {
    let dir = tempfile::tempdir().unwrap();
    let provider = YamlProvider::load(&dir.path().join("absent")).unwrap();
    assert!(provider.is_empty());

    fs::write(dir.path().join("broken.yaml"), "title: [unclosed\n").unwrap();
    assert!(matches!(
        YamlProvider::load(dir.path()),
        Err(ProviderError::Yaml(_))
    ));
}

#[test]
fn priority_can_be_overridden() {
    let dir = tempfile::tempdir().unwrap();
    let provider = YamlProvider::load(dir.path()).unwrap().with_priority(-5);
    assert_eq!(provider.priority(), -5);
    assert!(provider.enabled());
}
