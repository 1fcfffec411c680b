use deck_proto::catalog::{builtin_stations, default_stations, StationCatalog};
use deck_proto::favorites::Favorites;
use deck_proto::protocol::Station;
use deck_proto::store::{FileStore, KvStore, KEY_CUSTOM_STATIONS};

fn custom(id: &str, url: &str) -> Station {
    Station {
        id: id.to_string(),
        name: id.to_string(),
        url: url.to_string(),
        genre: "Custom".to_string(),
        country: "User".to_string(),
        color: "#ffffff".to_string(),
        ..Station::default()
    }
}

#[test]
fn catalog_survives_restart_without_session_local_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let mut catalog = StationCatalog::load(&store, builtin_stations());
    assert_eq!(catalog.len(), 48);

    catalog
        .add(custom("custom-1", "http://stream.example.com/live"))
        .unwrap();
    catalog
        .add(custom("custom-2", "blob:deckradio/3"))
        .unwrap();
    catalog.mark_offline("it-1");
    catalog.persist(&store).unwrap();

    let raw = store.get_raw(KEY_CUSTOM_STATIONS).unwrap().unwrap();
    assert!(!raw.contains("blob:"));

    let reopened = StationCatalog::load(&FileStore::new(dir.path()), builtin_stations());
    assert_eq!(reopened.len(), 49);
    assert!(reopened.get("custom-1").is_some());
    assert!(reopened.get("custom-2").is_none());
    assert!(reopened.get("it-1").unwrap().is_offline());
}

#[test]
fn favorites_are_stored_under_their_own_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let mut favs = Favorites::load(&store);
    favs.toggle("uk-1");
    favs.toggle("it-3");
    favs.persist(&store).unwrap();

    assert!(dir.path().join("my_favorites.json").exists());
    assert!(!dir.path().join("my_custom_stations.json").exists());
    assert_eq!(Favorites::load(&store).ids(), ["uk-1", "it-3"]);
}

#[test]
fn stations_toml_override_replaces_builtin_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.toml");
    std::fs::write(
        &path,
        "[[station]]\nid = \"home\"\nname = \"Home FM\"\nurl = \"http://home.local/stream\"\n",
    )
    .unwrap();

    let defaults = default_stations(Some(&path));
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].name, "Home FM");

    let missing = dir.path().join("nope.toml");
    assert_eq!(default_stations(Some(&missing)).len(), 48);
}
