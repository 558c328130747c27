// tests/corpus_file.rs
// JSON file store behaviour on a real filesystem (tempdir per test).

use ncc_ai_news::corpus::{CorpusStore, JsonFileStore};
use ncc_ai_news::NewsItem;

fn item(link: &str, title: &str, tags: &[&str]) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        link: link.to_string(),
        description: String::new(),
        pub_date: "2025-01-06T09:30:00+09:00".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn missing_file_loads_as_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("all_topics.json"));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn save_then_load_preserves_order_and_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested/data/all_topics.json"));
    let items = vec![
        item("https://a.test/2", "二番目", &["経済"]),
        item("https://a.test/1", "first", &["uncategorized"]),
    ];

    store.save(&items).await.unwrap();
    let back = store.load().await.unwrap();

    assert_eq!(back, items);
}

#[tokio::test]
async fn file_is_pretty_utf8_without_escapes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_topics.json");
    let store = JsonFileStore::new(&path);

    store
        .save(&[item("https://a.test/1", "首相が欧州へ", &["政治"])])
        .await
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("首相が欧州へ"));
    assert!(text.contains("\"政治\""));
    assert!(!text.contains("\\u"));
    assert!(text.contains("\n    {\n        \"title\""));
    assert!(text.contains("\"pub_date\""));
}

#[tokio::test]
async fn save_replaces_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_topics.json");
    let store = JsonFileStore::new(&path);

    store.save(&[item("1", "one", &["a"])]).await.unwrap();
    store
        .save(&[item("2", "two", &["b"]), item("1", "one", &["a"])])
        .await
        .unwrap();

    assert_eq!(store.load().await.unwrap().len(), 2);
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["all_topics.json".to_string()]);
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_topics.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileStore::new(&path).load().await.unwrap_err();
    assert!(format!("{err:#}").contains("parsing corpus"));
}

#[tokio::test]
async fn legacy_entries_without_optional_fields_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_topics.json");
    std::fs::write(&path, r#"[{"title":"t","link":"https://a.test/x"}]"#).unwrap();

    let items = JsonFileStore::new(&path).load().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "");
    assert!(items[0].tags.is_empty());
}

#[tokio::test]
async fn legacy_entries_with_null_fields_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_topics.json");
    std::fs::write(
        &path,
        r#"[
    {"title":"t","link":"https://a.test/x","description":null,"pub_date":"","tags":["a"]},
    {"title":null,"link":"https://a.test/y","description":"d","pub_date":null,"tags":null}
]"#,
    )
    .unwrap();

    let store = JsonFileStore::new(&path);
    let items = store.load().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].description, "");
    assert_eq!(items[0].tags, vec!["a"]);
    assert_eq!(items[1].title, "");
    assert_eq!(items[1].pub_date, "");
    assert!(items[1].tags.is_empty());

    // Saved back as empty strings and lists, never null.
    store.save(&items).await.unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("null"));
}
