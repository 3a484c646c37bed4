use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config(temp_dir.path());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(!config.weaviate.host.is_empty());
    assert!(config.weaviate.http_port > 0);
    assert!(!config.openai.chat_model.is_empty());
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut saved = Config::with_base_dir(temp_dir.path());
    saved.weaviate.default_collection = "LinuxCommandsV2".to_string();
    saved.save().expect("should save config");

    let config = load_existing_config(temp_dir.path());
    assert_eq!(config.weaviate.default_collection, "LinuxCommandsV2");
}

#[test]
fn unreachable_weaviate_fails_connection_check() {
    let weaviate = WeaviateConfig {
        host: "127.0.0.1".to_string(),
        http_port: 1,
        ..WeaviateConfig::default()
    };
    assert!(!test_weaviate_connection(&weaviate));
}
