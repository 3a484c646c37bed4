use super::*;
use serial_test::serial;
use std::collections::HashMap;
use tempfile::TempDir;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.weaviate.host, "wikiragweaviate");
    assert_eq!(config.weaviate.http_port, 8080);
    assert_eq!(config.weaviate.grpc_port, 50051);
    assert_eq!(config.weaviate.default_collection, "LinuxCommand");
    assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
    assert_eq!(config.pipeline.fetch_limit, 12);
    assert_eq!(config.pipeline.context_limit, 4);
    assert!((config.pipeline.relevance_threshold - 0.20).abs() < f32::EPSILON);
    assert!((config.pipeline.alpha - 0.5).abs() < f32::EPSILON);
    assert!(config.pipeline.relevance_gate);
    assert!(config.pipeline.safety_scan);
    assert!(!config.pipeline.rerank);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid = config.clone();
    invalid.weaviate.protocol = "ftp".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.weaviate.http_port = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.openai.chat_model = String::new();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.pipeline.alpha = 1.5;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidAlpha(_))
    ));

    let mut invalid = config.clone();
    invalid.pipeline.context_limit = 20;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidLimits { .. })
    ));

    let mut invalid = config.clone();
    invalid.pipeline.relevance_threshold = f32::NAN;
    assert!(invalid.validate().is_err());

    let mut invalid = config;
    invalid.pipeline.danger_keywords.push(String::new());
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::EmptyDenylistEntry)
    ));
}

#[test]
fn weaviate_url_generation() {
    let config = Config::default();
    let url = config
        .weaviate
        .base_url()
        .expect("should build weaviate url");
    assert_eq!(url.as_str(), "http://wikiragweaviate:8080/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed);
}

#[test]
fn api_key_is_never_serialized() {
    let config = Config::default().with_api_key("sk-secret");
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(!toml_str.contains("sk-secret"));
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [weaviate]
        host = "localhost"

        [pipeline]
        rerank = true
        answer_mode = "strict"
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(parsed.weaviate.host, "localhost");
    assert_eq!(parsed.weaviate.http_port, 8080);
    assert!(parsed.pipeline.rerank);
    assert_eq!(parsed.pipeline.answer_mode, AnswerMode::Strict);
    assert_eq!(parsed.pipeline.search, SearchMode::Hybrid);
}

#[test]
fn overrides_apply_to_weaviate_and_key() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[
            (ENV_WEAVIATE_HOST, "localhost"),
            (ENV_WEAVIATE_HTTP_PORT, "9090"),
            (ENV_WEAVIATE_GRPC_PORT, "50052"),
            (ENV_WEAVIATE_DEFAULT_COLLECTION, "NewCollection"),
            (ENV_OPENAI_API_KEY, "sk-test"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.weaviate.host, "localhost");
    assert_eq!(config.weaviate.http_port, 9090);
    assert_eq!(config.weaviate.grpc_port, 50052);
    assert_eq!(config.weaviate.default_collection, "NewCollection");
    assert_eq!(config.api_key().expect("key present"), "sk-test");
}

#[test]
fn blank_overrides_are_ignored() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[(ENV_WEAVIATE_HOST, "  "), (ENV_OPENAI_API_KEY, "")]))
        .expect("blank overrides are skipped");
    assert_eq!(config.weaviate.host, "wikiragweaviate");
    assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
}

#[test]
fn bad_port_override_is_rejected() {
    let mut config = Config::default();
    let err = config
        .apply_overrides(lookup_from(&[(ENV_WEAVIATE_HTTP_PORT, "eighty")]))
        .expect_err("non-numeric port must fail");
    assert!(matches!(err, ConfigError::InvalidEnvValue { .. }));
}

#[test]
fn missing_api_key_is_an_error() {
    let config = Config::default();
    assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
}

#[test]
fn query_log_path_resolution() {
    let mut config = Config::with_base_dir("/tmp/rag");
    assert_eq!(config.get_base_dir(), Path::new("/tmp/rag"));
    assert!(config.api_key().is_err());
    assert_eq!(config.query_log_path(), PathBuf::from("/tmp/rag/queries.csv"));

    config.query_log.path = PathBuf::from("/var/log/rag.csv");
    assert_eq!(config.query_log_path(), PathBuf::from("/var/log/rag.csv"));
}

#[test]
fn strategy_follows_search_mode() {
    let mut pipeline = PipelineConfig::default();
    assert_eq!(pipeline.strategy(), SearchStrategy::Hybrid { alpha: 0.5 });
    pipeline.search = SearchMode::NearVector;
    assert_eq!(pipeline.strategy(), SearchStrategy::NearVector);
}

#[test]
fn setter_validation() {
    let mut weaviate = WeaviateConfig::default();
    assert!(weaviate.set_host("localhost".to_string()).is_ok());
    assert!(weaviate.set_http_port(0).is_err());
    assert!(weaviate.set_default_collection("  ".to_string()).is_err());

    let mut openai = OpenAiConfig::default();
    assert!(openai.set_chat_model("gpt-4o".to_string()).is_ok());
    assert!(openai.set_embedding_model(String::new()).is_err());

    let mut pipeline = PipelineConfig::default();
    assert!(pipeline.set_alpha(0.7).is_ok());
    assert!(pipeline.set_alpha(-0.1).is_err());
    assert!(pipeline.set_relevance_threshold(f32::INFINITY).is_err());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.pipeline.rerank = true;
    config.weaviate.host = "localhost".to_string();
    config.save().expect("should save config");

    let loaded = Config::load_file(temp_dir.path()).expect("should load config");
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn load_reads_api_key_from_environment() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // SAFETY: serialized with every other test that touches the process environment.
    unsafe { std::env::set_var(ENV_OPENAI_API_KEY, "sk-from-env") };
    let loaded = Config::load(temp_dir.path());
    // SAFETY: see above.
    unsafe { std::env::remove_var(ENV_OPENAI_API_KEY) };

    let config = loaded.expect("config should load");
    assert_eq!(config.api_key().expect("key present"), "sk-from-env");
}
