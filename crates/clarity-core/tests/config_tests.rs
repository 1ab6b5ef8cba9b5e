use std::path::Path;

use clarity_core::config::{resolve_with_base, Config, LlmBackend};
use clarity_core::Error;
use figment::providers::{Format, Toml};
use figment::Figment;

fn config_from(toml: &str) -> Config {
    Config::from_figment(Figment::new().merge(Toml::string(toml)))
}

#[test]
fn empty_config_yields_defaults() {
    let settings = config_from("").settings().expect("settings");
    assert_eq!(settings.elastic.url, "http://localhost:9200");
    assert_eq!(settings.elastic.index_name, "vague-actual");
    assert_eq!(settings.embedding.dim, 384);
    assert_eq!(settings.llm.backend, LlmBackend::Hosted);
    assert_eq!(settings.llm.model, "gpt-4o-mini");
    assert_eq!(settings.eval.max_concurrency, 5);
    assert_eq!(settings.eval.max_retries, 3);
}

#[test]
fn sections_override_individual_keys() {
    let settings = config_from(
        r#"
        [elastic]
        index_name = "vague-actual-mpnet"

        [llm]
        backend = "local"
        model = "phi3"
        "#,
    )
    .settings()
    .expect("settings");
    assert_eq!(settings.elastic.index_name, "vague-actual-mpnet");
    assert_eq!(settings.elastic.url, "http://localhost:9200");
    assert_eq!(settings.llm.backend, LlmBackend::Local);
    assert_eq!(settings.llm.model, "phi3");
    assert_eq!(settings.llm.judge_model, "gpt-4o-mini");
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = config_from("[eval]\nmax_concurrency = 0").settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn get_reads_nested_keys() {
    let config = config_from("[data]\ndocuments = \"docs.json\"");
    let docs: String = config.get("data.documents").expect("key");
    assert_eq!(docs, "docs.json");
    assert!(config.get::<String>("data.missing").is_err());
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/clarity");
    assert_eq!(resolve_with_base(base, "data/x.json"), base.join("data/x.json"));
    assert_eq!(resolve_with_base(base, "/abs/x.json"), Path::new("/abs/x.json"));
}
