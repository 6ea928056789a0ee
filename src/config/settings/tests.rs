use super::*;
use tempfile::TempDir;

fn temp_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        ollama: OllamaConfig::default(),
        generation: GenerationConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };
    (config, temp_dir)
}

#[test]
fn defaults_are_valid() {
    let (config, _dir) = temp_config();
    assert!(config.validate().is_ok());
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load_from(temp_dir.path()).expect("load should succeed");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.generation, GenerationConfig::default());
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn save_and_reload_round_trips() {
    let (mut config, _dir) = temp_config();
    config.ollama.host = "embedder.internal".to_string();
    config.ollama.port = 8080;
    config.generation.min_score = 0.3;
    config.chunking.max_chars = 2000;

    config.save().expect("save should succeed");

    let reloaded = Config::load_from(&config.base_dir).expect("reload should succeed");
    assert_eq!(reloaded, config);
}

#[test]
fn rejects_invalid_protocol() {
    let (mut config, _dir) = temp_config();
    config.ollama.protocol = "ftp".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn rejects_empty_models() {
    let (mut config, _dir) = temp_config();
    config.ollama.model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    let (mut config, _dir) = temp_config();
    config.generation.model = String::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn rejects_overlap_wider_than_min_chunk() {
    let (mut config, _dir) = temp_config();
    config.chunking.min_chars = 100;
    config.chunking.overlap_chars = 100;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));
}

#[test]
fn rejects_min_score_out_of_range() {
    let (mut config, _dir) = temp_config();
    config.generation.min_score = 1.5;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMinScore(_))
    ));
}

#[test]
fn paths_hang_off_base_dir() {
    let (config, dir) = temp_config();

    assert_eq!(config.database_path(), dir.path().join("metadata.db"));
    assert_eq!(config.vector_database_path(), dir.path().join("vectors"));
    assert_eq!(config.corpus_dir_path(), dir.path().join("corpus"));
    assert_eq!(
        config.registry_path(),
        dir.path().join("scheme_links.json")
    );
}

#[test]
fn ollama_url_includes_port() {
    let (config, _dir) = temp_config();
    let url = config.ollama.ollama_url().expect("url should parse");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}
