use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("recognizer not found: {0}")]
    RecognizerNotFound(String),

    #[error("failed to load model: {0}")]
    ModelLoadFailed(String),

    #[error("failed to create recognizer stream: {0}")]
    StreamCreateFailed(String),

    #[error("failed to feed audio: {0}")]
    FeedFailed(String),

    #[error("failed to parse recognizer result: {0}")]
    ResultParseFailed(String),
}
