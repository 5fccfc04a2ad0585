/// Failures while locating, reading or writing docflow settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read docflow settings {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write docflow settings {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize docflow settings for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("docflow settings {path} are not valid yaml: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid docflow settings: {0}")]
    Invalid(String),
    #[error("HOME is not set; docflow keeps its settings under $HOME/.docflow")]
    HomeUnset,
    #[error("docflow is not set up: {path} is missing (run `docflow setup`)")]
    NotInitialized { path: String },
}
