use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Unknown entity template: {0}")]
    UnknownTemplate(String),

    #[error("Map glyph '{0}' has no terrain definition")]
    UnknownGlyph(char),

    #[error("Malformed map: {0}")]
    MalformedMap(String),

    #[error("Template data error: {0}")]
    TemplateData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
