use thiserror::Error;

pub type WidgetResult<T> = Result<T, WidgetError>;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("artwork request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("artwork request returned status {0}")]
    HttpStatus(u16),
    #[error("artwork loading unavailable: {0}")]
    Unavailable(&'static str),
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}
