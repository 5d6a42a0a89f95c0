pub type InvitaResult<T> = Result<T, InvitaError>;

#[derive(thiserror::Error, Debug)]
pub enum InvitaError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("timeline error: {0}")]
    Timeline(String),

    #[error("phase error: {0}")]
    Phase(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InvitaError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline(msg.into())
    }

    pub fn phase(msg: impl Into<String>) -> Self {
        Self::Phase(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for InvitaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            InvitaError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            InvitaError::timeline("x")
                .to_string()
                .contains("timeline error:")
        );
        assert!(InvitaError::phase("x").to_string().contains("phase error:"));
        assert!(InvitaError::audio("x").to_string().contains("audio error:"));
        assert!(InvitaError::config("x").to_string().contains("config error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = InvitaError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: InvitaError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, InvitaError::Config(_)));
    }
}
