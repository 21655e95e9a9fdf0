use thiserror::Error;

use crate::engine::PlaybackMode;

/// Errors surfaced by the engine, its configuration and offline rendering.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown {mode} preset index {index}")]
    UnknownPreset { mode: PlaybackMode, index: usize },

    #[error("unknown ambient sound '{0}'")]
    UnknownSound(String),

    #[error("audio backend failure: {0}")]
    Backend(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_resource() {
        let err = EngineError::UnknownPreset {
            mode: PlaybackMode::Binaural,
            index: 9,
        };
        assert_eq!(err.to_string(), "unknown binaural preset index 9");

        let err = EngineError::UnknownSound("thunder".into());
        assert_eq!(err.to_string(), "unknown ambient sound 'thunder'");
    }

    #[test]
    fn json_errors_convert() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
