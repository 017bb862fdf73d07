use thiserror::Error;

/// Shown when the upstream reports a failure without a message of its own.
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Gemini APIエラーが発生しました";

/// Failures of one flowchart generation. `Display` is the message returned to the caller.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("{0}")]
    Upstream(String),

    #[error("Gemini APIから予期しない形式の応答が返されました")]
    UnexpectedUpstreamShape,

    #[error("APIから返されたJSONを解析できませんでした: {0}")]
    MalformedJson(String),

    #[error("無効なデータ構造がAPIから返されました")]
    InvalidShape,

    #[error("Gemini APIへの接続に失敗しました: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the key as a query parameter.
        GenerateError::Transport(err.without_url().to_string())
    }
}
