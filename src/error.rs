use crate::types::ErrorCode;

/// Errors surfaced by the client, both wire-level and local.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A connection-level protocol violation; carries the code that was (or
    /// would have been) advertised in GOAWAY.
    #[error("connection error {code:?}: {context}")]
    Connection {
        code: ErrorCode,
        context: &'static str,
    },
    /// The peer reset one stream with RST_STREAM.
    #[error("stream reset by peer: {0:?}")]
    Reset(ErrorCode),
    /// A stream-scoped failure; we reset that one stream and the
    /// connection lives on.
    #[error("stream error {0:?}")]
    Stream(ErrorCode),
    #[error("request timed out")]
    Timeout,
    #[error("settings synchronization timed out")]
    SettingsTimeout,
    #[error("request cancelled")]
    Cancelled,
    #[error("client is not connected")]
    NotConnected,
    #[error("operation already in progress")]
    Busy,
    #[error("peer stream limit reached")]
    StreamLimit,
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("peer did not negotiate h2 via ALPN")]
    NoAlpn,
    #[error("connection closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn conn(code: ErrorCode, context: &'static str) -> Self {
        Self::Connection { code, context }
    }

    /// Wire code advertised when this error tears the connection down.
    #[must_use]
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            Self::Connection { code, .. } | Self::Reset(code) | Self::Stream(code) => *code,
            Self::SettingsTimeout => ErrorCode::SettingsTimeout,
            Self::Timeout | Self::Cancelled | Self::Closed => ErrorCode::Cancel,
            Self::Io(_) | Self::NotConnected => ErrorCode::InternalError,
            _ => ErrorCode::ProtocolError,
        }
    }

    /// A fresh error describing the same failure, used when one connection
    /// error has to be delivered to several pending completions.
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Self::Connection { code, context } => Self::Connection {
                code: *code,
                context,
            },
            Self::Reset(code) => Self::Reset(*code),
            Self::Stream(code) => Self::Stream(*code),
            Self::Timeout => Self::Timeout,
            Self::SettingsTimeout => Self::SettingsTimeout,
            Self::Cancelled => Self::Cancelled,
            Self::NotConnected => Self::NotConnected,
            Self::Busy => Self::Busy,
            Self::StreamLimit => Self::StreamLimit,
            Self::InvalidRequest(what) => Self::InvalidRequest(what),
            Self::NoAlpn => Self::NoAlpn,
            Self::Io(err) => Self::Io(std::io::Error::new(err.kind(), err.to_string())),
            _ => Self::Closed,
        }
    }
}
