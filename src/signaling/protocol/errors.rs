use thiserror::Error;

/// Problems with the content of one text message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    #[error("empty message")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command} requires {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("{command}: invalid {what}")]
    InvalidArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("{0} takes no argument")]
    UnexpectedArgument(&'static str),
}

/// Problems at the WebSocket frame level, before a message can be parsed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("binary frames are not supported")]
    Binary,
    #[error("frame of {actual} bytes exceeds limit of {max}")]
    TooLarge { max: usize, actual: usize },
    #[error(transparent)]
    Proto(#[from] ProtoError),
}
