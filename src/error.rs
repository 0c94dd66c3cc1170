use std::path::PathBuf;

/// Result type alias for the pipeline stages
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the pipeline stages
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    /// A token the main block must declare is absent
    MissingToken(String),
    /// A type reference named in an annotation cannot be located
    UnresolvedReference {
        reference: String,
        file: PathBuf,
        reason: String,
    },
    /// The parent chain of a subrouter mount does not terminate
    SubrouterCycle(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO 错误: {}", e),
            Error::MissingToken(key) => {
                write!(f, "主文件缺少必需的 \"{}\" 注解", key)
            }
            Error::UnresolvedReference {
                reference,
                file,
                reason,
            } => write!(
                f,
                "无法解析引用 \"{}\" ({}): {}",
                reference,
                file.display(),
                reason
            ),
            Error::SubrouterCycle(name) => {
                write!(f, "检测到子路由循环引用: {}", name)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unresolved_reference() {
        let err = Error::UnresolvedReference {
            reference: "model.User".to_string(),
            file: PathBuf::from("handler/user.go"),
            reason: "unknown import alias \"model\"".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("model.User"));
        assert!(message.contains("handler/user.go"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&Error::SubrouterCycle("a".into())).is_none());
    }
}
