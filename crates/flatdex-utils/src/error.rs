use std::{error::Error, fmt, path::PathBuf};

#[derive(Debug)]
pub enum FileSystemError {
    File {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    Directory {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    NotADirectory {
        path: PathBuf,
    },

    NoParentDirectory {
        path: PathBuf,
    },
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSystemError::File {
                path,
                action,
                source,
            } => {
                write!(f, "Failed to {action} file `{}`: {source}", path.display())
            }
            FileSystemError::Directory {
                path,
                action,
                source,
            } => {
                write!(
                    f,
                    "Failed to {action} directory `{}`: {source}",
                    path.display()
                )
            }
            FileSystemError::NotADirectory { path } => {
                write!(f, "`{}` is not a directory", path.display())
            }
            FileSystemError::NoParentDirectory { path } => {
                write!(f, "`{}` has no parent directory", path.display())
            }
        }
    }
}

impl Error for FileSystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FileSystemError::File { source, .. } => Some(source),
            FileSystemError::Directory { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum HashError {
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::ReadFailed { path, source } => {
                write!(f, "Failed to read file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for HashError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HashError::ReadFailed { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnvError {
    UnclosedReference { input: String },

    ExpectedVariableName { input: String },

    ExpectedSeparator { input: String },

    MissingVariable { var: String, input: String },
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::UnclosedReference { input } => {
                write!(f, "Unclosed variable reference in `{input}`")
            }
            EnvError::ExpectedVariableName { input } => {
                write!(f, "Expected variable name after `${{` in `{input}`")
            }
            EnvError::ExpectedSeparator { input } => {
                write!(f, "Expected `:` or `}}` after variable name in `{input}`")
            }
            EnvError::MissingVariable { var, input } => {
                write!(f, "Environment variable `{var}` not set in `{input}`")
            }
        }
    }
}

impl Error for EnvError {}

#[derive(Debug)]
pub enum UtilsError {
    Env(EnvError),
    FileSystem(FileSystemError),
    Hash(HashError),
}

impl fmt::Display for UtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtilsError::Env(err) => write!(f, "{err}"),
            UtilsError::FileSystem(err) => write!(f, "{err}"),
            UtilsError::Hash(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UtilsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UtilsError::Env(err) => Some(err),
            UtilsError::FileSystem(err) => Some(err),
            UtilsError::Hash(err) => Some(err),
        }
    }
}

impl From<EnvError> for UtilsError {
    fn from(err: EnvError) -> Self {
        UtilsError::Env(err)
    }
}

impl From<FileSystemError> for UtilsError {
    fn from(err: FileSystemError) -> Self {
        UtilsError::FileSystem(err)
    }
}

impl From<HashError> for UtilsError {
    fn from(err: HashError) -> Self {
        UtilsError::Hash(err)
    }
}

pub type EnvResult<T> = std::result::Result<T, EnvError>;
pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type HashResult<T> = std::result::Result<T, HashError>;

pub type UtilsResult<T> = std::result::Result<T, UtilsError>;
