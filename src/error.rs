use thiserror::Error;

/// The typed error taxonomy exposed at the edges of the supervisor (the
/// Control Interface and the HTTP handlers). Internal plumbing is free to
/// use `anyhow::Result` and `.context(..)`; callers that need to react to a
/// *kind* of failure (rather than just log and bail) should convert into
/// this enum.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("a program named '{0}' already exists")]
    NameConflict(String),

    #[error("no program named '{0}' is known")]
    NotFound(String),

    #[error("program '{0}' cannot perform this operation in its current state: {1}")]
    Busy(String, String),

    #[error("bad program declaration: {0}")]
    BadDeclaration(String),

    #[error("unsafe archive entry: {0}")]
    UnsafePath(String),

    #[error("archive exceeds the maximum allowed size ({0} bytes)")]
    ArchiveTooLarge(u64),

    #[error("install for program '{0}' exceeded the allotted time")]
    InstallTimeout(String),

    #[error("failed to spawn program '{0}': {1}")]
    SpawnFailed(String, String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
