use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroceryError {
    #[error("input is not a grocery command")]
    NotACommand,
    #[error("command or list label exceeds the length limit")]
    CommandTooLong,
    #[error("list `{0}` not found")]
    ListNotFound(String),
    #[error("{0}")]
    Usage(String),
    #[error("store failure: {0:#}")]
    StoreFailure(#[source] anyhow::Error),
}

impl GroceryError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Reply shown to the user, or `None` when the message should be ignored.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::NotACommand => None,
            Self::CommandTooLong => Some("Sorry, that command is too long.".to_string()),
            Self::ListNotFound(label) => Some(format!(
                "Hmm, I can't find a list called `{label}`. Create it with `!grolist new {label}`."
            )),
            Self::Usage(message) => Some(message.clone()),
            Self::StoreFailure(_) => {
                Some("Oops, something went wrong on my side. Please try again later.".to_string())
            }
        }
    }
}

impl From<anyhow::Error> for GroceryError {
    fn from(value: anyhow::Error) -> Self {
        Self::StoreFailure(value)
    }
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("target message or channel no longer exists")]
    TargetGone,
    #[error("messaging failure: {0}")]
    Other(String),
}
