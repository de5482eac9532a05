use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::library::BoxedError;

/// Type erased, serializable error which retains the error chain information
///
/// Used whenever an `Err(_)` has to cross the broker, most prominently when a
/// responder ships a handler failure back to the caller. The receiving service
/// does not know the concrete error types of the remote side, but it can embed
/// this one into its own errors and still present a meaningful trace.
///
/// When the error it is built from contains another [`RemoteError`] somewhere in
/// its source chain, that one is absorbed so a single flattened list of causes
/// remains at the top level.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RemoteError {
    causes: Vec<String>,
}

impl RemoteError {
    /// Creates a new instance from any error type
    ///
    /// Due to std providing default implementations for the `From<T> where T: T` trait,
    /// we can't both implement `Error` and `From<Error>` and have to decide on one.
    pub fn new<E: Error + 'static>(e: E) -> Self {
        (&e as &(dyn Error + 'static)).into()
    }

    /// Creates a new instance from a boxed error type
    pub fn from_boxed(e: BoxedError) -> Self {
        (e.as_ref() as &(dyn Error + 'static)).into()
    }

    /// Creates a new instance from a bare message with no underlying error value
    pub fn from_message<S: Into<String>>(message: S) -> Self {
        Self {
            causes: vec![message.into()],
        }
    }
}

impl Error for RemoteError {}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.causes.first() {
            writeln!(f, "Error: {}", first)?;
        } else {
            writeln!(f, "Unknown error")?;
            return Ok(());
        }

        if self.causes.len() > 1 {
            writeln!(f, "\nCaused by:")?;
            for (index, cause) in self.causes.iter().skip(1).enumerate() {
                writeln!(f, "    {}: {}", index, cause)?;
            }
        }

        Ok(())
    }
}

impl From<&(dyn Error + 'static)> for RemoteError {
    fn from(e: &(dyn Error + 'static)) -> Self {
        let mut source: Option<&(dyn Error + 'static)> = Some(e);
        let mut causes: Vec<String> = Vec::new();

        while let Some(error) = source {
            // Absorb any nested RemoteErrors and use ToString for anything else
            if let Some(remote_error) = error.downcast_ref::<RemoteError>() {
                let mut child_causes = remote_error.causes.clone();
                causes.append(&mut child_causes);
            } else {
                causes.push(error.to_string());
            }

            source = error.source();
        }

        Self { causes }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    enum TestError {
        #[error("Internal error")]
        Internal(#[from] RemoteError),
    }

    fn with_causes(causes: Vec<String>) -> RemoteError {
        RemoteError { causes }
    }

    #[test]
    fn handle_no_cause() {
        let error = with_causes(Vec::new());
        assert_eq!(error.to_string(), "Unknown error\n");
    }

    #[test]
    fn keep_bare_messages() {
        let error = RemoteError::from_message("store 42 does not exist");
        assert_eq!(error.to_string(), "Error: store 42 does not exist\n");
    }

    #[test]
    fn absorb_nested() {
        let lower_error = with_causes(vec![String::from("cause1"), String::from("cause2")]);
        let middle_error = TestError::from(lower_error);
        let high_error = RemoteError::from(&middle_error as &(dyn Error + 'static));

        assert_eq!(
            high_error.causes,
            vec!["Internal error", "cause1", "cause2"]
        )
    }

    #[test]
    fn format_correctly() {
        let formatted = with_causes(vec![
            String::from("cause1"),
            String::from("cause2"),
            String::from("cause3"),
        ])
        .to_string();

        assert_eq!(
            formatted,
            r#"Error: cause1

Caused by:
    0: cause2
    1: cause3
"#
        )
    }
}
