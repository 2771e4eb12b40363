//! First-success-of-N combinator.
//!
//! All attempts are polled concurrently. The first one to complete with `Ok`
//! wins regardless of its position in the input; failures are collected
//! until every attempt has failed or the deadline passes.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A boxed attempt that can be raced.
pub type Attempt<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Why no attempt produced a value.
#[derive(Debug)]
pub enum RaceError<E> {
    /// Every attempt completed with an error, in completion order.
    AllFailed(Vec<E>),
    /// The deadline elapsed before any attempt succeeded.
    TimedOut,
}

impl<E: std::fmt::Display> std::fmt::Display for RaceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaceError::AllFailed(errors) if errors.is_empty() => write!(f, "no attempts to race"),
            RaceError::AllFailed(errors) => {
                let joined = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "all attempts failed: {}", joined)
            }
            RaceError::TimedOut => write!(f, "race timed out"),
        }
    }
}

/// Race `attempts`, returning the first successful value.
///
/// Attempts still running when a winner is found are dropped, which cancels
/// any in-flight request they own.
///
/// # Errors
/// `RaceError::AllFailed` if every attempt fails, `RaceError::TimedOut` if
/// `deadline` passes first.
pub async fn first_success<'a, T, E>(
    attempts: Vec<Attempt<'a, T, E>>,
    deadline: Duration,
) -> Result<T, RaceError<E>> {
    let race = async move {
        let mut pending: FuturesUnordered<_> = attempts.into_iter().collect();
        let mut errors = Vec::new();

        while let Some(outcome) = pending.next().await {
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => errors.push(e),
            }
        }

        Err(RaceError::AllFailed(errors))
    };

    match tokio::time::timeout(deadline, race).await {
        Ok(result) => result,
        Err(_) => Err(RaceError::TimedOut),
    }
}
