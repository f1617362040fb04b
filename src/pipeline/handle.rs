//! Handle to a non-blocking call.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::CallError;

/// Future resolving to the body or the typed error of one call.
///
/// Cancelling (or dropping) the handle stops further attempts. An attempt
/// already on the wire still completes and is recorded by the breaker.
#[derive(Debug)]
pub struct CallHandle {
    url: String,
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Running {
        join: JoinHandle<Result<String, CallError>>,
        cancel: watch::Sender<bool>,
    },
    Ready(Option<CallError>),
}

impl CallHandle {
    pub(crate) fn running(
        url: String,
        join: JoinHandle<Result<String, CallError>>,
        cancel: watch::Sender<bool>,
    ) -> Self {
        Self {
            url,
            state: HandleState::Running { join, cancel },
        }
    }

    /// A handle that fails without starting a call.
    pub(crate) fn failed(err: CallError) -> Self {
        Self {
            url: err.url().to_string(),
            state: HandleState::Ready(Some(err)),
        }
    }

    /// Stop scheduling attempts for this call.
    pub fn cancel(&self) {
        if let HandleState::Running { cancel, .. } = &self.state {
            let _ = cancel.send(true);
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Running { join, .. } => join.is_finished(),
            HandleState::Ready(_) => true,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Future for CallHandle {
    type Output = Result<String, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            HandleState::Running { join, .. } => Pin::new(join).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => {
                    Err(CallError::unavailable(&this.url, "call aborted by pipeline shutdown"))
                }
                Err(e) => Err(CallError::unavailable(&this.url, format!("call task failed: {}", e))),
            }),
            HandleState::Ready(err) => match err.take() {
                Some(err) => Poll::Ready(Err(err)),
                None => Poll::Pending,
            },
        }
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
