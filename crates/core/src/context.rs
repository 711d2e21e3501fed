//! Per-request call context: caller identity, cancellation and deadline.
//!
//! Every workflow entry point takes a `&RequestContext` explicitly. There is no
//! ambient/global identity; whatever the boundary layer authenticated is carried
//! here and nowhere else.
//!
//! Store and notifier calls are wrapped in [`RequestContext::bound`], which races
//! the call against the cancellation signal and the deadline:
//!
//! ```text
//! bound(fut)
//!   ├─ already cancelled / past deadline? ──► Err(Interrupted) (fut never polled)
//!   └─ select! (biased)
//!        ├─ cancel signal fires ──► Err(Interrupted::Cancelled)     (fut dropped)
//!        ├─ deadline elapses    ──► Err(Interrupted::DeadlineExceeded)
//!        └─ fut completes       ──► Ok(output)
//! ```

use core::future::Future;
use core::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::DomainError;
use crate::id::{CustomerId, RequestId};

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    email: String,
    customer_id: Option<CustomerId>,
}

impl Identity {
    /// Create an identity from the caller's email address.
    pub fn new(email: impl Into<String>) -> Result<Self, DomainError> {
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(DomainError::validation("identity email cannot be empty"));
        }
        Ok(Self {
            email,
            customer_id: None,
        })
    }

    /// Attach the customer profile this identity maps to.
    pub fn with_customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }
}

/// Why a bounded call did not complete.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation cancelled by caller")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Owning side of a cancellation signal.
///
/// Dropping the `Canceller` without calling [`Canceller::cancel`] leaves every
/// derived [`CancelSignal`] permanently un-cancelled.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Signal cancellation to every context derived from this canceller.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Observing side of a cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation has been signalled; pending forever otherwise.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return core::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender dropped without cancelling.
            core::future::pending::<()>().await;
        }
    }
}

/// Context threaded through every core operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    identity: Option<Identity>,
    cancel: CancelSignal,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Context with no identity, no cancellation and no deadline.
    pub fn anonymous() -> Self {
        Self {
            request_id: RequestId::new(),
            identity: None,
            cancel: CancelSignal::never(),
            deadline: None,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::anonymous()
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The caller identity, or `DomainError::Unauthenticated`.
    pub fn require_identity(&self) -> Result<&Identity, DomainError> {
        self.identity.as_ref().ok_or(DomainError::Unauthenticated)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check of the cancellation signal and deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `fut` unless the request is cancelled or its deadline passes first.
    ///
    /// The future is dropped on interruption, so adapters must not leave partial
    /// writes visible when dropped mid-flight (an open transaction rolls back).
    pub async fn bound<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => core::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
