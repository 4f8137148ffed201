//! Cancellation tokens.
//!
//! A [`Context`] is cancelled at most once. Cancellation is visible in two
//! ways: [`Context::is_cancelled`] for polling, and [`Context::done`], a
//! receiver that disconnects on cancellation so it can sit in a
//! `crossbeam_channel::select!` next to the channel a stage is blocked on.
//!
//! Children created with [`Context::child`] are cancelled with their parent;
//! cancelling a child leaves the parent alone.

use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use basepair_core::{BasepairError, Result};

#[derive(Debug)]
struct Inner {
    /// Dropped on cancellation, which disconnects `done`.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

/// A cloneable cancellation token shared by the stages of a pipeline.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        let (trigger, done) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                done,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A context cancelled whenever this one is.
    pub fn child(&self) -> Self {
        let child = Self::new();
        let mut children = self.inner.children.lock();
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Cancel this context and every descendant. Idempotent.
    pub fn cancel(&self) {
        if self.inner.trigger.lock().take().is_none() {
            return;
        }
        let children = std::mem::take(&mut *self.inner.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            Self { inner: child }.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.trigger.lock().is_none()
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BasepairError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Never yields a value; becomes ready (disconnected) on cancellation.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }
}
