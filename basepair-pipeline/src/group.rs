//! Error aggregation for groups of stages.
//!
//! The first stage to fail cancels the group's context and its error is the
//! group's result. Errors reported after that, usually `Cancelled` from
//! stages that noticed the cancellation, are dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use basepair_core::{BasepairError, Result};

use crate::context::Context;

/// First-error slot tied to a context.
#[derive(Debug)]
pub(crate) struct FirstError {
    ctx: Context,
    slot: Mutex<Option<BasepairError>>,
}

impl FirstError {
    pub(crate) fn new(ctx: Context) -> Self {
        Self {
            ctx,
            slot: Mutex::new(None),
        }
    }

    pub(crate) fn record(&self, error: BasepairError) {
        {
            let mut slot = self.slot.lock();
            if slot.is_none() {
                if !error.is_cancelled() {
                    log::debug!("stage failed, cancelling group: {error}");
                }
                *slot = Some(error);
            }
        }
        self.ctx.cancel();
    }

    pub(crate) fn watch(&self, result: Result<()>) {
        if let Err(error) = result {
            self.record(error);
        }
    }

    pub(crate) fn into_result(self) -> Result<()> {
        match self.slot.into_inner() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// A set of named threads sharing one cancellation context.
///
/// ```
/// use basepair_core::BasepairError;
/// use basepair_pipeline::{Context, TaskGroup};
///
/// let mut group = TaskGroup::new(&Context::new());
/// group.spawn("fails", |_| Err(BasepairError::InvalidInput("bad".into()))).unwrap();
/// group
///     .spawn("waits", |ctx| {
///         let _ = ctx.done().recv();
///         Err(BasepairError::Cancelled)
///     })
///     .unwrap();
/// assert!(matches!(group.wait(), Err(BasepairError::InvalidInput(_))));
/// ```
#[derive(Debug)]
pub struct TaskGroup {
    ctx: Context,
    errors: Arc<FirstError>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl TaskGroup {
    /// A group whose context is a child of `parent`.
    pub fn new(parent: &Context) -> Self {
        let ctx = parent.child();
        Self {
            errors: Arc::new(FirstError::new(ctx.clone())),
            ctx,
            handles: Vec::new(),
        }
    }

    /// The group's context. Cancelled when any task fails.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Run `task` on its own thread.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce(&Context) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let ctx = self.ctx.clone();
        let errors = Arc::clone(&self.errors);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || errors.watch(task(&ctx)))?;
        log::debug!("started task {name}");
        self.handles.push((name, handle));
        Ok(())
    }

    /// Wait for every task and return the first error.
    pub fn wait(self) -> Result<()> {
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                self.errors.record(BasepairError::Invariant(format!("task {name} panicked")));
            }
            log::debug!("task {name} finished");
        }
        match Arc::try_unwrap(self.errors) {
            Ok(errors) => errors.into_result(),
            Err(shared) => {
                let error = shared.slot.lock().take();
                error.map_or(Ok(()), Err)
            }
        }
    }
}
