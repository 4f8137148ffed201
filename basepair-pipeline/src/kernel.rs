//! Channel stages.
//!
//! Stages talk over bounded `crossbeam_channel`s. A channel closes when its
//! last [`Sender`] is dropped, so every stage takes its output sender by
//! value and the channel closes exactly when the stage returns. Fan-in is
//! expressed by cloning the sender, one clone per producer.
//!
//! Every blocking send or receive is a `select!` against
//! [`Context::done`], and every stage checks its context at each record
//! boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{select, Receiver, Sender};

use basepair_core::{BasepairError, RecordParser, Result};

use crate::context::Context;
use crate::group::FirstError;

/// Send `item`, giving up when `ctx` is cancelled.
///
/// A disconnected sink means the consumer has gone away, which is reported
/// as `Cancelled` too.
pub fn send<T>(ctx: &Context, sink: &Sender<T>, item: T) -> Result<()> {
    select! {
        send(sink, item) -> sent => sent.map_err(|_| BasepairError::Cancelled),
        recv(ctx.done()) -> _ => Err(BasepairError::Cancelled),
    }
}

/// Receive the next item. `Ok(None)` once the channel is closed and drained.
pub fn recv<T>(ctx: &Context, source: &Receiver<T>) -> Result<Option<T>> {
    select! {
        recv(source) -> item => Ok(item.ok()),
        recv(ctx.done()) -> _ => Err(BasepairError::Cancelled),
    }
}

/// Drive `parser` into `sink` until end of input, preserving file order.
///
/// The sink closes when this returns, unless the caller kept another clone
/// of it (see [`many_to_channel`]). Returns the number of records sent.
pub fn parse_to_channel<P: RecordParser>(ctx: &Context, parser: &mut P, sink: Sender<P::Record>) -> Result<usize> {
    let mut sent = 0;
    loop {
        ctx.check()?;
        let Some(record) = parser.next_record()? else {
            break;
        };
        send(ctx, &sink, record)?;
        sent += 1;
    }
    log::debug!("parser drained after {sent} records");
    Ok(sent)
}

/// Fan several parsers into one sink, one thread per parser.
///
/// The sink closes once every parser has finished. The first parser error
/// cancels the others and is returned. Records from one parser stay in file
/// order; records from different parsers interleave.
pub fn many_to_channel<P>(ctx: &Context, sink: Sender<P::Record>, parsers: Vec<P>) -> Result<usize>
where
    P: RecordParser + Send,
    P::Record: Send,
{
    let group_ctx = ctx.child();
    let errors = FirstError::new(group_ctx.clone());
    let total = AtomicUsize::new(0);
    let (group_ctx, errors_ref, total_ref) = (&group_ctx, &errors, &total);

    thread::scope(move |scope| {
        for mut parser in parsers {
            let sink = sink.clone();
            scope.spawn(move || {
                let result = parse_to_channel(group_ctx, &mut parser, sink).map(|n| {
                    total_ref.fetch_add(n, Ordering::Relaxed);
                });
                errors_ref.watch(result);
            });
        }
        drop(sink);
    });

    errors.into_result()?;
    Ok(total.into_inner())
}

/// Copy the items of `input` satisfying `predicate` into `output`, in order.
/// `output` closes when `input` closes or the context is cancelled.
pub fn filter<T, F>(ctx: &Context, input: &Receiver<T>, output: Sender<T>, mut predicate: F) -> Result<()>
where
    F: FnMut(&T) -> bool,
{
    while let Some(item) = recv(ctx, input)? {
        ctx.check()?;
        if predicate(&item) {
            send(ctx, &output, item)?;
        }
    }
    Ok(())
}

/// Apply `f` to every item of `input`, in order, sending each result to
/// `output`. The first error from `f` ends the stage.
pub fn map<I, O, F>(ctx: &Context, input: &Receiver<I>, output: Sender<O>, mut f: F) -> Result<usize>
where
    F: FnMut(I) -> Result<O>,
{
    let mut sent = 0;
    while let Some(item) = recv(ctx, input)? {
        ctx.check()?;
        send(ctx, &output, f(item)?)?;
        sent += 1;
    }
    Ok(sent)
}

/// Run `workers` copies of `stage` sharing one input and one output.
///
/// Each worker receives its own clone of both ends. Output order across
/// workers is not preserved. The output closes once the input has closed
/// and every worker has drained; the first worker error cancels the rest.
pub fn run_workers<I, O, F>(ctx: &Context, workers: usize, input: Receiver<I>, output: Sender<O>, stage: F) -> Result<()>
where
    I: Send,
    O: Send,
    F: Fn(&Context, Receiver<I>, Sender<O>) -> Result<()> + Sync,
{
    let workers = workers.max(1);
    let group_ctx = ctx.child();
    let errors = FirstError::new(group_ctx.clone());
    let (group_ctx, errors_ref, stage) = (&group_ctx, &errors, &stage);

    thread::scope(move |scope| {
        for _ in 0..workers {
            let (input, output) = (input.clone(), output.clone());
            scope.spawn(move || errors_ref.watch(stage(group_ctx, input, output)));
        }
        drop(input);
        drop(output);
    });
    log::debug!("{workers} workers finished");

    errors.into_result()
}
