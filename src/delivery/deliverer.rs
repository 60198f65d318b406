//! Deliverer contract and buffer disposition

use crate::instance::Core;
use crate::pool::MessageBuffer;

/// What the deliverer decided about the buffer's ownership.
///
/// The two variants make the transfer explicit in the type system: a
/// deliverer either hands the buffer back for the framework to release, or
/// has already disposed of it (released through the [`Releaser`], or
/// retained — a retained buffer is leaked for the life of the instance and
/// is not detected).
#[derive(Debug)]
pub enum Disposition {
    /// The framework releases the buffer as soon as the callback returns
    ReleaseNow(MessageBuffer),
    /// The deliverer already released (or retained) the buffer itself
    AlreadyReleased,
}

/// Release access handed to the deliverer during a callback.
///
/// Lets a deliverer return its buffer to the pool before the callback
/// ends, which is the `AlreadyReleased` path of [`Disposition`].
pub struct Releaser<'a> {
    core: &'a Core,
}

impl<'a> Releaser<'a> {
    pub(crate) fn new(core: &'a Core) -> Self {
        Self { core }
    }

    /// Return `buffer` to the pool immediately
    pub fn release(&self, buffer: MessageBuffer) {
        self.core.release(buffer);
    }
}

/// User-supplied delivery function.
///
/// Invoked synchronously by the delivery thread, one message at a time, in
/// submission order. `length` is the byte count passed to `send`; the
/// message bytes are `message.as_slice()[..length]`. The callback runs to
/// completion; there is no cancellation of an in-flight delivery.
pub trait Deliverer: Send + 'static {
    fn deliver(
        &mut self,
        releaser: &Releaser<'_>,
        message: MessageBuffer,
        length: usize,
    ) -> Disposition;
}

impl<F> Deliverer for F
where
    F: FnMut(&Releaser<'_>, MessageBuffer, usize) -> Disposition + Send + 'static,
{
    fn deliver(
        &mut self,
        releaser: &Releaser<'_>,
        message: MessageBuffer,
        length: usize,
    ) -> Disposition {
        self(releaser, message, length)
    }
}
