//! Lock-free single-producer single-consumer event queue.

/*
A fixed ring of 256 slots with two monotonic indices wrapped by masking
(the capacity must stay a power of two so `& WRAP` replaces a modulo).

    push (producer only)              pop (consumer only)
    ---------------------             --------------------
    w = write.load(Relaxed)           r = read.load(Relaxed)
    full if (w+1)&WRAP == read.load(Acquire)
                                      empty if r == write.load(Acquire)
    slots[w] = event                  event = slots[r]
    write.store((w+1)&WRAP, Release)  read.store((r+1)&WRAP, Release)

Each side only ever *stores* its own index, so the relaxed self-load is
exact. The acquire on the opposite index pairs with the other side's
release store: by the time the consumer observes a new write index, the
slot contents written before it are visible too. Indices only move
forward (mod the wrap), so no ABA situation is observable.

One slot is sacrificed to distinguish full from empty: a queue of capacity
C reports full at C-1 unconsumed items. When full, `push` returns `false`
and drops the *new* event; the producing collaborator chooses what to do
about it; the queue never overwrites pending events.

The two halves are `Send` but deliberately not `Clone`: one producer, one
consumer, enforced by ownership.
*/

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Slots in the ring. Power of two so wrapping is a mask.
pub const QUEUE_SIZE: usize = 256;

const WRAP: usize = QUEUE_SIZE - 1;

struct Ring<T> {
    slots: [UnsafeCell<MaybeUninit<T>>; QUEUE_SIZE],
    read: AtomicUsize,
    write: AtomicUsize,
}

// The protocol guarantees a slot is touched by at most one side at a time:
// the producer writes slots the consumer cannot yet see, and vice versa.
unsafe impl<T: Send> Sync for Ring<T> {}

/// Producer half. Owned by the input thread.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

/// Consumer half. Owned by the audio thread (inside the engine).
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

/// Create a connected producer/consumer pair.
pub fn event_queue<T: Copy>() -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(Ring {
        slots: std::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit())),
        read: AtomicUsize::new(0),
        write: AtomicUsize::new(0),
    });
    (
        Producer { ring: ring.clone() },
        Consumer { ring },
    )
}

impl<T: Copy> Producer<T> {
    /// Enqueue an event. Returns `false` (dropping the event) when the
    /// queue is full.
    pub fn push(&mut self, event: T) -> bool {
        let write = self.ring.write.load(Ordering::Relaxed);
        let next = (write + 1) & WRAP;

        if next == self.ring.read.load(Ordering::Acquire) {
            return false;
        }

        unsafe { (*self.ring.slots[write].get()).write(event) };
        self.ring.write.store(next, Ordering::Release);
        true
    }
}

impl<T: Copy> Consumer<T> {
    /// Dequeue the oldest event, or `None` when the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        let read = self.ring.read.load(Ordering::Relaxed);

        if read == self.ring.write.load(Ordering::Acquire) {
            return None;
        }

        let event = unsafe { (*self.ring.slots[read].get()).assume_init_read() };
        self.ring.read.store((read + 1) & WRAP, Ordering::Release);
        Some(event)
    }
}
