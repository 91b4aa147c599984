//! Frame handoff between the emulation thread and its consumers.
//!
//! Audio frames move between the two sides through a pair of single-slot
//! ring buffers holding two owned buffers. The producer fills one while the
//! consumer plays the other; neither side ever sees a buffer the other still
//! owns. The producer cannot start a new frame until the consumer has
//! returned the previous one, which bounds the pipeline to one frame of lag.
//! A side that has to wait parks on a condition variable shared by both.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};

/// Wakes whichever side is parked after the other moves a buffer.
#[derive(Debug, Default)]
struct Doorbell {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Doorbell {
    fn ring(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.cond.notify_all();
    }

    /// Retry `attempt` until it yields, parking between tries. The lock is
    /// held from each failed try until the wait, so a ring cannot slip in
    /// between them.
    fn wait_for<T>(&self, mut attempt: impl FnMut() -> Option<T>) -> T {
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = attempt() {
                return value;
            }
            guard = self
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Emulation side of the audio link.
pub struct AudioProducer {
    filled: HeapProd<Vec<u8>>,
    recycled: HeapCons<Vec<u8>>,
    current: Vec<u8>,
    doorbell: Arc<Doorbell>,
}

/// Audio side of the audio link.
pub struct AudioConsumer {
    filled: HeapCons<Vec<u8>>,
    recycled: HeapProd<Vec<u8>>,
    doorbell: Arc<Doorbell>,
}

/// Create a linked producer/consumer pair for frames of `samples` samples.
#[must_use]
pub fn audio_link(samples: usize) -> (AudioProducer, AudioConsumer) {
    let (filled_prod, filled_cons) = HeapRb::<Vec<u8>>::new(1).split();
    let (mut recycled_prod, recycled_cons) = HeapRb::<Vec<u8>>::new(1).split();

    // The second buffer starts out owned by the consumer side.
    let _ = recycled_prod.try_push(Vec::with_capacity(samples));

    let doorbell = Arc::new(Doorbell::default());
    (
        AudioProducer {
            filled: filled_prod,
            recycled: recycled_cons,
            current: Vec::with_capacity(samples),
            doorbell: Arc::clone(&doorbell),
        },
        AudioConsumer {
            filled: filled_cons,
            recycled: recycled_prod,
            doorbell,
        },
    )
}

impl AudioProducer {
    /// The buffer for the frame being produced.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.current
    }

    /// Hand the finished frame to the consumer and take back the other
    /// buffer, waiting until the consumer has released it.
    pub fn submit(&mut self) {
        let mut frame = Some(std::mem::take(&mut self.current));
        let filled = &mut self.filled;
        self.doorbell.wait_for(|| match filled.try_push(frame.take()?) {
            Ok(()) => Some(()),
            Err(back) => {
                frame = Some(back);
                None
            }
        });
        self.doorbell.ring();

        let recycled = &mut self.recycled;
        let mut buffer = self.doorbell.wait_for(|| recycled.try_pop());
        buffer.clear();
        self.current = buffer;
    }
}

impl AudioConsumer {
    /// Take the next finished frame, if one is ready.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        let frame = self.filled.try_pop()?;
        self.doorbell.ring();
        Some(frame)
    }

    /// Wait for the next finished frame.
    pub fn recv(&mut self) -> Vec<u8> {
        let filled = &mut self.filled;
        let frame = self.doorbell.wait_for(|| filled.try_pop());
        self.doorbell.ring();
        frame
    }

    /// Give a played frame back to the producer.
    pub fn release(&mut self, frame: Vec<u8>) {
        if self.recycled.try_push(frame).is_err() {
            log::warn!("audio frame released twice; dropping it");
            return;
        }
        self.doorbell.ring();
    }
}

/// Video sync: the frame loop blocks on [`VsyncSignal::wait`] until the
/// display side calls [`VsyncSignal::notify`]. There is no timeout.
#[derive(Debug, Default)]
pub struct VsyncSignal {
    ready: Mutex<bool>,
    cond: Condvar,
}

impl VsyncSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        *ready = true;
        self.cond.notify_one();
    }

    /// Block until notified, then consume the notification.
    pub fn wait(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        while !*ready {
            ready = self
                .cond
                .wait(ready)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *ready = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn frames_arrive_in_order_and_buffers_are_reused() {
        let (mut producer, mut consumer) = audio_link(4);

        let player = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..6 {
                let frame = consumer.recv();
                seen.push(frame.clone());
                consumer.release(frame);
            }
            seen
        });

        for i in 0..6u8 {
            producer.buffer_mut().extend_from_slice(&[i; 4]);
            producer.submit();
        }

        let seen = player.join().expect("player thread");
        let expected: Vec<Vec<u8>> = (0..6u8).map(|i| vec![i; 4]).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn first_submit_does_not_wait_for_consumer() {
        let (mut producer, mut consumer) = audio_link(2);
        producer.buffer_mut().push(7);
        producer.submit();
        assert!(producer.buffer_mut().is_empty());
        assert_eq!(consumer.try_recv(), Some(vec![7]));
        assert_eq!(consumer.try_recv(), None);
    }

    #[test]
    fn submit_parks_until_the_frame_is_released() {
        let (mut producer, mut consumer) = audio_link(1);
        let done = Arc::new(AtomicBool::new(false));

        let emulator = {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..2u8 {
                    producer.buffer_mut().push(i);
                    producer.submit();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        // The second submit needs the first frame back.
        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));

        let first = consumer.recv();
        assert_eq!(first, vec![0]);
        consumer.release(first);
        emulator.join().expect("emulator thread");
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(consumer.recv(), vec![1]);
    }

    #[test]
    fn vsync_wait_returns_after_notify() {
        let signal = Arc::new(VsyncSignal::new());
        let display = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.notify())
        };
        signal.wait();
        display.join().expect("display thread");

        // A notification is consumed by exactly one wait.
        signal.notify();
        signal.wait();
        assert!(!*signal.ready.lock().expect("not poisoned"));
    }
}
