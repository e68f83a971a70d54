//! Lock-free sample queue between the device callback and the analysis thread

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Single-producer single-consumer ring of mono `f32` samples
pub struct SampleRingBuffer {
    producer: HeapProducer<f32>,
    consumer: HeapConsumer<f32>,
}

impl SampleRingBuffer {
    /// Create new ring buffer
    ///
    /// # Arguments
    /// * `capacity` - Capacity in samples
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        Self { producer, consumer }
    }

    /// Split into producer and consumer ends sharing one drop counter
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        let dropped = Arc::new(AtomicU64::new(0));

        (
            SampleProducer {
                producer: self.producer,
                dropped: Arc::clone(&dropped),
            },
            SampleConsumer {
                consumer: self.consumer,
                dropped,
                seen: 0,
            },
        )
    }
}

/// Writing end, owned by the audio callback
pub struct SampleProducer {
    producer: HeapProducer<f32>,
    dropped: Arc<AtomicU64>,
}

impl SampleProducer {
    /// Push samples, dropping whatever does not fit
    ///
    /// # Returns
    /// Number of samples written
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let written = self.producer.push_slice(samples);
        self.record_drops(samples.len() - written);
        written
    }

    /// Push samples from an iterator without an intermediate buffer
    ///
    /// Stops at the first sample that does not fit; the rest count as dropped.
    pub fn write_iter<I>(&mut self, samples: I) -> usize
    where
        I: ExactSizeIterator<Item = f32>,
    {
        let total = samples.len();
        let mut written = 0;

        for sample in samples {
            if self.producer.push(sample).is_err() {
                break;
            }
            written += 1;
        }

        self.record_drops(total - written);
        written
    }

    fn record_drops(&self, count: usize) {
        if count > 0 {
            // Release: published before any sample written after the gap
            self.dropped.fetch_add(count as u64, Ordering::Release);
        }
    }
}

/// Reading end, owned by the analysis thread
pub struct SampleConsumer {
    consumer: HeapConsumer<f32>,
    dropped: Arc<AtomicU64>,
    seen: u64,
}

impl SampleConsumer {
    /// Read up to `buffer.len()` samples
    pub fn read(&mut self, buffer: &mut [f32]) -> usize {
        self.consumer.pop_slice(buffer)
    }

    /// Total samples dropped because the consumer fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    /// Samples dropped since the previous call
    ///
    /// A non-zero result means the queued stream has a gap: anything read
    /// before this call may not be continuous with what is read after it.
    pub fn take_dropped(&mut self) -> u64 {
        let total = self.dropped();
        let fresh = total - self.seen;
        self.seen = total;
        fresh
    }

    /// Discard everything currently queued
    ///
    /// # Returns
    /// Number of samples discarded
    pub fn discard_queued(&mut self) -> usize {
        let mut scratch = [0.0; 256];
        let mut discarded = 0;

        loop {
            let n = self.consumer.pop_slice(&mut scratch);
            if n == 0 {
                return discarded;
            }
            discarded += n;
        }
    }

    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
