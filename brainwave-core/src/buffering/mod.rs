//! Lock-free SPSC ring buffer between the capture callback and the
//! clip collector thread.
//!
//! Uses `ringbuf::HeapRb<f32>` whose wait-free `push_slice` is safe to call
//! from the real-time audio callback.

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

/// Type alias for the producer half — held by the audio callback thread.
pub type AudioProducer = ringbuf::HeapProd<f32>;

/// Type alias for the consumer half — held by the collector thread.
pub type AudioConsumer = ringbuf::HeapCons<f32>;

/// Buffer capacity: 2^22 = 4 194 304 f32 samples ≈ 87.4 s at 48 kHz.
/// Long practice takes stay safe even if the collector momentarily stalls.
pub const RING_CAPACITY: usize = 1 << 22;

/// Create a matched producer/consumer pair backed by a heap-allocated ring.
pub fn create_audio_ring() -> (AudioProducer, AudioConsumer) {
    HeapRb::<f32>::new(RING_CAPACITY).split()
}
