//! Core transport primitives shared by the render and audio subsystems.
//!
//! * [`SlotAllocator`] – intrusive free list handing out `u32` resource slots.
//! * [`CmdRing`] – single-producer/single-consumer ring of typed command records.
//! * [`ResPool`] – slot-indexed resource table that grows on the writer thread.
//! * [`MultiBuffer`] / [`MultiArrayBuffer`] – rotating storage for published state.
//! * [`Semaphore`] – bounded counting semaphore used by the job handshake.
//! * [`TransportError`] – lightweight error surface for construction failures.

mod cmd_ring;
mod error;
mod multi_buffer;
mod res_pool;
mod semaphore;
mod slot_alloc;
pub mod wait;

pub use cmd_ring::{CmdRing, RingConsumer, RingProducer, RingPush};
pub use error::{TransportError, TransportResult};
pub use multi_buffer::{MultiArrayBuffer, MultiBuffer};
pub use res_pool::ResPool;
pub use semaphore::Semaphore;
pub use slot_alloc::{SlotAllocator, NULL_SLOT};
