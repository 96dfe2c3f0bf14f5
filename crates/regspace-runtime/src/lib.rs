//! Register runtime: policy-enforcing reads and writes over a bus.
//!
//! An engine pairs a shared [`CanonicalModel`](regspace_model::CanonicalModel)
//! with a transport. Access-policy checks run before any bus transaction, so
//! a denied operation leaves the bus untouched.
//!
//! - [`RegisterEngine`] drives a blocking [`BusTransport`]
//! - [`AsyncRegisterEngine`] drives an [`AsyncBusTransport`]
//! - [`memory::MemoryBus`] and [`sim::ClockedBus`] are in-process transports

pub mod access;
pub mod async_engine;
pub mod engine;
pub mod error;
pub mod handle;
pub mod memory;
pub mod sim;
pub mod transport;

pub use access::FieldWrite;
pub use async_engine::AsyncRegisterEngine;
pub use engine::RegisterEngine;
pub use error::{Operation, Result, RuntimeError, TransportError};
pub use handle::{ArrayInstanceRef, RegisterHandle};
pub use memory::{MemoryBus, Transaction};
pub use sim::{clocked_bus, ClockedBus, SimClock};
pub use transport::{AsyncBusTransport, BusTransport};
