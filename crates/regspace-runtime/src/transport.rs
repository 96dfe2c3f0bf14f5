//! The bus seam: anything that can move whole register words.
//!
//! Addresses are absolute byte addresses in the memory map. Words are
//! right-aligned in a `u64` regardless of register width.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;

/// A blocking bus. Each call occupies the caller until the transaction
/// completes.
pub trait BusTransport {
    /// Read the word at `address`.
    fn read_word(&self, address: u64) -> Result<u64, TransportError>;

    /// Write `word` to `address`.
    fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError>;
}

impl<T: BusTransport + ?Sized> BusTransport for &T {
    fn read_word(&self, address: u64) -> Result<u64, TransportError> {
        (**self).read_word(address)
    }

    fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError> {
        (**self).write_word(address, word)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Arc<T> {
    fn read_word(&self, address: u64) -> Result<u64, TransportError> {
        (**self).read_word(address)
    }

    fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError> {
        (**self).write_word(address, word)
    }
}

/// A bus whose transactions complete asynchronously, e.g. on a simulated
/// clock edge.
#[async_trait]
pub trait AsyncBusTransport {
    async fn read_word(&self, address: u64) -> Result<u64, TransportError>;

    async fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: AsyncBusTransport + Send + Sync + ?Sized> AsyncBusTransport for Arc<T> {
    async fn read_word(&self, address: u64) -> Result<u64, TransportError> {
        (**self).read_word(address).await
    }

    async fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError> {
        (**self).write_word(address, word).await
    }
}
