//! The async register engine, for transports that complete on a clock.

use std::sync::Arc;

use regspace_model::CanonicalModel;

use crate::access::{check_field_read, check_read, check_write, plan_field_write};
use crate::error::Result;
use crate::handle::{ArrayInstanceRef, RegisterHandle};
use crate::transport::AsyncBusTransport;

/// [`RegisterEngine`](crate::RegisterEngine) over an [`AsyncBusTransport`].
///
/// Same checks, same planned words; only the transport calls are awaited.
pub struct AsyncRegisterEngine<T> {
    model: Arc<CanonicalModel>,
    transport: T,
}

impl<T: AsyncBusTransport> AsyncRegisterEngine<T> {
    pub fn new(model: Arc<CanonicalModel>, transport: T) -> Self {
        Self { model, transport }
    }

    pub fn model(&self) -> &CanonicalModel {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn register(&self, path: &str) -> Result<RegisterHandle> {
        RegisterHandle::lookup(&self.model, path)
    }

    pub fn array(&self, path: &str, index: u64) -> Result<ArrayInstanceRef<'_>> {
        ArrayInstanceRef::lookup(&self.model, path, index)
    }

    pub async fn read(&self, handle: &RegisterHandle) -> Result<u64> {
        check_read(handle)?;
        self.bus_read(handle).await
    }

    pub async fn write(&self, handle: &RegisterHandle, word: u64) -> Result<()> {
        check_write(handle, word)?;
        self.bus_write(handle, word).await
    }

    pub async fn read_field(&self, handle: &RegisterHandle, field: &str) -> Result<u64> {
        let field = check_field_read(handle, field)?;
        Ok(field.extract(self.bus_read(handle).await?))
    }

    pub async fn write_field(&self, handle: &RegisterHandle, field: &str, value: u64) -> Result<()> {
        let plan = plan_field_write(handle, field, value)?;
        let current = if plan.reads_current() {
            self.bus_read(handle).await?
        } else {
            0
        };
        let word = plan.apply(current) & handle.register().word_mask();
        self.bus_write(handle, word).await
    }

    pub fn reset_value(&self, handle: &RegisterHandle) -> u64 {
        handle.register().composed_reset()
    }

    async fn bus_read(&self, handle: &RegisterHandle) -> Result<u64> {
        let word = self.transport.read_word(handle.address()).await?;
        tracing::trace!(register = handle.path(), address = handle.address(), word, "read");
        Ok(word)
    }

    async fn bus_write(&self, handle: &RegisterHandle, word: u64) -> Result<()> {
        tracing::trace!(register = handle.path(), address = handle.address(), word, "write");
        self.transport.write_word(handle.address(), word).await?;
        Ok(())
    }
}
