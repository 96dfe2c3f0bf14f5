//! The blocking register engine.

use std::sync::Arc;

use regspace_model::CanonicalModel;

use crate::access::{check_field_read, check_read, check_write, plan_field_write};
use crate::error::Result;
use crate::handle::{ArrayInstanceRef, RegisterHandle};
use crate::transport::BusTransport;

/// Policy-enforcing register access over a blocking transport.
///
/// The engine holds no lock of its own. A field read-modify-write is two
/// transactions and is not atomic against other users of the same bus.
pub struct RegisterEngine<T> {
    model: Arc<CanonicalModel>,
    transport: T,
}

impl<T: BusTransport> RegisterEngine<T> {
    pub fn new(model: Arc<CanonicalModel>, transport: T) -> Self {
        Self { model, transport }
    }

    pub fn model(&self) -> &CanonicalModel {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Handle for `map.block.register` or `block.register`.
    pub fn register(&self, path: &str) -> Result<RegisterHandle> {
        RegisterHandle::lookup(&self.model, path)
    }

    /// Instance `index` of the array at `map.block.array` or `block.array`.
    pub fn array(&self, path: &str, index: u64) -> Result<ArrayInstanceRef<'_>> {
        ArrayInstanceRef::lookup(&self.model, path, index)
    }

    pub fn read(&self, handle: &RegisterHandle) -> Result<u64> {
        check_read(handle)?;
        self.bus_read(handle)
    }

    pub fn write(&self, handle: &RegisterHandle, word: u64) -> Result<()> {
        check_write(handle, word)?;
        self.bus_write(handle, word)
    }

    pub fn read_field(&self, handle: &RegisterHandle, field: &str) -> Result<u64> {
        let field = check_field_read(handle, field)?;
        Ok(field.extract(self.bus_read(handle)?))
    }

    pub fn write_field(&self, handle: &RegisterHandle, field: &str, value: u64) -> Result<()> {
        let plan = plan_field_write(handle, field, value)?;
        let current = if plan.reads_current() {
            self.bus_read(handle)?
        } else {
            0
        };
        let word = plan.apply(current) & handle.register().word_mask();
        self.bus_write(handle, word)
    }

    /// The register's reset word: its own reset value, or the composed
    /// field resets.
    pub fn reset_value(&self, handle: &RegisterHandle) -> u64 {
        handle.register().composed_reset()
    }

    fn bus_read(&self, handle: &RegisterHandle) -> Result<u64> {
        let word = self.transport.read_word(handle.address())?;
        tracing::trace!(register = handle.path(), address = handle.address(), word, "read");
        Ok(word)
    }

    fn bus_write(&self, handle: &RegisterHandle, word: u64) -> Result<()> {
        tracing::trace!(register = handle.path(), address = handle.address(), word, "write");
        self.transport.write_word(handle.address(), word)?;
        Ok(())
    }
}
