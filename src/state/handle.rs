/// Display handles and the slots that own them
///
/// A `DisplayHandle` is a cheap, clonable reference to encoded image bytes
/// plus the renderer handle built from them. Each distinct buffer carries a
/// lease; the lease is released when the last clone goes away.
///
/// A `Slot` owns at most one handle. Installing a new one drops the
/// previous, so repeated uploads or compressions never accumulate buffers.

use bytes::Bytes;
use iced::widget::image::Handle;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Issues display handles and tracks how many buffers are still alive
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    live: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `bytes` in a new display handle with its own lease
    pub fn issue(&self, bytes: impl Into<Bytes>) -> DisplayHandle {
        let bytes = bytes.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::Relaxed);
        debug!("issued display handle #{} ({} bytes)", id, bytes.len());

        DisplayHandle {
            handle: Handle::from_bytes(bytes.clone()),
            bytes,
            lease: Arc::new(Lease {
                id,
                live: Arc::clone(&self.live),
            }),
        }
    }

    /// Number of buffers with at least one live handle
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

/// Releases its buffer's slot in the registry when dropped
#[derive(Debug)]
struct Lease {
    id: u64,
    live: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        debug!("released display handle #{}", self.id);
    }
}

/// Renderable reference to encoded image bytes
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    bytes: Bytes,
    handle: Handle,
    lease: Arc<Lease>,
}

impl DisplayHandle {
    /// Registry-unique id of the underlying buffer
    pub fn id(&self) -> u64 {
        self.lease.id
    }

    /// The encoded bytes (shared, not copied)
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Handle for `iced::widget::image`
    pub fn image(&self) -> Handle {
        self.handle.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for DisplayHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// Anything that owns a display handle and can sit in a [`Slot`]
pub trait Displayable {
    fn display_handle(&self) -> &DisplayHandle;
}

impl Displayable for DisplayHandle {
    fn display_handle(&self) -> &DisplayHandle {
        self
    }
}

/// Holds at most one value owning a display handle
#[derive(Debug)]
pub struct Slot<T> {
    name: &'static str,
    current: Option<T>,
}

impl<T: Displayable> Slot<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, current: None }
    }

    /// Install `value`, releasing whatever the slot held before
    pub fn install(&mut self, value: T) {
        let id = value.display_handle().id();
        if let Some(previous) = self.current.replace(value) {
            debug!(
                "{} slot: handle #{} replaces #{}",
                self.name,
                id,
                previous.display_handle().id()
            );
        }
    }

    /// Drop the slot's value, if any
    pub fn release(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!(
                "{} slot: cleared handle #{}",
                self.name,
                previous.display_handle().id()
            );
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
