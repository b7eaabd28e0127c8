//! Background tasks that own the socket halves.

pub(crate) mod ping;
pub(crate) mod read;
pub(crate) mod write;

use std::sync::Mutex;

use tokio::time::Instant;

/// Time of the last outbound frame, shared by the write and ping pumps.
pub(crate) struct LastWrite(Mutex<Instant>);

impl LastWrite {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(Instant::now()))
    }

    pub(crate) fn touch(&self) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub(crate) fn get(&self) -> Instant {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
