//! # Shared Court
//!
//! A cloneable handle serializing access to one [`Court`]. Each closure
//! passed to [`SharedCourt::with`] runs as one logical operation; callers
//! racing on the same draft or settlement see the loser rejected, never a
//! double application.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::court::Court;

#[derive(Clone)]
pub struct SharedCourt {
    inner: Arc<Mutex<Court>>,
}

impl SharedCourt {
    pub fn new(court: Court) -> Self {
        Self {
            inner: Arc::new(Mutex::new(court)),
        }
    }

    /// Run `f` with exclusive access to the court.
    pub fn with<R>(&self, f: impl FnOnce(&mut Court) -> R) -> R {
        let mut court = self.inner.lock();
        f(&mut court)
    }
}

impl From<Court> for SharedCourt {
    fn from(court: Court) -> Self {
        Self::new(court)
    }
}
