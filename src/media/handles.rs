//! Locally addressable image blobs, the in-process analogue of browser object URLs.
//!
//! A [`HandleRegistry`] owns the bytes; an [`ImageHandle`] is the single owner of
//! one entry and removes it on [`ImageHandle::release`] (or on drop, if the
//! caller never released it).

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use bytes::Bytes;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:cutout/";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    pub media_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    blobs: Arc<Mutex<HashMap<Uuid, ImageBlob>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Bytes, media_type: impl Into<String>) -> ImageHandle {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            ImageBlob {
                media_type: media_type.into(),
                data,
            },
        );
        ImageHandle {
            id,
            registry: self.clone(),
            released: false,
        }
    }

    /// Resolve a `blob:cutout/<id>` URL to its bytes while the handle is live.
    pub fn get(&self, url: &str) -> Option<ImageBlob> {
        let id = parse_url(url)?;
        self.lock().get(&id).cloned()
    }

    /// Number of blobs currently held.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ImageBlob>> {
        match self.blobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Sole owner of one registry entry.
#[derive(Debug)]
pub struct ImageHandle {
    id: Uuid,
    registry: HandleRegistry,
    released: bool,
}

impl ImageHandle {
    pub fn url(&self) -> String {
        format!("{URL_PREFIX}{}", self.id)
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.registry.remove(&self.id);
            self.released = true;
        }
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn parse_url(url: &str) -> Option<Uuid> {
    url.strip_prefix(URL_PREFIX)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}
