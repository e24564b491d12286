//! Texture Resource Loader
//!
//! Decodes every configured cloud image on its own worker thread and joins
//! the results into a [`TexturePool`]. A slot that fails to load is filled
//! with a procedural puff, so the join always succeeds and the pool is never
//! empty.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{debug, info, warn};

use crate::error::TextureError;
use crate::texture::{Texture, TextureHandle};
use crate::util::Rng;

/// Decode one image file into an RGBA texture
pub fn load_texture(path: &Path) -> Result<Texture, TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Texture::from_rgba(width, height, rgba.into_raw()).ok_or_else(|| TextureError::Empty {
        path: path.to_path_buf(),
    })
}

fn load_or_fallback(slot: usize, path: &Path) -> TextureHandle {
    match load_texture(path) {
        Ok(texture) => {
            debug!(
                "Loaded cloud texture {} ({}x{})",
                path.display(),
                texture.width(),
                texture.height()
            );
            TextureHandle::loaded(texture, path)
        },
        Err(e) => {
            warn!("{}; using procedural fallback", e);
            TextureHandle::fallback(slot as u32 + 1)
        },
    }
}

/// Resolved set of cloud textures shared by every cloud in a scene
#[derive(Debug, Clone)]
pub struct TexturePool {
    handles: Vec<TextureHandle>,
}

impl TexturePool {
    /// Wrap resolved handles. An empty list gets one synthesized puff.
    pub fn from_handles(mut handles: Vec<TextureHandle>) -> Self {
        if handles.is_empty() {
            handles.push(TextureHandle::fallback(0));
        }
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TextureHandle> {
        self.handles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureHandle> {
        self.handles.iter()
    }

    /// Uniformly random handle
    pub fn pick(&self, rng: &mut Rng) -> &TextureHandle {
        &self.handles[rng.index(self.handles.len())]
    }

    pub fn loaded_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_fallback()).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_fallback()).count()
    }
}

/// Starts texture loads
pub struct TextureLoader;

impl TextureLoader {
    /// Spawn one worker per path and return the pending join
    pub fn spawn(paths: &[PathBuf]) -> PendingTextures {
        let (sender, receiver) = mpsc::channel();
        let mut slots: Vec<Option<TextureHandle>> = vec![None; paths.len()];

        for (slot, path) in paths.iter().enumerate() {
            let sender = sender.clone();
            let worker_path = path.clone();
            let spawned = thread::Builder::new()
                .name(format!("cloud-texture-{}", slot))
                .spawn(move || {
                    let handle = load_or_fallback(slot, &worker_path);
                    // Receiver is gone if the scene was unmounted mid-load
                    let _ = sender.send((slot, handle));
                });
            if let Err(e) = spawned {
                warn!(
                    "Could not start loader for {}: {}; using procedural fallback",
                    path.display(),
                    e
                );
                slots[slot] = Some(TextureHandle::fallback(slot as u32 + 1));
            }
        }

        PendingTextures {
            receiver,
            slots,
            resolved: false,
        }
    }
}

/// Join over in-flight texture loads
pub struct PendingTextures {
    receiver: Receiver<(usize, TextureHandle)>,
    slots: Vec<Option<TextureHandle>>,
    resolved: bool,
}

impl PendingTextures {
    /// Number of slots, settled or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots still waiting on a worker
    pub fn outstanding(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Non-blocking join. Returns the pool exactly once, after every slot settles.
    pub fn try_resolve(&mut self) -> Option<TexturePool> {
        if self.resolved {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok((slot, handle)) => self.settle(slot, handle),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fill_abandoned();
                    break;
                },
            }
        }
        if self.outstanding() == 0 {
            Some(self.finish())
        } else {
            None
        }
    }

    /// Blocking join
    pub fn wait(mut self) -> TexturePool {
        while !self.resolved && self.outstanding() > 0 {
            match self.receiver.recv() {
                Ok((slot, handle)) => self.settle(slot, handle),
                Err(_) => self.fill_abandoned(),
            }
        }
        self.finish()
    }

    fn settle(&mut self, slot: usize, handle: TextureHandle) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(handle);
        }
    }

    /// Workers that died without reporting still get a texture
    fn fill_abandoned(&mut self) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.is_none() {
                warn!("Texture slot {} never reported; using procedural fallback", slot);
                *entry = Some(TextureHandle::fallback(slot as u32 + 1));
            }
        }
    }

    fn finish(&mut self) -> TexturePool {
        self.resolved = true;
        let handles: Vec<TextureHandle> = self.slots.drain(..).flatten().collect();
        let pool = TexturePool::from_handles(handles);
        info!(
            "Cloud textures ready: {} loaded, {} fallback",
            pool.loaded_count(),
            pool.fallback_count()
        );
        pool
    }
}
