//! Main-side record of which drawing-surface chunks exist for each clip.
//!
//! The surfaces themselves belong to the worker; this only tracks ids and
//! geometry so passes know what to paint.

use crate::render::ChunkTarget;
use crate::timeline::{ChunkId, ClipId};
use std::collections::HashMap;

/// Conventional chunk id for a clip channel and chunk index.
pub fn chunk_id(clip: &str, channel: usize, index: usize) -> ChunkId {
    format!("{clip}:{channel}:{index}")
}

#[derive(Debug, Clone, Default)]
pub struct ChunkRegistry {
    clips: HashMap<ClipId, Vec<(usize, ChunkTarget)>>,
}

impl ChunkRegistry {
    /// Records a chunk, replacing any earlier chunk with the same id.
    pub fn register(&mut self, clip: &str, channel: usize, target: ChunkTarget) {
        let chunks = self.clips.entry(clip.to_string()).or_default();
        chunks.retain(|(_, existing)| existing.id != target.id);
        chunks.push((channel, target));
    }

    /// Forgets the listed chunks, returning the ids that were known.
    pub fn unregister(&mut self, clip: &str, ids: &[ChunkId]) -> Vec<ChunkId> {
        let Some(chunks) = self.clips.get_mut(clip) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        chunks.retain(|(_, chunk)| {
            let drop = ids.contains(&chunk.id);
            if drop {
                removed.push(chunk.id.clone());
            }
            !drop
        });
        if chunks.is_empty() {
            self.clips.remove(clip);
        }
        removed
    }

    /// Forgets every chunk of a clip.
    pub fn remove_clip(&mut self, clip: &str) -> Vec<ChunkId> {
        self.clips
            .remove(clip)
            .map(|chunks| chunks.into_iter().map(|(_, chunk)| chunk.id).collect())
            .unwrap_or_default()
    }

    pub fn chunks(&self, clip: &str) -> &[(usize, ChunkTarget)] {
        self.clips.get(clip).map_or(&[], Vec::as_slice)
    }

    pub fn has_chunks(&self, clip: &str) -> bool {
        !self.chunks(clip).is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = ChunkRegistry::default();
        registry.register("a", 0, ChunkTarget::new(chunk_id("a", 0, 0), 100, 0));
        registry.register("a", 0, ChunkTarget::new(chunk_id("a", 0, 0), 50, 0));
        registry.register("a", 1, ChunkTarget::new(chunk_id("a", 1, 0), 100, 0));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.chunks("a")[0].1.css_width, 50);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ChunkRegistry::default();
        registry.register("a", 0, ChunkTarget::new("a:0:0", 100, 0));
        registry.register("a", 0, ChunkTarget::new("a:0:1", 100, 100));

        let removed = registry.unregister("a", &["a:0:1".to_string(), "missing".to_string()]);
        assert_eq!(removed, vec!["a:0:1".to_string()]);
        assert!(registry.has_chunks("a"));

        assert_eq!(registry.remove_clip("a"), vec!["a:0:0".to_string()]);
        assert!(registry.is_empty());
        assert!(registry.chunks("a").is_empty());
    }
}
