//! Visible-first chunk ordering.
//!
//! Chunks overlapping the viewport are painted first and awaited; the rest are
//! painted in small batches with a yield between batches.

use super::chunks::ChunkTarget;

/// Number of off-screen chunks painted between yields.
pub const IDLE_BATCH_SIZE: usize = 4;

/// Chunks of one clip channel, split into the visible set and the remainder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkPlan {
    pub visible: Vec<(usize, ChunkTarget)>,
    pub offscreen: Vec<(usize, ChunkTarget)>,
}

impl ChunkPlan {
    /// Partitions `(channel, chunk)` pairs by overlap with the clip-local pixel span.
    ///
    /// `visible_span` is `None` when no part of the clip is on screen, in which
    /// case every chunk is off-screen.
    pub fn new(chunks: Vec<(usize, ChunkTarget)>, visible_span: Option<(f64, f64)>) -> Self {
        let (mut visible, mut offscreen): (Vec<_>, Vec<_>) = match visible_span {
            Some((start, end)) => chunks
                .into_iter()
                .partition(|(_, chunk)| chunk.overlaps(start, end)),
            None => (Vec::new(), chunks),
        };

        visible.sort_by_key(|(channel, chunk)| (chunk.global_offset, *channel));

        // Off-screen chunks nearest the viewport go first
        if let Some((start, end)) = visible_span {
            offscreen.sort_by(|(_, a), (_, b)| {
                distance(a, start, end).total_cmp(&distance(b, start, end))
            });
        } else {
            offscreen.sort_by_key(|(channel, chunk)| (chunk.global_offset, *channel));
        }

        Self { visible, offscreen }
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.offscreen.is_empty()
    }

    pub fn len(&self) -> usize {
        self.visible.len() + self.offscreen.len()
    }

    /// Off-screen chunks in idle batches.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[(usize, ChunkTarget)]> {
        self.offscreen.chunks(batch_size.max(1))
    }
}

fn distance(chunk: &ChunkTarget, start: f64, end: f64) -> f64 {
    let left = chunk.global_offset as f64;
    let right = left + chunk.css_width as f64;
    if right <= start {
        start - right
    } else if left >= end {
        left - end
    } else {
        0.0
    }
}

/// Groups `(channel, chunk)` pairs by channel, preserving order within each channel.
pub fn group_by_channel(chunks: &[(usize, ChunkTarget)]) -> Vec<(usize, Vec<ChunkTarget>)> {
    let mut groups: Vec<(usize, Vec<ChunkTarget>)> = Vec::new();
    for (channel, chunk) in chunks {
        match groups.iter_mut().find(|(c, _)| c == channel) {
            Some((_, list)) => list.push(chunk.clone()),
            None => groups.push((*channel, vec![chunk.clone()])),
        }
    }
    groups
}
