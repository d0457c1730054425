//! Fixed-capacity sample ring with absolute stream offsets.
//!
//! Logical index 0 is the oldest buffered sample; it corresponds to absolute
//! stream position [`RingBuffer::stream_start_offset`]. The offset only moves
//! forward, either through [`RingBuffer::discard_up_to`] or when a push
//! overwrites unread samples.

use tracing::warn;

/// Default cap on how much of the buffered content one discard may reclaim.
pub const DEFAULT_MAX_DISCARD_FRACTION: f64 = 0.5;

pub struct RingBuffer {
    data: Vec<i16>,
    write_pos: usize,
    read_pos: usize,
    len: usize,
    stream_start_offset: u64,
    retain_floor: Option<u64>,
    max_discard_fraction: f64,
}

/// Borrowed view of a contiguous logical range, split where the ring wraps.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    head: &'a [i16],
    tail: &'a [i16],
}

impl<'a> Segment<'a> {
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` within the segment.
    #[cfg(test)]
    fn get(&self, index: usize) -> Option<i16> {
        if index < self.head.len() {
            Some(self.head[index])
        } else {
            self.tail.get(index - self.head.len()).copied()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i16> + 'a {
        self.head.iter().chain(self.tail.iter()).copied()
    }

    #[cfg(test)]
    fn to_vec(&self) -> Vec<i16> {
        self.iter().collect()
    }
}

impl RingBuffer {
    /// Create an empty ring. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            write_pos: 0,
            read_pos: 0,
            len: 0,
            stream_start_offset: 0,
            retain_floor: None,
            max_discard_fraction: DEFAULT_MAX_DISCARD_FRACTION,
        }
    }

    /// Limit the share of buffered content a single discard may reclaim.
    pub fn with_max_discard_fraction(mut self, fraction: f64) -> Self {
        self.max_discard_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots that can be pushed without overwriting.
    pub fn free(&self) -> usize {
        self.data.len() - self.len
    }

    /// Absolute stream position of logical index 0.
    pub fn stream_start_offset(&self) -> u64 {
        self.stream_start_offset
    }

    /// Absolute stream position one past the newest sample.
    pub fn end_offset(&self) -> u64 {
        self.stream_start_offset + self.len as u64
    }

    pub fn retain_floor(&self) -> Option<u64> {
        self.retain_floor
    }

    /// Discards will not move the stream start past `offset`.
    pub fn set_retain_floor(&mut self, offset: u64) {
        self.retain_floor = Some(offset);
    }

    /// Logical index of an absolute stream position, if it is buffered.
    pub fn absolute_to_index(&self, offset: u64) -> Option<usize> {
        if offset < self.stream_start_offset || offset > self.end_offset() {
            return None;
        }
        Some((offset - self.stream_start_offset) as usize)
    }

    /// Append samples. Returns how many unread samples were overwritten.
    ///
    /// Overwriting advances the stream start by the same amount, so offsets
    /// stay consistent even when the producer outruns the consumer.
    pub fn push(&mut self, samples: &[i16]) -> usize {
        let cap = self.data.len();

        // Anything older than the last `cap` samples can never be read back
        let skipped = samples.len().saturating_sub(cap);
        let incoming = &samples[skipped..];

        let first = (cap - self.write_pos).min(incoming.len());
        self.data[self.write_pos..self.write_pos + first].copy_from_slice(&incoming[..first]);
        let rest = incoming.len() - first;
        self.data[..rest].copy_from_slice(&incoming[first..]);
        self.write_pos = (self.write_pos + incoming.len()) % cap;

        let total = self.len + incoming.len();
        let dropped = total.saturating_sub(cap);
        self.len = total.min(cap);
        self.read_pos = (self.read_pos + dropped) % cap;

        let overwritten = skipped + dropped;
        if overwritten > 0 {
            self.stream_start_offset += overwritten as u64;
            warn!(
                overwritten,
                stream_start_offset = self.stream_start_offset,
                "ring buffer overflow, oldest samples overwritten"
            );
        }
        overwritten
    }

    /// View of `len` samples starting at logical `index`.
    ///
    /// Returns `None` when the range reaches past the buffered content.
    pub fn segment(&self, index: usize, len: usize) -> Option<Segment<'_>> {
        if index.checked_add(len)? > self.len {
            return None;
        }
        let cap = self.data.len();
        let start = (self.read_pos + index) % cap;
        let first = (cap - start).min(len);
        Some(Segment {
            head: &self.data[start..start + first],
            tail: &self.data[..len - first],
        })
    }

    /// Move the stream start toward `min_absolute_offset`. Returns the number
    /// of samples reclaimed.
    ///
    /// Never passes the buffered content or the retain floor, and reclaims at
    /// most the configured fraction of the content per call.
    pub fn discard_up_to(&mut self, min_absolute_offset: u64) -> usize {
        let mut target = min_absolute_offset;
        if let Some(floor) = self.retain_floor {
            target = target.min(floor);
        }
        if target <= self.stream_start_offset {
            return 0;
        }

        let wanted = (target - self.stream_start_offset).min(self.len as u64) as usize;
        let limit = (self.len as f64 * self.max_discard_fraction).floor() as usize;
        let count = wanted.min(limit);

        self.read_pos = (self.read_pos + count) % self.data.len();
        self.len -= count;
        self.stream_start_offset += count as u64;
        count
    }

    /// Drop all content and restart offsets at zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.write_pos = 0;
        self.read_pos = 0;
        self.len = 0;
        self.stream_start_offset = 0;
        self.retain_floor = None;
    }
}
