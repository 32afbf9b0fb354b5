//! Frame-range parsing and chunking.
//!
//! Expressions look like `"1-10"`, `"5"` or `"3, 5-10, 47-50"`. They are
//! parsed into merged inclusive intervals, so `"1-100000000"` costs the
//! same as `"1-2"`.

use std::fmt;
use std::ops::RangeInclusive;

use farmjob_common::error::{FarmjobError, FarmjobResult};

pub type Frame = u32;

/// A group of frames rendered by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameChunk {
    Single(Frame),
    Range { start: Frame, end: Frame },
}

impl FrameChunk {
    fn from_bounds(start: Frame, end: Frame) -> Self {
        if start == end {
            FrameChunk::Single(start)
        } else {
            FrameChunk::Range { start, end }
        }
    }

    pub fn first(&self) -> Frame {
        match *self {
            FrameChunk::Single(frame) => frame,
            FrameChunk::Range { start, .. } => start,
        }
    }

    pub fn last(&self) -> Frame {
        match *self {
            FrameChunk::Single(frame) => frame,
            FrameChunk::Range { end, .. } => end,
        }
    }

    /// Number of frames covered.
    pub fn len(&self) -> u64 {
        u64::from(self.last()) - u64::from(self.first()) + 1
    }

    /// Always false; present for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn frames(&self) -> RangeInclusive<Frame> {
        self.first()..=self.last()
    }

    /// `"12-34"`, used in task names and stored settings.
    pub fn hyphen(&self) -> String {
        self.to_string()
    }

    /// `"12..34"`, the notation of the engine's `--render-frame` flag.
    pub fn dotted(&self) -> String {
        match *self {
            FrameChunk::Single(frame) => frame.to_string(),
            FrameChunk::Range { start, end } => format!("{start}..{end}"),
        }
    }
}

impl fmt::Display for FrameChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FrameChunk::Single(frame) => write!(f, "{frame}"),
            FrameChunk::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// The set of frames described by a range expression.
///
/// Stored as sorted, disjoint, non-adjacent inclusive intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    intervals: Vec<(Frame, Frame)>,
}

impl FrameSet {
    pub fn parse(expr: &str) -> FarmjobResult<Self> {
        if expr.trim().is_empty() {
            return Err(FarmjobError::input("empty frame range"));
        }

        let mut intervals = expr
            .split(',')
            .map(parse_component)
            .collect::<FarmjobResult<Vec<_>>>()?;
        intervals.sort_unstable();

        let mut merged: Vec<(Frame, Frame)> = Vec::with_capacity(intervals.len());
        for (start, end) in intervals {
            match merged.last_mut() {
                Some(last) if u64::from(start) <= u64::from(last.1) + 1 => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        Ok(Self { intervals: merged })
    }

    pub fn first(&self) -> Frame {
        self.intervals.first().map(|i| i.0).unwrap_or_default()
    }

    pub fn last(&self) -> Frame {
        self.intervals.last().map(|i| i.1).unwrap_or_default()
    }

    /// Total number of distinct frames.
    pub fn len(&self) -> u64 {
        self.intervals
            .iter()
            .map(|&(start, end)| u64::from(end) - u64::from(start) + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// `first-last`, ignoring gaps.
    pub fn span(&self) -> FrameChunk {
        FrameChunk::from_bounds(self.first(), self.last())
    }

    /// Every frame in ascending order.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.intervals.iter().flat_map(|&(start, end)| start..=end)
    }

    /// Split into ascending chunks of at most `chunk_size` frames.
    ///
    /// A chunk never crosses a gap, so every range chunk is contiguous.
    pub fn chunks(&self, chunk_size: u32) -> Vec<FrameChunk> {
        let size = u64::from(chunk_size.max(1));
        let mut chunks = Vec::new();

        for &(start, end) in &self.intervals {
            let mut cursor = u64::from(start);
            let end = u64::from(end);
            while cursor <= end {
                let last = end.min(cursor + size - 1);
                // Both bounds lie inside a u32 interval.
                chunks.push(FrameChunk::from_bounds(cursor as Frame, last as Frame));
                cursor = last + 1;
            }
        }

        chunks
    }
}

fn parse_component(component: &str) -> FarmjobResult<(Frame, Frame)> {
    let component = component.trim();
    if component.is_empty() {
        return Err(FarmjobError::input("empty component in frame range"));
    }

    match component.split_once('-') {
        Some((start, end)) => {
            let start = parse_frame(start)?;
            let end = parse_frame(end)?;
            if end < start {
                return Err(FarmjobError::input(format!(
                    "frame range {component:?} ends before it starts"
                )));
            }
            Ok((start, end))
        }
        None => {
            let frame = parse_frame(component)?;
            Ok((frame, frame))
        }
    }
}

fn parse_frame(token: &str) -> FarmjobResult<Frame> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FarmjobError::input(format!(
            "invalid frame number {token:?}"
        )));
    }
    token
        .parse()
        .map_err(|_| FarmjobError::input(format!("frame number {token} is out of range")))
}

/// Parse `range_expr` and split it into chunks of at most `chunk_size` frames.
pub fn chunk(range_expr: &str, chunk_size: i64) -> FarmjobResult<Vec<FrameChunk>> {
    if chunk_size < 1 {
        return Err(FarmjobError::input(format!(
            "chunk size must be at least 1, got {chunk_size}"
        )));
    }
    let size = u32::try_from(chunk_size).unwrap_or(u32::MAX);
    Ok(FrameSet::parse(range_expr)?.chunks(size))
}
