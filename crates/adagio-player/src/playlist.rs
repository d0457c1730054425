//! Playlist and track loading.

use crate::source::{SampleSource, WavSource};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
}

impl Track {
    /// Track titled after its file stem.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, title }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Ordered tracks with a cursor. Never empty.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        Ok(Self { tracks, current: 0 })
    }

    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::new(
            paths
                .into_iter()
                .map(|p| Track::new(p.as_ref()))
                .collect(),
        )
    }

    pub fn current(&self) -> &Track {
        &self.tracks[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Move to the next track, wrapping. `None` with a single track.
    pub fn next(&mut self) -> Option<usize> {
        if self.tracks.len() <= 1 {
            return None;
        }
        self.current = (self.current + 1) % self.tracks.len();
        Some(self.current)
    }

    /// Move to the previous track, wrapping. `None` with a single track.
    pub fn previous(&mut self) -> Option<usize> {
        if self.tracks.len() <= 1 {
            return None;
        }
        self.current = (self.current + self.tracks.len() - 1) % self.tracks.len();
        Some(self.current)
    }

    /// End-of-track advance. `None` after the last track.
    pub fn advance(&mut self) -> Option<usize> {
        if self.current + 1 < self.tracks.len() {
            self.current += 1;
            Some(self.current)
        } else {
            None
        }
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(Error::TrackIndex {
                index,
                len: self.tracks.len(),
            });
        }
        self.current = index;
        Ok(())
    }
}

/// Opens a [`SampleSource`] for a track.
pub trait TrackLoader {
    fn load(&mut self, track: &Track) -> Result<Box<dyn SampleSource>>;
}

impl<F> TrackLoader for F
where
    F: FnMut(&Track) -> Result<Box<dyn SampleSource>>,
{
    fn load(&mut self, track: &Track) -> Result<Box<dyn SampleSource>> {
        self(track)
    }
}

/// Loads tracks as WAV files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl TrackLoader for WavLoader {
    fn load(&mut self, track: &Track) -> Result<Box<dyn SampleSource>> {
        Ok(Box::new(WavSource::open(&track.path)?))
    }
}
