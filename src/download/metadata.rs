//! ID3 tagging of downloaded tracks.

use crate::core::error::{AppError, AppResult};
use crate::download::error::DownloadError;
use crate::music::TrackDescriptor;
use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::{Path, PathBuf};

/// Values written into a file's tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub title: String,
    /// Artist names joined with `", "`
    pub artist: String,
    pub album: String,
    /// Album's total track count, not the track's position
    pub track_number: Option<u32>,
}

impl From<&TrackDescriptor> for TagFields {
    fn from(track: &TrackDescriptor) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist_line(),
            album: track.album_title.clone(),
            track_number: track.album_track_count,
        }
    }
}

/// Writes title, artist, album and track number into the file at `path`.
///
/// An existing tag is updated in place; a file without one gets a fresh ID3v2.4 tag.
/// Any other read failure (missing file, corrupt tag) is returned.
pub fn write_tags(fields: &TagFields, path: &Path) -> AppResult<()> {
    let mut tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
        Err(e) => return Err(e.into()),
    };

    tag.set_title(fields.title.as_str());
    tag.set_artist(fields.artist.as_str());
    tag.set_album(fields.album.as_str());
    if let Some(number) = fields.track_number {
        tag.set_track(number);
    }

    log::debug!("Saving tags to {}", path.display());
    tag.write_to_path(path, Version::Id3v24)?;
    Ok(())
}

/// Async wrapper: tags the file on the blocking pool so the handle never
/// lives across an await point of the caller.
pub async fn tag_file(track: &TrackDescriptor, path: &Path) -> AppResult<()> {
    let fields = TagFields::from(track);
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_tags(&fields, &path))
        .await
        .map_err(|e| AppError::Download(DownloadError::Tagging(format!("tagging task failed: {}", e))))?
}

/// Reads back the fields this module writes.
pub fn read_tags(path: &Path) -> AppResult<TagFields> {
    let tag = Tag::read_from_path(path)?;
    Ok(TagFields {
        title: tag.title().unwrap_or_default().to_string(),
        artist: tag.artist().unwrap_or_default().to_string(),
        album: tag.album().unwrap_or_default().to_string(),
        track_number: tag.track(),
    })
}
