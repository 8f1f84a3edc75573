//! Adapts the pipeline's track report for the listener.

use tracing::trace;

use crate::model::{SelectedTracks, TrackEntry, TrackFormat, TrackInfo, TrackType};

const SUBTITLE_MIME_TYPES: [&str; 11] = [
    "application/x-subrip",
    "application/ttml+xml",
    "application/x-quicktime-tx3g",
    "application/x-mp4-vtt",
    "application/x-mp4-cea-608",
    "application/cea-608",
    "application/cea-708",
    "application/dvbsubs",
    "application/pgs",
    "application/vobsub",
    "application/x-rawcc",
];

pub fn track_type_for_mime(mime: &str) -> Option<TrackType> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime.starts_with("video/") {
        Some(TrackType::Video)
    } else if mime.starts_with("audio/") {
        Some(TrackType::Audio)
    } else if mime.starts_with("text/") || SUBTITLE_MIME_TYPES.contains(&mime.as_str()) {
        Some(TrackType::Subtitle)
    } else {
        None
    }
}

fn build_track_info(track_type: TrackType, format: &TrackFormat) -> TrackInfo {
    let mut info = TrackInfo {
        track_type,
        id: format.id.clone(),
        language: format.language.clone(),
        video_width: None,
        video_height: None,
        video_frame_rate: None,
        audio_channel_count: None,
        audio_sample_rate: None,
    };
    match track_type {
        TrackType::Video => {
            info.video_width = format.width;
            info.video_height = format.height;
            info.video_frame_rate = format.frame_rate;
        }
        TrackType::Audio => {
            info.audio_channel_count = format.channel_count;
            info.audio_sample_rate = format.sample_rate;
        }
        TrackType::Subtitle => {}
    }
    info
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct AdaptedTracks {
    pub tracks: Vec<TrackInfo>,
    pub selected: SelectedTracks,
    pub has_video: bool,
}

/// Keeps the tracks the pipeline can handle and records the selection.
///
/// `has_video` is true only if a video track is both handled and selected.
pub(crate) fn adapt_tracks(entries: &[TrackEntry]) -> AdaptedTracks {
    let mut adapted = AdaptedTracks::default();
    for entry in entries {
        if !entry.handled {
            trace!(id = %entry.format.id, mime = %entry.format.sample_mime_type, "Skipping unhandled track");
            continue;
        }
        let Some(track_type) = track_type_for_mime(&entry.format.sample_mime_type) else {
            trace!(id = %entry.format.id, mime = %entry.format.sample_mime_type, "Skipping track of unknown type");
            continue;
        };
        adapted.tracks.push(build_track_info(track_type, &entry.format));
        if entry.selected {
            if track_type == TrackType::Video {
                adapted.has_video = true;
            }
            adapted.selected.insert(track_type, entry.format.id.clone());
        }
    }
    adapted
}
