//! Uploaded media metadata, looked up when a file module is created.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Playback duration in seconds, when the file is audio/video.
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Download path for the stored file.
    #[serde(default)]
    pub path: String,

    #[serde(default, rename = "fileSizeKB")]
    pub file_size_kb: u64,

    #[serde(default)]
    pub metadata: MediaMetadata,
}
