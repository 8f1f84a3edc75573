use anyhow::Result;
use serde::{Deserialize, Serialize};
use tvhconfig::Config;

use crate::datasource::SourceSettings;
use crate::pipeline::PipelineOptions;

/// Player tuning, read from the `player` configuration section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub stream_profile: String,
    pub buffer_playback_ms: u64,
    pub audio_tunneling: bool,
    pub captions_apply_embedded_styles: bool,
    pub timeshift_period_secs: u32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            stream_profile: "htsp".to_string(),
            buffer_playback_ms: 500,
            audio_tunneling: false,
            captions_apply_embedded_styles: true,
            timeshift_period_secs: 3600,
        }
    }
}

impl PlayerSettings {
    /// Reads the `player` section, missing keys keeping their default.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.section("player")
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            stream_profile: self.stream_profile.clone(),
            timeshift_period_secs: self.timeshift_period_secs,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            buffer_for_playback_ms: self.buffer_playback_ms,
            audio_tunneling: self.audio_tunneling,
            apply_embedded_caption_styles: self.captions_apply_embedded_styles,
        }
    }
}
