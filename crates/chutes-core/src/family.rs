//! Operation families a chute may implement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of task that different chutes expose under different paths
/// and field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationFamily {
    /// Prompt-only generation (usually text-to-image)
    Generate,
    /// Text to video
    #[serde(rename = "text2video")]
    TextToVideo,
    /// Image (plus optional prompt) to video
    #[serde(rename = "image2video")]
    ImageToVideo,
    /// Image editing guided by a prompt
    ImageEdit,
    /// Text to speech
    #[serde(rename = "text2speech")]
    TextToSpeech,
    /// Speech to text
    #[serde(rename = "speech2text")]
    SpeechToText,
    /// Text embeddings
    Embedding,
}

impl OperationFamily {
    /// Every family, in classification order.
    pub const ALL: [OperationFamily; 7] = [
        OperationFamily::Generate,
        OperationFamily::TextToVideo,
        OperationFamily::ImageToVideo,
        OperationFamily::ImageEdit,
        OperationFamily::TextToSpeech,
        OperationFamily::SpeechToText,
        OperationFamily::Embedding,
    ];

    /// Wire-style identifier (`text2video`, `image_edit`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationFamily::Generate => "generate",
            OperationFamily::TextToVideo => "text2video",
            OperationFamily::ImageToVideo => "image2video",
            OperationFamily::ImageEdit => "image_edit",
            OperationFamily::TextToSpeech => "text2speech",
            OperationFamily::SpeechToText => "speech2text",
            OperationFamily::Embedding => "embedding",
        }
    }

    /// Path used when the chute's schema cannot tell us better.
    ///
    /// Both video families default to `/generate`, which is what most
    /// deployed video chutes expose.
    pub fn default_path(&self) -> &'static str {
        match self {
            OperationFamily::Generate
            | OperationFamily::TextToVideo
            | OperationFamily::ImageToVideo => "/generate",
            OperationFamily::ImageEdit => "/edit",
            OperationFamily::TextToSpeech => "/speak",
            OperationFamily::SpeechToText => "/transcribe",
            OperationFamily::Embedding => "/v1/embeddings",
        }
    }

    /// Whether the family produces video.
    pub fn is_video(&self) -> bool {
        matches!(
            self,
            OperationFamily::TextToVideo | OperationFamily::ImageToVideo
        )
    }
}

impl fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationFamily {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "generate" | "text2image" | "text_to_image" => Ok(OperationFamily::Generate),
            "text2video" | "text_to_video" | "t2v" => Ok(OperationFamily::TextToVideo),
            "image2video" | "image_to_video" | "i2v" => Ok(OperationFamily::ImageToVideo),
            "image_edit" | "edit" | "imageedit" => Ok(OperationFamily::ImageEdit),
            "text2speech" | "text_to_speech" | "tts" => Ok(OperationFamily::TextToSpeech),
            "speech2text" | "speech_to_text" | "stt" | "transcribe" => {
                Ok(OperationFamily::SpeechToText)
            }
            "embedding" | "embeddings" | "embed" => Ok(OperationFamily::Embedding),
            _ => Err(crate::Error::config_error(format!(
                "Unknown operation family '{}'",
                s
            ))),
        }
    }
}
