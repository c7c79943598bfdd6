//! Per-model quirks keyed off the chute's base URL.

use chutes_core::OperationFamily;
use serde_json::{Value, json};

/// A model family with constraints beyond what its schema says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// LTX-Video: frames must be `8n+1`, chunked decoding off
    LtxVideo,
    /// Wan 2.x: frames must be `4n+1`
    Wan,
    /// Qwen image edit: request PNG output
    QwenImageEdit,
}

const MARKERS: &[(&str, ModelProfile)] = &[
    ("ltx", ModelProfile::LtxVideo),
    ("qwen-image-edit", ModelProfile::QwenImageEdit),
    ("wan2", ModelProfile::Wan),
    ("wan-", ModelProfile::Wan),
];

impl ModelProfile {
    /// Detect a profile from a base URL or chute name (case-insensitive).
    pub fn detect(hint: &str) -> Option<Self> {
        let hint = hint.to_ascii_lowercase();
        MARKERS
            .iter()
            .find(|(marker, _)| hint.contains(marker))
            .map(|(_, profile)| *profile)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelProfile::LtxVideo => "ltx-video",
            ModelProfile::Wan => "wan",
            ModelProfile::QwenImageEdit => "qwen-image-edit",
        }
    }

    /// Frame counts must be `step * n + 1`.
    pub fn frame_step(&self) -> Option<u64> {
        match self {
            ModelProfile::LtxVideo => Some(8),
            ModelProfile::Wan => Some(4),
            ModelProfile::QwenImageEdit => None,
        }
    }

    /// Flags injected into every request of `family`.
    pub fn technical_flags(&self, family: OperationFamily) -> Vec<(&'static str, Value)> {
        match self {
            ModelProfile::LtxVideo if family.is_video() => vec![("chunked_decode", json!(false))],
            ModelProfile::QwenImageEdit if family == OperationFamily::ImageEdit => {
                vec![("output_format", json!("png"))]
            }
            _ => Vec::new(),
        }
    }
}

/// Smallest `step * n + 1` (n >= 1) that is at least `frames`.
///
/// Counts with no such value below `u64::MAX` pass through unchanged.
pub fn round_frames(frames: u64, step: u64) -> u64 {
    if step == 0 {
        return frames;
    }
    let n = frames.saturating_sub(1).div_ceil(step).max(1);
    n.checked_mul(step)
        .and_then(|f| f.checked_add(1))
        .unwrap_or(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_base_url() {
        assert_eq!(
            ModelProfile::detect("https://chutes-lightricks-ltx-video.chutes.ai"),
            Some(ModelProfile::LtxVideo)
        );
        assert_eq!(
            ModelProfile::detect("https://chutes-wan2-1-14b.chutes.ai"),
            Some(ModelProfile::Wan)
        );
        assert_eq!(
            ModelProfile::detect("https://chutes-Qwen-Image-Edit.chutes.ai"),
            Some(ModelProfile::QwenImageEdit)
        );
        assert_eq!(ModelProfile::detect("https://chutes-flux-dev.chutes.ai"), None);
    }

    #[test]
    fn test_round_frames_ltx() {
        assert_eq!(round_frames(100, 8), 105);
        assert_eq!(round_frames(97, 8), 97);
        assert_eq!(round_frames(98, 8), 105);
        assert_eq!(round_frames(1, 8), 9);
        assert_eq!(round_frames(0, 8), 9);
    }

    #[test]
    fn test_round_frames_properties() {
        for frames in 0..300 {
            let rounded = round_frames(frames, 8);
            assert_eq!((rounded - 1) % 8, 0);
            assert!(rounded >= 9);
            assert!(rounded >= frames);
            assert_eq!(round_frames(rounded, 8), rounded);

            let wan = round_frames(frames, 4);
            assert_eq!((wan - 1) % 4, 0);
            assert_eq!(round_frames(wan, 4), wan);
        }
    }

    #[test]
    fn test_round_frames_near_u64_max() {
        assert_eq!(round_frames(u64::MAX, 8), u64::MAX);
        assert_eq!(round_frames(u64::MAX, 4), u64::MAX);
        assert_eq!(round_frames(u64::MAX - 1, 8), u64::MAX - 1);

        // 2^64 - 7 is 8n+1 and still representable
        let largest = u64::MAX - 6;
        assert_eq!(round_frames(largest, 8), largest);
        assert_eq!(round_frames(largest - 3, 8), largest);
    }

    #[test]
    fn test_technical_flags() {
        assert_eq!(
            ModelProfile::LtxVideo.technical_flags(OperationFamily::TextToVideo),
            vec![("chunked_decode", json!(false))]
        );
        assert!(ModelProfile::LtxVideo
            .technical_flags(OperationFamily::Generate)
            .is_empty());
        assert_eq!(
            ModelProfile::QwenImageEdit.technical_flags(OperationFamily::ImageEdit),
            vec![("output_format", json!("png"))]
        );
        assert!(ModelProfile::Wan
            .technical_flags(OperationFamily::ImageToVideo)
            .is_empty());
    }
}
