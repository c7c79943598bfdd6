//! The discovery result for one chute.

use chutes_core::OperationFamily;
use chutes_openapi::EndpointDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;

/// Endpoints assumed when a chute cannot describe itself.
pub const CANONICAL_ENDPOINTS: &[&str] = &[
    "/generate",
    "/text2video",
    "/image2video",
    "/edit",
    "/speak",
    "/transcribe",
    "/v1/embeddings",
];

/// How a [`ChuteCapabilities`] value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    /// Classified from the chute's schema document
    Discovered,
    /// Optimistic default: schema unavailable or inconclusive
    Fallback,
}

/// Resolution of one operation family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyResolution {
    pub supported: bool,
    /// Never empty; the canonical default when nothing matched
    pub path: String,
}

/// What a chute can do and where.
///
/// Built once per discovery and never mutated afterwards. When `supports`
/// is true for a family, its path is the path of one of [`endpoints`].
///
/// [`endpoints`]: ChuteCapabilities::endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChuteCapabilities {
    endpoints: Vec<EndpointDescriptor>,
    families: BTreeMap<OperationFamily, FamilyResolution>,
    source: CapabilitySource,
}

impl ChuteCapabilities {
    /// The optimistic default: canonical endpoints, every family supported.
    pub fn fallback() -> Self {
        let endpoints = CANONICAL_ENDPOINTS
            .iter()
            .map(|p| EndpointDescriptor::new(*p))
            .collect();
        let families = OperationFamily::ALL
            .iter()
            .map(|family| {
                (
                    *family,
                    FamilyResolution {
                        supported: true,
                        path: family.default_path().to_string(),
                    },
                )
            })
            .collect();

        Self {
            endpoints,
            families,
            source: CapabilitySource::Fallback,
        }
    }

    pub(crate) fn discovered(
        endpoints: Vec<EndpointDescriptor>,
        families: BTreeMap<OperationFamily, FamilyResolution>,
    ) -> Self {
        Self {
            endpoints,
            families,
            source: CapabilitySource::Discovered,
        }
    }

    /// Copy with `family` marked unsupported (its path reverts to the default).
    pub fn without(mut self, family: OperationFamily) -> Self {
        self.families.insert(
            family,
            FamilyResolution {
                supported: false,
                path: family.default_path().to_string(),
            },
        );
        self
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    pub fn source(&self) -> CapabilitySource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == CapabilitySource::Fallback
    }

    pub fn resolution(&self, family: OperationFamily) -> Option<&FamilyResolution> {
        self.families.get(&family)
    }

    pub fn supports(&self, family: OperationFamily) -> bool {
        self.families.get(&family).is_some_and(|r| r.supported)
    }

    /// Path chosen for `family`; always non-empty.
    pub fn path(&self, family: OperationFamily) -> &str {
        self.families
            .get(&family)
            .map(|r| r.path.as_str())
            .unwrap_or_else(|| family.default_path())
    }

    /// Descriptor behind the resolved path of a supported family.
    pub fn endpoint_for(&self, family: OperationFamily) -> Option<&EndpointDescriptor> {
        if !self.supports(family) {
            return None;
        }
        let path = self.path(family);
        self.endpoints.iter().find(|e| e.path == path)
    }

    pub fn supports_generate(&self) -> bool {
        self.supports(OperationFamily::Generate)
    }

    pub fn supports_text_to_video(&self) -> bool {
        self.supports(OperationFamily::TextToVideo)
    }

    pub fn supports_image_to_video(&self) -> bool {
        self.supports(OperationFamily::ImageToVideo)
    }

    pub fn supports_image_edit(&self) -> bool {
        self.supports(OperationFamily::ImageEdit)
    }

    pub fn supports_text_to_speech(&self) -> bool {
        self.supports(OperationFamily::TextToSpeech)
    }

    pub fn supports_speech_to_text(&self) -> bool {
        self.supports(OperationFamily::SpeechToText)
    }

    pub fn supports_embedding(&self) -> bool {
        self.supports(OperationFamily::Embedding)
    }

    pub fn generate_path(&self) -> &str {
        self.path(OperationFamily::Generate)
    }

    pub fn text_to_video_path(&self) -> &str {
        self.path(OperationFamily::TextToVideo)
    }

    pub fn image_to_video_path(&self) -> &str {
        self.path(OperationFamily::ImageToVideo)
    }

    pub fn image_edit_path(&self) -> &str {
        self.path(OperationFamily::ImageEdit)
    }

    pub fn text_to_speech_path(&self) -> &str {
        self.path(OperationFamily::TextToSpeech)
    }

    pub fn speech_to_text_path(&self) -> &str {
        self.path(OperationFamily::SpeechToText)
    }

    pub fn embedding_path(&self) -> &str {
        self.path(OperationFamily::Embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_optimistic() {
        let caps = ChuteCapabilities::fallback();
        assert!(caps.is_fallback());
        for family in OperationFamily::ALL {
            assert!(caps.supports(family), "{family} should be supported");
            assert_eq!(caps.path(family), family.default_path());
            assert!(caps.endpoint_for(family).is_some());
        }
        assert_eq!(caps.text_to_video_path(), "/generate");
        assert_eq!(caps.image_to_video_path(), "/generate");
        assert_eq!(caps.image_edit_path(), "/edit");
    }

    #[test]
    fn test_fallback_endpoints_cover_canonical_list() {
        let caps = ChuteCapabilities::fallback();
        let paths: Vec<&str> = caps.endpoints().iter().map(|e| e.path.as_str()).collect();
        for required in ["/generate", "/text2video", "/image2video", "/edit"] {
            assert!(paths.contains(&required));
        }
    }

    #[test]
    fn test_without_marks_family_unsupported() {
        let caps = ChuteCapabilities::fallback().without(OperationFamily::ImageToVideo);
        assert!(!caps.supports_image_to_video());
        assert_eq!(caps.image_to_video_path(), "/generate");
        assert!(caps.endpoint_for(OperationFamily::ImageToVideo).is_none());
        assert!(caps.supports_text_to_video());
    }
}
