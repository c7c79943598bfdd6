//! Capability discovery: which operation families a chute serves, and where.

use crate::capabilities::{ChuteCapabilities, FamilyResolution};
use chutes_core::OperationFamily;
use chutes_openapi::{EndpointDescriptor, SchemaDocument, SchemaFetch, SchemaFetcher};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Keys that carry an input image.
pub const IMAGE_FIELDS: &[&str] = &[
    "image",
    "image_b64",
    "image_b64s",
    "images",
    "image_url",
    "init_image",
];

/// Keys whose presence suggests a video output.
pub const VIDEO_HINT_FIELDS: &[&str] = &["frames", "num_frames", "fps", "video_length", "duration"];

/// Path aliases for one family.
///
/// `specific` aliases name the family outright and match on the path alone.
/// `generic` aliases are shared between families and only match when the
/// endpoint's declared fields (if any) fit the family's signature.
struct FamilyRule {
    family: OperationFamily,
    specific: &'static [&'static str],
    generic: &'static [&'static str],
}

const RULES: &[FamilyRule] = &[
    FamilyRule {
        family: OperationFamily::Generate,
        specific: &["/text2image", "/txt2img", "/generate_image"],
        generic: &["/generate"],
    },
    FamilyRule {
        family: OperationFamily::TextToVideo,
        specific: &["/text2video", "/t2v", "/txt2vid"],
        generic: &["/generate"],
    },
    FamilyRule {
        family: OperationFamily::ImageToVideo,
        specific: &["/image2video", "/i2v", "/img2vid", "/animate"],
        generic: &["/generate"],
    },
    FamilyRule {
        family: OperationFamily::ImageEdit,
        specific: &["/edit", "/image_edit", "/img2img", "/inpaint"],
        generic: &[],
    },
    FamilyRule {
        family: OperationFamily::TextToSpeech,
        specific: &["/speak", "/tts", "/text2speech"],
        generic: &[],
    },
    FamilyRule {
        family: OperationFamily::SpeechToText,
        specific: &["/transcribe", "/stt", "/speech2text"],
        generic: &[],
    },
    FamilyRule {
        family: OperationFamily::Embedding,
        specific: &["/v1/embeddings", "/embeddings", "/embed"],
        generic: &[],
    },
];

fn rule_for(family: OperationFamily) -> Option<&'static FamilyRule> {
    RULES.iter().find(|r| r.family == family)
}

/// Whether `path` is `alias` or `alias` followed by a separator.
pub fn path_matches_alias(path: &str, alias: &str) -> bool {
    match path.strip_prefix(alias) {
        Some("") => true,
        Some(rest) => rest.starts_with(['/', '_', '-']),
        None => false,
    }
}

/// Whether the declared fields of `endpoint` fit `family`.
pub fn matches_signature(family: OperationFamily, endpoint: &EndpointDescriptor) -> bool {
    let has = |f: &str| endpoint.declares(f);
    let image = endpoint.declares_any(IMAGE_FIELDS);
    let video = endpoint.declares_any(VIDEO_HINT_FIELDS);

    match family {
        OperationFamily::Generate => has("prompt") && !image && !video,
        OperationFamily::TextToVideo => has("prompt") && video && !image,
        OperationFamily::ImageToVideo => image && video,
        OperationFamily::ImageEdit => image && has("prompt") && !video,
        OperationFamily::TextToSpeech => has("text") && (has("voice") || has("speed")),
        OperationFamily::SpeechToText => has("audio") || has("audio_b64"),
        OperationFamily::Embedding => has("input"),
    }
}

/// Generic aliases accept schema-less endpoints optimistically.
fn fits_generic(family: OperationFamily, endpoint: &EndpointDescriptor) -> bool {
    !endpoint.has_declared_fields() || matches_signature(family, endpoint)
}

/// Whether `path` is claimed by a specific alias of another family.
fn names_other_family(path: &str, family: OperationFamily) -> bool {
    RULES
        .iter()
        .filter(|r| r.family != family)
        .flat_map(|r| r.specific.iter())
        .any(|alias| path_matches_alias(path, alias))
}

fn resolve_family<'a>(
    family: OperationFamily,
    endpoints: &'a [EndpointDescriptor],
) -> Option<&'a EndpointDescriptor> {
    let rule = rule_for(family)?;

    for alias in rule.specific {
        if let Some(endpoint) = endpoints.iter().find(|e| path_matches_alias(&e.path, alias)) {
            return Some(endpoint);
        }
    }
    for alias in rule.generic {
        if let Some(endpoint) = endpoints
            .iter()
            .find(|e| path_matches_alias(&e.path, alias) && fits_generic(family, e))
        {
            return Some(endpoint);
        }
    }

    endpoints.iter().find(|e| {
        e.has_declared_fields()
            && matches_signature(family, e)
            && !names_other_family(&e.path, family)
    })
}

/// Classify a parsed schema document.
///
/// A document without POST endpoints is inconclusive and yields the
/// optimistic default.
pub fn classify(document: &SchemaDocument) -> ChuteCapabilities {
    if document.endpoints.is_empty() {
        info!("Schema declares no POST endpoints, assuming default capabilities");
        return ChuteCapabilities::fallback();
    }

    let mut families = BTreeMap::new();
    for family in OperationFamily::ALL {
        let resolution = match resolve_family(family, &document.endpoints) {
            Some(endpoint) => FamilyResolution {
                supported: true,
                path: endpoint.path.clone(),
            },
            None => FamilyResolution {
                supported: false,
                path: family.default_path().to_string(),
            },
        };
        debug!(
            "{} -> {} ({})",
            family,
            resolution.path,
            if resolution.supported { "supported" } else { "unsupported" }
        );
        families.insert(family, resolution);
    }

    ChuteCapabilities::discovered(document.endpoints.clone(), families)
}

/// Discover what the chute at `base_url` can do.
///
/// Never fails: an unavailable or unusable schema falls back to
/// [`ChuteCapabilities::fallback`].
pub async fn discover_chute_capabilities(
    fetcher: &SchemaFetcher,
    base_url: &str,
    api_key: &str,
) -> ChuteCapabilities {
    match fetcher.fetch_schema(base_url, api_key).await {
        SchemaFetch::Available(document) => {
            debug!(
                "Classifying {} endpoints from {}",
                document.endpoints.len(),
                base_url
            );
            classify(&document)
        }
        SchemaFetch::Unavailable(reason) => {
            info!(
                "Schema unavailable for {} ({}), assuming default capabilities",
                base_url, reason
            );
            ChuteCapabilities::fallback()
        }
    }
}
