//! Translate a semantic field bag into the body one specific chute expects.
//!
//! Translation is a strict whitelist: each family accepts a fixed set of
//! semantic fields, each semantic field maps onto an ordered list of wire
//! names, and the endpoint's declared fields pick among them. Anything else
//! in the bag is dropped.

use crate::capabilities::ChuteCapabilities;
use crate::classifier::path_matches_alias;
use crate::models::{ModelProfile, round_frames};
use chutes_core::{OperationFamily, SemanticFieldBag};
use chutes_openapi::EndpointDescriptor;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, trace};

/// A concrete request for one chute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPlan {
    pub family: OperationFamily,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    /// Always the path capabilities resolved for `family`
    pub endpoint: String,
    pub body: Value,
}

fn serialize_method<S: serde::Serializer>(method: &Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

struct FieldRule {
    semantic: &'static str,
    wire: &'static [&'static str],
    base64: bool,
}

const fn field(semantic: &'static str, wire: &'static [&'static str]) -> FieldRule {
    FieldRule {
        semantic,
        wire,
        base64: false,
    }
}

const PROMPT: FieldRule = field("prompt", &["prompt"]);
const NEGATIVE_PROMPT: FieldRule = field("negative_prompt", &["negative_prompt"]);
const SEED: FieldRule = field("seed", &["seed"]);
const RESOLUTION: FieldRule = field("resolution", &["resolution"]);
const WIDTH: FieldRule = field("width", &["width"]);
const HEIGHT: FieldRule = field("height", &["height"]);
const STEPS: FieldRule = field("steps", &["steps", "num_inference_steps"]);
const GUIDANCE: FieldRule = field("guidance_scale", &["guidance_scale", "cfg", "cfg_scale"]);
const FPS: FieldRule = field("fps", &["fps"]);
const FRAMES: FieldRule = field("frames", &["frames", "num_frames"]);
const TEXT: FieldRule = field("text", &["text"]);
const VOICE: FieldRule = field("voice", &["voice"]);
const SPEED: FieldRule = field("speed", &["speed"]);
const AUDIO: FieldRule = FieldRule {
    semantic: "audio",
    wire: &["audio_b64", "audio"],
    base64: true,
};
const LANGUAGE: FieldRule = field("language", &["language"]);
const INPUT: FieldRule = field("input", &["input"]);
const MODEL: FieldRule = field("model", &["model"]);

const IMAGE_RULES: &[FieldRule] = &[
    PROMPT,
    NEGATIVE_PROMPT,
    SEED,
    RESOLUTION,
    WIDTH,
    HEIGHT,
    STEPS,
    GUIDANCE,
];
const VIDEO_RULES: &[FieldRule] = &[
    PROMPT,
    NEGATIVE_PROMPT,
    SEED,
    RESOLUTION,
    WIDTH,
    HEIGHT,
    STEPS,
    GUIDANCE,
    FPS,
    FRAMES,
];
const EDIT_RULES: &[FieldRule] = &[
    PROMPT,
    NEGATIVE_PROMPT,
    SEED,
    WIDTH,
    HEIGHT,
    STEPS,
    GUIDANCE,
];
const SPEECH_RULES: &[FieldRule] = &[TEXT, VOICE, SPEED];
const TRANSCRIBE_RULES: &[FieldRule] = &[AUDIO, LANGUAGE];
const EMBEDDING_RULES: &[FieldRule] = &[INPUT, MODEL];

fn rules_for(family: OperationFamily) -> &'static [FieldRule] {
    match family {
        OperationFamily::Generate => IMAGE_RULES,
        OperationFamily::TextToVideo | OperationFamily::ImageToVideo => VIDEO_RULES,
        OperationFamily::ImageEdit => EDIT_RULES,
        OperationFamily::TextToSpeech => SPEECH_RULES,
        OperationFamily::SpeechToText => TRANSCRIBE_RULES,
        OperationFamily::Embedding => EMBEDDING_RULES,
    }
}

fn accepts_images(family: OperationFamily) -> bool {
    matches!(
        family,
        OperationFamily::ImageEdit | OperationFamily::ImageToVideo
    )
}

const ARRAY_IMAGE_KEYS: &[&str] = &["image_b64s", "images"];
const SCALAR_IMAGE_KEYS: &[&str] = &["image_b64", "image", "image_url", "init_image"];

/// How a chute wants its input image(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageConvention {
    /// One base64 string under this key
    Scalar(&'static str),
    /// A list of base64 strings under this key
    Array(&'static str),
}

impl ImageConvention {
    /// Key used when several images must be sent.
    pub fn array_key(&self) -> &'static str {
        match *self {
            ImageConvention::Array(key) => key,
            ImageConvention::Scalar("image") => "images",
            ImageConvention::Scalar(_) => "image_b64s",
        }
    }
}

/// Image convention for `family` at `path`.
///
/// Declared fields win when they name a known image key; otherwise the
/// family/path table decides. `None` for families that take no image.
pub fn image_convention(
    family: OperationFamily,
    path: &str,
    endpoint: Option<&EndpointDescriptor>,
) -> Option<ImageConvention> {
    if !accepts_images(family) {
        return None;
    }
    if let Some(endpoint) = endpoint {
        if let Some(key) = endpoint.first_declared(ARRAY_IMAGE_KEYS) {
            return Some(ImageConvention::Array(key));
        }
        if let Some(key) = endpoint.first_declared(SCALAR_IMAGE_KEYS) {
            return Some(ImageConvention::Scalar(key));
        }
    }

    let convention = match family {
        OperationFamily::ImageEdit if path_matches_alias(path, "/edit") => {
            ImageConvention::Array("image_b64s")
        }
        OperationFamily::ImageToVideo
            if path_matches_alias(path, "/image2video") || path_matches_alias(path, "/animate") =>
        {
            ImageConvention::Scalar("image")
        }
        _ => ImageConvention::Scalar("image_b64"),
    };
    Some(convention)
}

/// Strip a `data:<mime>;base64,` prefix.
pub fn strip_data_uri(value: &str) -> &str {
    value
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .map(|(_, payload)| payload)
        .unwrap_or(value)
}

fn normalize_base64(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_data_uri(s).to_string()),
        other => other.clone(),
    }
}

/// Parse `"1280x720"` (also `X`, `*` or `×`) into width and height.
pub fn split_resolution(resolution: &str) -> Option<(u64, u64)> {
    let (w, h) = resolution
        .trim()
        .split_once(['x', 'X', '*', '×'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Build the request for `family` against a chute with `capabilities`.
///
/// Returns `None` when the chute does not support `family`; that outcome is
/// terminal and should not be retried. `base_url_hint` selects a
/// [`ModelProfile`] when one matches.
pub fn build_request_body(
    family: OperationFamily,
    capabilities: &ChuteCapabilities,
    fields: &SemanticFieldBag,
    base_url_hint: Option<&str>,
) -> Option<RequestPlan> {
    if !capabilities.supports(family) {
        debug!("{} not supported by chute", family);
        return None;
    }

    let path = capabilities.path(family);
    let endpoint = capabilities.endpoint_for(family);
    let profile = base_url_hint.and_then(ModelProfile::detect);
    let declares = |key: &str| endpoint.is_some_and(|e| e.declares(key));

    let mut body = Map::new();

    for rule in rules_for(family) {
        let Some(value) = fields.get(rule.semantic) else {
            continue;
        };
        let wire = endpoint
            .and_then(|e| e.first_declared(rule.wire))
            .unwrap_or(rule.wire[0]);

        match rule.semantic {
            "resolution" if !declares("resolution") && (declares("width") || declares("height")) => {
                match value.as_str().and_then(split_resolution) {
                    Some((width, height)) => {
                        body.entry("width").or_insert(Value::from(width));
                        body.entry("height").or_insert(Value::from(height));
                    }
                    None => {
                        body.insert(wire.to_string(), value.clone());
                    }
                }
            }
            "frames" => {
                let frames = match (fields.get_u64("frames"), profile.and_then(|p| p.frame_step())) {
                    (Some(requested), Some(step)) => {
                        let rounded = round_frames(requested, step);
                        if rounded != requested {
                            info!(
                                "Rounded frames {} -> {} for {}",
                                requested,
                                rounded,
                                profile.map(|p| p.name()).unwrap_or_default()
                            );
                        }
                        Value::from(rounded)
                    }
                    _ => value.clone(),
                };
                body.insert(wire.to_string(), frames);
            }
            _ if rule.base64 => {
                body.insert(wire.to_string(), normalize_base64(value));
            }
            _ => {
                body.insert(wire.to_string(), value.clone());
            }
        }
    }

    if let Some(convention) = image_convention(family, path, endpoint) {
        insert_images(&mut body, convention, fields);
    }

    if let Some(profile) = profile {
        for (key, value) in profile.technical_flags(family) {
            body.insert(key.to_string(), value);
        }
    }

    for (name, _) in fields.iter() {
        if !is_accepted(family, name) {
            trace!("Dropping field '{}' not accepted by {}", name, family);
        }
    }

    let body = match endpoint.and_then(|e| e.wrapper.as_deref()) {
        Some(wrapper) => {
            let mut outer = Map::new();
            outer.insert(wrapper.to_string(), Value::Object(body));
            Value::Object(outer)
        }
        None => Value::Object(body),
    };

    Some(RequestPlan {
        family,
        method: Method::POST,
        endpoint: path.to_string(),
        body,
    })
}

fn insert_images(body: &mut Map<String, Value>, convention: ImageConvention, fields: &SemanticFieldBag) {
    if let Some(Value::Array(items)) = fields.get("images") {
        if !items.is_empty() {
            let images = items.iter().map(normalize_base64).collect();
            body.insert(convention.array_key().to_string(), Value::Array(images));
            return;
        }
    }

    // A bare string under "images" counts as a single image
    let single = fields
        .get("image")
        .or_else(|| fields.get("images").filter(|v| v.is_string()));
    if let Some(image) = single {
        let image = normalize_base64(image);
        match convention {
            ImageConvention::Array(key) => {
                body.insert(key.to_string(), Value::Array(vec![image]));
            }
            ImageConvention::Scalar(key) => {
                body.insert(key.to_string(), image);
            }
        }
    }
}

fn is_accepted(family: OperationFamily, name: &str) -> bool {
    rules_for(family).iter().any(|r| r.semantic == name)
        || (accepts_images(family) && matches!(name, "image" | "images"))
}
