//! Draft normalization and merge rules.
//!
//! Every draft entering the validation pipeline passes through
//! [`sanitize_draft`] first, regardless of whether it came from the local
//! extractor, the interpretation gateway, or a session merge.

use quickcal_domain::constants::MAX_ATTACHED_IMAGES;
use quickcal_domain::utils::datetime::add_minutes;
use quickcal_domain::{EventDraft, ImageInput, InterpretedDraft};

/// Normalize a draft into canonical shape.
///
/// Trims every string field, clamps `confidence` into `[0, 1]`, and fills
/// `end` from `start + default_duration_minutes` when only the start is
/// known.
pub fn sanitize_draft(draft: EventDraft, default_duration_minutes: i64) -> EventDraft {
    let mut normalized = EventDraft {
        title: draft.title.trim().to_string(),
        start: draft.start.trim().to_string(),
        end: draft.end.trim().to_string(),
        location: draft.location.trim().to_string(),
        description: draft.description.trim().to_string(),
        confidence: clamp_confidence(draft.confidence),
        uncertain: draft.uncertain,
        needs_clarification: draft.needs_clarification,
        clarification_question: draft.clarification_question.trim().to_string(),
        user_confirmed: draft.user_confirmed,
        duplicate_confirmed: draft.duplicate_confirmed,
    };

    if !normalized.start.is_empty() && normalized.end.is_empty() {
        normalized.end = add_minutes(&normalized.start, default_duration_minutes)
            .unwrap_or_default();
    }

    normalized
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Overwrite the draft's interpretable fields with a refinement response.
///
/// This is a field-by-field merge over the known `EventDraft` shape:
/// unrecognized keys were already dropped at deserialization, and the
/// confirmation flags (`user_confirmed`, `duplicate_confirmed`) are
/// preserved because they belong to this dialogue, not to the gateway.
pub fn apply_interpreted(draft: &EventDraft, refined: &InterpretedDraft) -> EventDraft {
    EventDraft {
        title: refined.title.clone(),
        start: refined.start.clone(),
        end: refined.end.clone(),
        location: refined.location.clone(),
        description: refined.description.clone(),
        confidence: refined.confidence,
        uncertain: refined.uncertain,
        needs_clarification: refined.needs_clarification,
        clarification_question: refined.clarification_question.clone(),
        user_confirmed: draft.user_confirmed,
        duplicate_confirmed: draft.duplicate_confirmed,
    }
}

/// Build an [`EventDraft`] from an initial interpretation.
pub fn draft_from_interpreted(interpreted: InterpretedDraft) -> EventDraft {
    apply_interpreted(&EventDraft::default(), &interpreted)
}

/// Drop images with no payload or mime type and normalize the rest.
pub fn sanitize_images(images: Vec<ImageInput>) -> Vec<ImageInput> {
    images
        .into_iter()
        .filter_map(|image| {
            let mime_type = image.mime_type.trim().to_lowercase();
            let data_base64: String =
                image.data_base64.split_whitespace().collect::<Vec<_>>().concat();
            if mime_type.is_empty() || data_base64.is_empty() {
                return None;
            }

            let name = image.name.trim().to_string();
            let mut sanitized = ImageInput {
                name: if name.is_empty() { "image".to_string() } else { name },
                mime_type,
                data_base64,
                size_bytes: image.size_bytes,
            };
            sanitized.size_bytes = sanitized.resolved_size();
            Some(sanitized)
        })
        .collect()
}

/// Merge newly attached images with a session's stored ones, keeping only
/// the most recent [`MAX_ATTACHED_IMAGES`], oldest dropped first.
pub fn merge_images(base: Vec<ImageInput>, additional: Vec<ImageInput>) -> Vec<ImageInput> {
    let mut merged = sanitize_images(base);
    merged.extend(sanitize_images(additional));

    let overflow = merged.len().saturating_sub(MAX_ATTACHED_IMAGES);
    merged.split_off(overflow)
}
