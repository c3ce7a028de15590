//! Option merging.
//!
//! Top-level keys are merged shallowly: an override replaces the preset's
//! value wholesale. The sub-groups listed in [`DEEP_MERGED_GROUPS`] are merged
//! one level deeper, key by key, so that an override only has to name the keys
//! it changes. Neither input is ever mutated.

use crate::config::{OptionGroup, QrConfig, QrOptions, StyleGroup};

/// Sub-groups merged key-wise instead of being replaced.
pub const DEEP_MERGED_GROUPS: [StyleGroup; 5] = StyleGroup::ALL;

/// Merges `over` onto `base` one level deep; `over` wins per key.
pub fn merge_group(base: &OptionGroup, over: &OptionGroup) -> OptionGroup {
    let mut merged = base.clone();
    for (key, value) in over.iter() {
        merged.insert(key, value.clone());
    }
    merged
}

/// Resolves `options` against `preset` for `data`.
///
/// `pixel_ratio` scales the resolved width and height and is expected to be
/// already normalised (finite and positive).
pub fn resolve(preset: &QrConfig, data: &str, options: &QrOptions, pixel_ratio: f64) -> QrConfig {
    let mut config = QrConfig {
        width: options.width.unwrap_or(preset.width) * pixel_ratio,
        height: options.height.unwrap_or(preset.height) * pixel_ratio,
        draw_type: options.draw_type.unwrap_or(preset.draw_type),
        data: data.to_string(),
        image: options.image.clone().or_else(|| preset.image.clone()),
        qr_options: options.qr_options.unwrap_or(preset.qr_options),
        ..preset.clone()
    };

    for group in DEEP_MERGED_GROUPS {
        if let Some(over) = options.group(group) {
            *config.group_mut(group) = merge_group(preset.group(group), over);
        }
    }

    log::debug!(
        "resolved QR config {}x{} ({:?}, image: {})",
        config.width,
        config.height,
        config.draw_type,
        config.image.is_some()
    );
    config
}
