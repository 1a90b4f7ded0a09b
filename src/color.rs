/// Distinct color generation for label lists.
use crate::types::{LabelColor, LabelGroup};

/// Golden-ratio conjugate used for hue stepping.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.61803398875;
pub const SATURATION: f64 = 0.75;
pub const LIGHTNESS: f64 = 0.5;
/// Adjacent colors closer than this (RGB Euclidean) are considered too similar.
pub const MIN_DISTANCE: f64 = 0.25;
/// Hue offset applied once by the batch assigner when adjacent colors are too similar.
pub const BATCH_HUE_NUDGE: f64 = 0.1;
pub const MAX_ATTEMPTS: usize = 10;

/// Hue for position `i` in a golden-ratio sequence.
pub fn golden_hue(i: usize) -> f64 {
    (i as f64 * GOLDEN_RATIO_CONJUGATE).rem_euclid(1.0)
}

/// Standard HLS to RGB conversion, all components in `[0, 1]`.
pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> LabelColor {
    if s == 0.0 {
        return LabelColor::new(l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    LabelColor::new(
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn color_for_hue(hue: f64) -> LabelColor {
    hls_to_rgb(hue, LIGHTNESS, SATURATION)
}

/// Picks the batch color for `hue`, nudging once if it sits too close to `previous`.
/// The flag reports whether the nudge happened.
pub(crate) fn pick_batch_color(hue: f64, previous: Option<&LabelColor>) -> (LabelColor, bool) {
    let candidate = color_for_hue(hue);
    match previous {
        Some(prev) if candidate.distance(prev) < MIN_DISTANCE => {
            (color_for_hue((hue + BATCH_HUE_NUDGE).rem_euclid(1.0)), true)
        }
        _ => (candidate, false),
    }
}

/// Assigns one color per label, in input order.
///
/// Deterministic: the same list always yields the same colors. Adjacent colors
/// get a single hue nudge when too similar, which is best effort, not a guarantee.
pub fn assign_batch<S: AsRef<str>>(labels: &[S]) -> LabelGroup {
    let mut group = LabelGroup::with_capacity(labels.len());
    let mut previous: Option<LabelColor> = None;
    for (i, label) in labels.iter().enumerate() {
        let (color, nudged) = pick_batch_color(golden_hue(i), previous.as_ref());
        if nudged {
            log::debug!("Nudged hue for label '{}'", label.as_ref());
        }
        group.insert(label.as_ref().to_string(), color);
        previous = Some(color);
    }
    group
}

/// Stateful one-at-a-time color generator.
///
/// Remembers the last color it produced. Call [`ColorAssigner::reset`] before
/// starting an unrelated sequence.
#[derive(Debug, Default, Clone)]
pub struct ColorAssigner {
    last_color: Option<LabelColor>,
}

impl ColorAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_color = None;
    }

    pub fn last_color(&self) -> Option<LabelColor> {
        self.last_color
    }

    /// Color for `index`, stepping the hue forward until it is far enough from the
    /// last produced color. After `MAX_ATTEMPTS` the final candidate is returned
    /// unchecked and the remembered color is left as it was.
    pub fn assign_next(&mut self, index: usize) -> LabelColor {
        for attempt in 0..MAX_ATTEMPTS {
            let candidate = color_for_hue(golden_hue(index + attempt));
            let too_close = self
                .last_color
                .is_some_and(|last| candidate.distance(&last) < MIN_DISTANCE);
            if !too_close {
                self.last_color = Some(candidate);
                return candidate;
            }
        }
        log::debug!("No distinct color found for index {index}, using last candidate");
        color_for_hue(golden_hue(index + MAX_ATTEMPTS - 1))
    }

    /// Assigns a whole list through the incremental path, continuing the current sequence.
    pub fn assign_all<S: AsRef<str>>(&mut self, labels: &[S]) -> LabelGroup {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_ref().to_string(), self.assign_next(i)))
            .collect()
    }
}

/// Hex string for display, e.g. `#DF2020`.
pub fn to_hex(color: &LabelColor) -> String {
    let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02X}{:02X}{:02X}",
        channel(color.r),
        channel(color.g),
        channel(color.b)
    )
}
