/// Applying a label group to a segmentation owned by the host.
use std::collections::HashSet;

use crate::types::{LabelColor, LabelGroup};

/// The host-side segmentation a group is applied to.
pub trait SegmentSink {
    /// Names of the segments that already exist.
    fn segment_names(&self) -> Vec<String>;
    /// Adds an empty segment named `name`.
    fn add_empty_segment(&mut self, name: &str, color: LabelColor);
}

/// What to do when some labels already exist as segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Create nothing if any label is a duplicate.
    #[default]
    Abort,
    /// Create only the labels that are not duplicates.
    SkipDuplicates,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub skipped_empty: usize,
    /// Duplicates were found under [`DuplicatePolicy::Abort`]; nothing was created.
    pub aborted: bool,
}

/// Labels of `group` that already exist in `sink`, in group order.
pub fn find_duplicates(group: &LabelGroup, sink: &dyn SegmentSink) -> Vec<String> {
    let existing: HashSet<String> = sink.segment_names().into_iter().collect();
    group
        .keys()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty() && existing.contains(*label))
        .map(str::to_string)
        .collect()
}

/// Keeps `color` if it is a usable RGB triple, otherwise picks a random one.
pub fn sanitize_color(color: LabelColor) -> LabelColor {
    LabelColor::from_components(&color.to_array()).unwrap_or_else(|| {
        log::warn!("Unusable color {color:?}, substituting a random one");
        LabelColor::random()
    })
}

/// Creates one empty segment per label in `group`, in order.
pub fn apply_group(
    group: &LabelGroup,
    sink: &mut dyn SegmentSink,
    policy: DuplicatePolicy,
) -> ApplyReport {
    let mut report = ApplyReport {
        skipped_duplicates: find_duplicates(group, sink),
        ..ApplyReport::default()
    };
    if !report.skipped_duplicates.is_empty() && policy == DuplicatePolicy::Abort {
        report.aborted = true;
        return report;
    }

    let mut existing: HashSet<String> = sink.segment_names().into_iter().collect();
    for (label, color) in group {
        let label = label.trim();
        if label.is_empty() {
            report.skipped_empty += 1;
            continue;
        }
        // Also guards against two group keys trimming to the same name.
        if !existing.insert(label.to_string()) {
            continue;
        }
        sink.add_empty_segment(label, sanitize_color(*color));
        report.created.push(label.to_string());
    }
    log::info!(
        "Applied {} labels, skipped {} duplicates",
        report.created.len(),
        report.skipped_duplicates.len()
    );
    report
}

/// In-memory segmentation, useful for previews and tests.
#[derive(Clone, Debug, Default)]
pub struct SegmentList {
    pub segments: Vec<(String, LabelColor)>,
}

impl SegmentList {
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            segments: names
                .iter()
                .map(|n| (n.as_ref().to_string(), LabelColor::new(0.5, 0.5, 0.5)))
                .collect(),
        }
    }
}

impl SegmentSink for SegmentList {
    fn segment_names(&self) -> Vec<String> {
        self.segments.iter().map(|(name, _)| name.clone()).collect()
    }

    fn add_empty_segment(&mut self, name: &str, color: LabelColor) {
        self.segments.push((name.to_string(), color));
    }
}
