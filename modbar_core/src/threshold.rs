//! Threshold classification of metric predicates into semantic states

use crate::segment::Segment;
use serde::{Deserialize, Serialize};

/// Semantic state used to color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Good,
    Degraded,
    Bad,
    Urgent,
}

/// Declared order used by [`threshold`]: most severe first.
pub const DEFAULT_ORDER: [Severity; 3] = [Severity::Bad, Severity::Degraded, Severity::Good];

/// Pick the state for a set of predicates.
///
/// `urgent` is checked first and always wins. Otherwise the first predicate
/// that holds, in the order the caller declared them, decides the state. With
/// no match the result is [`Severity::Normal`].
pub fn classify(urgent: bool, predicates: &[(Severity, bool)]) -> Severity {
    if urgent {
        return Severity::Urgent;
    }
    predicates
        .iter()
        .find(|(_, matched)| *matched)
        .map(|(severity, _)| *severity)
        .unwrap_or(Severity::Normal)
}

/// Apply a classification to a segment.
///
/// `color` holds predicates for `bad`, `degraded` and `good`, in that order;
/// extra entries are ignored.
pub fn threshold(segment: Segment, urgent: bool, color: &[bool]) -> Segment {
    let predicates: Vec<(Severity, bool)> = DEFAULT_ORDER
        .iter()
        .zip(color.iter())
        .map(|(s, c)| (*s, *c))
        .collect();

    match classify(urgent, &predicates) {
        Severity::Urgent => segment.urgent(true),
        Severity::Normal => segment,
        other => segment.semantic(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::ColorRef;

    #[test]
    fn urgent_beats_every_predicate() {
        let preds = [
            (Severity::Bad, true),
            (Severity::Degraded, true),
            (Severity::Good, true),
        ];
        assert_eq!(classify(true, &preds), Severity::Urgent);
        assert_eq!(classify(true, &[]), Severity::Urgent);
    }

    #[test]
    fn first_true_in_declared_order_wins() {
        let preds = [
            (Severity::Bad, false),
            (Severity::Degraded, true),
            (Severity::Good, true),
        ];
        assert_eq!(classify(false, &preds), Severity::Degraded);

        // 顺序由调用方决定
        let reversed = [
            (Severity::Good, true),
            (Severity::Degraded, true),
            (Severity::Bad, false),
        ];
        assert_eq!(classify(false, &reversed), Severity::Good);
    }

    #[test]
    fn no_match_is_normal() {
        assert_eq!(
            classify(false, &[(Severity::Bad, false), (Severity::Good, false)]),
            Severity::Normal
        );
    }

    #[test]
    fn classify_is_deterministic() {
        let preds = [(Severity::Bad, false), (Severity::Good, true)];
        let first = classify(false, &preds);
        for _ in 0..10 {
            assert_eq!(classify(false, &preds), first);
        }
    }

    #[test]
    fn threshold_marks_urgent_without_color() {
        let s = threshold(Segment::text("load"), true, &[false, true, false]);
        assert!(s.is_urgent());
        assert_eq!(s.get_color(), None);
    }

    #[test]
    fn threshold_colors_by_first_match() {
        let s = threshold(Segment::text("mem"), false, &[false, true, true]);
        assert!(!s.is_urgent());
        assert_eq!(s.get_color(), Some(&ColorRef::Semantic(Severity::Degraded)));
    }

    #[test]
    fn threshold_ignores_extra_predicates() {
        let s = threshold(Segment::text("mem"), false, &[false, false, false, true]);
        assert_eq!(s.get_color(), None);
    }

    #[test]
    fn threshold_without_match_leaves_segment_alone() {
        let original = Segment::text("disk").hex("#ffffff");
        let s = threshold(original.clone(), false, &[false, false, false]);
        assert_eq!(s, original);
    }
}
