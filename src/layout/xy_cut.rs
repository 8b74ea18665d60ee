//! The recursive XY-cut engine.
//!
//! The engine finds gaps between sorted elements and turns them into cut
//! candidates; a caller-supplied policy decides which candidates to
//! actually use. Page segmentation and reading-order detection share this
//! engine with different policies.
//!
//! The x-cut sweep is error-tolerant: when a gap is blocked by a small
//! number of elements (a page-spanning rule, say), the sweep falls back to
//! the second-largest right edge seen so far and emits the cut with the
//! blocking element recorded in `overlapping_elements`.

use crate::model::{Document, Element};

/// Direction of a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutDir {
    /// A vertical cut separating a left and a right group.
    X,
    /// A horizontal cut separating an upper and a lower group.
    Y,
}

/// A gap between two sorted elements that may become a cut.
#[derive(Debug, Clone)]
pub struct Cut {
    /// Direction of the cut.
    pub dir: CutDir,
    /// Index of the candidate within its sweep.
    pub id: usize,
    /// Page number the cut lives on.
    pub page_num: u32,
    /// Start point x.
    pub x1: f64,
    /// Start point y.
    pub y1: f64,
    /// End point x.
    pub x2: f64,
    /// End point y.
    pub y2: f64,
    /// Width of the gap (for x-cuts) or of the cut envelope (for y-cuts).
    pub gap_width: f64,
    /// Height of the cut envelope (for x-cuts) or of the gap (for y-cuts).
    pub gap_height: f64,
    /// Index of the first element on the "after" side of the cut, within
    /// the sorted element list.
    pub pos_in_elements: usize,
    /// The element bounding the gap on the before side.
    pub element_before: Option<Element>,
    /// The element bounding the gap on the after side.
    pub element_after: Option<Element>,
    /// Elements the cut slices through (error-tolerant x-cuts only).
    pub overlapping_elements: Vec<Element>,
    /// Whether the policy chose this cut.
    pub is_chosen: bool,
}

/// A cut-acceptance callback: inspects all candidates of one sweep and sets
/// `is_chosen` on the accepted ones. The `silent` flag suppresses logging
/// for speculative sweeps.
pub type ChooseCutsFn<'a> = &'a dyn Fn(&mut [Cut], &[Element], &Document, bool);

/// Recursively divide `elements` into groups by x- and y-cuts.
///
/// Tries x-cuts first; when they succeed, each group is recursively divided
/// y-first, otherwise the engine falls back to y-cuts and recurses x-first
/// on their groups. Groups that cannot be divided further are emitted into
/// `result_groups`. All cut candidates of every sweep are appended to
/// `cuts_out` (chosen or not) when provided.
#[allow(clippy::too_many_arguments)]
pub fn xy_cut(
    elements: &[Element],
    doc: &Document,
    min_x_cut_gap_width: f64,
    min_y_cut_gap_height: f64,
    max_num_overlapping_elements: usize,
    choose_x_cuts: ChooseCutsFn<'_>,
    choose_y_cuts: ChooseCutsFn<'_>,
    silent: bool,
    result_groups: &mut Vec<Vec<Element>>,
    mut cuts_out: Option<&mut Vec<Cut>>,
) {
    if elements.is_empty() {
        return;
    }

    let mut x_groups = Vec::new();
    let ok = x_cut(
        elements,
        doc,
        min_x_cut_gap_width,
        max_num_overlapping_elements,
        choose_x_cuts,
        silent,
        Some(&mut x_groups),
        cuts_out.as_mut().map(|c| &mut **c),
    );

    if !ok {
        let mut y_groups = Vec::new();
        let ok = y_cut(
            elements,
            doc,
            min_y_cut_gap_height,
            choose_y_cuts,
            silent,
            Some(&mut y_groups),
            cuts_out.as_mut().map(|c| &mut **c),
        );

        if !ok {
            result_groups.push(elements.to_vec());
            return;
        }

        for y_group in y_groups {
            xy_cut(
                &y_group,
                doc,
                min_x_cut_gap_width,
                min_y_cut_gap_height,
                max_num_overlapping_elements,
                choose_x_cuts,
                choose_y_cuts,
                silent,
                result_groups,
                cuts_out.as_mut().map(|c| &mut **c),
            );
        }
        return;
    }

    for x_group in x_groups {
        let mut y_groups = Vec::new();
        let ok = y_cut(
            &x_group,
            doc,
            min_y_cut_gap_height,
            choose_y_cuts,
            silent,
            Some(&mut y_groups),
            cuts_out.as_mut().map(|c| &mut **c),
        );

        if !ok {
            result_groups.push(x_group);
            continue;
        }

        for y_group in y_groups {
            xy_cut(
                &y_group,
                doc,
                min_x_cut_gap_width,
                min_y_cut_gap_height,
                max_num_overlapping_elements,
                choose_x_cuts,
                choose_y_cuts,
                silent,
                result_groups,
                cuts_out.as_mut().map(|c| &mut **c),
            );
        }
    }
}

/// Try to divide `elements` by one or more vertical cuts.
///
/// Returns whether at least one cut was chosen. The resulting groups (the
/// runs between chosen cuts, in left-to-right order) are appended to
/// `result_groups`; when no cut is chosen the whole sorted list is emitted
/// as a single group.
#[allow(clippy::too_many_arguments)]
pub fn x_cut(
    elements: &[Element],
    doc: &Document,
    min_gap_width: f64,
    max_num_overlapping_elements: usize,
    choose_cuts: ChooseCutsFn<'_>,
    silent: bool,
    result_groups: Option<&mut Vec<Vec<Element>>>,
    result_cuts: Option<&mut Vec<Cut>>,
) -> bool {
    if elements.is_empty() {
        return false;
    }

    let mut sorted = elements.to_vec();
    sorted.sort_by(|a, b| a.pos(doc).left_x.total_cmp(&b.pos(doc).left_x));

    let elements_min_y = sorted
        .iter()
        .map(|e| e.pos(doc).upper_y)
        .fold(f64::MAX, f64::min);
    let elements_max_y = sorted
        .iter()
        .map(|e| e.pos(doc).lower_y)
        .fold(f64::MIN, f64::max);

    let mut cuts: Vec<Cut> = Vec::new();
    let mut largest_right = sorted[0];
    let mut second_largest_right = sorted[0];
    let mut num_group_elements = 0usize;

    for (pos, &element) in sorted.iter().enumerate().skip(1) {
        let gap_width = element.pos(doc).left_x - largest_right.pos(doc).right_x;
        let gap_x = largest_right.pos(doc).right_x + gap_width / 2.0;

        if gap_width >= min_gap_width {
            cuts.push(Cut {
                dir: CutDir::X,
                id: cuts.len(),
                page_num: element.pos(doc).page_num,
                x1: gap_x,
                y1: elements_min_y,
                x2: gap_x,
                y2: elements_max_y,
                gap_width,
                gap_height: elements_max_y - elements_min_y,
                pos_in_elements: pos,
                element_before: Some(largest_right),
                element_after: Some(element),
                overlapping_elements: Vec::new(),
                is_chosen: false,
            });
            num_group_elements = 0;
        } else if max_num_overlapping_elements > 0
            && num_group_elements > max_num_overlapping_elements
        {
            // Error-tolerant pass: measure the gap against the second
            // largest right edge instead, treating the largest as an
            // element the cut may slice through.
            let gap_width = element.pos(doc).left_x - second_largest_right.pos(doc).right_x;
            let gap_x = second_largest_right.pos(doc).right_x + gap_width / 2.0;

            if gap_width >= min_gap_width {
                cuts.push(Cut {
                    dir: CutDir::X,
                    id: cuts.len(),
                    page_num: element.pos(doc).page_num,
                    x1: gap_x,
                    y1: elements_min_y,
                    x2: gap_x,
                    y2: elements_max_y,
                    gap_width,
                    gap_height: elements_max_y - elements_min_y,
                    pos_in_elements: pos,
                    element_before: Some(second_largest_right),
                    element_after: Some(element),
                    overlapping_elements: vec![largest_right],
                    is_chosen: false,
                });
                num_group_elements = 0;
            }
        }

        if element.pos(doc).right_x > largest_right.pos(doc).right_x {
            second_largest_right = largest_right;
            largest_right = element;
        } else if element.pos(doc).right_x > second_largest_right.pos(doc).right_x {
            second_largest_right = element;
        }

        num_group_elements += 1;
    }

    choose_cuts(&mut cuts, &sorted, doc, silent);

    collect_groups(&sorted, cuts, result_groups, result_cuts)
}

/// Try to divide `elements` by one or more horizontal cuts.
///
/// The counterpart of [`x_cut`] without error tolerance: elements are
/// sorted by their upper edge and gaps are measured against the largest
/// lower edge seen so far.
pub fn y_cut(
    elements: &[Element],
    doc: &Document,
    min_gap_height: f64,
    choose_cuts: ChooseCutsFn<'_>,
    silent: bool,
    result_groups: Option<&mut Vec<Vec<Element>>>,
    result_cuts: Option<&mut Vec<Cut>>,
) -> bool {
    if elements.is_empty() {
        return false;
    }

    let mut sorted = elements.to_vec();
    sorted.sort_by(|a, b| a.pos(doc).upper_y.total_cmp(&b.pos(doc).upper_y));

    let elements_min_x = sorted
        .iter()
        .map(|e| e.pos(doc).left_x)
        .fold(f64::MAX, f64::min);
    let elements_max_x = sorted
        .iter()
        .map(|e| e.pos(doc).right_x)
        .fold(f64::MIN, f64::max);

    let mut cuts: Vec<Cut> = Vec::new();
    let mut largest_lower = sorted[0];

    for (pos, &element) in sorted.iter().enumerate().skip(1) {
        let gap_height = element.pos(doc).upper_y - largest_lower.pos(doc).lower_y;
        let gap_y = largest_lower.pos(doc).lower_y + gap_height / 2.0;

        if gap_height > min_gap_height {
            cuts.push(Cut {
                dir: CutDir::Y,
                id: cuts.len(),
                page_num: element.pos(doc).page_num,
                x1: elements_min_x,
                y1: gap_y,
                x2: elements_max_x,
                y2: gap_y,
                gap_width: elements_max_x - elements_min_x,
                gap_height,
                pos_in_elements: pos,
                element_before: Some(largest_lower),
                element_after: Some(element),
                overlapping_elements: Vec::new(),
                is_chosen: false,
            });
        }

        if element.pos(doc).lower_y > largest_lower.pos(doc).lower_y {
            largest_lower = element;
        }
    }

    choose_cuts(&mut cuts, &sorted, doc, silent);

    collect_groups(&sorted, cuts, result_groups, result_cuts)
}

/// Partition the sorted elements at every chosen cut.
fn collect_groups(
    sorted: &[Element],
    cuts: Vec<Cut>,
    result_groups: Option<&mut Vec<Vec<Element>>>,
    result_cuts: Option<&mut Vec<Cut>>,
) -> bool {
    let mut prev_cut_pos = 0usize;
    let mut has_chosen_cut = false;
    let mut groups: Vec<Vec<Element>> = Vec::new();

    for cut in &cuts {
        if !cut.is_chosen {
            continue;
        }
        groups.push(sorted[prev_cut_pos..cut.pos_in_elements].to_vec());
        has_chosen_cut = true;
        prev_cut_pos = cut.pos_in_elements;
    }
    groups.push(sorted[prev_cut_pos..].to_vec());

    if let Some(result_groups) = result_groups {
        result_groups.extend(groups);
    }
    if let Some(result_cuts) = result_cuts {
        result_cuts.extend(cuts);
    }
    has_chosen_cut
}

/// Choose y-cuts by partner search.
///
/// A y-cut is only useful when the strip it bounds can be divided further
/// by an x-cut. This helper walks the candidates top to bottom (augmented
/// by a top and a bottom sentinel), and for each candidate searches the
/// farthest following candidate such that every strip in between passes
/// the `x_cut_feasible` test; both ends of such a pair are chosen. After
/// accepting a pair, the walk resumes from the partner.
pub fn choose_y_cuts_by_partner_search(
    cuts: &mut [Cut],
    elements: &[Element],
    doc: &Document,
    x_cut_feasible: &dyn Fn(&[Element], &Document) -> bool,
) {
    if cuts.is_empty() || elements.is_empty() {
        return;
    }

    // Positions of the sentinels plus the real candidates. Entry i > 0
    // maps to cuts[i - 1]; the last entry is the bottom sentinel.
    let mut positions: Vec<usize> = Vec::with_capacity(cuts.len() + 2);
    positions.push(0);
    positions.extend(cuts.iter().map(|c| c.pos_in_elements));
    positions.push(elements.len());

    let num_entries = positions.len();
    let mut idx = 0usize;
    while idx < num_entries {
        let start_entry = idx;
        let begin = positions[start_entry];
        let mut partner: Option<usize> = None;

        let mut other_idx = idx + 1;
        while other_idx < num_entries {
            let end = positions[other_idx];

            if !x_cut_feasible(&elements[begin..end], doc) {
                break;
            }

            partner = Some(other_idx);
            idx = other_idx;
            other_idx += 1;
        }

        if let Some(partner_entry) = partner {
            // Sentinels are not real cuts; only mark in-range candidates.
            for entry in [start_entry, partner_entry] {
                if entry > 0 && entry <= cuts.len() {
                    cuts[entry - 1].is_chosen = true;
                }
            }
        }

        // The walk resumes from the accepted partner's successor; the
        // candidate immediately after a partner is deliberately never a
        // pair start of its own.
        idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::model::Shape;

    /// Build a document holding shapes at the given boxes and return the
    /// matching element list.
    fn shapes(boxes: &[(f64, f64, f64, f64)]) -> (Document, Vec<Element>) {
        let mut doc = Document::new();
        let elements = boxes
            .iter()
            .enumerate()
            .map(|(rank, &(left, upper, right, lower))| {
                let id = doc.push_shape(Shape {
                    pos: Position {
                        page_num: 1,
                        left_x: left,
                        upper_y: upper,
                        right_x: right,
                        lower_y: lower,
                        ..Position::default()
                    },
                    rank,
                });
                Element::Shape(id)
            })
            .collect();
        (doc, elements)
    }

    fn accept_all(cuts: &mut [Cut], _elements: &[Element], _doc: &Document, _silent: bool) {
        for cut in cuts {
            cut.is_chosen = true;
        }
    }

    fn reject_all(cuts: &mut [Cut], _elements: &[Element], _doc: &Document, _silent: bool) {
        for cut in cuts {
            cut.is_chosen = false;
        }
    }

    #[test]
    fn test_x_cut_finds_column_gap() {
        // Two columns with a 30pt gap in between.
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 50.0),
            (0.0, 60.0, 100.0, 110.0),
            (130.0, 0.0, 230.0, 50.0),
            (130.0, 60.0, 230.0, 110.0),
        ]);

        let mut groups = Vec::new();
        let mut cuts = Vec::new();
        let ok = x_cut(
            &elements,
            &doc,
            10.0,
            1,
            &accept_all,
            true,
            Some(&mut groups),
            Some(&mut cuts),
        );

        assert!(ok);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 2);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].pos_in_elements, 2);
        assert!((cuts[0].x1 - 115.0).abs() < 1e-9);
    }

    #[test]
    fn test_x_cut_invariant_sides() {
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 50.0),
            (130.0, 0.0, 230.0, 50.0),
            (0.0, 60.0, 100.0, 110.0),
        ]);

        let mut groups = Vec::new();
        let mut cuts = Vec::new();
        x_cut(&elements, &doc, 10.0, 1, &accept_all, true, Some(&mut groups), Some(&mut cuts));

        for cut in cuts.iter().filter(|c| c.is_chosen) {
            for (i, group) in groups.iter().enumerate() {
                for element in group {
                    let pos = element.pos(&doc);
                    if i == 0 {
                        assert!(pos.right_x <= cut.x1);
                    } else {
                        assert!(pos.left_x >= cut.x1);
                    }
                }
            }
        }
    }

    #[test]
    fn test_x_cut_no_gap_returns_single_group() {
        let (doc, elements) = shapes(&[(0.0, 0.0, 100.0, 50.0), (101.0, 0.0, 200.0, 50.0)]);

        let mut groups = Vec::new();
        let ok = x_cut(&elements, &doc, 10.0, 1, &accept_all, true, Some(&mut groups), None);

        assert!(!ok);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_x_cut_error_tolerant_slices_through_rule() {
        // Two columns separated by a wide gap, but a page-spanning rule
        // (very wide shape) blocks the naive sweep.
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 50.0),
            (0.0, 55.0, 300.0, 57.0), // the rule
            (0.0, 60.0, 100.0, 110.0),
            (200.0, 0.0, 300.0, 50.0),
            (200.0, 60.0, 300.0, 110.0),
        ]);

        let mut cuts = Vec::new();
        x_cut(&elements, &doc, 10.0, 1, &accept_all, true, None, Some(&mut cuts));

        let tolerant: Vec<&Cut> = cuts.iter().filter(|c| !c.overlapping_elements.is_empty()).collect();
        assert_eq!(tolerant.len(), 1);
        assert_eq!(tolerant[0].overlapping_elements.len(), 1);
    }

    #[test]
    fn test_y_cut_finds_row_gap() {
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 40.0),
            (0.0, 44.0, 100.0, 84.0),
            (0.0, 120.0, 100.0, 160.0),
        ]);

        let mut groups = Vec::new();
        let mut cuts = Vec::new();
        let ok = y_cut(&elements, &doc, 10.0, &accept_all, true, Some(&mut groups), Some(&mut cuts));

        assert!(ok);
        assert_eq!(groups.len(), 2);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].pos_in_elements, 2);
    }

    #[test]
    fn test_xy_cut_two_columns_of_rows() {
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 40.0),
            (0.0, 80.0, 100.0, 120.0),
            (200.0, 0.0, 300.0, 40.0),
            (200.0, 80.0, 300.0, 120.0),
        ]);

        let mut groups = Vec::new();
        xy_cut(
            &elements,
            &doc,
            10.0,
            10.0,
            1,
            &accept_all,
            &accept_all,
            true,
            &mut groups,
            None,
        );

        // One x-cut, then one y-cut per column: four terminal groups.
        assert_eq!(groups.len(), 4);
        for group in &groups {
            assert_eq!(group.len(), 1);
        }
    }

    #[test]
    fn test_xy_cut_policy_rejection_yields_single_group() {
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 100.0, 40.0),
            (200.0, 0.0, 300.0, 40.0),
        ]);

        let mut groups = Vec::new();
        xy_cut(
            &elements,
            &doc,
            10.0,
            10.0,
            1,
            &reject_all,
            &reject_all,
            true,
            &mut groups,
            None,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_partner_search_accepts_bounding_pair() {
        // Elements: a full-width header, then a two-column body, then a
        // full-width footer. The y-cuts above and below the body bound a
        // strip divisible by an x-cut, so both are chosen.
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 300.0, 20.0), // header
            (0.0, 40.0, 100.0, 80.0),
            (200.0, 40.0, 300.0, 80.0),
            (0.0, 100.0, 300.0, 120.0), // footer
        ]);

        // Manually produce the y-cut candidates.
        let mut cuts = Vec::new();
        let mut sorted = elements.clone();
        sorted.sort_by(|a, b| a.pos(&doc).upper_y.total_cmp(&b.pos(&doc).upper_y));
        y_cut(&elements, &doc, 10.0, &reject_all, true, None, Some(&mut cuts));
        assert_eq!(cuts.len(), 2);

        let feasible = |slice: &[Element], doc: &Document| {
            x_cut(slice, doc, 50.0, 1, &accept_all, true, None, None)
        };
        choose_y_cuts_by_partner_search(&mut cuts, &sorted, &doc, &feasible);

        assert!(cuts[0].is_chosen);
        assert!(cuts[1].is_chosen);
    }

    #[test]
    fn test_partner_search_rejects_unsplittable_strips() {
        // Two stacked single-column rows: the strip between the y-cuts is
        // not divisible by an x-cut, so no cut is chosen.
        let (doc, elements) = shapes(&[
            (0.0, 0.0, 300.0, 20.0),
            (0.0, 40.0, 300.0, 60.0),
            (0.0, 80.0, 300.0, 100.0),
        ]);

        let mut cuts = Vec::new();
        let mut sorted = elements.clone();
        sorted.sort_by(|a, b| a.pos(&doc).upper_y.total_cmp(&b.pos(&doc).upper_y));
        y_cut(&elements, &doc, 10.0, &reject_all, true, None, Some(&mut cuts));
        assert_eq!(cuts.len(), 2);

        let feasible = |slice: &[Element], doc: &Document| {
            x_cut(slice, doc, 50.0, 1, &accept_all, true, None, None)
        };
        choose_y_cuts_by_partner_search(&mut cuts, &sorted, &doc, &feasible);

        assert!(!cuts[0].is_chosen);
        assert!(!cuts[1].is_chosen);
    }
}
