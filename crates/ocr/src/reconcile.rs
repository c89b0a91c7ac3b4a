use std::sync::OnceLock;

use regex::Regex;
use suito_core::{FragmentKind, LineItem};
use tracing::{debug, info, warn};

use crate::fragment::FragmentBox;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_non_digit, r"[^0-9]");
re!(re_spaces, r"[ 　]");

/// Item text used when a row has an amount but nothing to name it.
pub const UNKNOWN_ITEM: &str = "項目不明";

/// Appended to the form title when several rows were guessed.
pub const WARNING_RETAKE: &str = "の写真が傾いているか、手ぶれで読み漏れが発生しました。もう一度撮影してアップロードするか、テレマスにて手修正してください。";
/// Appended to the form title when only a few rows were guessed.
pub const WARNING_FIX_MANUALLY: &str =
    "の写真が傾いているか、手ぶれで読み漏れが発生しました。テレマスにて手修正してください。";

/// Outcome of pairing item fragments with amount fragments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub line_items: Vec<LineItem>,
    pub review_needed: bool,
    pub warning: Option<String>,
}

/// Turns unordered item/amount fragments into ordered line items.
///
/// Equal, non-zero counts are paired top to bottom by index. Any other mix is
/// grouped into rows by vertical position, and rows that cannot be paired
/// cleanly are kept with placeholders and flagged for review.
pub struct RowReconciler {
    /// Share of the typical text height two fragments may differ by and
    /// still sit on one row.
    pub tolerance_factor: f32,
    pub min_tolerance: f32,
    /// Tolerance used when no fragment has a usable height.
    pub fallback_tolerance: f32,
    /// Heights at or below this are ignored when estimating text height.
    pub min_height: f32,
}

impl Default for RowReconciler {
    fn default() -> Self {
        Self {
            tolerance_factor: 0.95,
            min_tolerance: 0.008,
            fallback_tolerance: 0.01,
            min_height: 0.001,
        }
    }
}

impl RowReconciler {
    pub fn reconcile(&self, items: Vec<FragmentBox>, amounts: Vec<FragmentBox>) -> Reconciliation {
        let (line_items, review_needed) = if !items.is_empty() && items.len() == amounts.len() {
            info!(count = items.len(), "item and amount counts match, pairing by order");
            (pair_by_order(items, amounts), false)
        } else if items.is_empty() && amounts.is_empty() {
            warn!("no item or amount fragments found");
            return Reconciliation::default();
        } else {
            info!(
                items = items.len(),
                amounts = amounts.len(),
                "item and amount counts differ, grouping by row"
            );
            self.pair_by_rows(items, amounts)
        };

        let warning = (review_needed && !line_items.is_empty())
            .then(|| review_warning(line_items.len()).to_string());

        Reconciliation { line_items, review_needed, warning }
    }

    /// Row tolerance from the middle 60% of fragment heights, so a few huge or
    /// tiny boxes do not skew it.
    pub fn row_tolerance(&self, boxes: &[FragmentBox]) -> f32 {
        let mut heights: Vec<f32> = boxes
            .iter()
            .map(|b| b.height)
            .filter(|&h| h > self.min_height)
            .collect();
        if heights.is_empty() {
            return self.fallback_tolerance;
        }
        heights.sort_by(f32::total_cmp);

        let n = heights.len();
        let stable = &heights[n / 5..n * 4 / 5];
        let stable = if stable.is_empty() { &heights[..] } else { stable };

        let avg = stable.iter().sum::<f32>() / stable.len() as f32;
        let tolerance = (avg * self.tolerance_factor).max(self.min_tolerance);
        info!(tolerance, avg_height = avg, "row tolerance computed");
        tolerance
    }

    fn pair_by_rows(
        &self,
        items: Vec<FragmentBox>,
        amounts: Vec<FragmentBox>,
    ) -> (Vec<LineItem>, bool) {
        let mut boxes = items;
        boxes.extend(amounts);
        let tolerance = self.row_tolerance(&boxes);
        let rows = group_rows(boxes, tolerance);
        info!(rows = rows.len(), "fragments grouped into rows");

        let mut line_items = Vec::new();
        let mut review_needed = false;

        for row in rows {
            let (mut row_items, mut row_amounts): (Vec<_>, Vec<_>) =
                row.into_iter().partition(|b| b.kind == FragmentKind::Item);
            row_items.sort_by(|a, b| a.center_x.total_cmp(&b.center_x));
            row_amounts.sort_by(|a, b| a.center_x.total_cmp(&b.center_x));

            let merged_item = join_texts(&row_items);
            let item = clean_item_text(&merged_item);

            let amount = match (row_items.last(), row_amounts.first()) {
                (Some(last_item), Some(first_amount)) => {
                    if last_item.x_max < first_amount.x_min {
                        clean_amount_text(&join_texts(&row_amounts))
                    } else {
                        warn!(
                            item = %merged_item,
                            amounts = ?row_amounts.iter().map(|a| a.text.as_str()).collect::<Vec<_>>(),
                            "item overlaps amount horizontally, dropping the row's amount"
                        );
                        review_needed = true;
                        String::new()
                    }
                }
                (None, Some(_)) => clean_amount_text(&join_texts(&row_amounts)),
                _ => String::new(),
            };

            match (item.is_empty(), amount.is_empty()) {
                (false, false) => line_items.push(LineItem { item, amount }),
                (false, true) => {
                    line_items.push(LineItem { item, amount: "0".into() });
                    review_needed = true;
                }
                (true, false) => {
                    line_items.push(LineItem { item: UNKNOWN_ITEM.into(), amount });
                    review_needed = true;
                }
                (true, true) => {}
            }
        }

        (line_items, review_needed)
    }
}

fn pair_by_order(mut items: Vec<FragmentBox>, mut amounts: Vec<FragmentBox>) -> Vec<LineItem> {
    items.sort_by(|a, b| a.center_y.total_cmp(&b.center_y));
    amounts.sort_by(|a, b| a.center_y.total_cmp(&b.center_y));
    items
        .iter()
        .zip(&amounts)
        .map(|(item, amount)| LineItem {
            item: clean_item_text(&item.text),
            amount: clean_amount_text(&amount.text),
        })
        .collect()
}

/// Bands fragments into rows. Each row is anchored on its first (topmost)
/// member; a fragment joins while it stays within `tolerance` of that anchor.
pub fn group_rows(mut boxes: Vec<FragmentBox>, tolerance: f32) -> Vec<Vec<FragmentBox>> {
    boxes.sort_by(|a, b| a.center_y.total_cmp(&b.center_y));

    let mut rows: Vec<Vec<FragmentBox>> = Vec::new();
    for b in boxes {
        let joins = rows
            .last()
            .is_some_and(|row| (b.center_y - row[0].center_y).abs() < tolerance);
        match rows.last_mut() {
            Some(row) if joins => row.push(b),
            _ => rows.push(vec![b]),
        }
    }

    for (i, row) in rows.iter().enumerate() {
        debug!(row = i + 1, fragments = ?row.iter().map(|b| b.text.as_str()).collect::<Vec<_>>());
    }
    rows
}

/// Drops ASCII and full-width spaces and masks `@`.
pub fn clean_item_text(text: &str) -> String {
    re_spaces().replace_all(text, "").replace('@', "(a)")
}

/// Keeps ASCII digits only.
pub fn clean_amount_text(text: &str) -> String {
    re_non_digit().replace_all(text, "").into_owned()
}

fn join_texts(boxes: &[FragmentBox]) -> String {
    boxes.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" ")
}

fn review_warning(line_count: usize) -> &'static str {
    if line_count >= 3 {
        WARNING_RETAKE
    } else {
        WARNING_FIX_MANUALLY
    }
}
