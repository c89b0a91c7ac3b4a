use suito_core::{ExtractionResult, FragmentKind, RecognizedDocument, TitleCharsets, TraceContext};
use tracing::{debug, info};

use crate::fragment::{strip_newlines, FragmentBox};
use crate::reconcile::RowReconciler;
use crate::title::TitleNormalizer;

/// Builds an [`ExtractionResult`] from everything the recognition service
/// returned for one form.
#[derive(Default)]
pub struct LayoutReconstructor {
    titles: TitleNormalizer,
    rows: RowReconciler,
}

impl LayoutReconstructor {
    pub fn new(charsets: TitleCharsets, rows: RowReconciler) -> Self {
        Self { titles: TitleNormalizer::new(charsets), rows }
    }

    pub fn reconstruct(&self, doc: &RecognizedDocument, ctx: &TraceContext) -> ExtractionResult {
        let mut items = Vec::new();
        let mut amounts = Vec::new();
        let mut dropped = 0usize;

        for fragment in &doc.fragments {
            if !matches!(fragment.kind, FragmentKind::Item | FragmentKind::Amount) {
                continue;
            }
            match FragmentBox::from_fragment(fragment) {
                Some(b) if b.kind == FragmentKind::Item => items.push(b),
                Some(b) => amounts.push(b),
                None => {
                    dropped += 1;
                    debug!(trace_id = %ctx, text = %fragment.text, "fragment without usable geometry dropped");
                }
            }
        }

        let header = |kind| doc.first_of(kind).map(|f| strip_newlines(&f.text));
        let title = header(FragmentKind::Title).map(|raw| self.titles.normalize(&raw));
        let shop_name = header(FragmentKind::ShopName);
        let date = header(FragmentKind::Date);

        let rec = self.rows.reconcile(items, amounts);

        info!(
            trace_id = %ctx,
            title = ?title,
            line_items = rec.line_items.len(),
            dropped,
            review_needed = rec.review_needed,
            "layout reconstructed"
        );
        if let Some(warning) = &rec.warning {
            info!(trace_id = %ctx, warning = %warning, "user warning generated");
        }

        ExtractionResult {
            title,
            shop_name,
            date,
            line_items: rec.line_items,
            review_needed: rec.review_needed,
            warning: rec.warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suito_core::{LineItem, TextFragment, Vertex};

    fn ctx() -> TraceContext {
        TraceContext::new("test")
    }

    fn rect(text: &str, kind: FragmentKind, y: f32, x0: f32, x1: f32) -> TextFragment {
        TextFragment::with_rect(text, kind, (x0, y - 0.01, x1, y + 0.01))
    }

    #[test]
    fn equal_counts_scenario() {
        let doc = RecognizedDocument::new(vec![
            rect("出納表(クレジット支払)", FragmentKind::Title, 0.05, 0.3, 0.7),
            rect("商品B", FragmentKind::Item, 0.4, 0.1, 0.4),
            rect("¥1,000", FragmentKind::Amount, 0.2, 0.6, 0.8),
            rect("商品A", FragmentKind::Item, 0.2, 0.1, 0.4),
            rect("¥2,000", FragmentKind::Amount, 0.4, 0.6, 0.8),
        ]);
        let r = LayoutReconstructor::default().reconstruct(&doc, &ctx());
        assert_eq!(r.title.as_deref(), Some("クレジット支払"));
        assert!(r.has_known_title());
        assert_eq!(
            r.line_items,
            vec![LineItem::new("商品A", "1000"), LineItem::new("商品B", "2000")]
        );
        assert!(!r.review_needed);
        assert_eq!(r.warning, None);
    }

    #[test]
    fn headers_take_first_occurrence() {
        let doc = RecognizedDocument::new(vec![
            TextFragment { text: "駅前\n店".into(), kind: FragmentKind::ShopName, polygon: None },
            rect("本店", FragmentKind::ShopName, 0.1, 0.1, 0.2),
            rect("2025/01/05", FragmentKind::Date, 0.1, 0.7, 0.9),
            rect("2025/02/05", FragmentKind::Date, 0.2, 0.7, 0.9),
        ]);
        let r = LayoutReconstructor::default().reconstruct(&doc, &ctx());
        assert_eq!(r.shop_name.as_deref(), Some("駅前店"));
        assert_eq!(r.date.as_deref(), Some("2025/01/05"));
        assert_eq!(r.title, None);
        assert!(r.line_items.is_empty());
        assert!(!r.review_needed);
    }

    #[test]
    fn ambiguous_title_passes_through() {
        let doc = RecognizedDocument::new(vec![rect("現金クレジット", FragmentKind::Title, 0.05, 0.3, 0.7)]);
        let r = LayoutReconstructor::default().reconstruct(&doc, &ctx());
        assert_eq!(r.title.as_deref(), Some("現金クレジット"));
        assert!(!r.has_known_title());
    }

    #[test]
    fn malformed_fragments_are_excluded_from_counts() {
        // Two valid pairs plus a broken amount: still an equal-count page.
        let doc = RecognizedDocument::new(vec![
            rect("A", FragmentKind::Item, 0.2, 0.1, 0.4),
            rect("B", FragmentKind::Item, 0.4, 0.1, 0.4),
            rect("100", FragmentKind::Amount, 0.2, 0.6, 0.8),
            rect("200", FragmentKind::Amount, 0.4, 0.6, 0.8),
            TextFragment::new("999", FragmentKind::Amount, vec![Vertex::new(0.6, 0.6)]),
        ]);
        let r = LayoutReconstructor::default().reconstruct(&doc, &ctx());
        assert_eq!(r.line_items, vec![LineItem::new("A", "100"), LineItem::new("B", "200")]);
        assert!(!r.review_needed);
    }

    #[test]
    fn mismatched_counts_with_review_carry_warning() {
        let doc = RecognizedDocument::new(vec![
            rect("現金支払", FragmentKind::Title, 0.05, 0.3, 0.7),
            rect("A", FragmentKind::Item, 0.2, 0.1, 0.4),
            rect("B", FragmentKind::Item, 0.4, 0.1, 0.4),
            rect("100", FragmentKind::Amount, 0.2, 0.6, 0.8),
        ]);
        let r = LayoutReconstructor::default().reconstruct(&doc, &ctx());
        assert_eq!(r.line_items, vec![LineItem::new("A", "100"), LineItem::new("B", "0")]);
        assert!(r.review_needed);
        assert!(r.warning.is_some());
    }
}
