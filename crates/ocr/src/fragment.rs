use suito_core::{FragmentKind, TextFragment};

/// Flat bounding box of a recognized fragment, in page-normalized units.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentBox {
    pub text: String,
    pub kind: FragmentKind,
    pub center_x: f32,
    pub center_y: f32,
    pub x_min: f32,
    pub x_max: f32,
    pub height: f32,
}

impl FragmentBox {
    /// Derive a box from the fragment's polygon.
    ///
    /// Returns `None` when the polygon is missing, has fewer than four
    /// vertices, carries no usable coordinate on either axis, or is flat
    /// (zero height).
    pub fn from_fragment(fragment: &TextFragment) -> Option<Self> {
        let vertices = fragment.polygon.as_deref()?;
        if vertices.len() < 4 {
            return None;
        }

        let xs: Vec<f32> = vertices.iter().filter_map(|v| v.x).collect();
        let ys: Vec<f32> = vertices.iter().filter_map(|v| v.y).collect();
        let (x_min, x_max) = min_max(&xs)?;
        let (y_min, y_max) = min_max(&ys)?;
        let height = y_max - y_min;
        if height <= 0.0 {
            return None;
        }

        Some(FragmentBox {
            text: strip_newlines(&fragment.text),
            kind: fragment.kind,
            center_x: (x_min + x_max) / 2.0,
            center_y: (y_min + y_max) / 2.0,
            x_min,
            x_max,
            height,
        })
    }
}

pub(crate) fn strip_newlines(text: &str) -> String {
    text.replace('\n', "")
}

fn min_max(values: &[f32]) -> Option<(f32, f32)> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    finite.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use suito_core::Vertex;

    #[test]
    fn rectangle_becomes_box() {
        let f = TextFragment::with_rect("商品A", FragmentKind::Item, (0.1, 0.2, 0.3, 0.24));
        let b = FragmentBox::from_fragment(&f).unwrap();
        assert!((b.center_x - 0.2).abs() < 1e-6);
        assert!((b.center_y - 0.22).abs() < 1e-6);
        assert!((b.height - 0.04).abs() < 1e-6);
        assert_eq!(b.x_min, 0.1);
        assert_eq!(b.x_max, 0.3);
        assert_eq!(b.kind, FragmentKind::Item);
    }

    #[test]
    fn newlines_are_removed_from_text() {
        let f = TextFragment::with_rect("商\n品", FragmentKind::Item, (0.0, 0.0, 0.1, 0.1));
        assert_eq!(FragmentBox::from_fragment(&f).unwrap().text, "商品");
    }

    #[test]
    fn missing_polygon_is_dropped() {
        let f = TextFragment { text: "x".into(), kind: FragmentKind::Item, polygon: None };
        assert!(FragmentBox::from_fragment(&f).is_none());
    }

    #[test]
    fn fewer_than_four_vertices_is_dropped() {
        let f = TextFragment::new(
            "x",
            FragmentKind::Amount,
            vec![Vertex::new(0.1, 0.1), Vertex::new(0.2, 0.1), Vertex::new(0.2, 0.2)],
        );
        assert!(FragmentBox::from_fragment(&f).is_none());
    }

    #[test]
    fn vertices_without_coordinates_are_dropped() {
        let f = TextFragment::new("x", FragmentKind::Amount, vec![Vertex::default(); 4]);
        assert!(FragmentBox::from_fragment(&f).is_none());
    }

    #[test]
    fn partially_missing_axis_still_derives() {
        // The service leaves out zero coordinates.
        let f = TextFragment::new(
            "x",
            FragmentKind::Item,
            vec![
                Vertex { x: None, y: Some(0.01) },
                Vertex { x: Some(0.2), y: Some(0.01) },
                Vertex::new(0.2, 0.05),
                Vertex { x: None, y: Some(0.05) },
            ],
        );
        let b = FragmentBox::from_fragment(&f).unwrap();
        assert_eq!(b.x_min, 0.2);
        assert_eq!(b.x_max, 0.2);
        assert!((b.height - 0.04).abs() < 1e-6);
    }

    #[test]
    fn flat_polygon_is_dropped() {
        let f = TextFragment::with_rect("x", FragmentKind::Item, (0.1, 0.3, 0.2, 0.3));
        assert!(FragmentBox::from_fragment(&f).is_none());
    }
}
