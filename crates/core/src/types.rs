use serde::{Deserialize, Serialize};

/// Kind tag the recognition service attaches to every fragment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Item,
    Amount,
    Title,
    ShopName,
    Date,
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentKind::Item => write!(f, "item"),
            FragmentKind::Amount => write!(f, "amount"),
            FragmentKind::Title => write!(f, "title"),
            FragmentKind::ShopName => write!(f, "shop_name"),
            FragmentKind::Date => write!(f, "date"),
        }
    }
}

impl std::str::FromStr for FragmentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item" => Ok(FragmentKind::Item),
            "amount" => Ok(FragmentKind::Amount),
            "title" => Ok(FragmentKind::Title),
            "shop_name" => Ok(FragmentKind::ShopName),
            "date" => Ok(FragmentKind::Date),
            other => Err(format!("Unknown fragment kind: '{other}'")),
        }
    }
}

/// One polygon corner in page-normalized coordinates (0.0–1.0).
///
/// The recognition service omits a coordinate when it is zero, so either axis
/// may be missing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vertex {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x: Some(x), y: Some(y) }
    }
}

/// A single recognized text span, as produced by the recognition service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub kind: FragmentKind,
    pub polygon: Option<Vec<Vertex>>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, kind: FragmentKind, polygon: Vec<Vertex>) -> Self {
        Self { text: text.into(), kind, polygon: Some(polygon) }
    }

    /// Axis-aligned rectangle given as `(x_min, y_min, x_max, y_max)`.
    pub fn with_rect(
        text: impl Into<String>,
        kind: FragmentKind,
        (x_min, y_min, x_max, y_max): (f32, f32, f32, f32),
    ) -> Self {
        Self::new(
            text,
            kind,
            vec![
                Vertex::new(x_min, y_min),
                Vertex::new(x_max, y_min),
                Vertex::new(x_max, y_max),
                Vertex::new(x_min, y_max),
            ],
        )
    }
}

/// Everything the recognition service returned for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecognizedDocument {
    pub fragments: Vec<TextFragment>,
}

impl RecognizedDocument {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self { fragments }
    }

    pub fn first_of(&self, kind: FragmentKind) -> Option<&TextFragment> {
        self.fragments.iter().find(|f| f.kind == kind)
    }
}

/// The four form categories the ledger accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormTitle {
    CreditPayment,
    CreditReceipt,
    CashPayment,
    CashReceipt,
}

impl FormTitle {
    pub const ALL: [FormTitle; 4] = [
        FormTitle::CreditPayment,
        FormTitle::CreditReceipt,
        FormTitle::CashPayment,
        FormTitle::CashReceipt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormTitle::CreditPayment => "クレジット支払",
            FormTitle::CreditReceipt => "クレジット受入",
            FormTitle::CashPayment => "現金支払",
            FormTitle::CashReceipt => "現金受入",
        }
    }
}

impl std::fmt::Display for FormTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormTitle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormTitle::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown form title: '{s}'"))
    }
}

/// One exported row. `amount` holds digits only and may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub item: String,
    pub amount: String,
}

impl LineItem {
    pub fn new(item: impl Into<String>, amount: impl Into<String>) -> Self {
        Self { item: item.into(), amount: amount.into() }
    }
}

/// The structured reading of one form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub shop_name: Option<String>,
    pub date: Option<String>,
    pub line_items: Vec<LineItem>,
    /// Set when rows had to be guessed or dropped; a human should check the export.
    pub review_needed: bool,
    /// User-facing explanation accompanying `review_needed`.
    pub warning: Option<String>,
}

impl ExtractionResult {
    /// The title parsed into a canonical category, if it is one.
    pub fn form_title(&self) -> Option<FormTitle> {
        self.title.as_deref()?.parse().ok()
    }

    pub fn has_known_title(&self) -> bool {
        self.form_title().is_some()
    }
}
