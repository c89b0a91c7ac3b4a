pub mod config;
pub mod context;
pub mod types;

pub use config::TitleCharsets;
pub use context::TraceContext;
pub use types::{
    ExtractionResult, FormTitle, FragmentKind, LineItem, RecognizedDocument, TextFragment, Vertex,
};
