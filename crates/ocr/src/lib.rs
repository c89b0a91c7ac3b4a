pub mod fragment;
pub mod geometry;
pub mod hash;
pub mod intake;
pub mod layout;
pub mod messenger;
pub mod orientation;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod reconcile;
pub mod region;
pub mod store;
pub mod title;

pub use fragment::FragmentBox;
pub use hash::{blob_key, sha256_bytes, to_hex};
pub use intake::{spawn_intake_watcher, QueueError, TaskQueue, TaskRecord};
pub use layout::LayoutReconstructor;
pub use messenger::{LogMessenger, MessageError, Messenger, RecordingMessenger};
pub use orientation::OrientationAnalyzer;
pub use pipeline::{FormPipeline, PipelineError, QueueSummary, TaskOutcome};
pub use preprocess::{sniff_mime, ImageNormalizer, PreprocessError};
pub use recognizer::{DocumentRecognizer, HttpRecognizer, MockRecognizer, RecognizeError};
pub use reconcile::{Reconciliation, RowReconciler};
pub use region::{PaperRegionDetector, RegionMask};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, StoreError};
pub use title::TitleNormalizer;
