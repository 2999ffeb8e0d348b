pub mod apply;
pub mod decode;
pub mod error;
pub mod merge;
pub mod model;
pub mod record;
pub mod storage;
pub mod subscription;

pub use decode::DecoderRegistry;
pub use merge::{merge_batches, render_merged};
pub use model::RoutingDocument;
pub use record::{BatchEntry, ProxyRecord};
