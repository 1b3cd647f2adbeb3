pub use crate::data::init::random_layout;
pub use crate::data::structures::CoordinateList;
pub use crate::error::{LayoutError, Result};
pub use crate::training::callback::EpochCallback;
pub use crate::training::embedding::{AtomicEmbedding, AtomicFloat};
pub use crate::training::{LayoutParams, SeedPolicy};
pub use crate::{embed_against_reference, embed_graph, prepare_schedule};
