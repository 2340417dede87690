mod appearance;
mod kalman_filter;
mod lock_on;
mod matching;
mod rect;
mod registry;
mod strack;
mod track_state;

pub use appearance::{AppearanceDescriptor, DescriptorConfig, Embedding, cosine_similarity};
pub use kalman_filter::{MotionConfig, MotionFilter};
pub use lock_on::{Lock, LockConfig, LockOnController, LockSnapshot};
pub use matching::{AssignmentResult, Detection, best_appearance_match, greedy_assignment};
pub use rect::{Rect, iou_batch};
pub use registry::{TrackRegistry, TrackerConfig};
pub use strack::{Track, TrackedResult};
pub use track_state::TrackingState;
