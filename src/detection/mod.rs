//! Detection stages: route lookup, association, projection, debouncing.

pub mod association;
pub mod debounce;
pub mod path_index;
pub mod projection;

pub use association::{AssociationConfig, LightAssociator, StopLineAssociator};
pub use debounce::{DebounceConfig, DebounceState, StateDebouncer};
pub use path_index::Path;
pub use projection::{
    CameraConfig, CameraProjector, Projection, ProjectionError, ScreenPoint, SearchRegion,
    SearchRegionConfig, inside_clip_volume,
};
