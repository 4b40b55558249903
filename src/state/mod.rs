pub mod media;
pub mod sticky;

pub use media::MediaPolicyRegistry;
pub use sticky::{ChatSlot, StickyRegistry};
