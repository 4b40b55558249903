pub mod media;
pub mod sticky;
pub mod types;

pub use media::MediaPolicy;
pub use sticky::{StickyContent, StickyEntry, StickySnapshot};
pub use types::{MemberRole, MinutesRange};
