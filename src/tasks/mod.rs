pub mod deletion;
pub mod media;
pub mod sticky;
pub mod timer;

pub use deletion::DeletionScheduler;
pub use media::MediaPolicyService;
pub use sticky::StickyScheduler;
pub use timer::TimerService;
