//! Stateless repositories. Every method takes `&Connection`.

pub mod reading;
pub mod user_state;

pub use reading::ReadingRepo;
pub use user_state::UserStateRepo;
