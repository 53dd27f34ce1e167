pub mod analytics;
pub mod file;
pub mod session;
pub mod task;
pub mod user;

pub use analytics::*;
pub use file::*;
pub use session::*;
pub use task::*;
pub use user::*;
