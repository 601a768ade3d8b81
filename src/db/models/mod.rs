mod file;
mod grant;
mod membership;
mod project;
mod task;
mod user;

pub use file::*;
pub use grant::*;
pub use membership::*;
pub use project::*;
pub use task::*;
pub use user::*;
