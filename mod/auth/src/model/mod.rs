mod audit;
mod permission;
mod refs;
mod role;
mod token;
mod user;

pub use audit::*;
pub use permission::*;
pub use refs::*;
pub use role::*;
pub use token::*;
pub use user::*;
