pub mod group;
pub mod purchase_item;
pub mod receipt;
pub mod upload;
pub mod user;

pub use group::*;
pub use purchase_item::*;
pub use receipt::*;
pub use upload::*;
pub use user::*;
