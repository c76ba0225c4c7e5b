mod health;
mod json;
mod notes;
mod users;

pub use health::*;
pub use json::JsonBody;
pub use notes::*;
pub use users::*;
