// HTTP routes
pub mod analyze;
pub mod calls;
pub mod chat;
pub mod health;
pub mod knowledge;

pub use analyze::*;
pub use calls::*;
pub use chat::*;
pub use health::*;
pub use knowledge::*;
