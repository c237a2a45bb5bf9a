pub mod chat_view;
pub mod input;
pub mod markdown;
pub mod progress;

pub use chat_view::*;
pub use input::*;
pub use progress::*;
