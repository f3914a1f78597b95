pub mod item_ctx;
pub mod record;

pub use item_ctx::ItemCtx;
pub use record::{CachedPrompt, ResultRecord};
