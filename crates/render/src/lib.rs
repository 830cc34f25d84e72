pub mod describe;
pub mod docmodel;
pub mod embed;

pub use embed::{escape_markdown, RenderCtx};
