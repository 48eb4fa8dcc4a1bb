pub mod feed;
pub mod market;
pub mod odds;

pub use feed::*;
pub use market::*;
pub use odds::*;
