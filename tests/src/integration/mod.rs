//! Cross-module flows driven through the runtime.

pub mod advertising;
pub mod lock_flows;
pub mod sirk_flows;
