//! 规划层：模型输出解析与提示词

pub mod parser;
pub mod prompt;

pub use parser::{extract, ExtractError};
