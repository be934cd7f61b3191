//! 屏幕文字识别与聚类 - 把 OCR 的零散 token 组装成阅读顺序的文本块

pub mod cluster;
pub mod recognizer;
pub mod token;

pub use cluster::TextBlockClusterer;
pub use recognizer::{MockTokenRecognizer, OcrError, TokenRecognizer};
pub use token::{JoinStyle, TextBlock, TextToken};
