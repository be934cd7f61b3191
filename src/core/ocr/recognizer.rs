//! 识别引擎边界
//!
//! OCR 引擎是外部协作方，这里只定义取 token 的契约；
//! 单张图片识别失败由调用方捕获并降级为空结果，不中断整体流程。

use std::path::Path;

use thiserror::Error;

use super::token::TextToken;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("recognition engine error: {0}")]
    Engine(String),
}

pub trait TokenRecognizer: Send + Sync {
    /// 识别一张图片，返回带包围盒与置信度的 token 集合。
    /// 可以返回空集；置信度在 [0, 100]。
    fn recognize(&self, image: &Path) -> Result<Vec<TextToken>, OcrError>;
}

/// 测试用识别器：按路径脚本化返回 token
pub struct MockTokenRecognizer {
    script: Box<dyn Fn(&Path) -> Result<Vec<TextToken>, OcrError> + Send + Sync>,
}

impl MockTokenRecognizer {
    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&Path) -> Result<Vec<TextToken>, OcrError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
        }
    }

    /// 对所有图片返回同一批 token
    pub fn with_tokens(tokens: Vec<TextToken>) -> Self {
        Self::with_script(move |_| Ok(tokens.clone()))
    }

    /// 对所有图片返回失败
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with_script(move |_| Err(OcrError::Engine(message.clone())))
    }
}

impl TokenRecognizer for MockTokenRecognizer {
    fn recognize(&self, image: &Path) -> Result<Vec<TextToken>, OcrError> {
        (self.script)(image)
    }
}
