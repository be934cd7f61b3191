use serde::{Deserialize, Serialize};

/// 识别引擎输出的单个文字块（聚类前的最小单元）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    pub value: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// 置信度 [0, 100]
    pub confidence: f32,
}

impl TextToken {
    pub fn new(value: impl Into<String>, x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            value: value.into(),
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// 多行文本的拼接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    Space,
    Newline,
}

impl JoinStyle {
    pub fn separator(&self) -> &'static str {
        match self {
            JoinStyle::Space => " ",
            JoinStyle::Newline => "\n",
        }
    }
}

/// 聚类后的多行文本块（最终输出单元）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub value: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}
