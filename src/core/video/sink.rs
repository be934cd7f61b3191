//! 保留帧的落盘

use std::fs;
use std::path::{Path, PathBuf};

use super::error::SampleError;
use super::frame::Frame;

pub trait ImageSink {
    /// 持久化一帧，返回其句柄（路径）。失败按 IO 错误向上传播。
    fn store(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<PathBuf, SampleError>;
}

/// 把保留帧写成 `{时间戳:07}.png`
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn create(dir: &Path) -> Result<Self, SampleError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl ImageSink for DirectorySink {
    fn store(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<PathBuf, SampleError> {
        let path = self.dir.join(format!("{:07}.png", timestamp_ms));
        let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| SampleError::BadFormat("invalid frame buffer".into()))?;
        img.save(&path)?;
        Ok(path)
    }
}
