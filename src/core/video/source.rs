//! 帧源抽象
//!
//! 解码器本身是外部协作方，这里只约定按时间戳取帧的契约。
//! `ImageSequenceSource` 把一个静帧目录当作帧源，用于处理已抽出的帧序列。

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::SampleError;
use super::frame::Frame;

pub trait FrameSource {
    /// 源的总时长（毫秒）
    fn duration_ms(&self) -> u64;

    /// 取时间戳处（或其附近）的一帧；流结束返回 None。
    /// 调用方保证时间戳单调递增地 seek。
    fn read_at(&mut self, timestamp_ms: u64) -> Option<Frame>;
}

/// 静帧目录帧源
///
/// 目录下的文件名以时间戳开头（如 `0001500.png`、`0001500_s3_stable.png`），
/// `read_at` 返回不晚于请求时间戳的最近一帧。
#[derive(Debug)]
pub struct ImageSequenceSource {
    /// (时间戳, 文件路径)，按时间戳升序
    entries: Vec<(u64, PathBuf)>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, SampleError> {
        if !dir.is_dir() {
            return Err(SampleError::NotFound(dir.to_path_buf()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_image = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("png") | Some("jpg") | Some("jpeg") | Some("bmp")
            );
            if !is_image {
                continue;
            }
            if let Some(ts) = Self::parse_timestamp(&path) {
                entries.push((ts, path));
            }
        }

        if entries.is_empty() {
            return Err(SampleError::BadFormat(format!(
                "no frame images in {}",
                dir.display()
            )));
        }

        entries.sort_by_key(|(ts, _)| *ts);
        debug!("opened image sequence: {} frames", entries.len());
        Ok(Self { entries })
    }

    /// 文件名前缀的数字即时间戳
    fn parse_timestamp(path: &Path) -> Option<u64> {
        let stem = path.file_stem()?.to_str()?;
        let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

impl FrameSource for ImageSequenceSource {
    fn duration_ms(&self) -> u64 {
        self.entries.last().map(|(ts, _)| *ts).unwrap_or(0)
    }

    fn read_at(&mut self, timestamp_ms: u64) -> Option<Frame> {
        // 不晚于请求时间戳的最后一帧
        let idx = self
            .entries
            .partition_point(|(ts, _)| *ts <= timestamp_ms)
            .checked_sub(1)?;
        let (ts, path) = &self.entries[idx];

        // 单帧解码失败等同流结束，不向上传播
        let img = image::open(path).ok()?.to_rgba8();
        Some(Frame::new(img.width(), img.height(), img.into_raw(), *ts))
    }
}
