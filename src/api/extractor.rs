//! 视频文字提取器 - 抽帧、识别、聚类的一站式入口
//!
//! 采样阶段必须串行（seek 有状态，去重依赖上一保留帧），
//! 识别与聚类阶段各帧互相独立，放到 rayon 线程池并行，
//! 收集顺序保持时间戳顺序。

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::ocr::{JoinStyle, TextBlock, TextBlockClusterer, TokenRecognizer};
use crate::core::video::{
    FrameRecord, FrameSampler, FrameSource, HashProvider, ImageSink, SampleError, SampleStats,
    SamplerConfig, SharpnessProbe,
};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub sampler: SamplerConfig,
    /// 低于此置信度的 OCR token 丢弃
    pub min_confidence: f32,
    /// 多行文本块内行与行的拼接方式
    pub join_style: JoinStyle,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            min_confidence: 70.0,
            join_style: JoinStyle::Space,
        }
    }
}

/// 一张保留帧的识别结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameText {
    pub file: PathBuf,
    pub timestamp_ms: u64,
    pub text: Vec<TextBlock>,
}

/// 整次提取的输出：按时间戳排列的帧文本 + 采样统计
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub frames: Vec<FrameText>,
    pub stats: SampleStats,
}

impl ExtractionReport {
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// 对保留帧逐张识别并聚类。单帧识别失败降级为空结果并告警，不中断。
pub fn recognize_frames(
    records: &[FrameRecord],
    recognizer: &dyn TokenRecognizer,
    clusterer: &TextBlockClusterer,
) -> Vec<FrameText> {
    records
        .par_iter()
        .map(|record| {
            let tokens = match recognizer.recognize(&record.path) {
                Ok(tokens) => tokens,
                Err(err) => {
                    warn!("OCR failed for {}: {}", record.path.display(), err);
                    Vec::new()
                }
            };
            FrameText {
                file: record.path.clone(),
                timestamp_ms: record.timestamp_ms,
                text: clusterer.cluster(&tokens),
            }
        })
        .collect()
}

pub struct VideoTextExtractor {
    options: ExtractOptions,
}

impl VideoTextExtractor {
    pub fn new() -> Self {
        Self::with_options(ExtractOptions::default())
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        hasher: &dyn HashProvider,
        sharpness: &dyn SharpnessProbe,
        recognizer: &dyn TokenRecognizer,
        sink: &mut dyn ImageSink,
    ) -> Result<ExtractionReport, SampleError> {
        let sampler = FrameSampler::with_config(self.options.sampler.clone());
        let outcome = sampler.sample(source, hasher, sharpness, sink)?;

        info!("recognizing text in {} frames", outcome.records.len());
        let clusterer =
            TextBlockClusterer::new(self.options.min_confidence, self.options.join_style);
        let frames = recognize_frames(&outcome.records, recognizer, &clusterer);

        Ok(ExtractionReport {
            frames,
            stats: outcome.stats,
        })
    }
}

impl Default for VideoTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}
