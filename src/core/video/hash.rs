//! 感知哈希 - DCT 版 pHash
//!
//! 灰度图下采样到 32x32，做二维 DCT-II，取左上 8x8 低频系数，
//! 与中位数比较得到 64 位指纹。指纹间的距离为汉明距离。

use rustdct::{Dct2, DctPlanner};

use super::frame::Frame;

/// pHash 输入边长（下采样目标）
const HASH_INPUT: usize = 32;
/// 低频系数块边长，决定指纹位数（8x8 = 64 位）
const HASH_SIZE: usize = 8;

/// 一张图像的感知指纹
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// 汉明距离，对称，相同指纹距离为 0
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

pub trait HashProvider: Send + Sync {
    fn fingerprint(&self, frame: &Frame) -> Fingerprint;
}

/// 默认指纹实现：DCT pHash
pub struct DctHashProvider;

impl DctHashProvider {
    pub fn new() -> Self {
        Self
    }

    /// 块平均下采样到 HASH_INPUT x HASH_INPUT
    fn downsample(gray: &[u8], width: usize, height: usize) -> Vec<f32> {
        let n = HASH_INPUT;
        let mut out = Vec::with_capacity(n * n);

        for by in 0..n {
            let y0 = by * height / n;
            let y1 = ((by + 1) * height / n).max(y0 + 1).min(height);

            for bx in 0..n {
                let x0 = bx * width / n;
                let x1 = ((bx + 1) * width / n).max(x0 + 1).min(width);

                let mut sum = 0u32;
                let mut count = 0u32;
                for y in y0..y1 {
                    let row = y * width;
                    for x in x0..x1 {
                        if let Some(&v) = gray.get(row + x) {
                            sum += v as u32;
                            count += 1;
                        }
                    }
                }
                out.push(if count > 0 { sum as f32 / count as f32 } else { 0.0 });
            }
        }

        out
    }

    /// 二维 DCT-II：先行后列
    fn dct_2d(samples: &mut [f32]) {
        let n = HASH_INPUT;
        let mut planner: DctPlanner<f32> = DctPlanner::new();
        let dct = planner.plan_dct2(n);

        for row in samples.chunks_exact_mut(n) {
            dct.process_dct2(row);
        }

        let mut column = vec![0.0f32; n];
        for x in 0..n {
            for y in 0..n {
                column[y] = samples[y * n + x];
            }
            dct.process_dct2(&mut column);
            for y in 0..n {
                samples[y * n + x] = column[y];
            }
        }
    }
}

impl Default for DctHashProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HashProvider for DctHashProvider {
    fn fingerprint(&self, frame: &Frame) -> Fingerprint {
        let gray = frame.to_grayscale();
        let mut samples = Self::downsample(&gray, frame.width as usize, frame.height as usize);
        Self::dct_2d(&mut samples);

        // 左上 8x8 低频块
        let mut low_freq = [0.0f32; HASH_SIZE * HASH_SIZE];
        for y in 0..HASH_SIZE {
            for x in 0..HASH_SIZE {
                low_freq[y * HASH_SIZE + x] = samples[y * HASH_INPUT + x];
            }
        }

        let mut sorted = low_freq;
        sorted.sort_by(f32::total_cmp);
        let median = (sorted[31] + sorted[32]) / 2.0;

        let mut hash = 0u64;
        for (i, &coeff) in low_freq.iter().enumerate() {
            if coeff > median {
                hash |= 1 << i;
            }
        }

        Fingerprint(hash)
    }
}
