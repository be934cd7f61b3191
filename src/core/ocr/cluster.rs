//! 文本块聚类 - 两阶段空间聚类
//!
//! 阶段一：把零散 token 横向聚成行。按 x 升序挑种子，候选 token 只要与行内
//! **任意**成员满足（纵向接近、高度相当、横向间距小）即可入行，
//! 因此一行可以经由中间成员传递式地吸收远端 token。
//!
//! 阶段二：把行纵向聚成段。自上而下，候选行只与块内**最近加入**的行比较
//! （纵向间隙、横向投影重叠、高度相当），遇到第一个不满足的行即封块——
//! 段落行在纵向上是连续的。

use log::debug;

use super::token::{JoinStyle, TextBlock, TextToken};

/// 行内聚类的最大纵向偏移（像素）
const MAX_BASELINE_DRIFT: u32 = 10;
/// 同行/同段成员的最大高度比
const MAX_HEIGHT_RATIO: f32 = 1.5;
/// 行内 token 的最大横向间距（像素）
const MAX_TOKEN_GAP: u32 = 100;
/// 段内相邻行的最大纵向间隙（像素，含边界）
const MAX_LINE_GAP: i64 = 15;

/// 阶段一的中间产物：一行文字
#[derive(Debug, Clone)]
struct LineBlock {
    value: String,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    confidence: f32,
}

impl LineBlock {
    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

pub struct TextBlockClusterer {
    /// 低于此置信度的 token 直接丢弃
    min_confidence: f32,
    join_style: JoinStyle,
}

impl TextBlockClusterer {
    pub fn new(min_confidence: f32, join_style: JoinStyle) -> Self {
        Self {
            min_confidence,
            join_style,
        }
    }

    /// 把无序 token 集聚成阅读顺序（上到下，行内左到右）的文本块。
    /// 对固定输入与遍历顺序，输出是确定的。
    pub fn cluster(&self, tokens: &[TextToken]) -> Vec<TextBlock> {
        // 预处理：去掉低置信度与空白 token，文本去首尾空白
        let tokens: Vec<TextToken> = tokens
            .iter()
            .filter(|t| t.confidence >= self.min_confidence)
            .filter_map(|t| {
                let trimmed = t.value.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let mut kept = t.clone();
                kept.value = trimmed.to_string();
                Some(kept)
            })
            .collect();

        if tokens.is_empty() {
            return Vec::new();
        }

        let lines = Self::assemble_lines(&tokens);
        debug!("clustered {} tokens into {} lines", tokens.len(), lines.len());
        self.assemble_blocks(&lines)
    }

    /// 阶段一：token -> 行
    fn assemble_lines(tokens: &[TextToken]) -> Vec<LineBlock> {
        let n = tokens.len();
        let mut seed_order: Vec<usize> = (0..n).collect();
        seed_order.sort_by_key(|&i| tokens[i].x);

        let mut used = vec![false; n];
        let mut lines: Vec<LineBlock> = Vec::new();

        for &seed in &seed_order {
            if used[seed] {
                continue;
            }
            used[seed] = true;
            let mut members = vec![seed];

            // 候选按输入顺序扫描；行在扫描中增长，后续候选可经新成员入行
            for j in 0..n {
                if used[j] {
                    continue;
                }
                if members
                    .iter()
                    .any(|&m| Self::same_line(&tokens[j], &tokens[m]))
                {
                    used[j] = true;
                    members.push(j);
                }
            }

            members.sort_by_key(|&i| tokens[i].x);
            lines.push(Self::build_line(tokens, &members));
        }

        // 行按最小 y 排序（稳定排序，保证确定性）
        lines.sort_by_key(|line| line.y);
        lines
    }

    fn same_line(a: &TextToken, b: &TextToken) -> bool {
        a.y.abs_diff(b.y) <= MAX_BASELINE_DRIFT
            && heights_comparable(a.height, b.height)
            && span_gap(a.x, a.right(), b.x, b.right()) < MAX_TOKEN_GAP
    }

    fn build_line(tokens: &[TextToken], members: &[usize]) -> LineBlock {
        let min_x = members.iter().map(|&i| tokens[i].x).min().unwrap_or(0);
        let min_y = members.iter().map(|&i| tokens[i].y).min().unwrap_or(0);
        let max_right = members.iter().map(|&i| tokens[i].right()).max().unwrap_or(0);
        let max_bottom = members.iter().map(|&i| tokens[i].bottom()).max().unwrap_or(0);

        let value = members
            .iter()
            .map(|&i| tokens[i].value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let confidence =
            members.iter().map(|&i| tokens[i].confidence).sum::<f32>() / members.len() as f32;

        LineBlock {
            value,
            x: min_x,
            y: min_y,
            width: max_right - min_x,
            height: max_bottom - min_y,
            confidence,
        }
    }

    /// 阶段二：行 -> 块
    fn assemble_blocks(&self, lines: &[LineBlock]) -> Vec<TextBlock> {
        let n = lines.len();
        let mut used = vec![false; n];
        let mut blocks = Vec::new();

        for i in 0..n {
            if used[i] {
                continue;
            }
            used[i] = true;
            let mut group = vec![i];

            for j in i + 1..n {
                if used[j] {
                    continue;
                }
                let last = &lines[group[group.len() - 1]];
                if Self::joins_block(last, &lines[j]) {
                    used[j] = true;
                    group.push(j);
                } else {
                    // 纵向连续性一旦中断即封块
                    break;
                }
            }

            blocks.push(self.build_block(lines, &group));
        }

        blocks
    }

    /// 候选行只与块内最后加入的行比较
    fn joins_block(last: &LineBlock, next: &LineBlock) -> bool {
        let gap = next.y as i64 - last.bottom() as i64;
        gap <= MAX_LINE_GAP
            && spans_overlap(last.x, last.right(), next.x, next.right())
            && heights_comparable(last.height, next.height)
    }

    fn build_block(&self, lines: &[LineBlock], group: &[usize]) -> TextBlock {
        let min_x = group.iter().map(|&i| lines[i].x).min().unwrap_or(0);
        let min_y = group.iter().map(|&i| lines[i].y).min().unwrap_or(0);
        let max_right = group.iter().map(|&i| lines[i].right()).max().unwrap_or(0);
        let max_bottom = group.iter().map(|&i| lines[i].bottom()).max().unwrap_or(0);

        let value = group
            .iter()
            .map(|&i| lines[i].value.as_str())
            .collect::<Vec<_>>()
            .join(self.join_style.separator());
        let confidence =
            group.iter().map(|&i| lines[i].confidence).sum::<f32>() / group.len() as f32;

        TextBlock {
            value,
            x: min_x,
            y: min_y,
            width: max_right - min_x,
            height: max_bottom - min_y,
            confidence,
        }
    }
}

impl Default for TextBlockClusterer {
    fn default() -> Self {
        Self::new(70.0, JoinStyle::Space)
    }
}

/// 两个横向区间的间距：有重叠为 0，否则为最近边缘的距离
fn span_gap(left_a: u32, right_a: u32, left_b: u32, right_b: u32) -> u32 {
    if right_a <= left_b {
        left_b - right_a
    } else if right_b <= left_a {
        left_a - right_b
    } else {
        0
    }
}

/// 横向投影是否有严格大于零的重叠
fn spans_overlap(left_a: u32, right_a: u32, left_b: u32, right_b: u32) -> bool {
    right_a.min(right_b) > left_a.max(left_b)
}

/// 高度比 max/min <= 1.5；零高度退化为要求两者相等
fn heights_comparable(a: u32, b: u32) -> bool {
    let (min, max) = if a <= b { (a, b) } else { (b, a) };
    if min == 0 {
        a == b
    } else {
        max as f32 / min as f32 <= MAX_HEIGHT_RATIO
    }
}
