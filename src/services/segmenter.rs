use crate::config::SegmenterConfig;
use crate::error::{ImportError, Result};
use crate::types::{file_stem, ChapterDraft, SegmentationResult};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

const BOM: char = '\u{FEFF}';

/// Splits decoded manuscript text into a title and numbered chapters.
pub struct ChapterSegmenter {
    heading_pattern: Regex,
    bracket_title_pattern: Regex,
    config: SegmenterConfig,
}

impl ChapterSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        let heading_pattern =
            Regex::new(r"^\s*第[一二三四五六七八九十百千零〇两0-9]+[卷章节回部幕话]").map_err(
                |e| ImportError::Pattern {
                    reason: format!("Invalid chapter heading pattern: {}", e),
                },
            )?;
        let bracket_title_pattern =
            Regex::new(r"^《(.+)》$").map_err(|e| ImportError::Pattern {
                reason: format!("Invalid title pattern: {}", e),
            })?;

        Ok(Self {
            heading_pattern,
            bracket_title_pattern,
            config,
        })
    }

    pub fn is_heading(&self, line: &str) -> bool {
        self.heading_pattern.is_match(line.trim())
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        let lowered = line.to_lowercase();
        self.config
            .deny_list
            .iter()
            .any(|needle| lowered.contains(&needle.to_lowercase()))
    }

    /// Deterministic for a given `text` and `file_name`.
    pub fn segment(&self, text: &str, file_name: Option<&str>) -> SegmentationResult {
        let lines: Vec<&str> = text.lines().map(|l| l.trim_start_matches(BOM)).collect();

        let (title, bracket_line) = self.detect_title(&lines);
        let detected_title = title.or_else(|| {
            file_name
                .map(file_stem)
                .map(str::trim)
                .filter(|stem| !stem.is_empty())
                .map(str::to_string)
        });

        let chapters = self.split_chapters(&lines, bracket_line, detected_title.as_deref());
        debug!(
            "Segmented {} lines into {} chapters (title: {:?})",
            lines.len(),
            chapters.len(),
            detected_title
        );

        SegmentationResult {
            detected_title,
            chapters,
        }
    }

    /// Returns the title and, when it came from a `《…》` line, that line's index.
    fn detect_title(&self, lines: &[&str]) -> (Option<String>, Option<usize>) {
        let mut provisional: Option<String> = None;

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || self.is_boilerplate(trimmed) {
                continue;
            }

            if let Some(captures) = self.bracket_title_pattern.captures(trimmed) {
                let inner = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                if !inner.is_empty() {
                    return (Some(inner.to_string()), Some(idx));
                }
            }

            if provisional.is_none() && trimmed.chars().count() <= self.config.max_title_chars {
                provisional = Some(trimmed.to_string());
            }
        }

        (provisional, None)
    }

    fn split_chapters(
        &self,
        lines: &[&str],
        bracket_line: Option<usize>,
        detected_title: Option<&str>,
    ) -> Vec<ChapterDraft> {
        let mut chapters: Vec<ChapterDraft> = Vec::new();
        let mut open_title: Option<&str> = None;
        let mut body: Vec<&str> = Vec::new();
        let mut seen_heading = false;

        for (idx, line) in lines.iter().copied().enumerate() {
            let trimmed = line.trim();

            if self.heading_pattern.is_match(trimmed) {
                if is_open(open_title, &body) {
                    chapters.push(close_chapter(chapters.len(), open_title, &body));
                }
                open_title = Some(trimmed);
                body.clear();
                seen_heading = true;
                continue;
            }

            // A bracketed title line ahead of the first heading is not prose.
            if !seen_heading && Some(idx) == bracket_line {
                continue;
            }

            body.push(line);
        }

        if !seen_heading {
            let whole = lines.join("\n");
            let whole = whole.trim();
            if whole.is_empty() {
                return Vec::new();
            }
            let title = detected_title
                .map(str::to_string)
                .unwrap_or_else(|| synthesized_title(1));
            return vec![ChapterDraft::new(1, title, whole)];
        }

        if is_open(open_title, &body) {
            chapters.push(close_chapter(chapters.len(), open_title, &body));
        }

        chapters
    }

    pub fn segmentation_stats(
        &self,
        result: &SegmentationResult,
    ) -> HashMap<String, serde_json::Value> {
        let mut stats = HashMap::new();

        let total_chapters = result.chapters.len();
        stats.insert("total_chapters".to_string(), total_chapters.into());

        let total_chars: usize = result
            .chapters
            .iter()
            .map(|c| c.content_data.text.chars().count())
            .sum();
        stats.insert("total_characters".to_string(), total_chars.into());

        let synthesized = result
            .chapters
            .iter()
            .filter(|c| c.title == synthesized_title(c.chapter_number as usize))
            .count();
        stats.insert("synthesized_titles".to_string(), synthesized.into());

        let avg_chars = if total_chapters > 0 {
            total_chars as f64 / total_chapters as f64
        } else {
            0.0
        };
        stats.insert("avg_chars_per_chapter".to_string(), avg_chars.into());

        stats
    }
}

impl Default for ChapterSegmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default()).expect("built-in patterns are valid")
    }
}

fn is_open(title: Option<&str>, body: &[&str]) -> bool {
    title.is_some() || body.iter().any(|l| !l.trim().is_empty())
}

fn close_chapter(emitted: usize, title: Option<&str>, body: &[&str]) -> ChapterDraft {
    let chapter_number = emitted + 1;
    let text = body.join("\n");
    let title = title
        .map(str::to_string)
        .unwrap_or_else(|| synthesized_title(chapter_number));
    ChapterDraft::new(chapter_number as u32, title, text.trim())
}

fn synthesized_title(chapter_number: usize) -> String {
    format!("第{}章", chapter_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> ChapterSegmenter {
        ChapterSegmenter::default()
    }

    #[test]
    fn test_heading_pattern() {
        let s = segmenter();
        assert!(s.is_heading("第一章 开始"));
        assert!(s.is_heading("  第12回 夜行"));
        assert!(s.is_heading("第两百零三节"));
        assert!(s.is_heading("第〇卷"));
        assert!(s.is_heading("第3话"));
        assert!(!s.is_heading("第一天很好"));
        assert!(!s.is_heading("这是第一章"));
        assert!(!s.is_heading("第章"));
    }

    #[test]
    fn test_bracket_title_and_single_heading() {
        let result = segmenter().segment("《示例书》\n第一章 开始\n今天天气很好", None);

        assert_eq!(result.detected_title.as_deref(), Some("示例书"));
        assert_eq!(result.chapters.len(), 1);
        assert_eq!(result.chapters[0].chapter_number, 1);
        assert_eq!(result.chapters[0].title, "第一章 开始");
        assert_eq!(result.chapters[0].content_data.text, "今天天气很好");
    }

    #[test]
    fn test_numbered_headings_split_in_order() {
        let result = segmenter().segment("第1章 A\nx\n第2章 B\ny", None);

        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[0].chapter_number, 1);
        assert_eq!(result.chapters[0].title, "第1章 A");
        assert_eq!(result.chapters[0].content_data.text, "x");
        assert_eq!(result.chapters[1].chapter_number, 2);
        assert_eq!(result.chapters[1].title, "第2章 B");
        assert_eq!(result.chapters[1].content_data.text, "y");
    }

    #[test]
    fn test_numbering_ignores_source_numbers() {
        let text = "第十章 甲\n一\n\n第三章 乙\n二\n第99章 丙\n三";
        let result = segmenter().segment(text, None);

        let numbers: Vec<u32> = result.chapters.iter().map(|c| c.chapter_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(result.chapters[2].title, "第99章 丙");
    }

    #[test]
    fn test_no_headings_yields_whole_document() {
        let text = "\n  开头一段\n\n结尾一段  \n";
        let result = segmenter().segment(text, Some("story.txt"));

        assert_eq!(result.chapters.len(), 1);
        assert_eq!(result.chapters[0].chapter_number, 1);
        assert_eq!(result.chapters[0].title, "开头一段");
        assert_eq!(result.chapters[0].content_data.text, "开头一段\n\n结尾一段");
    }

    #[test]
    fn test_blank_document_has_nothing_to_import() {
        let result = segmenter().segment(" \n\n\t\n", Some("empty.txt"));
        assert!(result.chapters.is_empty());
        assert_eq!(result.detected_title.as_deref(), Some("empty"));
    }

    #[test]
    fn test_later_bracket_title_overrides_provisional() {
        let text = "序言\n\n《远方的船》\n第一章 启航\n风很大";
        let result = segmenter().segment(text, None);
        assert_eq!(result.detected_title.as_deref(), Some("远方的船"));
    }

    #[test]
    fn test_boilerplate_lines_are_skipped_for_title() {
        let text = "本书来自 www.example.com\nTyped by someone\n\n山海旧事\n第一章\n内容";
        let result = segmenter().segment(text, None);

        assert_eq!(result.detected_title.as_deref(), Some("山海旧事"));
        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[1].title, "第一章");
    }

    #[test]
    fn test_boilerplate_lines_stay_in_preamble_body() {
        let text = "作者主页 www.example.com 欢迎来访\n这是开场白。\n第一章 正文\n内容";
        let result = segmenter().segment(text, None);

        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[0].title, "第1章");
        assert_eq!(
            result.chapters[0].content_data.text,
            "作者主页 www.example.com 欢迎来访\n这是开场白。"
        );
    }

    #[test]
    fn test_provisional_title_line_is_not_dropped() {
        let text = "很久以前，山里住着一位老人。\n第一章 出山\n他下山了。\n第二章 归来\n他回来了。";
        let result = segmenter().segment(text, None);

        assert_eq!(result.detected_title.as_deref(), Some("很久以前，山里住着一位老人。"));
        assert_eq!(result.chapters.len(), 3);
        assert_eq!(result.chapters[0].title, "第1章");
        assert_eq!(result.chapters[0].content_data.text, "很久以前，山里住着一位老人。");
        assert_eq!(result.chapters[1].content_data.text, "他下山了。");
        assert_eq!(result.chapters[2].content_data.text, "他回来了。");
    }

    #[test]
    fn test_long_first_line_is_not_a_title() {
        let long_line = "很".repeat(60);
        let text = format!("{}\n短标题\n正文", long_line);
        let result = segmenter().segment(&text, None);
        assert_eq!(result.detected_title.as_deref(), Some("短标题"));
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let long_line = "长".repeat(80);
        let result = segmenter().segment(&long_line, Some("uploads/my-novel.txt"));

        assert_eq!(result.detected_title.as_deref(), Some("my-novel"));
        assert_eq!(result.chapters[0].title, "my-novel");
    }

    #[test]
    fn test_leading_prose_gets_synthesized_title() {
        let text = "书名\n这是一段没有标题的开场白。\n第一章 正文\n内容";
        let result = segmenter().segment(text, None);

        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[0].title, "第1章");
        assert_eq!(result.chapters[0].content_data.text, "书名\n这是一段没有标题的开场白。");
        assert_eq!(result.chapters[1].chapter_number, 2);
        assert_eq!(result.chapters[1].title, "第一章 正文");
    }

    #[test]
    fn test_body_keeps_inner_line_breaks() {
        let text = "第一章 开始\r\n\u{3000}\u{3000}第一段\r\n\r\n\u{3000}\u{3000}第二段\r\n";
        let result = segmenter().segment(text, None);

        assert_eq!(
            result.chapters[0].content_data.text,
            "第一段\n\n\u{3000}\u{3000}第二段"
        );
    }

    #[test]
    fn test_empty_heading_chapter_is_kept() {
        let result = segmenter().segment("第一卷\n第一章 起\n正文", None);

        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[0].title, "第一卷");
        assert_eq!(result.chapters[0].content_data.text, "");
    }

    #[test]
    fn test_bom_is_stripped_from_lines() {
        let result = segmenter().segment("\u{FEFF}《题》\n第一章\n文", None);
        assert_eq!(result.detected_title.as_deref(), Some("题"));
    }

    #[test]
    fn test_segmentation_is_idempotent() {
        let text = "《远方的船》\n楔子\n第一章 启航\n风\n第二章 归来\n雨";
        let s = segmenter();
        assert_eq!(s.segment(text, Some("a.txt")), s.segment(text, Some("a.txt")));
    }

    #[test]
    fn test_custom_deny_entry() {
        let config = SegmenterConfig::default().with_extra_denied(["免费小说网"]);
        let s = ChapterSegmenter::new(config).unwrap();
        let result = s.segment("免费小说网整理\n真正的书名\n第一章\n文", None);
        assert_eq!(result.detected_title.as_deref(), Some("真正的书名"));
    }

    #[test]
    fn test_stats() {
        let s = segmenter();
        let result = s.segment("《引子》\n第一章\n甲乙\n第二章\n丙丁", None);
        let stats = s.segmentation_stats(&result);
        assert_eq!(stats["total_chapters"], 2);
        assert_eq!(stats["total_characters"], 4);
    }
}
