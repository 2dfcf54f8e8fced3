//! 成绩/系数提取服务 - 业务能力层
//!
//! 只负责把一行评估的文本变成 [`GradeRecord`]，不接触文档树

use regex::Regex;

use crate::config::ScanProfile;
use crate::error::{AppError, AppResult};
use crate::models::GradeRecord;

const COEF_PATTERN: &str = r"(?i)\bcoef\.?\s*([0-9]+)";

/// 从页面中取出的一行评估文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemText {
    /// 整行文本，不含成绩/系数子节点的文本
    pub text: String,
    /// 成绩子节点文本（如果页面单独渲染了成绩）
    pub note_text: Option<String>,
    /// 系数子节点文本
    pub coef_text: Option<String>,
}

/// 成绩/系数提取器
///
/// 成绩记号：占位符，或 1~2 位整数加可选的 `.`/`,` 和 0~2 位小数，
/// 两侧必须是空白、冒号或文本边界。
/// 系数记号：`Coef`（不区分大小写，可带 `.`）后跟整数。
pub struct PatternExtractor {
    grade_re: Regex,
    coef_re: Regex,
    placeholder: String,
}

impl PatternExtractor {
    pub fn new(placeholder: &str) -> AppResult<Self> {
        let grade_pattern = if placeholder.is_empty() {
            r"[0-9]{1,2}(?:[.,][0-9]{0,2})?".to_string()
        } else {
            format!(r"{}|[0-9]{{1,2}}(?:[.,][0-9]{{0,2}})?", regex::escape(placeholder))
        };
        let grade_re =
            Regex::new(&grade_pattern).map_err(|e| AppError::invalid_pattern(&grade_pattern, e))?;
        let coef_re =
            Regex::new(COEF_PATTERN).map_err(|e| AppError::invalid_pattern(COEF_PATTERN, e))?;

        Ok(Self {
            grade_re,
            coef_re,
            placeholder: placeholder.to_string(),
        })
    }

    pub fn from_profile(profile: &ScanProfile) -> AppResult<Self> {
        Self::new(&profile.placeholder)
    }

    /// 解析一行完整文本（系数子节点的文本仍在其中）
    ///
    /// 先把系数文本从整行中剔除，再找成绩，避免系数的数字被当成成绩。
    /// 剔除时从行尾往前找、且只认完整记号，所以纯数字的系数不会切进成绩里。
    /// 找不到成绩 → `note = None`；找不到系数 → `coefficient = 1`。
    pub fn extract(&self, text: &str, coef_text: Option<&str>) -> GradeRecord {
        let mut main = text.to_string();
        let span = coef_text.map(str::trim).filter(|s| !s.is_empty());

        if let Some(span) = span {
            if let Some(start) = rfind_token(&main, span) {
                main.replace_range(start..start + span.len(), " ");
            }
        }

        self.record(main, span.and_then(|s| self.parse_coefficient(s)))
    }

    /// 解析一行评估；`item.text` 已不含成绩/系数子节点的文本，
    /// 有成绩子节点时成绩只从子节点取
    pub fn extract_item(&self, item: &ItemText) -> GradeRecord {
        let coefficient = item
            .coef_text
            .as_deref()
            .and_then(|s| self.parse_coefficient(s));
        let mut record = self.record(item.text.clone(), coefficient);
        if let Some(note_text) = &item.note_text {
            record.note = self.parse_note(note_text);
        }
        record
    }

    fn record(&self, mut main: String, coefficient: Option<u32>) -> GradeRecord {
        // 子节点文本与整行的空白不一定一致，整行里残留的系数也要剔除
        let found = self.coef_re.captures(&main).and_then(|c| {
            let range = c.get(0)?.range();
            let value = c.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            Some((range, value))
        });
        let mut coefficient = coefficient;
        if let Some((range, value)) = found {
            coefficient = coefficient.or(value);
            main.replace_range(range, " ");
        }

        GradeRecord {
            note: self.parse_note(&main),
            coefficient: coefficient.unwrap_or(1),
        }
    }

    /// 取最后一个成绩记号；占位符或无记号时为 `None`
    ///
    /// 评估名称（如 `DS 1`）通常在成绩之前，所以取最后一个。
    pub fn parse_note(&self, text: &str) -> Option<f64> {
        let token = self
            .grade_re
            .find_iter(text)
            .filter(|m| is_boundary(text[..m.start()].chars().next_back()))
            .filter(|m| is_boundary(text[m.end()..].chars().next()))
            .last()?
            .as_str();

        if token == self.placeholder {
            return None;
        }
        token.replace(',', ".").trim_end_matches('.').parse().ok()
    }

    /// `Coef N`，或整段只有一个整数（系数子节点常常只渲染数字）
    pub fn parse_coefficient(&self, text: &str) -> Option<u32> {
        match self.coef_re.captures(text) {
            Some(caps) => caps.get(1)?.as_str().parse().ok(),
            None => text.trim().parse().ok(),
        }
    }
}

/// 从后往前找 `needle`，要求两侧都是记号边界
fn rfind_token(haystack: &str, needle: &str) -> Option<usize> {
    let mut end = haystack.len();
    while let Some(start) = haystack[..end].rfind(needle) {
        let after = start + needle.len();
        if is_boundary(haystack[..start].chars().next_back())
            && is_boundary(haystack[after..].chars().next())
        {
            return Some(start);
        }
        if start == 0 {
            break;
        }
        end = start + needle.len() - 1;
        while !haystack.is_char_boundary(end) {
            end -= 1;
        }
    }
    None
}

fn is_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || c == ':',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new("~").unwrap()
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(extractor().parse_note("14,5"), Some(14.5));
        assert_eq!(extractor().parse_note("14.50"), Some(14.5));
        assert_eq!(extractor().parse_note("8."), Some(8.0));
    }

    #[test]
    fn test_placeholder_is_none() {
        assert_eq!(extractor().parse_note("~"), None);
        assert_eq!(extractor().extract("Examen ~ Coef. 4", None), GradeRecord::new(None, 4));
    }

    #[test]
    fn test_token_boundaries() {
        let e = extractor();
        assert_eq!(e.parse_note("Projet : 8,25"), Some(8.25));
        assert_eq!(e.parse_note("Projet:8,25"), Some(8.25));
        assert_eq!(e.parse_note("Note 123"), None);
        assert_eq!(e.parse_note("14.567"), None);
        assert_eq!(e.parse_note("DS1"), None);
        assert_eq!(e.parse_note("12/20"), None);
    }

    #[test]
    fn test_label_digits_before_grade() {
        let record = extractor().extract("DS 1\n12.5\nCoef. 2", None);
        assert_eq!(record, GradeRecord::new(Some(12.5), 2));
    }

    #[test]
    fn test_coefficient_span_is_removed_first() {
        let e = extractor();
        assert_eq!(
            e.extract("TP noté 15 Coef 3", Some("Coef 3")),
            GradeRecord::new(Some(15.0), 3)
        );
        // 只有系数，没有成绩：系数的数字不能被当成成绩
        assert_eq!(e.extract("Coef. 12", Some("Coef. 12")), GradeRecord::new(None, 12));
        assert_eq!(e.extract("Coef. 12", None), GradeRecord::new(None, 12));
    }

    #[test]
    fn test_coefficient_defaults_to_one() {
        let e = extractor();
        assert_eq!(e.extract("Rapport 16", None), GradeRecord::new(Some(16.0), 1));
        assert_eq!(e.extract("Rapport 16 x", Some("x")), GradeRecord::new(Some(16.0), 1));
        assert_eq!(e.extract("Oral 9 coef. 99999999999", None).coefficient, 1);
        assert_eq!(e.extract("Oral 9 COEF 0", None), GradeRecord::new(Some(9.0), 0));
    }

    #[test]
    fn test_numeric_coefficient_span() {
        let e = extractor();
        assert_eq!(e.extract("DS 12 2", Some("2")), GradeRecord::new(Some(12.0), 2));
        assert_eq!(e.extract("TP 2 14,5 3", Some("3")), GradeRecord::new(Some(14.5), 3));
        // 系数与成绩相同：剔除的是行尾那一个
        assert_eq!(e.extract("Oral 4 4", Some("4")), GradeRecord::new(Some(4.0), 4));
    }

    #[test]
    fn test_structural_item_text_keeps_grade() {
        let item = ItemText {
            text: "DS 2".to_string(),
            note_text: None,
            coef_text: Some("2".to_string()),
        };
        assert_eq!(extractor().extract_item(&item), GradeRecord::new(Some(2.0), 2));
    }

    #[test]
    fn test_note_span_overrides_text() {
        let item = ItemText {
            text: "SAE 2 Rendu 11,75 Coef. 5".to_string(),
            note_text: Some("11,75".to_string()),
            coef_text: Some("Coef. 5".to_string()),
        };
        assert_eq!(extractor().extract_item(&item), GradeRecord::new(Some(11.75), 5));

        let pending = ItemText {
            note_text: Some("~".to_string()),
            ..item
        };
        assert_eq!(extractor().extract_item(&pending), GradeRecord::new(None, 5));
    }
}
