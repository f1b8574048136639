use crate::api::types::{
    BatchClassifyResponse, ClassifyOutcome, GarbageTypeStat, ImageStatusResponse, PredictionEntry,
    Rule,
};
use crate::domain::{GarbageKind, HistoryEntry, UNKNOWN_ICON};

/// Character width of every meter bar the client draws.
pub const METER_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    Text,
    Image,
}

/// A category badge: the verbatim wire label plus the kind that decides its
/// visuals. Unrecognized labels keep their text but render as Other.
#[derive(Debug, Clone)]
pub struct Badge {
    pub label: String,
    pub kind: GarbageKind,
}

impl Badge {
    fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self {
            label: if trimmed.is_empty() {
                "未知".to_string()
            } else {
                trimmed.to_string()
            },
            kind: GarbageKind::from_label_or_other(label),
        }
    }
}

/// A proportional bar, pre-measured so the draw step only prints.
#[derive(Debug, Clone, Copy)]
pub struct Meter {
    pub filled: usize,
    pub width: usize,
}

impl Meter {
    pub fn percent(value: f64) -> Self {
        let clamped = value.clamp(0.0, 100.0);
        Self {
            filled: ((clamped / 100.0) * METER_WIDTH as f64).round() as usize,
            width: METER_WIDTH,
        }
    }

    pub fn scaled(value: u64, max: u64) -> Self {
        if max == 0 {
            return Self {
                filled: 0,
                width: METER_WIDTH,
            };
        }
        Self {
            filled: ((value as f64 / max as f64) * METER_WIDTH as f64).round() as usize,
            width: METER_WIDTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub rank: usize,
    pub object_name: String,
    pub confidence: f64,
    pub meter: Meter,
    pub badge: Badge,
    pub classifiable: bool,
}

#[derive(Debug, Clone)]
pub struct ResultCard {
    pub banner: Option<&'static str>,
    pub glyph: String,
    pub title: String,
    pub badge: Badge,
    pub reason_heading: &'static str,
    pub reason: String,
    pub suggestion_heading: &'static str,
    pub suggestion: String,
    pub hint: Option<&'static str>,
    pub predictions: Vec<PredictionRow>,
    pub timestamp: String,
    pub threshold_note: Option<String>,
}

/// Maps a classification outcome to its card. The branch is taken on the
/// `success` flag alone; everything else is presentation.
pub fn build_result_card(outcome: &ClassifyOutcome, mode: ResultMode) -> ResultCard {
    let confident = outcome.success;

    let badge = if confident {
        Badge::from_label(&outcome.garbage_type)
    } else {
        Badge {
            label: match mode {
                ResultMode::Text => "未知",
                ResultMode::Image => "无法分类",
            }
            .to_string(),
            kind: GarbageKind::Other,
        }
    };

    let banner = match (mode, confident) {
        (ResultMode::Text, _) => None,
        (ResultMode::Image, true) => Some("图片识别模式 - 使用深度学习模型识别垃圾类型"),
        (ResultMode::Image, false) => Some("图片识别模式 - 识别结果不确定"),
    };

    let hint = if confident {
        None
    } else {
        Some(match mode {
            ResultMode::Text => "建议咨询相关部门，或用 add-rule 将其添加到规则库",
            ResultMode::Image => "可以尝试调低置信度阈值、使用更清晰的图片，或改用文本分类",
        })
    };

    ResultCard {
        banner,
        glyph: if confident {
            outcome.icon.clone()
        } else {
            UNKNOWN_ICON.to_string()
        },
        title: outcome.display_name().to_string(),
        badge,
        reason_heading: if confident { "分类依据" } else { "说明" },
        reason: outcome.reason.clone(),
        suggestion_heading: if confident { "处理建议" } else { "建议" },
        suggestion: outcome.suggestion.clone(),
        hint,
        predictions: outcome
            .predictions
            .iter()
            .enumerate()
            .map(|(rank, entry)| build_prediction_row(rank, entry))
            .collect(),
        timestamp: outcome.timestamp.clone(),
        threshold_note: outcome
            .confidence_threshold
            .map(|threshold| format!("置信度阈值: {:.0}%", threshold * 100.0)),
    }
}

/// Rows keep the server's order; `can_classify` is independent of the
/// confidence value.
fn build_prediction_row(rank: usize, entry: &PredictionEntry) -> PredictionRow {
    PredictionRow {
        rank,
        object_name: entry.object_name.clone(),
        confidence: entry.confidence,
        meter: Meter::percent(entry.confidence),
        badge: Badge::from_label(&entry.garbage_type),
        classifiable: entry.can_classify,
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLine {
    pub status: &'static str,
    pub item_name: String,
    pub badge: Badge,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub lines: Vec<HistoryLine>,
}

pub fn build_history_view(entries: &[HistoryEntry]) -> HistoryView {
    HistoryView {
        lines: entries
            .iter()
            .map(|entry| HistoryLine {
                status: if entry.success { "✅" } else { "❌" },
                item_name: entry.item_name.clone(),
                badge: Badge::from_label(&entry.garbage_type),
                timestamp: entry.timestamp.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct BatchLine {
    pub status: &'static str,
    pub item_name: String,
    pub badge: Badge,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchView {
    pub total: usize,
    pub successful: usize,
    pub lines: Vec<BatchLine>,
}

pub fn build_batch_view(batch: &BatchClassifyResponse) -> BatchView {
    BatchView {
        total: batch.total,
        successful: batch.successful,
        lines: batch
            .results
            .iter()
            .map(|outcome| BatchLine {
                status: if outcome.success { "✅" } else { "❌" },
                item_name: outcome.display_name().to_string(),
                badge: Badge::from_label(&outcome.garbage_type),
                reason: outcome.reason.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct RuleRow {
    pub icon: String,
    pub item_name: String,
    pub badge: Badge,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RulesView {
    pub rows: Vec<RuleRow>,
}

pub fn build_rules_view<'a, I>(rules: I) -> RulesView
where
    I: IntoIterator<Item = &'a Rule>,
{
    RulesView {
        rows: rules
            .into_iter()
            .map(|rule| RuleRow {
                icon: rule.icon.clone(),
                item_name: rule.item_name.clone(),
                badge: Badge::from_label(&rule.garbage_type),
                reason: rule.reason.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct StatRow {
    pub icon: String,
    pub label: String,
    pub kind: GarbageKind,
    pub count: u64,
    pub percentage: f64,
    pub share: Meter,
    pub magnitude: Meter,
}

#[derive(Debug, Clone)]
pub struct StatsView {
    pub rows: Vec<StatRow>,
    pub total_rules: u64,
}

/// Both charts are keyed on the same ordered category list; share bars are
/// scaled to 100%, magnitude bars to the largest count.
pub fn build_stats_view(stats: &[GarbageTypeStat], total_rules: u64) -> StatsView {
    let max_count = stats.iter().map(|stat| stat.count).max().unwrap_or(0);
    StatsView {
        rows: stats
            .iter()
            .map(|stat| StatRow {
                icon: if stat.icon.is_empty() {
                    stat.kind().icon().to_string()
                } else {
                    stat.icon.clone()
                },
                label: stat.garbage_type.clone(),
                kind: stat.kind(),
                count: stat.count,
                percentage: stat.percentage,
                share: Meter::percent(stat.percentage),
                magnitude: Meter::scaled(stat.count, max_count),
            })
            .collect(),
        total_rules,
    }
}

/// The persistent image-feature status line.
pub fn status_line(status: &ImageStatusResponse) -> String {
    if status.available {
        format!(
            "✅ 图片识别功能已启用，模型{}",
            if status.model_loaded {
                "已加载"
            } else {
                "待加载"
            }
        )
    } else if status.required_packages.is_empty() {
        format!("⚠️ {}", status.message)
    } else {
        format!(
            "⚠️ 图片识别功能不可用。需要安装: {}",
            status.required_packages.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, garbage_type: &str) -> ClassifyOutcome {
        serde_json::from_str(&format!(
            r#"{{"success": {success}, "item_name": "测试", "garbage_type": "{garbage_type}",
                "reason": "r", "suggestion": "s", "icon": "♻️", "timestamp": "2025-11-03 10:00:00"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn meter_scales_and_clamps() {
        assert_eq!(Meter::percent(0.0).filled, 0);
        assert_eq!(Meter::percent(100.0).filled, METER_WIDTH);
        assert_eq!(Meter::percent(150.0).filled, METER_WIDTH);
        assert_eq!(Meter::percent(-5.0).filled, 0);
        assert_eq!(Meter::percent(50.0).filled, METER_WIDTH / 2);
        assert_eq!(Meter::scaled(3, 0).filled, 0);
        assert_eq!(Meter::scaled(2, 4).filled, METER_WIDTH / 2);
    }

    #[test]
    fn confident_card_keeps_the_server_badge() {
        let card = build_result_card(&outcome(true, "可回收垃圾"), ResultMode::Text);
        assert_eq!(card.badge.label, "可回收垃圾");
        assert_eq!(card.badge.kind, GarbageKind::Recyclable);
        assert_eq!(card.glyph, "♻️");
        assert_eq!(card.reason_heading, "分类依据");
        assert!(card.hint.is_none());
    }

    #[test]
    fn uncertain_card_renders_the_unknown_branch() {
        let card = build_result_card(&outcome(false, ""), ResultMode::Text);
        assert_eq!(card.badge.label, "未知");
        assert_eq!(card.badge.kind, GarbageKind::Other);
        assert_eq!(card.glyph, UNKNOWN_ICON);
        assert_eq!(card.reason_heading, "说明");
        assert!(card.hint.is_some());
    }

    #[test]
    fn unrecognized_type_maps_to_other_without_losing_its_label() {
        let card = build_result_card(&outcome(true, "大型垃圾"), ResultMode::Image);
        assert_eq!(card.badge.label, "大型垃圾");
        assert_eq!(card.badge.kind, GarbageKind::Other);
    }

    #[test]
    fn prediction_rows_keep_server_order() {
        let json = r#"{
            "success": true, "object_name": "塑料瓶", "garbage_type": "可回收垃圾",
            "icon": "♻️", "confidence_threshold": 0.1,
            "predictions": [
                {"object_name": "塑料瓶", "confidence": 87.5, "garbage_type": "可回收垃圾", "can_classify": true},
                {"object_name": "玻璃杯", "confidence": 8.1, "garbage_type": "可回收垃圾", "can_classify": false}
            ]
        }"#;
        let outcome: ClassifyOutcome = serde_json::from_str(json).unwrap();
        let card = build_result_card(&outcome, ResultMode::Image);
        assert_eq!(card.predictions.len(), 2);
        assert_eq!(card.predictions[0].rank, 0);
        assert_eq!(card.predictions[0].object_name, "塑料瓶");
        assert!(!card.predictions[1].classifiable);
        assert_eq!(card.threshold_note.as_deref(), Some("置信度阈值: 10%"));
    }

    #[test]
    fn status_line_matches_both_branches() {
        let available: ImageStatusResponse = serde_json::from_str(
            r#"{"available": true, "model_loaded": true, "message": "", "required_packages": []}"#,
        )
        .unwrap();
        assert_eq!(status_line(&available), "✅ 图片识别功能已启用，模型已加载");

        let missing: ImageStatusResponse = serde_json::from_str(
            r#"{"available": false, "model_loaded": false, "message": "图片识别功能不可用，请安装依赖",
                "required_packages": ["torch", "transformers", "pillow"]}"#,
        )
        .unwrap();
        assert_eq!(
            status_line(&missing),
            "⚠️ 图片识别功能不可用。需要安装: torch, transformers, pillow"
        );
    }

    #[test]
    fn empty_history_builds_an_empty_view() {
        assert!(build_history_view(&[]).lines.is_empty());
    }
}
