use std::fmt::Write;

use super::model::{Badge, BatchView, HistoryView, Meter, ResultCard, RulesView, StatsView};
use crate::domain::GarbageKind;

const RESET: &str = "\x1b[0m";

fn draw_meter(meter: &Meter) -> String {
    let mut bar = String::with_capacity(meter.width);
    for i in 0..meter.width {
        bar.push(if i < meter.filled { '█' } else { '░' });
    }
    bar
}

fn paint(badge: &Badge) -> String {
    format!("{}{}{}", badge.kind.color(), badge.label, RESET)
}

fn paint_meter(kind: GarbageKind, meter: &Meter) -> String {
    format!("{}{}{}", kind.color(), draw_meter(meter), RESET)
}

pub fn draw_result(card: &ResultCard) -> String {
    let mut out = String::new();
    if let Some(banner) = card.banner {
        let _ = writeln!(out, "[{banner}]");
    }
    let _ = writeln!(out, "{}  {}  「{}」", card.glyph, card.title, paint(&card.badge));
    if !card.reason.is_empty() {
        let _ = writeln!(out, "  {}: {}", card.reason_heading, card.reason);
    }
    if !card.suggestion.is_empty() {
        let _ = writeln!(out, "  {}: {}", card.suggestion_heading, card.suggestion);
    }
    if let Some(hint) = card.hint {
        let _ = writeln!(out, "  提示: {hint}");
    }

    if !card.predictions.is_empty() {
        let _ = writeln!(out, "  详细识别结果 (Top {}):", card.predictions.len());
        for row in &card.predictions {
            let _ = writeln!(
                out,
                "   {}. {} [{}] {:.1}%  「{}」 {}",
                row.rank + 1,
                row.object_name,
                draw_meter(&row.meter),
                row.confidence,
                paint(&row.badge),
                if row.classifiable { "✅" } else { "❌" }
            );
        }
    }

    let mut footer = card.timestamp.clone();
    if let Some(note) = &card.threshold_note {
        if !footer.is_empty() {
            footer.push_str("   ");
        }
        footer.push_str(note);
    }
    if !footer.is_empty() {
        let _ = writeln!(out, "  {footer}");
    }
    out
}

pub fn draw_history(view: &HistoryView) -> String {
    if view.lines.is_empty() {
        return "暂无分类记录\n".to_string();
    }
    let mut out = String::new();
    for line in &view.lines {
        let _ = writeln!(
            out,
            "{} {}  「{}」  {}",
            line.status,
            line.item_name,
            paint(&line.badge),
            line.timestamp
        );
    }
    out
}

pub fn draw_batch(view: &BatchView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "共处理 {} 个物品，成功分类 {} 个",
        view.total, view.successful
    );
    for line in &view.lines {
        let _ = writeln!(out, "{} {}  「{}」", line.status, line.item_name, paint(&line.badge));
        if !line.reason.is_empty() {
            let _ = writeln!(out, "   {}", line.reason);
        }
    }
    out
}

pub fn draw_rules(view: &RulesView) -> String {
    if view.rows.is_empty() {
        return "暂无规则\n".to_string();
    }
    let mut out = String::new();
    for row in &view.rows {
        let _ = writeln!(out, "{} {}  「{}」", row.icon, row.item_name, paint(&row.badge));
        let _ = writeln!(out, "   {}", row.reason);
    }
    let _ = writeln!(out, "共 {} 条规则", view.rows.len());
    out
}

pub fn draw_stats(view: &StatsView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "规则占比:");
    for row in &view.rows {
        let _ = writeln!(
            out,
            "  {} {} [{}] {:.1}%",
            row.icon,
            row.label,
            paint_meter(row.kind, &row.share),
            row.percentage
        );
    }
    let _ = writeln!(out, "规则数量:");
    for row in &view.rows {
        let _ = writeln!(
            out,
            "  {} {} [{}] {}",
            row.icon,
            row.label,
            paint_meter(row.kind, &row.magnitude),
            row.count
        );
    }
    let _ = writeln!(out, "共 {} 条规则", view.total_rules);
    out
}

#[cfg(test)]
mod tests {
    use super::super::model::{build_history_view, build_result_card, ResultMode};
    use super::*;
    use crate::api::types::ClassifyOutcome;

    #[test]
    fn meter_draws_filled_then_empty() {
        let meter = Meter { filled: 3, width: 5 };
        assert_eq!(draw_meter(&meter), "███░░");
    }

    #[test]
    fn empty_history_draws_the_empty_state() {
        assert_eq!(draw_history(&build_history_view(&[])), "暂无分类记录\n");
    }

    #[test]
    fn result_draw_contains_the_card_fields() {
        let outcome: ClassifyOutcome = serde_json::from_str(
            r#"{"success": true, "item_name": "电池", "garbage_type": "有害垃圾",
                "reason": "含有重金属", "suggestion": "投入红色有害垃圾桶", "icon": "☠️",
                "timestamp": "2025-11-03 10:00:00"}"#,
        )
        .unwrap();
        let text = draw_result(&build_result_card(&outcome, ResultMode::Text));
        assert!(text.contains("电池"));
        assert!(text.contains("有害垃圾"));
        assert!(text.contains("分类依据"));
        assert!(text.contains("2025-11-03 10:00:00"));
    }
}
