use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines, Stdin};

use crate::{
    api::types::{ClassifyOutcome, ImageStatusResponse, RuleDraft},
    api::{split_batch_input, ApiClient, ApiError},
    cli::{Command, HistoryAction, RuleAction},
    db::history::{HistoryRepository, VISIBLE_HISTORY},
    domain::{now_stamp, GarbageKind, HistoryEntry},
    render,
    rules::RuleManager,
    stats,
};

const HELP_TEXT: &str = "\
可用命令:
  classify <物品名称>           分类单个物品
  batch <物品> <物品> ...       批量分类
  image <图片路径> [阈值%]      图片识别分类
  history                       最近 10 条历史记录
  clear-history                 清空历史记录
  rules                         重新拉取并列出全部规则
  search <关键词>               在已缓存规则中搜索
  kind <类型>                   按垃圾类型筛选缓存规则
  add-rule <名称> <类型> <依据>  添加规则
  edit-rule <名称> <类型> <依据> 编辑规则
  delete-rule <名称>            删除规则
  stats                         分类统计
  status                        图片识别功能状态
  help                          显示本帮助
  quit                          退出";

/// Owns everything a run needs: the API client, the local history log, the
/// rule cache, and the last known image-feature status. Requests are always
/// dispatched one at a time, so a stale response can never overwrite a
/// newer one.
pub struct Session {
    api: ApiClient,
    history: HistoryRepository,
    rules: RuleManager,
    image_status: String,
    tz: Tz,
    default_threshold_pct: f64,
}

impl Session {
    pub fn new(
        api: ApiClient,
        history: HistoryRepository,
        tz: Tz,
        default_threshold_pct: f64,
    ) -> Self {
        Self {
            api,
            history,
            rules: RuleManager::new(),
            image_status: "图片识别功能状态未知".to_string(),
            tz,
            default_threshold_pct,
        }
    }

    pub async fn close(&self) {
        self.history.close().await;
    }

    pub async fn run_once(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Classify { item } => self.handle_classify(&item).await,
            Command::Batch { items, file } => {
                let items = if !items.is_empty() {
                    split_batch_input(&items.join("\n"))
                } else if let Some(path) = file {
                    let raw = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("无法读取文件 {}", path.display()))?;
                    split_batch_input(&raw)
                } else {
                    let mut raw = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut raw)
                        .await
                        .context("无法读取标准输入")?;
                    split_batch_input(&raw)
                };
                self.handle_batch(&items).await
            }
            Command::Image { path, threshold } => self.handle_image(&path, threshold).await,
            Command::History { action: None, limit } => self.handle_history(limit).await,
            Command::History {
                action: Some(HistoryAction::Clear { yes }),
                ..
            } => {
                let confirmed = yes || confirm_blocking("确定要清空所有历史记录吗？");
                self.handle_clear_history(confirmed).await
            }
            Command::Rules {
                action: None,
                search,
                kind,
            } => {
                let kind = match parse_kind(kind.as_deref()) {
                    Ok(kind) => kind,
                    Err(notice) => {
                        println!("⚠️ {notice}");
                        return Ok(());
                    }
                };
                self.handle_rules_list(&search, kind, true).await
            }
            Command::Rules {
                action: Some(action),
                ..
            } => match action {
                RuleAction::Add {
                    item_name,
                    garbage_type,
                    reason,
                } => {
                    self.handle_rule_save(false, draft(item_name, garbage_type, reason))
                        .await
                }
                RuleAction::Edit {
                    item_name,
                    garbage_type,
                    reason,
                } => {
                    self.handle_rule_save(true, draft(item_name, garbage_type, reason))
                        .await
                }
                RuleAction::Delete { item_name, yes } => {
                    let confirmed =
                        yes || confirm_blocking(&format!("确定要删除规则 \"{item_name}\" 吗？"));
                    self.handle_rule_delete(&item_name, confirmed).await
                }
            },
            Command::Stats => self.handle_stats().await,
            Command::Status => {
                self.probe_status().await;
                println!("{}", self.image_status);
                Ok(())
            }
        }
    }

    pub async fn run_interactive(&mut self) -> Result<()> {
        self.startup().await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt();
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            };
            let Some(line) = line else { break };
            if !self.dispatch(&mut lines, line.trim()).await? {
                break;
            }
        }
        println!("再见!");
        Ok(())
    }

    /// Entry warm-up: history, rule cache, statistics, image feature probe.
    async fn startup(&mut self) {
        println!("智能垃圾分类助手  {}", now_stamp(&self.tz));
        if let Ok(total) = self.history.count().await {
            if total > 0 {
                println!("历史记录: {total} 条");
            }
        }
        self.show_recent().await;
        match self.rules.refresh(&self.api).await {
            Ok(total) => println!("规则库: {total} 条规则"),
            Err(err) => tracing::warn!(target: "api", error = %err, "加载规则失败"),
        }
        if let Err(err) = self.api.fetch_statistics().await {
            tracing::warn!(target: "api", error = %err, "加载统计信息失败");
        }
        self.probe_status().await;
        println!("{}", self.image_status);
        println!("输入 help 查看命令");
    }

    async fn dispatch(
        &mut self,
        lines: &mut Lines<BufReader<Stdin>>,
        input: &str,
    ) -> Result<bool> {
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" => return Ok(false),
            "help" => println!("{HELP_TEXT}"),
            "classify" => self.handle_classify(rest).await?,
            "batch" => {
                let items: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                self.handle_batch(&items).await?;
            }
            "image" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                match parts.as_slice() {
                    [path] => self.handle_image(Path::new(path), None).await?,
                    [path, pct] => match pct.parse::<f64>() {
                        Ok(pct) => self.handle_image(Path::new(path), Some(pct)).await?,
                        Err(_) => println!("⚠️ 阈值必须是 0-100 的数字"),
                    },
                    _ => println!("⚠️ 用法: image <图片路径> [阈值%]"),
                }
            }
            "history" => self.handle_history(VISIBLE_HISTORY).await?,
            "clear-history" => {
                let confirmed = confirm(lines, "确定要清空所有历史记录吗？").await?;
                self.handle_clear_history(confirmed).await?;
            }
            "rules" => self.handle_rules_list("", None, true).await?,
            "search" => self.handle_rules_list(rest, None, false).await?,
            "kind" => match parse_kind(Some(rest)) {
                Ok(kind) => self.handle_rules_list("", kind, false).await?,
                Err(notice) => println!("⚠️ {notice}"),
            },
            "add-rule" | "edit-rule" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() < 3 {
                    println!("⚠️ 用法: {command} <名称> <类型> <依据>");
                } else {
                    self.handle_rule_save(
                        command == "edit-rule",
                        draft(
                            parts[0].to_string(),
                            parts[1].to_string(),
                            parts[2..].join(" "),
                        ),
                    )
                    .await?;
                }
            }
            "delete-rule" => {
                if rest.is_empty() {
                    println!("⚠️ 用法: delete-rule <名称>");
                } else {
                    let confirmed =
                        confirm(lines, &format!("确定要删除规则 \"{rest}\" 吗？")).await?;
                    self.handle_rule_delete(rest, confirmed).await?;
                }
            }
            "stats" => self.handle_stats().await?,
            "status" => {
                self.probe_status().await;
                println!("{}", self.image_status);
            }
            _ => println!("⚠️ 未知命令: {command}，输入 help 查看命令"),
        }
        Ok(true)
    }

    async fn handle_classify(&mut self, raw: &str) -> Result<()> {
        match self.api.classify_text(raw).await {
            Ok(outcome) => {
                let card = render::build_result_card(&outcome, render::ResultMode::Text);
                print!("{}", render::draw_result(&card));
                tracing::info!(target: "api", item = %outcome.display_name(), garbage_type = %outcome.garbage_type, "分类完成");
                self.record(&outcome, None).await;
                self.show_recent().await;
            }
            Err(err) => self.notice(&err),
        }
        Ok(())
    }

    async fn handle_batch(&mut self, items: &[String]) -> Result<()> {
        match self.api.batch_classify(items).await {
            Ok(batch) => {
                let view = render::build_batch_view(&batch);
                print!("{}", render::draw_batch(&view));
                for outcome in &batch.results {
                    self.record(outcome, Some(&batch.timestamp)).await;
                }
                self.show_recent().await;
            }
            Err(err) => self.notice(&err),
        }
        Ok(())
    }

    async fn handle_image(&mut self, path: &Path, threshold_pct: Option<f64>) -> Result<()> {
        let threshold = threshold_pct.unwrap_or(self.default_threshold_pct) / 100.0;
        match self.api.classify_image(path, threshold).await {
            Ok(outcome) => {
                let card = render::build_result_card(&outcome, render::ResultMode::Image);
                print!("{}", render::draw_result(&card));
                println!("图片识别完成");
                if outcome.success {
                    self.record(&outcome, None).await;
                    self.show_recent().await;
                }
            }
            Err(ApiError::FeatureUnavailable { message }) => {
                // 503 also updates the persistent status line, not just the
                // transient notice.
                self.image_status = format!("⚠️ {message}");
                println!("⚠️ 图片识别功能不可用：{message}");
            }
            Err(err) => self.notice(&err),
        }
        Ok(())
    }

    async fn handle_history(&self, limit: i64) -> Result<()> {
        let entries = match self.history.recent(limit).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(target: "db", error = %err, "读取历史记录失败");
                Vec::new()
            }
        };
        print!("{}", render::draw_history(&render::build_history_view(&entries)));
        Ok(())
    }

    async fn handle_clear_history(&mut self, confirmed: bool) -> Result<()> {
        if !confirmed {
            println!("已取消");
            return Ok(());
        }
        match self.history.clear().await {
            Ok(_) => println!("历史记录已清空"),
            Err(err) => {
                tracing::warn!(target: "db", error = %err, "清空历史记录失败");
                println!("❌ 清空历史记录失败");
            }
        }
        Ok(())
    }

    async fn handle_rules_list(
        &mut self,
        search: &str,
        kind: Option<GarbageKind>,
        refetch: bool,
    ) -> Result<()> {
        if refetch || self.rules.rules().is_empty() {
            if let Err(err) = self.rules.refresh(&self.api).await {
                self.notice(&err);
                return Ok(());
            }
        }
        let filtered = self.rules.filter(search, kind);
        print!("{}", render::draw_rules(&render::build_rules_view(filtered)));
        Ok(())
    }

    async fn handle_rule_save(&mut self, edit: bool, draft: RuleDraft) -> Result<()> {
        if edit {
            if self.rules.rules().is_empty() {
                if let Err(err) = self.rules.refresh(&self.api).await {
                    self.notice(&err);
                    return Ok(());
                }
            }
            if self.rules.begin_edit(&draft.item_name).is_none() {
                println!("⚠️ 未找到规则: {}", draft.item_name);
                return Ok(());
            }
        } else {
            self.rules.begin_create();
        }

        match self.rules.save(&self.api, &draft).await {
            Ok(confirmation) => {
                let fallback = if edit { "规则更新成功" } else { "规则添加成功" };
                println!(
                    "{}",
                    if confirmation.message.is_empty() {
                        fallback
                    } else {
                        confirmation.message.as_str()
                    }
                );
            }
            Err(err) => self.notice(&err),
        }
        Ok(())
    }

    async fn handle_rule_delete(&mut self, item_name: &str, confirmed: bool) -> Result<()> {
        if !confirmed {
            println!("已取消");
            return Ok(());
        }
        match self.rules.delete(&self.api, item_name).await {
            Ok(confirmation) => {
                println!(
                    "{}",
                    if confirmation.message.is_empty() {
                        "规则删除成功"
                    } else {
                        confirmation.message.as_str()
                    }
                );
            }
            Err(err) => self.notice(&err),
        }
        Ok(())
    }

    async fn handle_stats(&self) -> Result<()> {
        match stats::present(&self.api).await {
            Ok(text) => print!("{text}"),
            Err(err) => {
                tracing::warn!(target: "api", error = %err, "加载统计信息失败");
                self.notice(&err);
            }
        }
        Ok(())
    }

    async fn probe_status(&mut self) {
        let probe = self.api.image_status().await;
        self.image_status = apply_probe(std::mem::take(&mut self.image_status), probe);
    }

    /// Appends a completed classification to the local log. Storage
    /// failures degrade to "no history", they never interrupt the flow.
    async fn record(&self, outcome: &ClassifyOutcome, stamp_override: Option<&str>) {
        let entry = entry_from_outcome(outcome, stamp_override, &now_stamp(&self.tz));
        if let Err(err) = self.history.append(&entry).await {
            tracing::warn!(target: "db", error = %err, item = %entry.item_name, "历史记录写入失败");
        }
    }

    async fn show_recent(&self) {
        let entries = match self.history.recent(VISIBLE_HISTORY).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(target: "db", error = %err, "读取历史记录失败");
                Vec::new()
            }
        };
        println!("最近记录:");
        print!("{}", render::draw_history(&render::build_history_view(&entries)));
    }

    fn notice(&self, err: &ApiError) {
        match err {
            ApiError::Invalid(message) => println!("⚠️ {message}"),
            ApiError::Server { status, message } => {
                tracing::warn!(target: "api", status, "服务端返回错误: {message}");
                println!("❌ {message}");
            }
            ApiError::FeatureUnavailable { .. } => println!("⚠️ {err}"),
            ApiError::Network(source) => {
                tracing::error!(target: "api", error = %source, "网络请求失败");
                println!("❌ {err}");
            }
        }
    }
}

fn entry_from_outcome(
    outcome: &ClassifyOutcome,
    stamp_override: Option<&str>,
    fallback_stamp: &str,
) -> HistoryEntry {
    let timestamp = if !outcome.timestamp.is_empty() {
        outcome.timestamp.clone()
    } else {
        stamp_override
            .filter(|stamp| !stamp.is_empty())
            .unwrap_or(fallback_stamp)
            .to_string()
    };
    HistoryEntry {
        item_name: outcome.display_name().to_string(),
        garbage_type: outcome.garbage_type.clone(),
        success: outcome.success,
        timestamp,
        icon: outcome.icon.clone(),
    }
}

/// A failed probe keeps the previously displayed status untouched.
fn apply_probe(previous: String, probe: Result<ImageStatusResponse, ApiError>) -> String {
    match probe {
        Ok(status) => render::status_line(&status),
        Err(err) => {
            tracing::warn!(target: "api", error = %err, "检查图片功能状态失败");
            previous
        }
    }
}

fn draft(item_name: String, garbage_type: String, reason: String) -> RuleDraft {
    RuleDraft {
        item_name,
        garbage_type,
        reason,
    }
}

fn parse_kind(value: Option<&str>) -> Result<Option<GarbageKind>, String> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => GarbageKind::from_alias(raw)
            .map(Some)
            .ok_or_else(|| format!("未知的垃圾类型: {raw}")),
    }
}

fn prompt() {
    print!("laji> ");
    let _ = std::io::stdout().flush();
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, prompt_text: &str) -> Result<bool> {
    print!("{prompt_text} (y/N): ");
    let _ = std::io::stdout().flush();
    let answer = lines.next_line().await?;
    Ok(matches!(
        answer.as_deref().map(str::trim),
        Some("y") | Some("Y") | Some("yes")
    ))
}

fn confirm_blocking(prompt_text: &str) -> bool {
    print!("{prompt_text} (y/N): ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_prefers_the_outcome_timestamp() {
        let outcome: ClassifyOutcome = serde_json::from_str(
            r#"{"success": true, "item_name": "瓶子", "garbage_type": "可回收垃圾",
                "icon": "♻️", "timestamp": "2025-11-03 10:00:00"}"#,
        )
        .unwrap();
        let entry = entry_from_outcome(&outcome, Some("2025-11-03 11:00:00"), "2025-11-03 12:00:00");
        assert_eq!(entry.timestamp, "2025-11-03 10:00:00");
        assert_eq!(entry.item_name, "瓶子");
        assert!(entry.success);
    }

    #[test]
    fn batch_entries_take_the_batch_timestamp() {
        let outcome: ClassifyOutcome = serde_json::from_str(
            r#"{"success": false, "item_name": "谜之物体", "garbage_type": "未知", "icon": "❓"}"#,
        )
        .unwrap();
        let entry = entry_from_outcome(&outcome, Some("2025-11-03 11:00:00"), "2025-11-03 12:00:00");
        assert_eq!(entry.timestamp, "2025-11-03 11:00:00");
        assert!(!entry.success);
    }

    #[test]
    fn missing_timestamps_fall_back_to_local_time() {
        let outcome: ClassifyOutcome = serde_json::from_str(
            r#"{"success": true, "object_name": "塑料瓶", "garbage_type": "可回收垃圾", "icon": "♻️"}"#,
        )
        .unwrap();
        let entry = entry_from_outcome(&outcome, None, "2025-11-03 12:00:00");
        assert_eq!(entry.timestamp, "2025-11-03 12:00:00");
        assert_eq!(entry.item_name, "塑料瓶");
    }

    #[test]
    fn failed_probe_keeps_the_previous_status_line() {
        let previous = "✅ 图片识别功能已启用，模型已加载".to_string();
        let kept = apply_probe(
            previous.clone(),
            Err(ApiError::Invalid("network down".to_string())),
        );
        assert_eq!(kept, previous);
    }

    #[test]
    fn successful_probe_replaces_the_status_line() {
        let status: ImageStatusResponse = serde_json::from_str(
            r#"{"available": true, "model_loaded": false, "message": "", "required_packages": []}"#,
        )
        .unwrap();
        let line = apply_probe("旧状态".to_string(), Ok(status));
        assert_eq!(line, "✅ 图片识别功能已启用，模型待加载");
    }

    #[test]
    fn kind_parsing_accepts_labels_aliases_and_empty() {
        assert_eq!(parse_kind(None).unwrap(), None);
        assert_eq!(parse_kind(Some("")).unwrap(), None);
        assert_eq!(
            parse_kind(Some("厨余垃圾")).unwrap(),
            Some(GarbageKind::Kitchen)
        );
        assert_eq!(
            parse_kind(Some("recyclable")).unwrap(),
            Some(GarbageKind::Recyclable)
        );
        assert!(parse_kind(Some("plastic")).is_err());
    }
}
