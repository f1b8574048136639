use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "laji")]
#[command(version)]
#[command(about = "智能垃圾分类助手终端客户端")]
pub struct Cli {
    /// 不带子命令时进入交互模式
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// 分类单个物品
    Classify {
        /// 物品名称
        item: String,
    },
    /// 批量分类（参数优先，其次 --file，否则读取标准输入，均按行拆分）
    Batch {
        /// 物品名称列表
        items: Vec<String>,

        /// 从文件读取，每行一个物品
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// 图片识别分类
    Image {
        /// 图片路径（jpg/png/gif/bmp，不超过 16MB）
        path: PathBuf,

        /// 置信度阈值百分比 (0-100)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// 查看或清空历史记录
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// 显示条数
        #[arg(short = 'n', long, default_value = "10")]
        limit: i64,
    },
    /// 查看或管理分类规则
    Rules {
        #[command(subcommand)]
        action: Option<RuleAction>,

        /// 搜索词（匹配物品名称或分类依据）
        #[arg(short, long, default_value = "")]
        search: String,

        /// 类型过滤（中文标签或 recyclable/hazardous/kitchen/other）
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// 分类统计
    Stats,
    /// 图片识别功能状态
    Status,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 清空历史记录
    Clear {
        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// 添加规则
    Add {
        item_name: String,
        garbage_type: String,
        reason: String,
    },
    /// 编辑已有规则
    Edit {
        item_name: String,
        garbage_type: String,
        reason: String,
    },
    /// 删除规则
    Delete {
        item_name: String,

        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
}
