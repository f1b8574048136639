use serde::{Deserialize, Serialize};

use crate::domain::{GarbageKind, UNKNOWN_ICON};

#[derive(Debug, Serialize)]
pub struct ClassifyRequest<'a> {
    pub item_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct BatchClassifyRequest<'a> {
    pub items: &'a [String],
}

/// A single classification outcome as returned by both the text and the
/// image endpoints. Text mode fills `item_name`, image mode `object_name`;
/// everything else is shared.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyOutcome {
    pub success: bool,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub garbage_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default = "unknown_icon")]
    pub icon: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub predictions: Vec<PredictionEntry>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
}

impl ClassifyOutcome {
    pub fn display_name(&self) -> &str {
        self.item_name
            .as_deref()
            .or(self.object_name.as_deref())
            .unwrap_or("未知物品")
    }

    pub fn kind(&self) -> GarbageKind {
        GarbageKind::from_label_or_other(&self.garbage_type)
    }
}

fn unknown_icon() -> String {
    UNKNOWN_ICON.to_string()
}

/// One row of the image model's confidence-ranked output. The server sends
/// these pre-sorted by descending confidence.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionEntry {
    pub object_name: String,
    pub confidence: f64,
    pub garbage_type: String,
    pub can_classify: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchClassifyResponse {
    pub results: Vec<ClassifyOutcome>,
    pub total: usize,
    pub successful: usize,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub item_name: String,
    pub garbage_type: String,
    pub reason: String,
    #[serde(default = "unknown_icon")]
    pub icon: String,
}

impl Rule {
    pub fn kind(&self) -> GarbageKind {
        GarbageKind::from_label_or_other(&self.garbage_type)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleDraft {
    pub item_name: String,
    pub garbage_type: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RulesResponse {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
pub struct RuleMutationResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GarbageTypeStat {
    pub garbage_type: String,
    pub count: u64,
    pub percentage: f64,
    #[serde(default = "unknown_icon")]
    pub icon: String,
}

impl GarbageTypeStat {
    pub fn kind(&self) -> GarbageKind {
        GarbageKind::from_label_or_other(&self.garbage_type)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatisticsResponse {
    pub statistics: Vec<GarbageTypeStat>,
    #[serde(default)]
    pub total_rules: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageStatusResponse {
    pub available: bool,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub required_packages: Vec<String>,
}

/// Error payload the service attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_outcome_decodes_text_response() {
        let json = r##"{
            "success": true,
            "item_name": "电池",
            "garbage_type": "有害垃圾",
            "reason": "包含关键词'电池'，可能含有有害物质",
            "suggestion": "投入红色有害垃圾桶，由专业机构处理",
            "color": "#F44336",
            "icon": "☠️",
            "timestamp": "2025-11-03 10:22:41"
        }"##;
        let outcome: ClassifyOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.display_name(), "电池");
        assert_eq!(outcome.kind(), GarbageKind::Hazardous);
        assert!(outcome.predictions.is_empty());
    }

    #[test]
    fn classify_outcome_tolerates_missing_fields() {
        let outcome: ClassifyOutcome =
            serde_json::from_str(r#"{"success": false, "item_name": "谜之物体"}"#).unwrap();
        assert_eq!(outcome.kind(), GarbageKind::Other);
        assert_eq!(outcome.icon, UNKNOWN_ICON);
        assert_eq!(outcome.reason, "");
    }

    #[test]
    fn batch_response_keeps_input_order() {
        let json = r#"{
            "results": [
                {"success": true, "item_name": "瓶子", "garbage_type": "可回收垃圾", "icon": "♻️"},
                {"success": true, "item_name": "电池", "garbage_type": "有害垃圾", "icon": "☠️"},
                {"success": true, "item_name": "菜叶", "garbage_type": "厨余垃圾", "icon": "🍎"}
            ],
            "total": 3,
            "successful": 3,
            "timestamp": "2025-11-03 10:22:41"
        }"#;
        let batch: BatchClassifyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(batch.total, 3);
        let names: Vec<_> = batch.results.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, ["瓶子", "电池", "菜叶"]);
    }

    #[test]
    fn image_outcome_carries_predictions() {
        let json = r#"{
            "success": true,
            "object_name": "塑料瓶",
            "garbage_type": "可回收垃圾",
            "reason": "识别为塑料瓶",
            "suggestion": "清洗干净后投入蓝色回收桶",
            "icon": "♻️",
            "predictions": [
                {"object_name": "塑料瓶", "confidence": 87.5, "garbage_type": "可回收垃圾", "can_classify": true},
                {"object_name": "玻璃杯", "confidence": 8.1, "garbage_type": "可回收垃圾", "can_classify": false}
            ],
            "confidence_threshold": 0.1,
            "timestamp": "2025-11-03 10:25:00"
        }"#;
        let outcome: ClassifyOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.display_name(), "塑料瓶");
        assert_eq!(outcome.predictions.len(), 2);
        assert!(outcome.predictions[0].confidence > outcome.predictions[1].confidence);
        assert!(!outcome.predictions[1].can_classify);
    }

    #[test]
    fn image_status_decodes_unavailable_shape() {
        let json = r#"{
            "available": false,
            "message": "图片识别功能不可用，请安装依赖",
            "required_packages": ["torch", "transformers", "pillow"],
            "model_loaded": false
        }"#;
        let status: ImageStatusResponse = serde_json::from_str(json).unwrap();
        assert!(!status.available);
        assert_eq!(status.required_packages.len(), 3);
    }
}
