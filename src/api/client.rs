use std::{path::Path, time::Duration};

use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::domain::GarbageKind;

use super::types::{
    ApiErrorBody, BatchClassifyRequest, BatchClassifyResponse, ClassifyOutcome, ClassifyRequest,
    ImageStatusResponse, Rule, RuleDraft, RuleMutationResponse, RulesResponse, StatisticsResponse,
};

/// Hard upper bound enforced before any upload; the server checks it again.
pub const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Everything an endpoint call can fail with, collapsed to one surface.
/// `Invalid` never reaches the network; the other three come back from it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("图片识别功能不可用：{message}")]
    FeatureUnavailable { message: String },
    #[error("网络错误，请检查连接")]
    Network(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(http: Client, base: Url, timeout: Duration) -> Self {
        Self {
            http,
            base,
            timeout,
        }
    }

    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }

    pub async fn classify_text(&self, raw: &str) -> Result<ClassifyOutcome, ApiError> {
        let item_name = trimmed_item(raw)?;
        let response = self
            .http
            .post(self.endpoint("classify"))
            .timeout(self.timeout)
            .json(&ClassifyRequest { item_name })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn batch_classify(&self, items: &[String]) -> Result<BatchClassifyResponse, ApiError> {
        if items.is_empty() || items.iter().all(|item| item.trim().is_empty()) {
            return Err(ApiError::Invalid("请输入要分类的物品".to_string()));
        }
        let response = self
            .http
            .post(self.endpoint("batch-classify"))
            .timeout(self.timeout)
            .json(&BatchClassifyRequest { items })
            .send()
            .await?;
        decode(response).await
    }

    /// Uploads an image for recognition. File type and size are checked
    /// against the metadata before the file is even read.
    pub async fn classify_image(
        &self,
        path: &Path,
        threshold: f64,
    ) -> Result<ClassifyOutcome, ApiError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::Invalid("置信度阈值必须在0-1之间".to_string()));
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ApiError::Invalid("无效的图片路径".to_string()))?
            .to_string();
        let len = tokio::fs::metadata(path)
            .await
            .map_err(|err| ApiError::Invalid(format!("无法读取图片文件: {err}")))?
            .len();
        let mime = validate_image_file(&file_name, len)?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::Invalid(format!("无法读取图片文件: {err}")))?;

        let image = multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = multipart::Form::new()
            .part("image", image)
            .text("confidence_threshold", threshold.to_string());

        let response = self
            .http
            .post(self.endpoint("classify-image"))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_rules(&self) -> Result<Vec<Rule>, ApiError> {
        let response = self
            .http
            .get(self.endpoint("rules"))
            .timeout(self.timeout)
            .send()
            .await?;
        let listing: RulesResponse = decode(response).await?;
        Ok(listing.rules)
    }

    pub async fn create_rule(&self, draft: &RuleDraft) -> Result<RuleMutationResponse, ApiError> {
        let draft = validate_rule_draft(draft)?;
        let response = self
            .http
            .post(self.endpoint("rules"))
            .timeout(self.timeout)
            .json(&draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_rule(&self, draft: &RuleDraft) -> Result<RuleMutationResponse, ApiError> {
        let draft = validate_rule_draft(draft)?;
        let response = self
            .http
            .put(self.endpoint("rules"))
            .timeout(self.timeout)
            .json(&draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_rule(&self, item_name: &str) -> Result<RuleMutationResponse, ApiError> {
        let item_name = trimmed_item(item_name)?;
        let mut url = self.endpoint("rules");
        url.query_pairs_mut().append_pair("item_name", item_name);
        let response = self.http.delete(url).timeout(self.timeout).send().await?;
        decode(response).await
    }

    pub async fn fetch_statistics(&self) -> Result<StatisticsResponse, ApiError> {
        let response = self
            .http
            .get(self.endpoint("statistics"))
            .timeout(self.timeout)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn image_status(&self) -> Result<ImageStatusResponse, ApiError> {
        let response = self
            .http
            .get(self.endpoint("image-status"))
            .timeout(self.timeout)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
    Err(error_from(status, body))
}

fn error_from(status: StatusCode, body: ApiErrorBody) -> ApiError {
    if status == StatusCode::SERVICE_UNAVAILABLE {
        let message = body
            .message
            .or(body.error)
            .unwrap_or_else(|| "请安装服务端图片识别依赖".to_string());
        return ApiError::FeatureUnavailable { message };
    }
    let message = body
        .error
        .or(body.message)
        .unwrap_or_else(|| "请求失败".to_string());
    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

fn trimmed_item(raw: &str) -> Result<&str, ApiError> {
    let item = raw.trim();
    if item.is_empty() {
        return Err(ApiError::Invalid("请输入物品名称".to_string()));
    }
    Ok(item)
}

/// Splits raw batch input into trimmed, non-empty lines, preserving order.
pub fn split_batch_input(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn validate_image_file(file_name: &str, len: u64) -> Result<&'static str, ApiError> {
    let mime = image_mime(file_name).ok_or_else(|| {
        ApiError::Invalid("不支持的文件类型，请上传 JPG、PNG、GIF 或 BMP 格式的图片".to_string())
    })?;
    if len == 0 {
        return Err(ApiError::Invalid("图片文件为空".to_string()));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(ApiError::Invalid(
            "图片文件过大，请上传小于 16MB 的图片".to_string(),
        ));
    }
    Ok(mime)
}

fn image_mime(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn validate_rule_draft(draft: &RuleDraft) -> Result<RuleDraft, ApiError> {
    let item_name = draft.item_name.trim();
    let garbage_type = draft.garbage_type.trim();
    let reason = draft.reason.trim();
    if item_name.is_empty() || garbage_type.is_empty() || reason.is_empty() {
        return Err(ApiError::Invalid("请填写所有字段".to_string()));
    }
    if GarbageKind::from_label(garbage_type).is_none() {
        let labels: Vec<&str> = GarbageKind::ALL.iter().map(|kind| kind.label()).collect();
        return Err(ApiError::Invalid(format!(
            "垃圾类型必须是: {}",
            labels.join(", ")
        )));
    }
    Ok(RuleDraft {
        item_name: item_name.to_string(),
        garbage_type: garbage_type.to_string(),
        reason: reason.to_string(),
    })
}
