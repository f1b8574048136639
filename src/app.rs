use anyhow::{Context, Result};
use chrono_tz::Tz;
use reqwest::Client;
use url::Url;

use crate::{
    api::ApiClient,
    cli::Command,
    config::AppConfig,
    db::{self, history::HistoryRepository},
    infrastructure::directories::ResolvedPaths,
    session::Session,
};

pub struct App {
    session: Session,
}

impl App {
    pub async fn initialize(config: AppConfig, paths: ResolvedPaths) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let history = HistoryRepository::new(pool);

        let http = Client::builder()
            .user_agent(format!("laji-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = Url::parse(&config.api.base_url)
            .with_context(|| format!("API base URL 无效: {}", config.api.base_url))?;
        let api = ApiClient::new(http, base, config.api.timeout);

        let tz: Tz = config.timezone.parse().unwrap_or(chrono_tz::Asia::Shanghai);

        Ok(Self {
            session: Session::new(api, history, tz, config.image.default_threshold_pct),
        })
    }

    pub async fn run(mut self, command: Option<Command>) -> Result<()> {
        tracing::info!("垃圾分类客户端启动");
        let result = match command {
            Some(command) => self.session.run_once(command).await,
            None => self.session.run_interactive().await,
        };
        self.session.close().await;
        result
    }
}
