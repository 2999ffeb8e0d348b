use std::path::{Path, PathBuf};

use anyhow::anyhow;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::subscription::{FailurePolicy, Subscription};

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> anyhow::Result<Self> {
        let base = BaseDirs::new().ok_or_else(|| anyhow!("failed to resolve base directories"))?;
        Ok(Self {
            config_dir: base.home_dir().join(".config/submerge"),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn app_config_path(&self) -> PathBuf {
        self.config_dir.join("app.yaml")
    }

    pub fn subscriptions_file(&self) -> PathBuf {
        self.config_dir.join("subscriptions.yaml")
    }

    pub fn output_config_path(&self) -> PathBuf {
        self.config_dir.join("output/config.yaml")
    }

    pub async fn ensure_runtime_dirs(&self) -> anyhow::Result<()> {
        fs::create_dir_all(self.config_dir()).await?;
        if let Some(parent) = self.output_config_path().parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubscriptionList {
    #[serde(default)]
    pub items: Vec<Subscription>,
}

impl SubscriptionList {
    pub fn enabled(&self) -> impl Iterator<Item = &Subscription> {
        self.items.iter().filter(|sub| sub.enabled)
    }
}

pub async fn load_subscription_list(paths: &AppPaths) -> anyhow::Result<SubscriptionList> {
    match fs::read_to_string(paths.subscriptions_file()).await {
        Ok(contents) => {
            let list: SubscriptionList = serde_yaml::from_str(&contents)?;
            Ok(list)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let list = SubscriptionList::default();
            save_subscription_list(paths, &list).await?;
            Ok(list)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn save_subscription_list(
    paths: &AppPaths,
    list: &SubscriptionList,
) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(list)?;
    if let Some(parent) = paths.subscriptions_file().parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(paths.subscriptions_file(), yaml).await?;
    Ok(())
}

/// Behavior knobs for the update cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// External controller endpoint to push merged configurations to.
    #[serde(default)]
    pub controller: Option<String>,

    #[serde(default)]
    pub secret: Option<String>,
}

pub async fn load_app_config(paths: &AppPaths) -> anyhow::Result<AppConfig> {
    match fs::read_to_string(paths.app_config_path()).await {
        Ok(raw) => Ok(serde_yaml::from_str(&raw)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(err.into()),
    }
}

pub async fn save_app_config(paths: &AppPaths, cfg: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = paths.app_config_path().parent() {
        fs::create_dir_all(parent).await?;
    }
    let yaml = serde_yaml::to_string(cfg)?;
    fs::write(paths.app_config_path(), yaml).await?;
    Ok(())
}
