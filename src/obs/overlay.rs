//! OBS WebSocket overlay sync
//!
//! Mirrors the shown game into scene item visibility. Each game has a
//! source in the configured scene named after its title.

use anyhow::{Context, Result};
use async_trait::async_trait;
use obws::requests::scene_items::{
    Bounds, Position, SceneItemTransform, SetEnabled, SetTransform,
};
use obws::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ObsConfig;

/// Placement applied to a scene item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceTransform {
    pub position_x: f32,
    pub position_y: f32,
    pub bounds_width: f32,
    pub bounds_height: f32,
    #[serde(default)]
    pub rotation: f32,
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("source '{source_name}' not found in scene '{scene}'")]
    SourceNotFound { scene: String, source_name: String },

    #[error("OBS request failed: {0}")]
    Request(#[from] obws::error::Error),
}

/// Remote visibility control for game sources
#[async_trait]
pub trait OverlaySync: Send + Sync {
    async fn set_visible(&self, scene: &str, source: &str, visible: bool)
        -> Result<(), OverlayError>;

    async fn set_transform(
        &self,
        scene: &str,
        source: &str,
        transform: &SourceTransform,
    ) -> Result<(), OverlayError>;
}

/// Overlay sync over obs-websocket
pub struct ObsOverlay {
    client: Client,
}

impl ObsOverlay {
    /// Connect to OBS
    pub async fn connect(config: &ObsConfig) -> Result<Self> {
        let client = Client::connect(
            &config.host,
            config.port,
            config.password.as_deref().filter(|p| !p.is_empty()),
        )
        .await
        .context("Failed to connect to OBS WebSocket")?;

        info!("Connected to OBS WebSocket at {}:{}", config.host, config.port);
        Ok(Self { client })
    }

    /// Scene item id of a source, looked up by name
    async fn item_id(&self, scene: &str, source: &str) -> Result<i64, OverlayError> {
        let items = self.client.scene_items().list(scene.into()).await?;

        items
            .into_iter()
            .find(|item| item.source_name == source)
            .map(|item| item.id)
            .ok_or_else(|| OverlayError::SourceNotFound {
                scene: scene.to_string(),
                source_name: source.to_string(),
            })
    }
}

#[async_trait]
impl OverlaySync for ObsOverlay {
    async fn set_visible(
        &self,
        scene: &str,
        source: &str,
        visible: bool,
    ) -> Result<(), OverlayError> {
        let item_id = self.item_id(scene, source).await?;
        self.client
            .scene_items()
            .set_enabled(SetEnabled {
                scene: scene.into(),
                item_id,
                enabled: visible,
            })
            .await?;

        debug!("OBS source '{}' visible={}", source, visible);
        Ok(())
    }

    async fn set_transform(
        &self,
        scene: &str,
        source: &str,
        transform: &SourceTransform,
    ) -> Result<(), OverlayError> {
        let item_id = self.item_id(scene, source).await?;
        self.client
            .scene_items()
            .set_transform(SetTransform {
                scene: scene.into(),
                item_id,
                transform: SceneItemTransform {
                    position: Some(Position {
                        x: Some(transform.position_x),
                        y: Some(transform.position_y),
                    }),
                    rotation: Some(transform.rotation),
                    bounds: Some(Bounds {
                        width: Some(transform.bounds_width.max(1.0)),
                        height: Some(transform.bounds_height.max(1.0)),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            })
            .await?;

        debug!("OBS source '{}' transform {:?}", source, transform);
        Ok(())
    }
}
