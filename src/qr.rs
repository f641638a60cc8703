//! QR artifacts for issued tickets.

use std::{error::Error as StdError, io, path::PathBuf};

use async_trait::async_trait;
use derive_more::{Display, From};
use qrcode::{render::svg, types::QrError, QrCode};
use tokio::fs;

use crate::config;

/// Public location of a rendered artifact, stored on the ticket.
pub type ArtifactLocation = String;

#[derive(Debug, Display, From)]
pub enum RenderError {
    #[display("cannot encode QR symbol: {_0}")]
    Encode(QrError),
    #[display("cannot write QR artifact: {_0}")]
    Io(io::Error),
}

impl StdError for RenderError {}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders a QR artifact carrying `code` and returns where it lives.
    async fn render(&self, code: &str) -> Result<ArtifactLocation, RenderError>;

    /// Removes the artifact rendered for `code`, if any. Used when the
    /// tickets it was rendered for are rolled back. Best-effort.
    async fn discard(&self, code: &str);
}

/// Writes `<dir>/<code>.svg` and exposes it under `public_prefix`.
pub struct SvgRenderer {
    dir: PathBuf,
    public_prefix: String,
}

impl SvgRenderer {
    pub fn new(config: config::Qr) -> Self {
        Self {
            dir: config.dir,
            public_prefix: config.public_prefix,
        }
    }

    fn path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}.svg"))
    }
}

#[async_trait]
impl Renderer for SvgRenderer {
    async fn render(&self, code: &str) -> Result<ArtifactLocation, RenderError> {
        let image = QrCode::new(code.as_bytes())?
            .render::<svg::Color>()
            .min_dimensions(256, 256)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        fs::create_dir_all(&self.dir).await?;
        fs::write(self.path(code), image).await?;

        Ok(format!(
            "{}/{code}.svg",
            self.public_prefix.trim_end_matches('/'),
        ))
    }

    async fn discard(&self, code: &str) {
        match fs::remove_file(self.path(code)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(code, error = %e, "cannot remove QR artifact");
            }
        }
    }
}
