use std::path::Path;

use av1::ivf;
use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// One encoded temporal unit and, when the container declares them, the
/// frame dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub temporal_unit: Bytes,
    pub dimensions: Option<(u32, u32)>,
}

impl Input {
    /// Reads `path` and unwraps it if it is an IVF file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| AppError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), len = data.len(), "read input");
        Self::from_bytes(Bytes::from(data))
    }

    /// IVF input yields its first frame; anything else is taken as a bare
    /// OBU stream.
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("input is empty".into()));
        }

        if !ivf::is_ivf(&data) {
            return Ok(Self {
                temporal_unit: data,
                dimensions: None,
            });
        }

        let (header, frame) = ivf::first_frame(data)?;
        info!(
            width = header.width,
            height = header.height,
            frames = header.frame_count,
            "reading first frame of IVF input"
        );

        let dimensions = (header.width != 0 && header.height != 0)
            .then(|| (u32::from(header.width), u32::from(header.height)));
        Ok(Self {
            temporal_unit: frame,
            dimensions,
        })
    }
}
