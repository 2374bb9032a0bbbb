//! Checkpoint stores and the on-disk model format.
//!
//! ## Format
//!
//! ```text
//! [magic: 8 bytes "AZMODEL\0"][format version: u32 LE][bincode DualNet]
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::nn::DualNet;

/// Leading bytes of every model file.
pub const CHECKPOINT_MAGIC: [u8; 8] = *b"AZMODEL\0";

/// Current model file layout.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = CHECKPOINT_MAGIC.len() + 4;

/// Reference to a saved model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHandle {
    /// Sequence number within the store.
    pub id: u64,
    /// `DualNet::version` of the saved model.
    pub model_version: u64,
    /// File location, for file-backed stores.
    pub path: Option<PathBuf>,
}

/// Somewhere champions can be saved and restored.
pub trait CheckpointStore: Send {
    /// Persist `model`, returning a handle that loads it back.
    fn save(&mut self, model: &DualNet) -> Result<CheckpointHandle>;

    /// Restore a saved model.
    fn load(&self, handle: &CheckpointHandle) -> Result<DualNet>;

    /// Most recent checkpoint, if any.
    fn latest(&self) -> Option<CheckpointHandle>;
}

/// Serialize a model with the checkpoint header.
pub fn encode_model(model: &DualNet) -> Result<Vec<u8>> {
    let body = bincode::serialize(model)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&CHECKPOINT_MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Parse bytes produced by `encode_model`.
pub fn decode_model(bytes: &[u8]) -> Result<DualNet> {
    if bytes.len() < HEADER_LEN || bytes[..CHECKPOINT_MAGIC.len()] != CHECKPOINT_MAGIC {
        return Err(Error::Codec("not a model checkpoint".into()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[CHECKPOINT_MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(Error::Codec(format!(
            "unsupported checkpoint format {version}, expected {FORMAT_VERSION}"
        )));
    }
    let model: DualNet = bincode::deserialize(&bytes[HEADER_LEN..])?;
    model.config().validate()?;
    Ok(model)
}

/// Write a model file atomically.
///
/// Bytes go to a sibling temp file, named after this process, which is
/// synced and then renamed over `path`. Readers see either the old file or
/// the complete new one, and a failed save removes its temp file.
pub fn save_model(path: &Path, model: &DualNet) -> Result<()> {
    let bytes = encode_model(model)?;
    let persistence = |source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(persistence)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp = PathBuf::from(tmp_name);

    if let Err(source) = write_synced(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(persistence(source));
    }

    debug!("saved model v{} to {}", model.version(), path.display());
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Read a model file written by `save_model`.
pub fn load_model(path: &Path) -> Result<DualNet> {
    let bytes = fs::read(path).map_err(|source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    })?;
    decode_model(&bytes)
}

/// Numbered model files in one directory.
#[derive(Clone, Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
    next_id: u64,
    latest: Option<CheckpointHandle>,
}

impl FileCheckpointStore {
    /// Open (creating if needed) a checkpoint directory. Numbering resumes
    /// after the highest checkpoint already present, whose model is read to
    /// fill in `latest().model_version`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let persistence = |source| Error::Persistence {
            path: dir.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(persistence)?;

        let mut highest: Option<u64> = None;
        for entry in fs::read_dir(&dir).map_err(persistence)? {
            let entry = entry.map_err(persistence)?;
            if let Some(id) = entry.file_name().to_str().and_then(Self::parse_id) {
                highest = Some(highest.map_or(id, |h| h.max(id)));
            }
        }

        let latest = match highest {
            Some(id) => {
                let path = dir.join(Self::file_name(id));
                let model_version = load_model(&path)?.version();
                Some(CheckpointHandle {
                    id,
                    model_version,
                    path: Some(path),
                })
            }
            None => None,
        };

        Ok(Self {
            next_id: highest.map_or(0, |h| h + 1),
            dir,
            latest,
        })
    }

    /// Directory holding the checkpoints.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(id: u64) -> String {
        format!("model-{id:06}.ckpt")
    }

    fn parse_id(name: &str) -> Option<u64> {
        name.strip_prefix("model-")?.strip_suffix(".ckpt")?.parse().ok()
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, model: &DualNet) -> Result<CheckpointHandle> {
        let path = self.dir.join(Self::file_name(self.next_id));
        save_model(&path, model)?;

        let handle = CheckpointHandle {
            id: self.next_id,
            model_version: model.version(),
            path: Some(path),
        };
        self.next_id += 1;
        self.latest = Some(handle.clone());
        Ok(handle)
    }

    fn load(&self, handle: &CheckpointHandle) -> Result<DualNet> {
        let path = handle
            .path
            .clone()
            .unwrap_or_else(|| self.dir.join(Self::file_name(handle.id)));
        load_model(&path)
    }

    fn latest(&self) -> Option<CheckpointHandle> {
        self.latest.clone()
    }
}

/// Encoded checkpoints kept in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Vec<Vec<u8>>,
    versions: Vec<u64>,
}

impl MemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Check if nothing has been saved.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, model: &DualNet) -> Result<CheckpointHandle> {
        self.checkpoints.push(encode_model(model)?);
        self.versions.push(model.version());
        Ok(CheckpointHandle {
            id: (self.checkpoints.len() - 1) as u64,
            model_version: model.version(),
            path: None,
        })
    }

    fn load(&self, handle: &CheckpointHandle) -> Result<DualNet> {
        let bytes = self
            .checkpoints
            .get(handle.id as usize)
            .ok_or_else(|| Error::Codec(format!("no checkpoint {}", handle.id)))?;
        decode_model(bytes)
    }

    fn latest(&self) -> Option<CheckpointHandle> {
        let id = self.checkpoints.len().checked_sub(1)?;
        Some(CheckpointHandle {
            id: id as u64,
            model_version: self.versions[id],
            path: None,
        })
    }
}
