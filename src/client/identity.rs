use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::RngCore;

const TOKEN_BYTES: usize = 16;

/// Client-generated ownership token, kept in a file so it survives restarts.
///
/// It only marks which groups this client created; anyone holding the value
/// can act as the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorIdentity {
    token: String,
    path: PathBuf,
}

impl CreatorIdentity {
    /// Read the token at `path`, or generate and persist a new one.
    pub fn load_or_create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        match fs::read_to_string(&path) {
            Ok(raw) if is_valid_token(raw.trim()) => {
                return Ok(Self {
                    token: raw.trim().to_string(),
                    path,
                });
            }
            Ok(_) => log::warn!("Ignoring malformed creator token in {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let token = generate();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &token)?;
        log::info!("Created new creator token in {}", path.display());

        Ok(Self { token, path })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_valid_token(s: &str) -> bool {
    s.len() == TOKEN_BYTES * 2 && hex::decode(s).is_ok()
}
