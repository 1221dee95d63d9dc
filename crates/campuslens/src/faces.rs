//! Face image lookup.
//!
//! Face images live as `<face_id>.jpg` or `<face_id>.jpeg` files in one
//! directory. Ids arrive in whatever case the client has, so the lookup probes
//! the id as given, then lower-cased, then upper-cased.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// Extensions probed for every id, in order.
const EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// The directory of face images.
#[derive(Debug, Clone)]
pub struct FaceImages {
    dir: PathBuf,
}

impl FaceImages {
    /// Look up images in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The image directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names probed for `face_id`, in probe order, without repeats.
    ///
    /// Returns nothing for ids that could escape the image directory.
    #[must_use]
    pub fn candidates(face_id: &str) -> Vec<String> {
        if !is_plain_file_stem(face_id) {
            return Vec::new();
        }

        let mut names: Vec<String> = Vec::with_capacity(6);
        for stem in [
            face_id.to_string(),
            face_id.to_lowercase(),
            face_id.to_uppercase(),
        ] {
            for ext in EXTENSIONS {
                let name = format!("{stem}.{ext}");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Path of the first existing image for `face_id`.
    ///
    /// The caller streams the file; nothing is read here.
    pub async fn resolve(&self, face_id: &str) -> Option<PathBuf> {
        for name in Self::candidates(face_id) {
            let path = self.dir.join(&name);
            trace!("Probing {}", path.display());
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    debug!("Resolved face {} to {}", face_id, path.display());
                    return Some(path);
                }
                _ => {}
            }
        }
        None
    }
}

fn is_plain_file_stem(face_id: &str) -> bool {
    !face_id.is_empty()
        && face_id != "."
        && face_id != ".."
        && !face_id.contains(['/', '\\', '\0'])
}
