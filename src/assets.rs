//! Asset loading: raw bytes from disk or `fetch`, decoded into meshes,
//! images and fonts, and handed out as opaque handles.
use std::collections::HashMap;
use std::io::Cursor;

use thiserror::Error;
use tracing::{debug, info};

use crate::utils::{Mesh, Vertex};

/// Side length every OBJ is normalized to on load.
pub const NORMALIZED_SIZE: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("failed to parse OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("OBJ {path} contains no triangles")]
    EmptyMesh { path: String },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("model declares {expected} pose(s) but {found} mesh(es) were given")]
    PoseCount { expected: usize, found: usize },
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// CPU-side storage for everything loaded; handle values index into it.
#[derive(Debug, Default)]
pub struct AssetStore {
    meshes: Vec<Mesh>,
    images: Vec<ImageData>,
    fonts: Vec<Vec<u8>>,
}

impl AssetStore {
    pub fn insert_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn insert_image(&mut self, image: ImageData) -> TextureId {
        self.images.push(image);
        TextureId(self.images.len() - 1)
    }

    pub fn insert_font(&mut self, bytes: Vec<u8>) -> FontId {
        self.fonts.push(bytes);
        FontId(self.fonts.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn image(&self, id: TextureId) -> &ImageData {
        &self.images[id.0]
    }

    pub fn font(&self, id: FontId) -> &[u8] {
        &self.fonts[id.0]
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn images(&self) -> &[ImageData] {
        &self.images
    }
}

/// Loads assets relative to a root and caches them by path, so a file used
/// by two models is only fetched and decoded once.
pub struct AssetLoader {
    root: String,
    store: AssetStore,
    mesh_cache: HashMap<String, MeshId>,
    texture_cache: HashMap<String, TextureId>,
}

impl AssetLoader {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            store: AssetStore::default(),
            mesh_cache: HashMap::new(),
            texture_cache: HashMap::new(),
        }
    }

    fn resolve(&self, path: &str) -> String {
        if self.root.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.root.trim_end_matches('/'), path)
        }
    }

    /// Load and normalize an OBJ mesh.
    pub async fn load_mesh(&mut self, path: &str) -> Result<MeshId, AssetError> {
        if let Some(id) = self.mesh_cache.get(path) {
            return Ok(*id);
        }
        let full = self.resolve(path);
        let bytes = read_bytes(&full).await?;
        let mesh = decode_obj(&full, &bytes)?;
        debug!(path = %full, vertices = mesh.vertices.len(), triangles = mesh.indices.len() / 3, "loaded mesh");
        let id = self.store.insert_mesh(mesh);
        self.mesh_cache.insert(path.to_string(), id);
        Ok(id)
    }

    pub async fn load_texture(&mut self, path: &str) -> Result<TextureId, AssetError> {
        if let Some(id) = self.texture_cache.get(path) {
            return Ok(*id);
        }
        let full = self.resolve(path);
        let bytes = read_bytes(&full).await?;
        let image = decode_image(&full, &bytes)?;
        debug!(path = %full, width = image.width, height = image.height, "loaded texture");
        let id = self.store.insert_image(image);
        self.texture_cache.insert(path.to_string(), id);
        Ok(id)
    }

    pub async fn load_font(&mut self, path: &str) -> Result<FontId, AssetError> {
        let full = self.resolve(path);
        let bytes = read_bytes(&full).await?;
        debug!(path = %full, bytes = bytes.len(), "loaded font");
        Ok(self.store.insert_font(bytes))
    }

    /// Register a mesh built in code rather than loaded from a file.
    pub fn insert_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.store.insert_mesh(mesh)
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn into_store(self) -> AssetStore {
        info!(
            meshes = self.store.meshes.len(),
            textures = self.store.images.len(),
            fonts = self.store.fonts.len(),
            "assets ready"
        );
        self.store
    }
}

/// Parse an OBJ file into a single triangle mesh, merging all of its
/// objects. Materials are ignored; every model carries one texture.
pub fn decode_obj(path: &str, bytes: &[u8]) -> Result<Mesh, AssetError> {
    let (models, _materials) = tobj::load_obj_buf(
        &mut Cursor::new(bytes),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|source| AssetError::Obj { path: path.to_string(), source })?;

    let mut merged = Mesh::empty();
    let mut missing_normals = false;
    for model in models {
        let m = model.mesh;
        let count = m.positions.len() / 3;
        let has_normals = m.normals.len() == m.positions.len();
        let has_uvs = m.texcoords.len() / 2 == count;
        missing_normals |= !has_normals;

        let vertices = (0..count)
            .map(|i| Vertex {
                pos: [m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]],
                normal: if has_normals {
                    [m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2]]
                } else {
                    [0.0; 3]
                },
                // OBJ puts v = 0 at the bottom of the image
                uv: if has_uvs {
                    [m.texcoords[2 * i], 1.0 - m.texcoords[2 * i + 1]]
                } else {
                    [0.0; 2]
                },
            })
            .collect();
        merged.extend(Mesh { vertices, indices: m.indices });
    }

    if merged.is_empty() {
        return Err(AssetError::EmptyMesh { path: path.to_string() });
    }
    if missing_normals {
        merged.compute_normals();
    }
    merged.normalize(NORMALIZED_SIZE);
    Ok(merged)
}

pub fn decode_image(path: &str, bytes: &[u8]) -> Result<ImageData, AssetError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|source| AssetError::Image { path: path.to_string(), source })?
        .to_rgba8();
    Ok(ImageData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(target_arch = "wasm32")]
async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_err = |reason: String| AssetError::Fetch { path: path.to_string(), reason };

    let window = web_sys::window().ok_or_else(|| fetch_err("no global `window`".into()))?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| fetch_err(format!("{e:?}")))?
        .dyn_into::<web_sys::Response>()
        .map_err(|_| fetch_err("fetch did not return a Response".into()))?;
    if !response.ok() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(|e| fetch_err(format!("{e:?}")))?)
        .await
        .map_err(|e| fetch_err(format!("{e:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io { path: path.to_string(), source })
}
