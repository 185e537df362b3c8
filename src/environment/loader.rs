//! Environment image loading.
//!
//! Loading is the only asynchronous step of the studio core. On native targets
//! file reads and decoding run on a dedicated blocking pool, so the returned
//! future can be driven by any executor (including `pollster`). The `http`
//! feature adds a URL-based loader that also works in the browser.

use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::environment::preset::{EnvironmentSource, SourceKind};
use crate::errors::{Result, StudioError};
use crate::resources::Image;

#[cfg(not(target_arch = "wasm32"))]
use std::sync::OnceLock;
#[cfg(not(target_arch = "wasm32"))]
use tokio::runtime::Runtime;

#[cfg(not(target_arch = "wasm32"))]
fn get_loader_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("myth-studio-loader")
            .build()
            .expect("Failed to create environment loader runtime")
    })
}

/// Produces decoded pixels for an environment source.
pub trait EnvironmentLoader {
    fn load(&self, source: &EnvironmentSource) -> impl Future<Output = Result<Image>>;
}

/// Reads environment files relative to a root directory.
///
/// Native only; browser hosts use `HttpEnvironmentLoader` (feature `http`) or
/// [`MemoryEnvironmentLoader`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileEnvironmentLoader {
    root_path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileEnvironmentLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EnvironmentLoader for FileEnvironmentLoader {
    async fn load(&self, source: &EnvironmentSource) -> Result<Image> {
        let path = self.root_path.join(&source.uri);
        let kind = source.kind;
        let label = source.uri.clone();

        get_loader_runtime()
            .spawn_blocking(move || {
                let bytes = std::fs::read(&path)?;
                decode_environment(&bytes, kind, &label)
            })
            .await?
    }
}

/// Fetches environment files relative to a base URL.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpEnvironmentLoader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpEnvironmentLoader {
    /// A base that does not end in `/` is treated as a file; its directory
    /// becomes the root.
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str)
            .map_err(|e| StudioError::Network(format!("Invalid base url {url_str}: {e}")))?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };
        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }

    pub fn resolve(&self, uri: &str) -> Result<url::Url> {
        self.root_url
            .join(uri)
            .map_err(|e| StudioError::Network(format!("Invalid environment uri {uri}: {e}")))
    }
}

#[cfg(feature = "http")]
impl EnvironmentLoader for HttpEnvironmentLoader {
    async fn load(&self, source: &EnvironmentSource) -> Result<Image> {
        let url = self.resolve(&source.uri)?;
        let response = ehttp::fetch_async(ehttp::Request::get(url.as_str()))
            .await
            .map_err(|e| StudioError::Network(format!("{url}: {e}")))?;
        if !response.ok {
            return Err(StudioError::Network(format!(
                "HTTP {} {} for {url}",
                response.status, response.status_text
            )));
        }
        decode_environment(&response.bytes, source.kind, &source.uri)
    }
}

/// Serves sources from bytes already in memory (fetched by the host, embedded, ...).
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvironmentLoader {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryEnvironmentLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(uri.into(), bytes);
    }
}

impl EnvironmentLoader for MemoryEnvironmentLoader {
    async fn load(&self, source: &EnvironmentSource) -> Result<Image> {
        let bytes = self.files.get(&source.uri).ok_or_else(|| {
            StudioError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                source.uri.clone(),
            ))
        })?;
        decode_environment(bytes, source.kind, &source.uri)
    }
}

/// Decodes with the path matching the declared source kind.
pub fn decode_environment(bytes: &[u8], kind: SourceKind, label: &str) -> Result<Image> {
    match kind {
        SourceKind::Hdr => decode_hdr_cpu(bytes, label),
        SourceKind::Ldr => decode_ldr_cpu(bytes, label),
    }
}

/// CPU HDR decoding logic (converts to `RGBA16Float`).
pub fn decode_hdr_cpu(bytes: &[u8], label: &str) -> Result<Image> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| StudioError::ImageDecodeError(format!("Failed to decode HDR {label}: {e}")))?;

    let width = img.width();
    let height = img.height();
    let rgb32f = img.into_rgb32f();

    // Convert RGB32F to RGBA16F (half float) for GPU
    let mut rgba_f16_data = Vec::with_capacity((width * height * 4) as usize * 2);

    for pixel in rgb32f.pixels() {
        let r = half::f16::from_f32(pixel[0]);
        let g = half::f16::from_f32(pixel[1]);
        let b = half::f16::from_f32(pixel[2]);
        let a = half::f16::from_f32(1.0);

        rgba_f16_data.extend_from_slice(&r.to_le_bytes());
        rgba_f16_data.extend_from_slice(&g.to_le_bytes());
        rgba_f16_data.extend_from_slice(&b.to_le_bytes());
        rgba_f16_data.extend_from_slice(&a.to_le_bytes());
    }

    Ok(Image::new(
        label,
        width,
        height,
        wgpu::TextureFormat::Rgba16Float,
        rgba_f16_data,
    ))
}

/// CPU LDR decoding logic (sRGB 8-bit).
pub fn decode_ldr_cpu(bytes: &[u8], label: &str) -> Result<Image> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| StudioError::ImageDecodeError(format!("Failed to decode image {label}: {e}")))?;

    let (width, height) = (img.width(), img.height());
    let rgba = img.to_rgba8();

    Ok(Image::new(
        label,
        width,
        height,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        rgba.into_raw(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn ldr_decodes_to_srgb_rgba8() {
        let png = encode(
            image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                4,
                2,
                image::Rgba([10, 20, 30, 255]),
            )),
            image::ImageFormat::Png,
        );
        let img = decode_ldr_cpu(&png, "test.png").unwrap();
        assert_eq!((img.width, img.height), (4, 2));
        assert_eq!(img.format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(img.data.len(), 4 * 2 * 4);
        assert_eq!(&img.data[..4], &[10, 20, 30, 255]);
        assert!(!img.is_hdr());
    }

    #[test]
    fn hdr_keeps_values_above_one() {
        let hdr = encode(
            image::DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
                2,
                1,
                image::Rgb([4.0, 0.5, 0.25]),
            )),
            image::ImageFormat::Hdr,
        );
        let img = decode_hdr_cpu(&hdr, "test.hdr").unwrap();
        assert_eq!(img.format, wgpu::TextureFormat::Rgba16Float);
        assert_eq!(img.data.len(), 2 * 8);
        let r = half::f16::from_le_bytes([img.data[0], img.data[1]]).to_f32();
        assert!((r - 4.0).abs() < 0.1, "red channel was {r}");
        assert!(img.is_hdr());
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_root_drops_trailing_file_name() {
        let loader = HttpEnvironmentLoader::new("https://cdn.example.com/env/catalog.json").unwrap();
        assert_eq!(loader.root_url().as_str(), "https://cdn.example.com/env/");
        assert_eq!(
            loader.resolve("studio.hdr").unwrap().as_str(),
            "https://cdn.example.com/env/studio.hdr"
        );

        let loader = HttpEnvironmentLoader::new("https://cdn.example.com/env/").unwrap();
        assert_eq!(
            loader.resolve("hdr/sunset.jpg").unwrap().as_str(),
            "https://cdn.example.com/env/hdr/sunset.jpg"
        );
        assert!(HttpEnvironmentLoader::new("not a url").is_err());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_environment(b"not an image", SourceKind::Hdr, "bad.hdr");
        assert!(matches!(err, Err(StudioError::ImageDecodeError(_))));
    }
}
