//! Handle caches for decoded assets.
//!
//! Keys identify the source (a path, or the SHA-256 of an in-memory buffer) plus
//! the load parameter that changes the result, such as a font's point size. A
//! cached key is never decoded twice until `clear_all` releases everything.

use crate::device::{FontHandle, RenderDevice, TextureInfo};
use crate::error::{EngineError, EngineResult};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub enum AssetSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// An asset source a node can hold on to until it is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedSource {
    Path(PathBuf),
    Bytes(Cow<'static, [u8]>),
}

impl OwnedSource {
    pub fn as_source(&self) -> AssetSource<'_> {
        match self {
            OwnedSource::Path(path) => AssetSource::Path(path),
            OwnedSource::Bytes(bytes) => AssetSource::Bytes(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SourceId {
    Path(PathBuf),
    Digest([u8; 32]),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    source: SourceId,
    /// Extra load parameter, e.g. font point size in hundredths.
    param: u32,
}

impl AssetKey {
    pub fn new(source: AssetSource<'_>, param: u32) -> Self {
        let source = match source {
            AssetSource::Path(path) => SourceId::Path(path.to_path_buf()),
            AssetSource::Bytes(bytes) => SourceId::Digest(Sha256::digest(bytes).into()),
        };
        Self { source, param }
    }
}

pub struct AssetCache<V> {
    entries: HashMap<AssetKey, V>,
}

impl<V: Clone> AssetCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &AssetKey) -> Option<V> {
        self.entries.get(key).cloned()
    }

    /// Return the cached value, or run `load` once and remember its result.
    /// Failed loads are not cached.
    pub fn get_or_load(
        &mut self,
        key: AssetKey,
        load: impl FnOnce() -> EngineResult<V>,
    ) -> EngineResult<V> {
        if let Some(value) = self.entries.get(&key) {
            return Ok(value.clone());
        }
        let value = load()?;
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry, handing each value to `release`.
    pub fn clear_all(&mut self, mut release: impl FnMut(V)) {
        for (_, value) in self.entries.drain() {
            release(value);
        }
    }
}

impl<V: Clone> Default for AssetCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn read_source(source: AssetSource<'_>) -> EngineResult<Cow<'_, [u8]>> {
    match source {
        AssetSource::Path(path) => std::fs::read(path)
            .map(Cow::Owned)
            .map_err(|e| EngineError::asset(format!("Failed to read {}: {e}", path.display()))),
        AssetSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
    }
}

pub fn source_label(source: AssetSource<'_>) -> String {
    match source {
        AssetSource::Path(path) => path.display().to_string(),
        AssetSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

/// Texture and font caches owned by the root context.
#[derive(Default)]
pub struct Assets {
    pub textures: AssetCache<TextureInfo>,
    pub fonts: AssetCache<FontHandle>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(
        &mut self,
        device: &mut dyn RenderDevice,
        source: AssetSource<'_>,
    ) -> EngineResult<TextureInfo> {
        let key = AssetKey::new(source, 0);
        self.textures.get_or_load(key, || {
            let bytes = read_source(source)?;
            device.load_texture(&bytes, &source_label(source))
        })
    }

    pub fn font(
        &mut self,
        device: &mut dyn RenderDevice,
        source: AssetSource<'_>,
        point_size: f32,
    ) -> EngineResult<FontHandle> {
        let key = AssetKey::new(source, (point_size * 100.0).round() as u32);
        self.fonts.get_or_load(key, || {
            let bytes = read_source(source)?;
            device.load_font(&bytes, point_size)
        })
    }

    /// Release every cached handle on the device.
    pub fn clear_all(&mut self, device: &mut dyn RenderDevice) {
        self.textures
            .clear_all(|info| device.release_texture(info.handle));
        self.fonts.clear_all(|font| device.release_font(font));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_support::tiny_png;
    use crate::device::RecordingDevice;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "crank_cache_test_{}_{}_{}.png",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn get_or_load_runs_loader_once() {
        let mut cache: AssetCache<u32> = AssetCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_load(AssetKey::new(AssetSource::Bytes(b"abc"), 0), || {
                    calls += 1;
                    Ok(7)
                })
                .expect("load");
            assert_eq!(v, 7);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let mut cache: AssetCache<u32> = AssetCache::new();
        let key = AssetKey::new(AssetSource::Bytes(b"abc"), 0);
        assert!(cache
            .get_or_load(key.clone(), || Err(EngineError::asset("boom")))
            .is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_load(key, || Ok(1)).expect("retry"), 1);
    }

    #[test]
    fn keys_distinguish_content_and_params() {
        let a = AssetKey::new(AssetSource::Bytes(b"same"), 0);
        let b = AssetKey::new(AssetSource::Bytes(b"same"), 0);
        let c = AssetKey::new(AssetSource::Bytes(b"same"), 2400);
        let d = AssetKey::new(AssetSource::Bytes(b"other"), 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn texture_cache_hits_skip_the_device() {
        let mut device = RecordingDevice::new();
        let mut assets = Assets::new();
        let png = tiny_png();
        let first = assets
            .texture(&mut device, AssetSource::Bytes(&png))
            .expect("load");
        let second = assets
            .texture(&mut device, AssetSource::Bytes(&png))
            .expect("load");
        assert_eq!(first, second);
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn texture_loads_from_path() {
        let path = temp_file_path("tex");
        std::fs::write(&path, tiny_png()).expect("write temp file");
        let mut device = RecordingDevice::new();
        let mut assets = Assets::new();
        let info = assets
            .texture(&mut device, AssetSource::Path(&path))
            .expect("load from path");
        assert_eq!((info.width, info.height), (2, 3));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_path_is_an_asset_error() {
        let mut device = RecordingDevice::new();
        let mut assets = Assets::new();
        let err = assets
            .texture(&mut device, AssetSource::Path(Path::new("/no/such/file.png")))
            .expect_err("missing file");
        assert!(matches!(err, EngineError::Asset(_)));
    }

    #[test]
    fn fonts_are_cached_per_point_size() {
        let mut device = RecordingDevice::new();
        let mut assets = Assets::new();
        let small = assets
            .font(&mut device, AssetSource::Bytes(b"ttf"), 12.0)
            .expect("font");
        let again = assets
            .font(&mut device, AssetSource::Bytes(b"ttf"), 12.0)
            .expect("font");
        let large = assets
            .font(&mut device, AssetSource::Bytes(b"ttf"), 48.0)
            .expect("font");
        assert_eq!(small, again);
        assert_ne!(small, large);
        assert_eq!(device.live_fonts(), 2);
    }

    #[test]
    fn clear_all_releases_on_device() {
        let mut device = RecordingDevice::new();
        let mut assets = Assets::new();
        let png = tiny_png();
        assets
            .texture(&mut device, AssetSource::Bytes(&png))
            .expect("load");
        assets
            .font(&mut device, AssetSource::Bytes(b"ttf"), 12.0)
            .expect("font");
        assets.clear_all(&mut device);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_fonts(), 0);
        assert!(assets.textures.is_empty());
    }
}
