//! Boundary with the audio collaborator. Decoding and mixing live behind
//! `AudioBackend`; the engine only caches handles and starts playback.

use crate::cache::{AssetCache, AssetKey, AssetSource};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SfxHandle(pub u32);

pub trait AudioBackend {
    /// Open the output device. Called once, lazily, before the first load.
    fn open(&mut self) -> EngineResult<()>;
    fn load_music(&mut self, source: AssetSource<'_>) -> EngineResult<MusicHandle>;
    fn load_sfx(&mut self, source: AssetSource<'_>) -> EngineResult<SfxHandle>;
    /// Loop the track until replaced.
    fn play_music(&mut self, music: MusicHandle) -> EngineResult<()>;
    /// Play once on any free channel, returning the channel used.
    fn play_sfx(&mut self, sfx: SfxHandle) -> EngineResult<u32>;
    fn free_music(&mut self, music: MusicHandle);
    fn free_sfx(&mut self, sfx: SfxHandle);
}

pub struct AudioLibrary<B: AudioBackend> {
    backend: B,
    opened: bool,
    music: AssetCache<MusicHandle>,
    sfx: AssetCache<SfxHandle>,
}

impl<B: AudioBackend> AudioLibrary<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            opened: false,
            music: AssetCache::new(),
            sfx: AssetCache::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_open(&mut self) -> EngineResult<()> {
        if !self.opened {
            self.backend.open()?;
            self.opened = true;
        }
        Ok(())
    }

    pub fn music(&mut self, source: AssetSource<'_>) -> EngineResult<MusicHandle> {
        self.ensure_open()?;
        let backend = &mut self.backend;
        self.music
            .get_or_load(AssetKey::new(source, 0), || backend.load_music(source))
    }

    pub fn sfx(&mut self, source: AssetSource<'_>) -> EngineResult<SfxHandle> {
        self.ensure_open()?;
        let backend = &mut self.backend;
        self.sfx
            .get_or_load(AssetKey::new(source, 0), || backend.load_sfx(source))
    }

    pub fn play_music(&mut self, source: AssetSource<'_>) -> EngineResult<()> {
        let handle = self.music(source)?;
        self.backend.play_music(handle)
    }

    pub fn play_sfx(&mut self, source: AssetSource<'_>) -> EngineResult<u32> {
        let handle = self.sfx(source)?;
        self.backend.play_sfx(handle)
    }

    pub fn clear_all(&mut self) {
        let backend = &mut self.backend;
        self.music.clear_all(|m| backend.free_music(m));
        self.sfx.clear_all(|s| backend.free_sfx(s));
    }
}

/// Backend for hosts without an audio device. Loads succeed, playback fails.
#[derive(Debug, Default)]
pub struct NullAudio {
    next: u32,
}

impl AudioBackend for NullAudio {
    fn open(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn load_music(&mut self, _source: AssetSource<'_>) -> EngineResult<MusicHandle> {
        self.next += 1;
        Ok(MusicHandle(self.next))
    }

    fn load_sfx(&mut self, _source: AssetSource<'_>) -> EngineResult<SfxHandle> {
        self.next += 1;
        Ok(SfxHandle(self.next))
    }

    fn play_music(&mut self, _music: MusicHandle) -> EngineResult<()> {
        Err(EngineError::misuse("no audio device"))
    }

    fn play_sfx(&mut self, _sfx: SfxHandle) -> EngineResult<u32> {
        Err(EngineError::misuse("no audio device"))
    }

    fn free_music(&mut self, _music: MusicHandle) {}

    fn free_sfx(&mut self, _sfx: SfxHandle) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        opens: u32,
        loads: u32,
        freed: u32,
        played: Vec<u32>,
    }

    impl AudioBackend for CountingBackend {
        fn open(&mut self) -> EngineResult<()> {
            self.opens += 1;
            Ok(())
        }
        fn load_music(&mut self, _source: AssetSource<'_>) -> EngineResult<MusicHandle> {
            self.loads += 1;
            Ok(MusicHandle(self.loads))
        }
        fn load_sfx(&mut self, source: AssetSource<'_>) -> EngineResult<SfxHandle> {
            if let AssetSource::Bytes(b) = source {
                if b.is_empty() {
                    return Err(EngineError::asset("empty sfx"));
                }
            }
            self.loads += 1;
            Ok(SfxHandle(self.loads))
        }
        fn play_music(&mut self, music: MusicHandle) -> EngineResult<()> {
            self.played.push(music.0);
            Ok(())
        }
        fn play_sfx(&mut self, sfx: SfxHandle) -> EngineResult<u32> {
            self.played.push(sfx.0);
            Ok(0)
        }
        fn free_music(&mut self, _music: MusicHandle) {
            self.freed += 1;
        }
        fn free_sfx(&mut self, _sfx: SfxHandle) {
            self.freed += 1;
        }
    }

    #[test]
    fn opens_once_and_caches_loads() {
        let mut lib = AudioLibrary::new(CountingBackend::default());
        lib.play_sfx(AssetSource::Bytes(b"blip")).expect("play");
        lib.play_sfx(AssetSource::Bytes(b"blip")).expect("play");
        lib.play_music(AssetSource::Bytes(b"theme")).expect("music");
        assert_eq!(lib.backend().opens, 1);
        assert_eq!(lib.backend().loads, 2);
        assert_eq!(lib.backend().played, vec![1, 1, 2]);
    }

    #[test]
    fn load_failures_surface() {
        let mut lib = AudioLibrary::new(CountingBackend::default());
        assert!(lib.sfx(AssetSource::Bytes(b"")).is_err());
    }

    #[test]
    fn clear_all_frees_every_handle() {
        let mut lib = AudioLibrary::new(CountingBackend::default());
        lib.sfx(AssetSource::Bytes(b"a")).expect("sfx");
        lib.sfx(AssetSource::Bytes(b"b")).expect("sfx");
        lib.music(AssetSource::Bytes(b"c")).expect("music");
        lib.clear_all();
        assert_eq!(lib.backend().freed, 3);
    }

    #[test]
    fn null_audio_refuses_playback() {
        let mut lib = AudioLibrary::new(NullAudio::default());
        assert!(lib.sfx(AssetSource::Bytes(b"a")).is_ok());
        assert!(lib.play_sfx(AssetSource::Bytes(b"a")).is_err());
    }
}
