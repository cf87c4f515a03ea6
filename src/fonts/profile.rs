//! Font glyph profiles and their persisted repository.

use super::candidates::CandidatePool;
use super::loader::{FontHandle, FontStore};
use super::support::GlyphSupportResolver;
use crate::core::constants::GLYPH_CACHE_VERSION;
use crate::core::errors::{SynthError, SynthResult};
use once_cell::sync::OnceCell;
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The characters one font can visibly produce.
///
/// `chars` keeps the resolver's order, including the trailing blank
/// separators, so random picks weight blanks the same way every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontGlyphProfile {
    font_key: String,
    chars: Vec<char>,
    members: HashSet<char>,
}

impl FontGlyphProfile {
    pub fn new(font_key: impl Into<String>, chars: Vec<char>) -> Self {
        let members = chars.iter().copied().collect();
        Self {
            font_key: font_key.into(),
            chars,
            members,
        }
    }

    /// The font path this profile was built for.
    pub fn font_key(&self) -> &str {
        &self.font_key
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn contains(&self, ch: char) -> bool {
        self.members.contains(&ch)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Removes every character the font cannot draw.
    ///
    /// ```
    /// use oar_synth::fonts::FontGlyphProfile;
    ///
    /// let profile = FontGlyphProfile::new("f.ttf", vec!['A', 'B', ' ']);
    /// assert_eq!(profile.filter_text("AΩB"), "AB");
    /// ```
    pub fn filter_text(&self, text: &str) -> String {
        text.chars().filter(|c| self.contains(*c)).collect()
    }

    /// Picks one supported character uniformly from the ordered list.
    pub fn random_char<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
        self.chars.choose(rng).copied()
    }
}

/// On-disk shape of the glyph cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    /// [`CandidatePool::fingerprint`] of the pool the profiles were built from.
    #[serde(default)]
    pool: String,
    profiles: BTreeMap<String, String>,
}

type Slot = Arc<OnceCell<Arc<FontGlyphProfile>>>;

/// Get-or-build store of [`FontGlyphProfile`]s keyed by font path.
///
/// Profiles are read from the cache file on open. A miss builds the profile
/// once, even when many threads ask for the same font at the same time:
/// the first caller runs the resolver while the others block on the same
/// slot. Every new profile is written back to the cache file.
pub struct GlyphProfileRepository {
    cache_path: Option<PathBuf>,
    resolver: GlyphSupportResolver,
    pool: CandidatePool,
    slots: Mutex<HashMap<String, Slot>>,
    persist_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl std::fmt::Debug for GlyphProfileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphProfileRepository")
            .field("cache_path", &self.cache_path)
            .field("pool", &self.pool.len())
            .field("builds", &self.build_count())
            .finish()
    }
}

impl GlyphProfileRepository {
    /// Creates a repository without a backing file.
    pub fn in_memory(resolver: GlyphSupportResolver, pool: CandidatePool) -> Self {
        Self {
            cache_path: None,
            resolver,
            pool,
            slots: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Creates a repository backed by `cache_path`, loading it if present.
    ///
    /// A missing, unreadable, corrupt or outdated cache file is not an
    /// error; it only means every profile gets recomputed. The same holds
    /// for a cache built from a different candidate pool (another language).
    pub fn open(
        cache_path: impl Into<PathBuf>,
        resolver: GlyphSupportResolver,
        pool: CandidatePool,
    ) -> Self {
        let cache_path = cache_path.into();
        let mut repository = Self::in_memory(resolver, pool);

        let fingerprint = repository.pool.fingerprint();
        match load_cache(&cache_path, &fingerprint) {
            Ok(Some(profiles)) => {
                info!(
                    "Loaded {} glyph profiles from {}",
                    profiles.len(),
                    cache_path.display()
                );
                let slots = repository.slots.get_mut().unwrap_or_else(|e| e.into_inner());
                for (key, chars) in profiles {
                    let profile = FontGlyphProfile::new(key.clone(), chars.chars().collect());
                    slots.insert(key, Arc::new(OnceCell::with_value(Arc::new(profile))));
                }
            }
            Ok(None) => debug!("No glyph cache at {}", cache_path.display()),
            Err(e) => warn!(
                "Ignoring glyph cache {}: {}",
                cache_path.display(),
                e.detail()
            ),
        }

        repository.cache_path = Some(cache_path);
        repository
    }

    pub fn resolver(&self) -> &GlyphSupportResolver {
        &self.resolver
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Number of profiles built (not loaded) by this repository.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Returns the cached profile for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<FontGlyphProfile>> {
        self.lock_slots().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Returns the profile of `font`, building and persisting it on a miss.
    pub fn get_or_build(&self, font: &FontHandle) -> SynthResult<Arc<FontGlyphProfile>> {
        let key = font_key(font.path());
        self.get_or_build_with(&key, || Ok(self.resolver.resolve(font, &self.pool)))
    }

    /// Returns the profile stored under `key`, building it with `build` on a
    /// miss.
    ///
    /// Concurrent callers for the same key run `build` at most once; a
    /// failed build leaves the slot empty so a later call may retry.
    pub fn get_or_build_with<F>(&self, key: &str, build: F) -> SynthResult<Arc<FontGlyphProfile>>
    where
        F: FnOnce() -> SynthResult<Vec<char>>,
    {
        let slot = Arc::clone(self.lock_slots().entry(key.to_string()).or_default());

        let mut built = false;
        let profile = slot.get_or_try_init(|| {
            debug!("Building glyph profile for {}", key);
            let chars = build()?;
            self.builds.fetch_add(1, Ordering::SeqCst);
            built = true;
            Ok::<_, SynthError>(Arc::new(FontGlyphProfile::new(key, chars)))
        })?;

        if built {
            info!("Built glyph profile for {} ({} chars)", key, profile.len());
            if let Err(e) = self.persist() {
                warn!("Failed to persist glyph cache: {}", e.detail());
            }
        }
        Ok(Arc::clone(profile))
    }

    /// Builds the profiles of every font up front, in parallel.
    ///
    /// Fonts that fail to load are logged and skipped; they fail again (and
    /// are reported) when a sample uses them.
    pub fn warm(&self, fonts: &[PathBuf], store: &FontStore) -> usize {
        fonts
            .par_iter()
            .filter(|path| {
                match store
                    .get(path)
                    .and_then(|font| self.get_or_build(&font).map(|_| ()))
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Skipping glyph profile for {}: {}", path.display(), e.detail());
                        false
                    }
                }
            })
            .count()
    }

    /// Writes every built or loaded profile to the cache file.
    ///
    /// The file is replaced atomically via a temporary sibling.
    pub fn persist(&self) -> SynthResult<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().unwrap_or_else(|e| e.into_inner());

        let profiles: BTreeMap<String, String> = self
            .lock_slots()
            .iter()
            .filter_map(|(key, slot)| {
                slot.get()
                    .map(|profile| (key.clone(), profile.chars().iter().collect()))
            })
            .collect();
        let cache = CacheFile {
            version: GLYPH_CACHE_VERSION,
            pool: self.pool.fingerprint(),
            profiles,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SynthError::io_write(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(&cache)?;
        std::fs::write(&tmp, json).map_err(|e| SynthError::io_write(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| SynthError::io_write(path, e))?;
        debug!("Persisted {} glyph profiles", cache.profiles.len());
        Ok(())
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cache key of a font: its path as given.
pub fn font_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn load_cache(path: &Path, pool: &str) -> SynthResult<Option<BTreeMap<String, String>>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let cache: CacheFile = serde_json::from_str(&contents)?;
    if cache.version != GLYPH_CACHE_VERSION {
        return Err(SynthError::invalid_input(format!(
            "cache version {} (expected {})",
            cache.version, GLYPH_CACHE_VERSION
        )));
    }
    if cache.pool != pool {
        return Err(SynthError::invalid_input(format!(
            "cache built from candidate pool {} (expected {})",
            cache.pool, pool
        )));
    }
    Ok(Some(cache.profiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::support::tests::{FakeGlyphs, ring, tofu};
    use crate::fonts::test_font_path;
    use std::time::Duration;

    fn repository(path: Option<&Path>) -> GlyphProfileRepository {
        let resolver = GlyphSupportResolver::default();
        let pool = CandidatePool::latin();
        match path {
            Some(path) => GlyphProfileRepository::open(path, resolver, pool),
            None => GlyphProfileRepository::in_memory(resolver, pool),
        }
    }

    #[test]
    fn test_filter_text_drops_unsupported() {
        let profile = FontGlyphProfile::new("f", vec!['A', 'B', ' ']);
        assert_eq!(profile.filter_text("AΩB"), "AB");
        assert_eq!(profile.filter_text("A B"), "A B");
        assert_eq!(profile.filter_text("ΩΩ"), "");
    }

    #[test]
    fn test_single_builder_per_key() {
        let repo = repository(None);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let profile = repo
                        .get_or_build_with("font.ttf", || {
                            std::thread::sleep(Duration::from_millis(50));
                            Ok(vec!['a', 'b'])
                        })
                        .unwrap();
                    assert_eq!(profile.chars(), &['a', 'b']);
                });
            }
        });
        assert_eq!(repo.build_count(), 1);
    }

    #[test]
    fn test_failed_build_can_retry() {
        let repo = repository(None);
        assert!(
            repo.get_or_build_with("f", || Err(SynthError::render("boom")))
                .is_err()
        );
        assert!(repo.get("f").is_none());
        let profile = repo.get_or_build_with("f", || Ok(vec!['x'])).unwrap();
        assert!(profile.contains('x'));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("glyphs.json");

        let first = repository(Some(&path));
        first.get_or_build_with("a.ttf", || Ok(vec!['q', ' '])).unwrap();
        assert!(path.exists());

        let second = repository(Some(&path));
        let profile = second
            .get_or_build_with("a.ttf", || Err(SynthError::render("must not rebuild")))
            .unwrap();
        assert_eq!(profile.chars(), &['q', ' ']);
        assert_eq!(second.build_count(), 0);
    }

    #[test]
    fn test_corrupt_or_outdated_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyphs.json");

        std::fs::write(&path, "{not json").unwrap();
        let repo = repository(Some(&path));
        assert!(repo.get("a.ttf").is_none());

        std::fs::write(&path, r#"{"version": 999, "profiles": {"a.ttf": "x"}}"#).unwrap();
        let repo = repository(Some(&path));
        assert!(repo.get("a.ttf").is_none());
    }

    #[test]
    fn test_cache_from_other_language_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyphs.json");
        let resolver = GlyphSupportResolver::default;

        let en = GlyphProfileRepository::open(&path, resolver(), CandidatePool::for_language("en"));
        en.get_or_build_with("a.ttf", || Ok(vec!['q'])).unwrap();

        let cn = GlyphProfileRepository::open(&path, resolver(), CandidatePool::for_language("cn"));
        assert!(cn.get("a.ttf").is_none());
        let profile = cn.get_or_build_with("a.ttf", || Ok(vec!['中'])).unwrap();
        assert!(profile.contains('中'));
        assert_eq!(cn.build_count(), 1);

        let en_again =
            GlyphProfileRepository::open(&path, resolver(), CandidatePool::for_language("en"));
        assert!(en_again.get("a.ttf").is_none());
        let cn_again =
            GlyphProfileRepository::open(&path, resolver(), CandidatePool::for_language("cn"));
        assert!(cn_again.get("a.ttf").unwrap().contains('中'));
    }

    #[test]
    fn test_resolver_drives_profile() {
        let fake = FakeGlyphs::default()
            .with('A', Some(ring()))
            .with('B', Some(ring()))
            .with('C', Some(tofu()));
        let repo = repository(None);
        let profile = repo
            .get_or_build_with("fake", || {
                Ok(repo.resolver().resolve(&fake, &CandidatePool::latin()))
            })
            .unwrap();
        assert_eq!(profile.filter_text("ABCΩ D"), "AB ");
        assert!(!profile.contains('C'));
        assert!(profile.contains(' '));
    }

    #[test]
    fn test_warm_real_font() {
        let Some(font) = test_font_path() else {
            return;
        };
        let repo = repository(None);
        let store = FontStore::new();
        let built = repo.warm(&[font.clone(), PathBuf::from("/missing.ttf")], &store);
        assert_eq!(built, 1);
        let profile = repo.get(&font_key(&font)).unwrap();
        assert!(profile.contains('A'));
        assert!(!profile.contains('中'));
    }
}
