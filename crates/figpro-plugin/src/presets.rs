//! Preset prompt storage
//!
//! Maps trigger words to prompt templates. The store ships with three stock
//! presets so a fresh install responds to something; admins add, replace,
//! and delete entries at runtime and every change writes through to disk.

use std::collections::BTreeMap;
use std::path::Path;

use figpro_store::JsonStore;
use tokio::sync::Mutex;

/// Backing file for preset prompts.
pub const PRESETS_FILE: &str = "presets.json";

/// Presets seeded into an empty install.
const STOCK_PRESETS: [(&str, &str); 3] = [
    (
        "figurine",
        "Use the nano-banana model to create a 1/7 scale commercialized figure \
         of the character in the illustration, in a realistic style and \
         environment. Place the figure on a computer desk, using a circular \
         transparent acrylic base without any text. On the computer screen, \
         display the ZBrush modeling process of the figure. Next to the \
         computer screen, place a BANDAI-style toy packaging box printed with \
         the original artwork.",
    ),
    (
        "chibi",
        "Transform the character into a Nendoroid style Chibi figure. Big \
         head, small body, cute proportions, smooth plastic texture, 3D \
         rendering style.",
    ),
    (
        "itaroom",
        "Transform the room into an otaku's paradise, filled with anime \
         posters, figurines, and merchandise. Colorful LED lighting, messy \
         but cozy atmosphere.",
    ),
];

/// Persistent map from trigger word to prompt template.
#[derive(Debug)]
pub struct PresetStore {
    store: JsonStore<String>,
    presets: Mutex<BTreeMap<String, String>>,
}

impl PresetStore {
    /// Open the preset store under `data_dir`.
    ///
    /// A missing file is seeded with the stock presets; a present file is
    /// loaded as-is, so deleting every preset sticks across restarts.
    pub async fn open(data_dir: impl AsRef<Path>) -> Self {
        let store = JsonStore::new(data_dir.as_ref().join(PRESETS_FILE));
        let seed = !store.exists().await;
        let mut presets = store.load().await;

        if seed {
            for (key, prompt) in STOCK_PRESETS {
                presets.insert(key.to_string(), prompt.to_string());
            }
            if let Err(e) = store.save(&presets).await {
                tracing::error!(error = %e, "preset seed persist failed, serving from memory");
            }
            tracing::info!(presets = presets.len(), "preset store seeded with stock presets");
        }

        Self {
            store,
            presets: Mutex::new(presets),
        }
    }

    /// Prompt template for a trigger word, if one is configured.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.presets.lock().await.get(key).cloned()
    }

    /// Add or replace a preset and persist.
    pub async fn set(&self, key: &str, prompt: &str) {
        let mut presets = self.presets.lock().await;
        presets.insert(key.to_string(), prompt.to_string());
        self.persist(&presets).await;
    }

    /// Delete a preset and persist.
    ///
    /// Returns whether the trigger word was present.
    pub async fn remove(&self, key: &str) -> bool {
        let mut presets = self.presets.lock().await;
        let removed = presets.remove(key).is_some();
        if removed {
            self.persist(&presets).await;
        }
        removed
    }

    /// All presets as `(trigger, prompt)` pairs, sorted by trigger.
    pub async fn all(&self) -> Vec<(String, String)> {
        self.presets
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    async fn persist(&self, presets: &BTreeMap<String, String>) {
        if let Err(e) = self.store.save(presets).await {
            tracing::error!(error = %e, "preset persist failed, serving from memory");
        }
    }
}
