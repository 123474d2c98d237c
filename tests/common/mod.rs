// Shared fixtures for integration tests: a small topic model installed in a
// temporary model directory, and corpus helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use dvg::vector::{ModelShape, write_model};
use dvg::{
    ModelSpec, ScdvModel, SearchConfig, SearchOverrides, SearchSession, Settings, Tokenizer,
    WorkerPool, find_model_spec, load_model, tokenizer_for,
};
use tempfile::TempDir;

pub const MODEL_NAME: &str = "topics";

/// Words of the topic model with their cluster weights and idf vectors.
/// Three clusters: alpha/beta, river, gamma; stone straddles the last two.
const VOCABULARY: &[(&str, [f32; 3], [f32; 2])] = &[
    ("alpha", [1.0, 0.0, 0.0], [1.0, 0.0]),
    ("beta", [0.8, 0.2, 0.0], [0.2, 0.8]),
    ("river", [0.0, 1.0, 0.0], [0.5, 0.5]),
    ("stone", [0.0, 0.5, 0.5], [0.9, 0.1]),
    ("gamma", [0.0, 0.0, 1.0], [0.3, 0.7]),
];

pub fn vocabulary() -> Vec<&'static str> {
    VOCABULARY.iter().map(|(w, _, _)| *w).collect()
}

/// Writes the packed model and its `.model.toml` spec into `dir`.
pub fn install_model(dir: &Path) -> PathBuf {
    let words = vocabulary();
    let cluster_weights: Vec<f32> = VOCABULARY.iter().flat_map(|(_, c, _)| *c).collect();
    let idf: Vec<f32> = VOCABULARY.iter().flat_map(|(_, _, i)| *i).collect();
    let shape = ModelShape::new(3, 2).unwrap();

    let file = dir.join("topics.dvgm");
    write_model(&file, &words, shape, &cluster_weights, &idf).unwrap();
    std::fs::write(
        dir.join(format!("{MODEL_NAME}.model.toml")),
        "type = \"scdv\"\ntokenizer = \"ws\"\nfile = \"topics.dvgm\"\nversion = 1\n",
    )
    .unwrap();
    file
}

/// A temporary workspace with the topic model installed under `models/`.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("models");
        std::fs::create_dir_all(&models).unwrap();
        install_model(&models);

        let mut settings = Settings::default();
        settings.model.dir = models;
        settings.index_dir = dir.path().join(".dvg");
        Self { dir, settings }
    }

    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    pub fn open_model(&self) -> (ModelSpec, ScdvModel, Arc<dyn Tokenizer>) {
        let spec = find_model_spec(&self.settings.model.dir, MODEL_NAME).unwrap();
        let tokenizer = tokenizer_for(&spec.tokenizer).unwrap();
        let model = load_model(&spec.file).unwrap();
        (spec, model, tokenizer)
    }

    pub fn config(&self, overrides: SearchOverrides) -> SearchConfig {
        SearchConfig::new(&self.settings, overrides).unwrap()
    }

    pub fn session(&self, query: &str, overrides: SearchOverrides) -> SearchSession {
        let (_, model, tokenizer) = self.open_model();
        SearchSession::prepare(model, tokenizer, query, self.config(overrides)).unwrap()
    }
}

pub fn pool(workers: usize) -> WorkerPool {
    WorkerPool::new(workers, 1, 8, Arc::new(AtomicBool::new(false)))
}
