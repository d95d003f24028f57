/// Common test utilities
use async_trait::async_trait;
use radio_charts::popularity::{PopularityError, PopularitySource};
use std::collections::HashMap;
use std::path::Path;

/// Popularity source answering from a fixed title -> score table
pub struct ScriptedSource {
    scores: HashMap<String, f64>,
}

impl ScriptedSource {
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(title, score)| (title.to_string(), *score))
                .collect(),
        }
    }
}

#[async_trait]
impl PopularitySource for ScriptedSource {
    async fn fetch_popularity(&self, artist: &str, title: &str) -> Result<f64, PopularityError> {
        self.scores
            .get(title)
            .copied()
            .ok_or_else(|| PopularityError::NotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            })
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

/// Write a file, creating parent directories
pub fn write_file(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[allow(dead_code)]
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
