use std::collections::HashMap;
use std::path::Path;

use crate::{error::ArtifactError, models::Film};

/// Film metadata table, keyed by Letterboxd film id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    films: HashMap<String, Film>,
}

impl Catalog {
    pub fn new(films: impl IntoIterator<Item = Film>) -> Self {
        Self {
            films: films.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    /// Loads a JSON array of films
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let films: Vec<Film> =
            serde_json::from_str(&contents).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let catalog = Self::new(films);
        tracing::info!(path = %path.display(), films = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Film> {
        self.films.get(id)
    }

    pub fn len(&self) -> usize {
        self.films.len()
    }

    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("catalog-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"id": "a", "name": "A", "runTime": 90}, {"id": "b", "name": "B"}]"#,
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().run_time, Some(90));
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
