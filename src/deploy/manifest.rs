//! Desired-state manifests.
//!
//! A manifest is either one TOML file:
//!
//! ```toml
//! [app]
//! name = "crm"
//! title = "Customers"
//! slug = "customers"
//! groups = ["staff"]
//!
//! [[resources]]
//! name = "warehouse"
//! type = "postgres"
//! connection = { host = "db" }
//!
//! [[queries]]
//! name = "orders"
//! resource = "warehouse"
//! content = "select * from orders"
//! ```
//!
//! or a directory of TOML documents, one entity each, tagged with
//! `kind = "app" | "query" | "resource"`. Directory walks respect
//! `.gitignore` and visit files in name order.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::Deserialize;

use crate::model::ResourceKind;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: ignore::Error,
    },

    #[error("no app defined under {}", .0.display())]
    MissingApp(PathBuf),

    #[error("more than one app defined under {}", .0.display())]
    DuplicateApp(PathBuf),

    #[error("{kind} {name:?} is defined more than once")]
    Duplicate { kind: &'static str, name: String },
}

/// The desired app. `groups` holds group names, resolved at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppSpec {
    pub name: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A desired query template. `resource` is a resource name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuerySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default = "empty_object")]
    pub connection: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Everything one deploy should bring into existence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    pub app: AppSpec,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

/// One document of a manifest directory.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Document {
    App(AppSpec),
    Query(QuerySpec),
    Resource(ResourceSpec),
}

impl Manifest {
    /// Loads a manifest from a file or a directory of documents.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let manifest = if path.is_dir() {
            Self::load_dir(path)?
        } else {
            let contents = read(path)?;
            toml::from_str(&contents).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        manifest.check_unique()?;
        Ok(manifest)
    }

    fn load_dir(root: &Path) -> Result<Self, ManifestError> {
        let mut app = None;
        let mut queries = Vec::new();
        let mut resources = Vec::new();

        let mut builder = WalkBuilder::new(root);
        builder.sort_by_file_name(Ord::cmp);
        for entry in builder.build() {
            let entry = entry.map_err(|source| ManifestError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_some_and(|ft| ft.is_file())
                || path.extension().and_then(|e| e.to_str()) != Some("toml")
            {
                continue;
            }

            let contents = read(path)?;
            let document: Document = toml::from_str(&contents).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "loaded manifest document");
            match document {
                Document::App(spec) => {
                    if app.replace(spec).is_some() {
                        return Err(ManifestError::DuplicateApp(root.to_path_buf()));
                    }
                }
                Document::Query(spec) => queries.push(spec),
                Document::Resource(spec) => resources.push(spec),
            }
        }

        Ok(Self {
            app: app.ok_or_else(|| ManifestError::MissingApp(root.to_path_buf()))?,
            queries,
            resources,
        })
    }

    fn check_unique(&self) -> Result<(), ManifestError> {
        unique("query", self.queries.iter().map(|q| q.name.as_str()))?;
        unique("resource", self.resources.iter().map(|r| r.name.as_str()))
    }
}

fn unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<(), ManifestError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ManifestError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const SINGLE: &str = r#"
[app]
name = "crm"
title = "Customers"
slug = "customers"
groups = ["staff"]

[[resources]]
name = "warehouse"
type = "postgres"
connection = { host = "db", port = 5432 }

[[queries]]
name = "orders"
resource = "warehouse"
content = "select * from orders"
"#;

    #[test]
    fn loads_a_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, SINGLE).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.app.name, "crm");
        assert_eq!(manifest.app.groups, ["staff"]);
        assert_eq!(manifest.app.description, "");
        assert_eq!(manifest.resources[0].kind, ResourceKind::Postgres);
        assert_eq!(manifest.resources[0].connection, json!({ "host": "db", "port": 5432 }));
        assert_eq!(manifest.queries[0].resource, "warehouse");
    }

    #[test]
    fn loads_a_directory_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("app.toml"),
            "kind = \"app\"\nname = \"crm\"\ntitle = \"Customers\"\nslug = \"customers\"\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("queries")).unwrap();
        fs::write(
            dir.path().join("queries").join("b.toml"),
            "kind = \"query\"\nname = \"second\"\nresource = \"warehouse\"\ncontent = \"select 2\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("queries").join("a.toml"),
            "kind = \"query\"\nname = \"first\"\nresource = \"warehouse\"\ncontent = \"select 1\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("warehouse.toml"),
            "kind = \"resource\"\nname = \"warehouse\"\ntype = \"mysql\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "not a manifest").unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.app.name, "crm");
        let names: Vec<_> = manifest.queries.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(manifest.resources[0].connection, json!({}));
    }

    #[test]
    fn directory_needs_exactly_one_app() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Manifest::load(dir.path()),
            Err(ManifestError::MissingApp(_))
        ));

        let app = "kind = \"app\"\nname = \"crm\"\ntitle = \"T\"\nslug = \"t\"\n";
        fs::write(dir.path().join("a.toml"), app).unwrap();
        fs::write(dir.path().join("b.toml"), app).unwrap();
        assert!(matches!(
            Manifest::load(dir.path()),
            Err(ManifestError::DuplicateApp(_))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        let doubled = format!(
            "{SINGLE}\n[[queries]]\nname = \"orders\"\nresource = \"warehouse\"\ncontent = \"select 1\"\n"
        );
        fs::write(&path, doubled).unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Duplicate { kind: "query", .. }));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[app\n").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
