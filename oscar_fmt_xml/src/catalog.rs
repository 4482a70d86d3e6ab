//! Lazily loaded catalogs of reusable entities and maneuvers.

use crate::parser::{self, ATTR_NAME, DocumentError, Element, TAG_CATALOG};
use anyhow::{Context, bail};
use hashbrown::{HashMap, HashSet};
use log::{error, info, trace, warn};
use std::path::{Path, PathBuf};

/// The kinds of catalog a scenario can declare a location for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    /// `VehicleCatalog`
    Vehicle,
    /// `PedestrianCatalog`
    Pedestrian,
    /// `MiscObjectCatalog`
    MiscObject,
    /// `ManeuverCatalog`
    Maneuver,
}

impl CatalogKind {
    /// Catalogs an entity definition can come from.
    pub const ENTITIES: &'static [CatalogKind] = &[
        CatalogKind::Vehicle,
        CatalogKind::Pedestrian,
        CatalogKind::MiscObject,
    ];

    /// Catalogs a maneuver can come from.
    pub const MANEUVERS: &'static [CatalogKind] = &[CatalogKind::Maneuver];

    /// The kind of catalog declared by a tag of `CatalogLocations`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            parser::TAG_VEHICLE_CATALOG => Some(CatalogKind::Vehicle),
            parser::TAG_PEDESTRIAN_CATALOG => Some(CatalogKind::Pedestrian),
            parser::TAG_MISC_OBJECT_CATALOG => Some(CatalogKind::MiscObject),
            parser::TAG_MANEUVER_CATALOG => Some(CatalogKind::Maneuver),
            _ => None,
        }
    }
}

/// Cache of catalog entries, keyed by catalog directory, catalog name and entry name.
///
/// A directory is read the first time an entry is looked up in it.
#[derive(Debug, Default)]
pub(crate) struct Catalogs {
    directories: HashMap<CatalogKind, PathBuf>,
    scanned: HashSet<PathBuf>,
    entries: HashMap<(PathBuf, String, String), Element>,
}

impl Catalogs {
    pub(crate) fn set_directory(&mut self, kind: CatalogKind, directory: PathBuf) {
        info!(target: "builder", "{kind:?} catalog at '{}'", directory.display());
        if let Some(previous) = self.directories.insert(kind, directory) {
            warn!(target: "builder", "{kind:?} catalog location '{}' overridden", previous.display());
        }
    }

    /// Looks up an entry among the catalogs of the given kinds.
    pub(crate) fn entry(
        &mut self,
        kinds: &[CatalogKind],
        catalog: &str,
        entry: &str,
    ) -> anyhow::Result<Element> {
        for kind in kinds {
            let Some(directory) = self.directories.get(kind).cloned() else {
                continue;
            };
            if !self.scanned.contains(&directory) {
                self.scan(&directory)?;
            }
            let key = (directory, catalog.to_owned(), entry.to_owned());
            if let Some(definition) = self.entries.get(&key) {
                trace!(target: "builder", "found entry '{entry}' in catalog '{catalog}'");
                return Ok(definition.clone());
            }
        }
        error!(target: "builder", "catalog '{catalog}' has no entry '{entry}'");
        bail!(DocumentError::CatalogEntryNotFound {
            catalog: catalog.to_owned(),
            entry: entry.to_owned(),
        })
    }

    fn scan(&mut self, directory: &Path) -> anyhow::Result<()> {
        info!(target: "builder", "reading catalog directory '{}'", directory.display());
        let mut paths = std::fs::read_dir(directory)
            .with_context(|| format!("failed to read directory '{}'", directory.display()))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read directory entry")?;
        paths.sort();
        for path in paths {
            if path.extension().is_none_or(|ext| ext != "xosc") {
                trace!(target: "builder", "skipping '{}'", path.display());
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read file '{}'", path.display()))?;
            let root = parser::parse(&text)
                .with_context(|| format!("failed to parse catalog '{}'", path.display()))?;
            let catalog = root.required(TAG_CATALOG)?;
            let name = catalog.attribute(ATTR_NAME).ok_or_else(|| {
                error!(target: "builder", "catalog in '{}' has no name", path.display());
                DocumentError::MissingAttribute {
                    element: TAG_CATALOG.to_owned(),
                    attribute: ATTR_NAME.to_owned(),
                }
            })?;
            for definition in &catalog.children {
                let Some(entry) = definition.attribute(ATTR_NAME) else {
                    warn!(target: "builder", "unnamed '{}' in catalog '{name}'", definition.tag);
                    continue;
                };
                let key = (directory.to_owned(), name.to_owned(), entry.to_owned());
                if self.entries.contains_key(&key) {
                    warn!(target: "builder", "entry '{entry}' declared multiple times in catalog '{name}'");
                    continue;
                }
                trace!(target: "builder", "catalog '{name}': entry '{entry}'");
                self.entries.insert(key, definition.clone());
            }
        }
        self.scanned.insert(directory.to_owned());
        Ok(())
    }
}
