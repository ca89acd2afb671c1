//! Version registry and schema catalog
//!
//! Definitions are addressed by interchange version id (e.g. "00401",
//! "00501") plus functional-group or transaction-set code. The registry is
//! populated once at catalog load and read-only thereafter.

use crate::model::{ElementDef, InterchangeDef, SegmentDict, StructureDef, StructureKind};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// All definitions belonging to one interchange version
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    /// Root interchange definition
    pub interchange: Arc<InterchangeDef>,
    /// Functional group definitions by code (e.g. "PO")
    pub groups: HashMap<String, Arc<StructureDef>>,
    /// Transaction set definitions by code (e.g. "850")
    pub transactions: HashMap<String, Arc<StructureDef>>,
}

impl VersionCatalog {
    /// Create a catalog around an interchange definition.
    pub fn new(interchange: Arc<InterchangeDef>) -> Self {
        Self {
            interchange,
            groups: HashMap::new(),
            transactions: HashMap::new(),
        }
    }

    /// Register a functional group definition.
    pub fn add_group(&mut self, definition: Arc<StructureDef>) -> Result<()> {
        if definition.kind != StructureKind::FunctionalGroup {
            return Err(Error::InvalidSchema(format!(
                "{} registered as functional group but has kind {:?}",
                definition.id, definition.kind
            )));
        }
        self.groups.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Register a transaction set definition.
    pub fn add_transaction(&mut self, definition: Arc<StructureDef>) -> Result<()> {
        if definition.kind != StructureKind::TransactionSet {
            return Err(Error::InvalidSchema(format!(
                "{} registered as transaction set but has kind {:?}",
                definition.id, definition.kind
            )));
        }
        self.transactions.insert(definition.id.clone(), definition);
        Ok(())
    }
}

/// Registry of schema catalogs keyed by interchange version
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    versions: HashMap<String, VersionCatalog>,
    elements: HashMap<String, Arc<ElementDef>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version catalog; the interchange definition is validated.
    pub fn register(&mut self, catalog: VersionCatalog) -> Result<()> {
        catalog.interchange.validate()?;
        debug!(version = %catalog.interchange.version, "registering schema catalog");
        self.versions
            .insert(catalog.interchange.version.clone(), catalog);
        Ok(())
    }

    /// Register an element definition for id-based lookup.
    pub fn register_element(&mut self, definition: Arc<ElementDef>) -> Result<()> {
        definition.validate()?;
        self.elements.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Interchange definition for a version.
    pub fn interchange_def(&self, version: &str) -> Result<Arc<InterchangeDef>> {
        self.catalog(version)
            .map(|catalog| Arc::clone(&catalog.interchange))
    }

    /// Functional group definition for a version and group code.
    pub fn functional_group_def(&self, version: &str, code: &str) -> Result<Arc<StructureDef>> {
        self.catalog(version)?
            .groups
            .get(code)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("functional group {code} in version {version}")))
    }

    /// Transaction set definition for a version and transaction code.
    pub fn transaction_set_def(&self, version: &str, code: &str) -> Result<Arc<StructureDef>> {
        self.catalog(version)?
            .transactions
            .get(code)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("transaction set {code} in version {version}")))
    }

    /// Segment dictionary for a version.
    pub fn segment_dict(&self, version: &str) -> Result<Arc<SegmentDict>> {
        self.catalog(version)
            .map(|catalog| Arc::clone(&catalog.interchange.dict))
    }

    /// Element definition by id.
    pub fn element_def(&self, id: &str) -> Result<Arc<ElementDef>> {
        self.elements
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("element {id}")))
    }

    /// Whether a version is registered.
    pub fn contains(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    /// Registered version ids, sorted.
    pub fn versions(&self) -> Vec<&String> {
        let mut versions: Vec<_> = self.versions.keys().collect();
        versions.sort();
        versions
    }

    fn catalog(&self, version: &str) -> Result<&VersionCatalog> {
        self.versions
            .get(version)
            .ok_or_else(|| Error::NotFound(format!("interchange version {version}")))
    }
}

/// Thread-safe registry wrapper for global sharing
#[derive(Debug, Default)]
pub struct ConcurrentSchemaRegistry {
    inner: RwLock<SchemaRegistry>,
}

impl ConcurrentSchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version catalog.
    pub fn register(&self, catalog: VersionCatalog) -> Result<()> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .register(catalog)
    }

    /// Register an element definition.
    pub fn register_element(&self, definition: Arc<ElementDef>) -> Result<()> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .register_element(definition)
    }

    /// Interchange definition for a version.
    pub fn interchange_def(&self, version: &str) -> Result<Arc<InterchangeDef>> {
        self.read(|registry| registry.interchange_def(version))
    }

    /// Functional group definition for a version and group code.
    pub fn functional_group_def(&self, version: &str, code: &str) -> Result<Arc<StructureDef>> {
        self.read(|registry| registry.functional_group_def(version, code))
    }

    /// Transaction set definition for a version and transaction code.
    pub fn transaction_set_def(&self, version: &str, code: &str) -> Result<Arc<StructureDef>> {
        self.read(|registry| registry.transaction_set_def(version, code))
    }

    /// Segment dictionary for a version.
    pub fn segment_dict(&self, version: &str) -> Result<Arc<SegmentDict>> {
        self.read(|registry| registry.segment_dict(version))
    }

    /// Element definition by id.
    pub fn element_def(&self, id: &str) -> Result<Arc<ElementDef>> {
        self.read(|registry| registry.element_def(id))
    }

    /// Whether a version is registered.
    pub fn contains(&self, version: &str) -> bool {
        self.read(|registry| Ok(registry.contains(version)))
            .unwrap_or(false)
    }

    fn read<T>(&self, f: impl FnOnce(&SchemaRegistry) -> Result<T>) -> Result<T> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }
}
