//! Schema catalog loader
//!
//! Reads version catalogs from JSON or YAML files into the immutable model.
//! The file format uses flat id-keyed sections (code lists, elements,
//! composites, segments, loops, transactions, groups, interchange) with
//! references resolved after deserialization. All model invariants are
//! checked during conversion; violations are fatal `InvalidSchema` errors.

use crate::codelist::CodeList;
use crate::model::{
    ChildDef, ChildUse, ComponentUse, CompositeDef, ElementDef, ElementKind, ElementUse,
    InterchangeDef, Requirement, RepeatCount, SegmentDef, SegmentDict, SlotDef, StructureDef,
    StructureKind,
};
use crate::registry::VersionCatalog;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Serializable catalog format for loading from files
#[derive(Debug, Deserialize)]
struct SchemaFile {
    version: String,
    #[serde(default)]
    code_lists: Vec<CodeListFile>,
    #[serde(default)]
    elements: Vec<ElementFile>,
    #[serde(default)]
    composites: Vec<CompositeFile>,
    #[serde(default)]
    segments: Vec<SegmentFile>,
    #[serde(default)]
    loops: Vec<StructureFile>,
    #[serde(default)]
    transactions: Vec<StructureFile>,
    #[serde(default)]
    groups: Vec<StructureFile>,
    interchange: StructureFile,
}

#[derive(Debug, Deserialize)]
struct CodeListFile {
    name: String,
    codes: Vec<String>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
struct ElementFile {
    id: String,
    #[serde(default)]
    name: String,
    kind: String,
    #[serde(default = "default_min_length")]
    min_length: usize,
    #[serde(default = "default_max_length")]
    max_length: usize,
    #[serde(default)]
    codes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompositeFile {
    id: String,
    #[serde(default)]
    name: String,
    components: Vec<ComponentFile>,
}

#[derive(Debug, Deserialize)]
struct ComponentFile {
    element: String,
    #[serde(default)]
    requirement: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SegmentFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    elements: Vec<ElementUseFile>,
}

#[derive(Debug, Deserialize)]
struct ElementUseFile {
    #[serde(default)]
    element: Option<String>,
    #[serde(default)]
    composite: Option<String>,
    #[serde(default)]
    requirement: Option<String>,
    #[serde(default)]
    repeat: Option<RepeatFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepeatFile {
    Bounded(u32),
    Keyword(String),
}

#[derive(Debug, Deserialize)]
struct StructureFile {
    id: String,
    #[serde(default)]
    name: String,
    children: Vec<ChildFile>,
}

#[derive(Debug, Deserialize)]
struct ChildFile {
    #[serde(default)]
    segment: Option<String>,
    #[serde(default, rename = "loop")]
    loop_ref: Option<String>,
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    requirement: Option<String>,
    #[serde(default)]
    repeat: Option<RepeatFile>,
}

fn default_true() -> bool {
    true
}

fn default_min_length() -> usize {
    1
}

fn default_max_length() -> usize {
    35
}

/// Loader that resolves schema files from a set of search paths
pub struct SchemaLoader {
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a new loader with the given search paths.
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self { schema_paths }
    }

    /// Add a search path for schema files.
    pub fn add_path(&mut self, path: PathBuf) {
        self.schema_paths.push(path);
    }

    /// Load a version catalog by interchange version id.
    ///
    /// Looks for `<version>.json`, `<version>.yaml`, or `<version>.yml` in
    /// the search paths.
    pub fn load(&self, version: &str) -> Result<VersionCatalog> {
        let variations = [
            format!("{}.json", version.to_lowercase()),
            format!("{}.yaml", version.to_lowercase()),
            format!("{}.yml", version.to_lowercase()),
        ];

        for path in &self.schema_paths {
            for variation in &variations {
                let file_path = path.join(variation);
                if file_path.exists() {
                    trace!("Found schema file: {:?}", file_path);
                    return self.load_from_file(&file_path);
                }
            }
        }

        Err(Error::NotFound(format!(
            "schema for version {} not found in search paths: {:?}",
            version, self.schema_paths
        )))
    }

    /// Load a version catalog from a specific file path.
    pub fn load_from_file(&self, path: &Path) -> Result<VersionCatalog> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            self.load_from_yaml(&content)
        } else {
            self.load_from_json(&content)
        }
    }

    /// Load a version catalog from a JSON string.
    pub fn load_from_json(&self, json: &str) -> Result<VersionCatalog> {
        let schema_file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        convert_schema_file(schema_file)
    }

    /// Load a version catalog from a YAML string.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<VersionCatalog> {
        let schema_file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        convert_schema_file(schema_file)
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

fn convert_schema_file(file: SchemaFile) -> Result<VersionCatalog> {
    debug!(version = %file.version, "converting schema file");

    let mut code_lists: HashMap<String, Arc<CodeList>> = HashMap::new();
    for list_file in file.code_lists {
        let list =
            CodeList::with_codes(&list_file.name, list_file.codes).case_sensitive(list_file.case_sensitive);
        code_lists.insert(list_file.name, Arc::new(list));
    }

    let mut elements: HashMap<String, Arc<ElementDef>> = HashMap::new();
    for element_file in file.elements {
        let mut def = ElementDef::new(
            &element_file.id,
            &element_file.name,
            parse_kind(&element_file.id, &element_file.kind)?,
        )
        .length(element_file.min_length, element_file.max_length);
        if let Some(list_name) = &element_file.codes {
            let list = code_lists.get(list_name).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "element {} references unknown code list {}",
                    element_file.id, list_name
                ))
            })?;
            def = def.with_code_list(Arc::clone(list));
        }
        def.validate()?;
        elements.insert(element_file.id, Arc::new(def));
    }

    let mut composites: HashMap<String, Arc<CompositeDef>> = HashMap::new();
    for composite_file in file.composites {
        let mut components = Vec::new();
        for component_file in &composite_file.components {
            let definition = elements.get(&component_file.element).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "composite {} references unknown element {}",
                    composite_file.id, component_file.element
                ))
            })?;
            components.push(
                ComponentUse::new(Arc::clone(definition))
                    .require(parse_requirement(component_file.requirement.as_deref())?),
            );
        }
        let def = CompositeDef::new(&composite_file.id, &composite_file.name)
            .with_components(components);
        def.validate()?;
        composites.insert(composite_file.id, Arc::new(def));
    }

    let mut segments: HashMap<String, Arc<SegmentDef>> = HashMap::new();
    let mut dict = SegmentDict::new();
    for segment_file in file.segments {
        let mut uses = Vec::new();
        for use_file in &segment_file.elements {
            let slot = match (&use_file.element, &use_file.composite) {
                (Some(element_id), None) => {
                    SlotDef::Simple(Arc::clone(elements.get(element_id).ok_or_else(|| {
                        Error::InvalidSchema(format!(
                            "segment {} references unknown element {}",
                            segment_file.id, element_id
                        ))
                    })?))
                }
                (None, Some(composite_id)) => {
                    SlotDef::Composite(Arc::clone(composites.get(composite_id).ok_or_else(
                        || {
                            Error::InvalidSchema(format!(
                                "segment {} references unknown composite {}",
                                segment_file.id, composite_id
                            ))
                        },
                    )?))
                }
                _ => {
                    return Err(Error::InvalidSchema(format!(
                        "segment {}: element use must name exactly one of element/composite",
                        segment_file.id
                    )));
                }
            };
            uses.push(ElementUse {
                slot,
                requirement: parse_requirement(use_file.requirement.as_deref())?,
                repeat: parse_repeat(use_file.repeat.as_ref())?,
            });
        }
        let def = SegmentDef::new(&segment_file.id)
            .named(&segment_file.name)
            .purpose(&segment_file.purpose)
            .with_elements(uses);
        def.validate()?;
        let def = Arc::new(def);
        dict.insert(Arc::clone(&def));
        segments.insert(segment_file.id, def);
    }

    let mut resolver = StructureResolver {
        segments: &segments,
        loops: file
            .loops
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect(),
        resolved_loops: HashMap::new(),
        transactions: HashMap::new(),
        groups: HashMap::new(),
    };

    let loop_ids: Vec<String> = resolver.loops.keys().cloned().collect();
    for id in loop_ids {
        resolver.resolve_loop(&id, &mut HashSet::new())?;
    }

    for transaction_file in file.transactions {
        let def = resolver.convert(StructureKind::TransactionSet, &transaction_file)?;
        resolver.transactions.insert(def.id.clone(), def);
    }
    for group_file in file.groups {
        let def = resolver.convert(StructureKind::FunctionalGroup, &group_file)?;
        resolver.groups.insert(def.id.clone(), def);
    }
    let interchange_structure = resolver.convert(StructureKind::Interchange, &file.interchange)?;

    let interchange = Arc::new(InterchangeDef::new(
        &file.version,
        interchange_structure,
        Arc::new(dict),
    ));
    interchange.validate()?;

    let mut catalog = VersionCatalog::new(interchange);
    for def in resolver.transactions.into_values() {
        catalog.add_transaction(def)?;
    }
    for def in resolver.groups.into_values() {
        catalog.add_group(def)?;
    }
    Ok(catalog)
}

struct StructureResolver<'a> {
    segments: &'a HashMap<String, Arc<SegmentDef>>,
    loops: HashMap<String, StructureFile>,
    resolved_loops: HashMap<String, Arc<StructureDef>>,
    transactions: HashMap<String, Arc<StructureDef>>,
    groups: HashMap<String, Arc<StructureDef>>,
}

impl StructureResolver<'_> {
    fn resolve_loop(
        &mut self,
        id: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<Arc<StructureDef>> {
        if let Some(resolved) = self.resolved_loops.get(id) {
            return Ok(Arc::clone(resolved));
        }
        if !in_progress.insert(id.to_string()) {
            return Err(Error::InvalidSchema(format!(
                "circular loop reference involving {id}"
            )));
        }

        let file = self.loops.remove(id).ok_or_else(|| {
            Error::InvalidSchema(format!("reference to unknown loop {id}"))
        })?;
        let mut children = Vec::new();
        for child_file in &file.children {
            children.push(self.convert_child(child_file, in_progress)?);
        }
        let def = StructureDef::new(StructureKind::Loop, id)
            .named(&file.name)
            .with_children(children);
        def.validate()?;
        let def = Arc::new(def);
        in_progress.remove(id);
        self.resolved_loops.insert(id.to_string(), Arc::clone(&def));
        Ok(def)
    }

    fn convert(&mut self, kind: StructureKind, file: &StructureFile) -> Result<Arc<StructureDef>> {
        let mut children = Vec::new();
        for child_file in &file.children {
            children.push(self.convert_child(child_file, &mut HashSet::new())?);
        }
        let def = StructureDef::new(kind, &file.id)
            .named(&file.name)
            .with_children(children);
        def.validate()?;
        Ok(Arc::new(def))
    }

    fn convert_child(
        &mut self,
        file: &ChildFile,
        in_progress: &mut HashSet<String>,
    ) -> Result<ChildUse> {
        let child = match (&file.segment, &file.loop_ref, &file.transaction, &file.group) {
            (Some(id), None, None, None) => {
                ChildDef::Segment(Arc::clone(self.segments.get(id).ok_or_else(|| {
                    Error::InvalidSchema(format!("reference to unknown segment {id}"))
                })?))
            }
            (None, Some(id), None, None) => {
                ChildDef::Structure(self.resolve_loop(id, in_progress)?)
            }
            (None, None, Some(id), None) => {
                ChildDef::Structure(self.transactions.get(id).cloned().ok_or_else(|| {
                    Error::InvalidSchema(format!("reference to unknown transaction set {id}"))
                })?)
            }
            (None, None, None, Some(id)) => {
                ChildDef::Structure(self.groups.get(id).cloned().ok_or_else(|| {
                    Error::InvalidSchema(format!("reference to unknown functional group {id}"))
                })?)
            }
            _ => {
                return Err(Error::InvalidSchema(
                    "structure child must name exactly one of segment/loop/transaction/group"
                        .to_string(),
                ));
            }
        };
        Ok(ChildUse {
            child,
            requirement: parse_requirement(file.requirement.as_deref())?,
            repeat: parse_repeat(file.repeat.as_ref())?,
        })
    }
}

fn parse_kind(element_id: &str, kind: &str) -> Result<ElementKind> {
    let normalized = kind.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "id" => Ok(ElementKind::Id),
        "an" => Ok(ElementKind::Text),
        "r" => Ok(ElementKind::Decimal),
        "dt" => Ok(ElementKind::Date),
        "tm" => Ok(ElementKind::Time),
        _ => {
            if let Some(digits) = normalized.strip_prefix('n') {
                let precision = if digits.is_empty() {
                    0
                } else {
                    digits.parse::<u8>().map_err(|_| {
                        Error::InvalidFormat(format!(
                            "element {element_id}: unknown kind '{kind}'"
                        ))
                    })?
                };
                Ok(ElementKind::Numeric { precision })
            } else {
                Err(Error::InvalidFormat(format!(
                    "element {element_id}: unknown kind '{kind}'"
                )))
            }
        }
    }
}

fn parse_requirement(requirement: Option<&str>) -> Result<Requirement> {
    let Some(requirement) = requirement else {
        return Ok(Requirement::Optional);
    };
    match requirement.trim().to_ascii_uppercase().as_str() {
        "M" | "MANDATORY" => Ok(Requirement::Mandatory),
        "O" | "OPTIONAL" => Ok(Requirement::Optional),
        "X" | "RELATIONAL" => Ok(Requirement::Relational),
        "N" | "NOTUSED" | "NOT_USED" => Ok(Requirement::NotUsed),
        other => Err(Error::InvalidFormat(format!(
            "unknown requirement '{other}'"
        ))),
    }
}

fn parse_repeat(repeat: Option<&RepeatFile>) -> Result<RepeatCount> {
    match repeat {
        None => Ok(RepeatCount::bounded(1)),
        Some(RepeatFile::Bounded(n)) => Ok(RepeatCount::bounded(*n)),
        Some(RepeatFile::Keyword(word)) => {
            if word.eq_ignore_ascii_case("unbounded") {
                Ok(RepeatCount::unbounded())
            } else {
                Err(Error::InvalidFormat(format!(
                    "unknown repeat count '{word}'"
                )))
            }
        }
    }
}
