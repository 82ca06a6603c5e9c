//! Compatibility table lookup structures.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use super::format::*;
use crate::catalog::Scriptlet;
use crate::error::TableError;
use crate::types::{ContentType, Dialect, NameKind};

/// One scriptlet or redirect resource and its name in every dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub canonical: String,
    pub kind: NameKind,
    /// Catalog entry, for scriptlets.
    pub scriptlet: Option<Scriptlet>,
    /// Default content types, for redirects.
    pub content_types: ContentType,
    pub content_type_optional: bool,
    aliases: [Vec<String>; 3],
    values: [BTreeMap<String, String>; 3],
}

impl Entry {
    /// Name written when converting into `dialect`.
    pub fn designated(&self, dialect: Dialect) -> Option<&str> {
        self.aliases[dialect.index()].first().map(String::as_str)
    }

    /// Every name `dialect` accepts, designated name first.
    pub fn aliases(&self, dialect: Dialect) -> &[String] {
        &self.aliases[dialect.index()]
    }

    pub fn supports(&self, dialect: Dialect) -> bool {
        !self.aliases[dialect.index()].is_empty()
    }

    /// Rewrite an argument value for `dialect`, or return it unchanged.
    pub fn map_value<'a>(&'a self, dialect: Dialect, value: &'a str) -> &'a str {
        self.values[dialect.index()]
            .get(value)
            .map(String::as_str)
            .unwrap_or(value)
    }
}

/// Entries of one name kind plus their per-dialect name index.
#[derive(Debug, Clone)]
pub struct KindTable {
    kind: NameKind,
    entries: Vec<Entry>,
    by_canonical: HashMap<String, usize>,
    by_name: [HashMap<String, usize>; 3],
}

impl KindTable {
    fn empty(kind: NameKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            by_canonical: HashMap::new(),
            by_name: Default::default(),
        }
    }

    fn build(kind: NameKind, records: Vec<Record>) -> Result<Self, TableError> {
        let mut table = Self::empty(kind);

        for record in records {
            let entry = Self::entry_from_record(kind, record)?;
            if table.by_canonical.contains_key(&entry.canonical) {
                return Err(TableError::DuplicateEntry {
                    kind,
                    canonical: entry.canonical,
                });
            }
            table
                .by_canonical
                .insert(entry.canonical.clone(), table.entries.len());
            table.entries.push(entry);
        }

        // Names listed in the table win over derived ones
        for idx in 0..table.entries.len() {
            for dialect in Dialect::ALL {
                let names = table.entries[idx].aliases[dialect.index()].clone();
                for name in names {
                    table.insert_name(dialect, name, idx);
                }
            }
            let canonical = table.entries[idx].canonical.clone();
            table.insert_name(Dialect::AdGuard, canonical, idx);
        }

        // AdGuard also reads other dialects' scriptlet names behind a prefix
        let derived = if kind == NameKind::Scriptlet { table.entries.len() } else { 0 };
        for idx in 0..derived {
            for foreign in [Dialect::UBlock, Dialect::AdblockPlus] {
                let prefix = foreign.adguard_alias_prefix();
                let names = table.entries[idx].aliases[foreign.index()].clone();
                for name in names {
                    if let Some(stem) = name.strip_suffix(".js") {
                        table.insert_name(Dialect::AdGuard, format!("{prefix}{stem}"), idx);
                    }
                    table.insert_name(Dialect::AdGuard, format!("{prefix}{name}"), idx);
                }
            }
        }

        log::debug!(
            "Loaded {} {} entries ({} AdGuard, {} uBO, {} ABP names)",
            table.entries.len(),
            kind,
            table.by_name[0].len(),
            table.by_name[1].len(),
            table.by_name[2].len()
        );

        Ok(table)
    }

    fn entry_from_record(kind: NameKind, record: Record) -> Result<Entry, TableError> {
        let canonical = record.canonical.trim().to_string();
        if canonical.is_empty() {
            return Err(TableError::EmptyCanonical(kind));
        }

        let scriptlet = match kind {
            NameKind::Scriptlet => Some(
                Scriptlet::from_name(&canonical)
                    .ok_or_else(|| TableError::UnknownScriptlet(canonical.clone()))?,
            ),
            NameKind::Redirect => None,
        };

        let mut content_types = ContentType::empty();
        for name in &record.content_types {
            let flag = ContentType::from_modifier(name).ok_or_else(|| {
                TableError::UnknownContentType {
                    canonical: canonical.clone(),
                    content_type: name.clone(),
                }
            })?;
            content_types |= flag;
        }

        let aliases = Dialect::ALL.map(|d| {
            record
                .aliases
                .get(d)
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>()
        });
        let values = Dialect::ALL.map(|d| record.values.get(d).clone());

        Ok(Entry {
            canonical,
            kind,
            scriptlet,
            content_types,
            content_type_optional: record.content_type_optional,
            aliases,
            values,
        })
    }

    fn insert_name(&mut self, dialect: Dialect, name: String, idx: usize) {
        let map = &mut self.by_name[dialect.index()];
        match map.get(&name) {
            Some(&existing) if existing != idx => {
                log::warn!(
                    "{} name '{}' ({}) claimed by both {} and {}; keeping {}",
                    self.kind,
                    name,
                    dialect.as_str(),
                    self.entries[existing].canonical,
                    self.entries[idx].canonical,
                    self.entries[existing].canonical
                );
            }
            Some(_) => {}
            None => {
                map.insert(name, idx);
            }
        }
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_canonical(&self, canonical: &str) -> Option<&Entry> {
        self.by_canonical.get(canonical).map(|&idx| &self.entries[idx])
    }

    /// Find the entry `dialect` knows under `name`.
    ///
    /// uBO scriptlet names may omit their `.js` suffix.
    pub fn lookup(&self, name: &str, dialect: Dialect) -> Option<&Entry> {
        let map = &self.by_name[dialect.index()];
        let idx = map.get(name).copied().or_else(|| {
            if dialect == Dialect::UBlock && self.kind == NameKind::Scriptlet && !name.ends_with(".js") {
                map.get(&format!("{name}.js")).copied()
            } else {
                None
            }
        })?;
        Some(&self.entries[idx])
    }

    /// Every name `dialect` accepts, sorted.
    pub fn names(&self, dialect: Dialect) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name[dialect.index()]
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Scriptlet and redirect tables.
#[derive(Debug, Clone)]
pub struct CompatibilityTable {
    scriptlets: KindTable,
    redirects: KindTable,
}

static GLOBAL_TABLE: OnceLock<CompatibilityTable> = OnceLock::new();

impl CompatibilityTable {
    pub fn empty() -> Self {
        Self {
            scriptlets: KindTable::empty(NameKind::Scriptlet),
            redirects: KindTable::empty(NameKind::Redirect),
        }
    }

    pub fn from_file(file: TableFile) -> Result<Self, TableError> {
        Ok(Self {
            scriptlets: KindTable::build(NameKind::Scriptlet, file.scriptlets)?,
            redirects: KindTable::build(NameKind::Redirect, file.redirects)?,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(text)?;
        Self::from_file(file)
    }

    /// The table shipped with the crate.
    pub fn embedded() -> Result<Self, TableError> {
        Self::from_json(EMBEDDED_TABLE)
    }

    /// Process-wide embedded table, built on first use.
    ///
    /// A table that fails to load is logged and replaced with an empty one, so
    /// every lookup reports `NotFound` instead of panicking.
    pub fn global() -> &'static CompatibilityTable {
        GLOBAL_TABLE.get_or_init(|| match Self::embedded() {
            Ok(table) => table,
            Err(e) => {
                log::error!("Failed to load embedded compatibility table: {}", e);
                Self::empty()
            }
        })
    }

    pub fn kind(&self, kind: NameKind) -> &KindTable {
        match kind {
            NameKind::Scriptlet => &self.scriptlets,
            NameKind::Redirect => &self.redirects,
        }
    }

    pub fn scriptlets(&self) -> &KindTable {
        &self.scriptlets
    }

    pub fn redirects(&self) -> &KindTable {
        &self.redirects
    }

    pub fn lookup(&self, name: &str, dialect: Dialect, kind: NameKind) -> Option<&Entry> {
        self.kind(kind).lookup(name, dialect)
    }
}
