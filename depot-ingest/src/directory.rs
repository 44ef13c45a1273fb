//! Id -> display-name lookups for clients and couriers.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    names: HashMap<String, String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Two-column CSV with an `id,name` header.
    pub fn read_csv(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut dir = Directory::new();
        for result in rdr.records() {
            let record = result?;
            let id = record.get(0).unwrap_or("");
            let name = record.get(1).unwrap_or("");
            if id.is_empty() || name.is_empty() {
                continue;
            }
            dir.insert(id, name);
        }
        Ok(dir)
    }
}

pub fn parse_directory_csv(path: impl AsRef<Path>) -> Result<Directory> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Directory::read_csv(file).with_context(|| format!("parsing {}", path.display()))
}
