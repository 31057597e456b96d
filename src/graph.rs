use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::entities::{Provenance, Stamped};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Property,
    Address,
    MailingAddress,
    Lot,
    Structure,
    Utility,
    Layout,
    Tax,
    Sales,
    Deed,
    File,
    Person,
    Company,
    Geometry,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Address => "address",
            Self::MailingAddress => "mailing_address",
            Self::Lot => "lot",
            Self::Structure => "structure",
            Self::Utility => "utility",
            Self::Layout => "layout",
            Self::Tax => "tax",
            Self::Sales => "sales",
            Self::Deed => "deed",
            Self::File => "file",
            Self::Person => "person",
            Self::Company => "company",
            Self::Geometry => "geometry",
        }
    }

    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::Property
                | Self::Address
                | Self::MailingAddress
                | Self::Lot
                | Self::Structure
                | Self::Utility
                | Self::Geometry
        )
    }
}

/// Pointer to an entity document, serialized as `{"/": "./<file>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    kind: EntityKind,
    file_name: String,
}

impl EntityRef {
    #[cfg(test)]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Serialize for EntityRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("/", &format!("./{}", self.file_name))?;
        map.end()
    }
}

#[derive(Serialize)]
struct Relationship<'a> {
    from: &'a EntityRef,
    to: &'a EntityRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub contents: String,
}

fn render<T: Serialize + ?Sized>(value: &T, file_name: &str) -> Result<String, PipelineError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| {
        PipelineError::Serialize {
            file_name: file_name.to_string(),
            source,
        }
    })?;
    text.push('\n');
    Ok(text)
}

#[derive(Debug)]
pub struct DocumentGraph {
    provenance: Provenance,
    documents: Vec<Document>,
    entity_counts: BTreeMap<EntityKind, usize>,
    relationship_counts: BTreeMap<(EntityKind, EntityKind), usize>,
}

impl DocumentGraph {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            documents: Vec::new(),
            entity_counts: BTreeMap::new(),
            relationship_counts: BTreeMap::new(),
        }
    }

    pub fn add<T: Serialize>(&mut self, kind: EntityKind, entity: &T) -> Result<EntityRef, PipelineError> {
        let count = self.entity_counts.entry(kind).or_insert(0);
        if kind.is_singleton() && *count > 0 {
            return Err(PipelineError::DuplicateSingleton {
                kind: kind.as_str(),
            });
        }
        *count += 1;
        let file_name = if kind.is_singleton() {
            format!("{}.json", kind.as_str())
        } else {
            format!("{}_{}.json", kind.as_str(), count)
        };

        let contents = render(
            &Stamped {
                entity,
                provenance: &self.provenance,
            },
            &file_name,
        )?;
        self.documents.push(Document {
            file_name: file_name.clone(),
            contents,
        });
        Ok(EntityRef { kind, file_name })
    }

    pub fn relate(&mut self, from: &EntityRef, to: &EntityRef) -> Result<(), PipelineError> {
        let count = self
            .relationship_counts
            .entry((from.kind, to.kind))
            .or_insert(0);
        *count += 1;
        let file_name = format!(
            "relationship_{}_{}_{}.json",
            from.kind.as_str(),
            to.kind.as_str(),
            count
        );
        let contents = render(&Relationship { from, to }, &file_name)?;
        self.documents.push(Document { file_name, contents });
        Ok(())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entity_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn relationship_count(&self) -> usize {
        self.relationship_counts.values().sum()
    }
}
