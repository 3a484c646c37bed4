//! Collection administration: create, list and delete.
//!
//! Destructive choices are explicit parameters so the caller decides how
//! to obtain them (an interactive prompt on the CLI, a literal in tests).

use tracing::{info, warn};

use super::{CollectionInfo, CollectionSchema, WeaviateClient, normalize_collection_name};
use crate::{RagError, Result};

/// What to do when the collection to create already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingCollection {
    /// Drop it and create it again, losing its records.
    Recreate,
    /// Leave it untouched.
    Skip,
    /// Report [`RagError::CollectionExists`].
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Recreated,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The collection was removed; `objects` is its size beforehand, if known.
    Deleted { objects: Option<u64> },
    /// The caller did not confirm, nothing was changed.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub info: CollectionInfo,
    /// `None` when the count could not be retrieved.
    pub objects: Option<u64>,
}

pub fn create_collection(
    client: &WeaviateClient,
    schema: &CollectionSchema,
    on_existing: ExistingCollection,
) -> Result<CreateOutcome> {
    let name = normalize_collection_name(&schema.name)?;

    if !client.collection_exists(&name)? {
        client.create_collection(schema)?;
        return Ok(CreateOutcome::Created);
    }

    match on_existing {
        ExistingCollection::Skip => {
            info!("Collection {} already exists, leaving it as is", name);
            Ok(CreateOutcome::Skipped)
        }
        ExistingCollection::Fail => Err(RagError::CollectionExists { name }),
        ExistingCollection::Recreate => {
            warn!("Recreating existing collection {}", name);
            client.delete_collection(&name)?;
            client.create_collection(schema)?;
            Ok(CreateOutcome::Recreated)
        }
    }
}

/// Delete a collection once the caller has confirmed it.
///
/// A missing collection is reported before confirmation matters, so the
/// caller can offer the list of existing ones instead.
pub fn delete_collection(
    client: &WeaviateClient,
    name: &str,
    confirmed: bool,
) -> Result<DeleteOutcome> {
    let name = normalize_collection_name(name)?;

    if !client.collection_exists(&name)? {
        return Err(RagError::CollectionNotFound { name });
    }

    if !confirmed {
        info!("Deletion of {} cancelled", name);
        return Ok(DeleteOutcome::Cancelled);
    }

    let objects = client.aggregate_count(&name).ok();
    client.delete_collection(&name)?;

    if client.collection_exists(&name)? {
        return Err(RagError::VectorStore(format!(
            "collection {name} still exists after deletion"
        )));
    }

    Ok(DeleteOutcome::Deleted { objects })
}

/// Every collection with its object count.
pub fn list_collections(client: &WeaviateClient) -> Result<Vec<CollectionSummary>> {
    let collections = client.list_collections()?;

    Ok(collections
        .into_iter()
        .map(|info| {
            let objects = match client.aggregate_count(&info.name) {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Could not count objects in {}: {}", info.name, e);
                    None
                }
            };
            CollectionSummary { info, objects }
        })
        .collect())
}
