use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::weaviate::SchemaVariant;

/// Properties of a stored record, typed by schema variant.
///
/// Fields are optional because the store may return objects with missing
/// or non-text properties; such values are dropped at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum DocumentProperties {
    Command {
        command: Option<String>,
        description: Option<String>,
    },
    Passage {
        text: Option<String>,
        source: Option<String>,
    },
}

impl DocumentProperties {
    #[inline]
    pub fn command(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Command {
            command: Some(command.into()),
            description: Some(description.into()),
        }
    }

    #[inline]
    pub fn passage(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Passage {
            text: Some(text.into()),
            source: Some(source.into()),
        }
    }

    /// Build from a (primary, secondary) pair in the given layout.
    #[inline]
    pub fn from_pair(variant: SchemaVariant, primary: String, secondary: String) -> Self {
        match variant {
            SchemaVariant::Command => Self::command(primary, secondary),
            SchemaVariant::Passage => Self::passage(primary, secondary),
        }
    }

    /// Read the variant's fields from a raw store object.
    pub fn from_object(variant: SchemaVariant, object: &Map<String, Value>) -> Self {
        let field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match variant {
            SchemaVariant::Command => Self::Command {
                command: field("command"),
                description: field("description"),
            },
            SchemaVariant::Passage => Self::Passage {
                text: field("text"),
                source: field("source"),
            },
        }
    }

    /// Property map as sent to the store; missing fields are omitted.
    pub fn to_object(&self) -> Map<String, Value> {
        let variant = self.variant();
        let mut object = Map::new();
        if let Some(primary) = self.primary_opt() {
            object.insert(
                variant.primary_field().to_string(),
                Value::String(primary.to_string()),
            );
        }
        if let Some(secondary) = self.secondary_opt() {
            object.insert(
                variant.secondary_field().to_string(),
                Value::String(secondary.to_string()),
            );
        }
        object
    }

    #[inline]
    pub fn variant(&self) -> SchemaVariant {
        match self {
            Self::Command { .. } => SchemaVariant::Command,
            Self::Passage { .. } => SchemaVariant::Passage,
        }
    }

    fn primary_opt(&self) -> Option<&str> {
        match self {
            Self::Command { command, .. } => command.as_deref(),
            Self::Passage { text, .. } => text.as_deref(),
        }
    }

    fn secondary_opt(&self) -> Option<&str> {
        match self {
            Self::Command { description, .. } => description.as_deref(),
            Self::Passage { source, .. } => source.as_deref(),
        }
    }

    /// The deduplication key: the command or the passage text, `""` if missing.
    #[inline]
    pub fn primary(&self) -> &str {
        self.primary_opt().unwrap_or_default()
    }

    /// The description or the source, `""` if missing.
    #[inline]
    pub fn secondary(&self) -> &str {
        self.secondary_opt().unwrap_or_default()
    }
}

/// A search hit, alive for the duration of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: Option<String>,
    pub properties: DocumentProperties,
    /// Store-defined relevance, higher is better; not a probability.
    pub score: f32,
}

impl Candidate {
    #[inline]
    pub fn new(properties: DocumentProperties, score: f32) -> Self {
        Self {
            id: None,
            properties,
            score,
        }
    }

    #[inline]
    pub fn primary(&self) -> &str {
        self.properties.primary()
    }

    #[inline]
    pub fn secondary(&self) -> &str {
        self.properties.secondary()
    }
}
