//! Parse context, information values and requirements.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::locale::Localizer;

/// Identifies a piece of information supplied by the embedder, e.g. the player issuing a
/// command. Tags distinguish several values of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InformationId {
    pub name: String,
    pub tags: Vec<String>,
}

impl InformationId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
        }
    }

    pub fn tagged<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for InformationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.tags.join(", "))
        }
    }
}

/// A typed value made available to requirements and handlers.
#[derive(Clone)]
pub struct Information {
    pub id: InformationId,
    pub description: Option<String>,
    value: Arc<dyn Any + Send + Sync>,
}

impl Information {
    pub fn new<T: Any + Send + Sync>(id: InformationId, value: T) -> Self {
        Self {
            id,
            description: None,
            value: Arc::new(value),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Information")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Per-call state threaded through parsing: information values and the localizer.
///
/// Cloning is cheap; information is held in a persistent map.
#[derive(Clone, Default)]
pub struct ParseContext {
    information: im::HashMap<InformationId, Information>,
    localizer: Option<Arc<dyn Localizer>>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_information(mut self, information: Information) -> Self {
        self.insert(information);
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    pub fn insert(&mut self, information: Information) {
        self.information.insert(information.id.clone(), information);
    }

    pub fn information(&self, id: &InformationId) -> Option<&Information> {
        self.information.get(id)
    }

    /// Typed lookup of an information value.
    pub fn get<T: Any>(&self, id: &InformationId) -> Option<&T> {
        self.information(id)?.get::<T>()
    }

    pub fn localizer(&self) -> Option<&dyn Localizer> {
        self.localizer.as_deref()
    }
}

impl fmt::Debug for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&InformationId> = self.information.keys().collect();
        ids.sort();
        f.debug_struct("ParseContext")
            .field("information", &ids)
            .field("localizer", &self.localizer)
            .finish()
    }
}

type Tester = dyn Fn(&Information) -> bool + Send + Sync;

/// A condition on an information value that must hold for a command or argument to be used.
#[derive(Clone)]
pub struct Requirement {
    pub subject: InformationId,
    pub description: String,
    tester: Arc<Tester>,
}

impl Requirement {
    pub fn new<F>(subject: InformationId, description: impl Into<String>, tester: F) -> Self
    where
        F: Fn(&Information) -> bool + Send + Sync + 'static,
    {
        Self {
            subject,
            description: description.into(),
            tester: Arc::new(tester),
        }
    }

    /// Only requires the information to be present.
    pub fn present(subject: InformationId) -> Self {
        let description = format!("requires {}", subject);
        Self::new(subject, description, |_| true)
    }

    pub fn is_satisfied(&self, ctx: &ParseContext) -> bool {
        ctx.information(&self.subject)
            .map(|info| (self.tester)(info))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("subject", &self.subject)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
