use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use crate::traits::{AvailabilitySource, RequestRetractor};

/// The kinds of availability source, strongest evidence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Db,
    Api,
    Catalog,
}

impl SourceKind {
    /// Resolution order. Direct file evidence beats the catalog's view.
    pub const PRECEDENCE: [SourceKind; 3] = [SourceKind::Db, SourceKind::Api, SourceKind::Catalog];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Db => "db",
            SourceKind::Api => "api",
            SourceKind::Catalog => "catalog",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whichever sources are configured, keyed by kind. Any subset may be present.
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: HashMap<SourceKind, Arc<dyn AvailabilitySource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, source: Arc<dyn AvailabilitySource>) -> Self {
        self.insert(kind, source);
        self
    }

    pub fn insert(&mut self, kind: SourceKind, source: Arc<dyn AvailabilitySource>) {
        self.sources.insert(kind, source);
    }

    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn AvailabilitySource>> {
        self.sources.get(&kind)
    }

    /// Present sources in precedence order.
    pub fn in_precedence(&self) -> impl Iterator<Item = (SourceKind, &Arc<dyn AvailabilitySource>)> {
        SourceKind::PRECEDENCE
            .into_iter()
            .filter_map(move |kind| self.sources.get(&kind).map(|s| (kind, s)))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.in_precedence().map(|(kind, _)| kind.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The first source able to withdraw upstream requests, if any.
    pub fn retractor(&self) -> Option<&dyn RequestRetractor> {
        self.in_precedence().find_map(|(_, source)| source.as_retractor())
    }
}
