//! The capability a domain manager works through.

use cfgtool_schema::{Domain, EntityKind};
use std::collections::BTreeSet;
use tracing::debug;

use crate::base::{BaseManager, RetiredIds, record_id};
use crate::document::ConfigDocument;
use crate::journal::{Change, Journal};
use crate::{Error, Result};

/// Session state that lives beside the document and is rolled back with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub retired: RetiredIds,
    /// Write-once settings present in a loaded or saved document
    pub locked_settings: BTreeSet<String>,
}

/// Read access to the whole document, write access to one domain.
///
/// Every write goes through [`Scope::commit`], which applies the change and
/// records it in the journal in one step.
pub struct Scope<'a> {
    domain: Domain,
    doc: &'a mut ConfigDocument,
    journal: &'a mut Journal,
    session: &'a mut Session,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        domain: Domain,
        doc: &'a mut ConfigDocument,
        journal: &'a mut Journal,
        session: &'a mut Session,
    ) -> Self {
        Self {
            domain,
            doc,
            journal,
            session,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn doc(&self) -> &ConfigDocument {
        &*self.doc
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn base(&self, kind: EntityKind) -> BaseManager<'_> {
        BaseManager::new(kind, &*self.doc)
    }

    /// Next free id for `kind`, honouring ids retired this session.
    pub fn reserve_next_id(&self, kind: EntityKind) -> i64 {
        self.base(kind).reserve_next_id(&self.session.retired, None)
    }

    /// Apply `change` and journal it. Returns `false` when the change was a
    /// no-op and nothing was recorded.
    pub fn commit(&mut self, change: Change) -> Result<bool> {
        if change.domain() != self.domain {
            let kind = change.kind().unwrap_or(EntityKind::SystemParameter);
            return Err(Error::OutOfScope {
                domain: self.domain,
                kind,
            });
        }
        if change.is_noop() {
            return Ok(false);
        }

        let entry = self.journal.entry_for(&change, &*self.doc);
        self.doc.apply(&change)?;
        self.journal.push(entry);

        if let Change::Delete { kind, record } = &change
            && let Some(id) = record_id(kind.spec(), record)
        {
            self.session.retired.retire(*kind, id);
        }
        debug!(op = %change.op(), domain = %self.domain, "Committed change");
        Ok(true)
    }
}
