//! Single construction point for every issue variant.
//!
//! All construction flows through here so that the collaborator wiring is
//! consistent. A missing record propagates as `None` — "no such issue" is
//! not the same thing as a new blank issue, which callers request
//! explicitly with [`IssueFactory::new_issue`].

use crate::error::Result;
use crate::issue::entity::Issue;
use crate::issue::fields::IssueRecord;
use crate::issue::indexed::{IndexDocument, IndexedIssue};
use crate::services::IssueServices;

/// Builds issues with a consistent set of collaborators.
#[derive(Clone)]
pub struct IssueFactory {
    services: IssueServices,
}

impl IssueFactory {
    #[must_use]
    pub const fn new(services: IssueServices) -> Self {
        Self { services }
    }

    /// A blank, unbound issue to be filled in and stored.
    #[must_use]
    pub fn new_issue(&self) -> Issue {
        Issue::unbound(self.services.clone())
    }

    /// An issue bound to an existing backing record.
    ///
    /// # Errors
    ///
    /// Returns an error if hydration lookups fail.
    pub fn issue(&self, record: IssueRecord) -> Result<Issue> {
        Issue::bound(self.services.clone(), record)
    }

    /// `None` in, `None` out: absent records stay absent.
    ///
    /// # Errors
    ///
    /// Returns an error if hydration lookups fail.
    pub fn issue_or_none(&self, record: Option<IssueRecord>) -> Result<Option<Issue>> {
        record.map(|r| self.issue(r)).transpose()
    }

    /// Build issues for a batch of records.
    ///
    /// # Errors
    ///
    /// Returns the first hydration error encountered.
    pub fn issues(&self, records: impl IntoIterator<Item = IssueRecord>) -> Result<Vec<Issue>> {
        records.into_iter().map(|r| self.issue(r)).collect()
    }

    /// Load an issue by store id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record load or hydration fails.
    pub fn load(&self, id: i64) -> Result<Option<Issue>> {
        let record = self.services.store.issue_record(id)?;
        self.issue_or_none(record)
    }

    /// A read-only issue view over a search-index document.
    #[must_use]
    pub fn indexed_issue(&self, document: IndexDocument) -> IndexedIssue {
        IndexedIssue::new(document, self.services.clone())
    }

    /// Clone an issue's in-memory state, keeping its parent linkage.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the source's relations fails.
    pub fn clone_issue(&self, source: &Issue) -> Result<Issue> {
        Issue::cloned_from(self.services.clone(), source, true)
    }

    /// Clone an issue's in-memory state with the parent linkage cleared,
    /// so the clone never attempts link discovery.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the source's relations fails.
    pub fn clone_issue_without_parent(&self, source: &Issue) -> Result<Issue> {
        Issue::cloned_from(self.services.clone(), source, false)
    }
}

impl std::fmt::Debug for IssueFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueFactory").finish_non_exhaustive()
    }
}
