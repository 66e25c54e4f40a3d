use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    AddressSpace, MemoryFault, MemorySpace, SearchParams, SearchQuery, SearchRecord, SearchResult,
};

impl<B: AddressSpace> MemorySpace<B> {
    /// Runs an initial scan when `old_results` is empty, otherwise narrows
    /// `old_results` against the query target.
    ///
    /// The initial scan is capped at `query.limit`. A narrowing pass ignores
    /// the limit and only ever returns a subset of `old_results`, in their
    /// original order. Searches use raw reads and leave emulated state
    /// untouched. No state is kept between calls.
    ///
    /// # Errors
    ///
    /// Returns a configuration fault when the target cannot be used with the
    /// query kind, and a decode fault when the backend returns a record with
    /// an unrecognized type tag, width, or divisor.
    pub fn search(
        &self,
        query: &SearchQuery,
        old_results: &[SearchResult],
    ) -> Result<Vec<SearchResult>, MemoryFault> {
        let params = SearchParams::resolve(
            query,
            &self.config().guess_divisors,
            self.base(),
            self.len(),
        )?;
        let base = self.base();

        let records = if old_results.is_empty() {
            debug!(kind = ?query.kind, flags = ?query.flags, limit = query.limit, "initial scan");
            let mut records = self.backend().scan(&params, query.limit);
            records.truncate(query.limit);
            records
        } else {
            debug!(candidates = old_results.len(), "narrowing scan");
            let prior: Vec<SearchRecord> = old_results
                .iter()
                .map(|result| result.to_record(base))
                .collect();
            let known: HashSet<SearchRecord> = prior.iter().copied().collect();
            self.backend()
                .rescan(&params, &prior)
                .into_iter()
                .filter(|record| known.contains(record))
                .collect()
        };

        let mut results = Vec::with_capacity(records.len());
        for record in &records {
            if !in_region(record, &params) {
                warn!(
                    address = record.address,
                    segment = record.segment,
                    "backend returned a match outside the search region"
                );
                continue;
            }
            results.push(SearchResult::from_record(record, base)?);
        }
        debug!(matches = results.len(), "search finished");
        Ok(results)
    }
}

fn in_region(record: &SearchRecord, params: &SearchParams) -> bool {
    let start = u64::from(record.address);
    let end = start + u64::from(record.width.max(1));
    start >= params.region.start && end <= params.region.end
}
