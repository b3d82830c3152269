use common::codec::compare_values;
use common::ids::ValueId;
use common::storage_trait::{KeyDesc, SortedStream, StreamPosition};
use common::CrustyError;
use std::cmp::Ordering;

/// A relation sorted on one key.
///
/// Tuples are cut into runs of at most `max_tuples`, each run is sorted on its own, and the
/// runs are merged into one ascending sequence. Equal keys keep their scan order.
pub struct SortedFile {
    records: Vec<Vec<u8>>,
    next: usize,
}

impl SortedFile {
    pub(crate) fn new<I>(scan: I, key: KeyDesc, max_tuples: usize) -> Result<Self, CrustyError>
    where
        I: Iterator<Item = Result<(ValueId, Vec<u8>), CrustyError>>,
    {
        if max_tuples == 0 {
            return Err(CrustyError::StorageFailure(String::from(
                "sort runs must hold at least one tuple",
            )));
        }
        let mut runs: Vec<Vec<Vec<u8>>> = Vec::new();
        let mut run = Vec::with_capacity(max_tuples);
        for item in scan {
            let (_, tuple) = item?;
            // Every key must be readable before sorting so comparisons cannot fail midway.
            let k = key.extract(&tuple)?;
            compare_values(key.dtype, k, k)?;
            run.push(tuple);
            if run.len() == max_tuples {
                runs.push(SortedFile::sort_run(run, &key));
                run = Vec::with_capacity(max_tuples);
            }
        }
        if !run.is_empty() {
            runs.push(SortedFile::sort_run(run, &key));
        }
        debug!("SortedFile merging {} runs of up to {} tuples", runs.len(), max_tuples);
        let records = SortedFile::merge_runs(runs, &key);
        Ok(SortedFile { records, next: 0 })
    }

    /// Only called on tuples whose keys `new` already read, so the fallbacks never apply.
    fn compare(key: &KeyDesc, a: &[u8], b: &[u8]) -> Ordering {
        let (ka, kb) = match (key.extract(a), key.extract(b)) {
            (Ok(ka), Ok(kb)) => (ka, kb),
            _ => return Ordering::Equal,
        };
        compare_values(key.dtype, ka, kb).unwrap_or(Ordering::Equal)
    }

    fn sort_run(mut run: Vec<Vec<u8>>, key: &KeyDesc) -> Vec<Vec<u8>> {
        run.sort_by(|a, b| SortedFile::compare(key, a, b));
        run
    }

    /// Repeatedly take the smallest head among the runs; earlier runs win ties.
    fn merge_runs(mut runs: Vec<Vec<Vec<u8>>>, key: &KeyDesc) -> Vec<Vec<u8>> {
        let total = runs.iter().map(|r| r.len()).sum();
        let mut merged = Vec::with_capacity(total);
        let mut cursors = vec![0; runs.len()];
        loop {
            let mut best: Option<usize> = None;
            for i in 0..runs.len() {
                let head = match runs[i].get(cursors[i]) {
                    Some(head) => head,
                    None => continue,
                };
                best = match best {
                    Some(b) if SortedFile::compare(key, head, &runs[b][cursors[b]]) != Ordering::Less => {
                        Some(b)
                    }
                    _ => Some(i),
                };
            }
            match best {
                Some(b) => {
                    merged.push(std::mem::take(&mut runs[b][cursors[b]]));
                    cursors[b] += 1;
                }
                None => break,
            }
        }
        merged
    }
}

impl SortedStream for SortedFile {
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, CrustyError> {
        match self.records.get(self.next) {
            Some(tuple) => {
                self.next += 1;
                Ok(Some(tuple.clone()))
            }
            None => Ok(None),
        }
    }

    fn position(&self) -> StreamPosition {
        StreamPosition::new(self.next.saturating_sub(1))
    }

    fn restore(&mut self, pos: StreamPosition) -> Result<(), CrustyError> {
        if pos.get() > self.records.len() {
            return Err(CrustyError::StorageFailure(format!(
                "cannot rewind to {} in a stream of {} tuples",
                pos.get(),
                self.records.len()
            )));
        }
        self.next = pos.get();
        Ok(())
    }
}
