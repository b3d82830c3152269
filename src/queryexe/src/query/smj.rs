use super::Executor;
use common::catalog::Catalog;
use common::storage_trait::{KeyDesc, SortTrait, SortedStream, StorageEngine, StorageTrait};
use common::{Algorithm, AttrDesc, CrustyError};
use std::cmp::Ordering;

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Sort-merge join on `left = right`.
    ///
    /// Both relations are sorted on their join attribute with runs sized by
    /// `sort_run_capacity`. When the heads match, the right stream is marked at the
    /// start of its group of equal keys and rewound there for every left tuple with the
    /// same key. Returns the number of tuples written to `result`.
    pub(crate) fn smj(
        &self,
        result: &str,
        projection: &[AttrDesc],
        reclen: usize,
        left: &AttrDesc,
        right: &AttrDesc,
    ) -> Result<usize, CrustyError> {
        info!("Algorithm: {}", Algorithm::SortMerge);
        let out = self.storage_manager.open_or_create(result)?;
        self.open_relation(&left.rel_name)?;
        self.open_relation(&right.rel_name)?;
        let mut left_stream = self.storage_manager.open_sorted(
            &left.rel_name,
            &KeyDesc::from(left),
            self.sort_run_capacity(&left.rel_name)?,
        )?;
        let mut right_stream = self.storage_manager.open_sorted(
            &right.rel_name,
            &KeyDesc::from(right),
            self.sort_run_capacity(&right.rel_name)?,
        )?;

        let mut count = 0;
        let mut rec1 = left_stream.next_record()?;
        let mut rec2 = right_stream.next_record()?;
        loop {
            let (r1, r2) = match (rec1.take(), rec2.take()) {
                (Some(r1), Some(r2)) => (r1, r2),
                _ => break,
            };
            match self.match_rec(&r1, &r2, left, right)? {
                Ordering::Less => {
                    rec1 = left_stream.next_record()?;
                    rec2 = Some(r2);
                }
                Ordering::Greater => {
                    rec1 = Some(r1);
                    rec2 = right_stream.next_record()?;
                }
                Ordering::Equal => {
                    let mark = right_stream.position();
                    let marked = r2;
                    let mut outer = r1;
                    loop {
                        right_stream.restore(mark)?;
                        // The first tuple past the group, or None at the end of the stream.
                        let mut after_group = None;
                        while let Some(r) = right_stream.next_record()? {
                            if self.match_rec(&outer, &r, left, right)? != Ordering::Equal {
                                after_group = Some(r);
                                break;
                            }
                            self.project_and_insert(
                                out,
                                &left.rel_name,
                                Some(&right.rel_name),
                                &outer,
                                Some(&r),
                                projection,
                                reclen,
                            )?;
                            count += 1;
                        }
                        match left_stream.next_record()? {
                            Some(next)
                                if self.match_rec(&next, &marked, left, right)? == Ordering::Equal =>
                            {
                                outer = next;
                            }
                            next => {
                                rec1 = next;
                                rec2 = after_group;
                                break;
                            }
                        }
                    }
                }
            }
        }
        debug!(
            "sort merge {}.{} = {}.{} wrote {} tuples",
            left.rel_name, left.attr_name, right.rel_name, right.attr_name, count
        );
        Ok(count)
    }
}
