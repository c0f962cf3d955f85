/*!
 * Batch partitioning.
 *
 * Splits a document into ordered, non-overlapping windows of at most
 * `batch_size` records. Each window is encoded into a single provider call.
 */

use log::{debug, error};

use crate::subtitle_processor::{SubtitleDocument, SubtitleRecord};

/// Default number of records per provider call
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A contiguous window of records sent to the provider in one call
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 0-based position of this batch in the document
    pub index: usize,

    /// Records of this batch, in document order
    pub records: &'a [SubtitleRecord],
}

impl<'a> Batch<'a> {
    /// Number of text characters carried by this batch
    pub fn char_count(&self) -> usize {
        self.records.iter().map(SubtitleRecord::char_count).sum()
    }

    /// Ids of the records in this batch
    pub fn ids(&self) -> Vec<u32> {
        self.records.iter().map(|record| record.id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Partition a document into `ceil(n / batch_size)` batches.
///
/// A `batch_size` of zero is treated as one so that the loop always makes progress.
pub fn partition_into_batches(document: &SubtitleDocument, batch_size: usize) -> Vec<Batch<'_>> {
    let effective_size = batch_size.max(1);
    let records = document.records();

    let batches: Vec<Batch<'_>> = records
        .chunks(effective_size)
        .enumerate()
        .map(|(index, records)| Batch { index, records })
        .collect();

    let covered: usize = batches.iter().map(Batch::len).sum();
    if covered != records.len() {
        error!("Lost records during partitioning! Original: {}, after partitioning: {}",
               records.len(), covered);
    } else if log::max_level() >= log::LevelFilter::Debug {
        for batch in &batches {
            debug!("Batch {}: {} records (ids: {:?}, {} chars)",
                   batch.index + 1, batch.len(), batch.ids(), batch.char_count());
        }
    }

    batches
}
