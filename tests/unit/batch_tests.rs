/*!
 * Tests for batch partitioning, marker encoding and reconciliation
 */

use subrecon::subtitle_processor::{SubtitleDocument, SubtitleRecord};
use subrecon::translation::markers::RECORD_SEPARATOR;
use subrecon::translation::{
    MarkerCodec, ReconcileMethod, TagMarkerCodec, partition_into_batches, reconcile_batch,
};
use crate::common;

fn record(id: u32, lines: &[&str]) -> SubtitleRecord {
    SubtitleRecord::new(id, "00:00:01,000 --> 00:00:02,000", lines.iter().map(|l| l.to_string()).collect())
}

/// Test batch count and coverage for a non-multiple document size
#[test]
fn test_partition_withTwentyFiveRecords_shouldCreateThreeBatches() {
    let document = SubtitleDocument::parse(&common::generate_srt(25));
    let batches = partition_into_batches(&document, 10);

    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![10, 10, 5]);
    assert_eq!(batches.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1, 2]);

    let ids: Vec<u32> = batches.iter().flat_map(|b| b.ids()).collect();
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
}

/// Test degenerate batch sizes
#[test]
fn test_partition_withZeroBatchSizeOrEmptyDocument_shouldStillBeTotal() {
    let document = SubtitleDocument::parse(&common::generate_srt(3));
    assert_eq!(partition_into_batches(&document, 0).len(), 3);
    assert_eq!(partition_into_batches(&document, 100).len(), 1);
    assert!(partition_into_batches(&SubtitleDocument::default(), 10).is_empty());
}

/// Test batch character count
#[test]
fn test_batch_char_count_withTwoRecords_shouldSumTextLines() {
    let document = SubtitleDocument::from_records(vec![record(1, &["abc"]), record(2, &["de", "f"])]);
    let batches = partition_into_batches(&document, 10);

    assert_eq!(batches[0].char_count(), 6);
}

/// Test the envelope layout of an encoded batch
#[test]
fn test_encode_withTwoRecords_shouldProduceEnvelopes() {
    let encoded = TagMarkerCodec.encode(&[record(3, &["One", "Two"]), record(4, &["Three"])]);

    assert_eq!(
        encoded,
        format!("<SUBT:3>\n<LINE:1>One</LINE:1>\n<LINE:2>Two</LINE:2>\n</SUBT:3>\n{}\n<SUBT:4>\n<LINE:1>Three</LINE:1>\n</SUBT:4>", RECORD_SEPARATOR)
    );
}

/// Test decoding of a provider reply with altered case and spacing
#[test]
fn test_decode_withLowercaseSpacedMarkers_shouldRecoverSpans() {
    let reply = "< subt : 3 >\n<line:1> Uno </line:1><LINE: 2>Dos</ LINE:2>\n</SUBT:3>\n<SUBT_DIV>\n<SUBT:4><LINE:1>Tres</LINE:1></SUBT:4>";
    let spans = TagMarkerCodec.decode(reply, &[3, 4]);

    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].marked_lines, vec!["Uno", "Dos"]);
    assert_eq!(spans[1].marked_lines, vec!["Tres"]);
}

/// Test reconciliation of a reply that merged two lines into one
#[test]
fn test_reconcile_withFewerLines_shouldBeDegraded() {
    let originals = vec![record(1, &["Hello", "world"])];
    let reply = "<SUBT:1><LINE:1>Hola mundo</LINE:1></SUBT:1>";
    let result = reconcile_batch(&TagMarkerCodec, &originals, reply);

    assert!(result.is_complete());
    assert_eq!(result.matched[0].method, ReconcileMethod::Degraded);
    assert_eq!(result.matched[0].record.lines, vec!["Hola mundo"]);
}

/// Test that records whose envelope vanished are reported unmatched
#[test]
fn test_reconcile_withMissingEnvelope_shouldListUnmatched() {
    let originals = vec![record(1, &["A"]), record(2, &["B"]), record(3, &["C"])];
    let reply = "<SUBT:1><LINE:1>a</LINE:1></SUBT:1>\n<SUBT_DIV>\n<SUBT:3><LINE:1>c</LINE:1></SUBT:3>\n<SUBT:99><LINE:1>x</LINE:1></SUBT:99>";
    let result = reconcile_batch(&TagMarkerCodec, &originals, reply);

    let matched: Vec<u32> = result.matched.iter().map(|r| r.record.id).collect();
    assert_eq!(matched, vec![1, 3]);
    assert_eq!(result.unmatched.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
    assert!(result.matched.iter().all(|r| r.method == ReconcileMethod::Structural));
}

/// Test that matched records keep their original timecode
#[test]
fn test_reconcile_withTranslatedText_shouldPreserveTimecode() {
    let mut original = record(5, &["Hi"]);
    original.time_code = "01:02:03,456 --> 01:02:04,000".to_string();
    let result = reconcile_batch(&TagMarkerCodec, &[original], "<SUBT:5><LINE:1>Hallo</LINE:1></SUBT:5>");

    assert_eq!(result.matched[0].record.time_code, "01:02:03,456 --> 01:02:04,000");
}
