//! Integration tests for whole pipelines.
//!
//! These tests drive real stages end to end:
//! 1. Ordering and fan-out through the engine
//! 2. Per-unit fault isolation
//! 3. Type detection without needless classifier calls
//! 4. Mailbox splitting, narration and triple extraction
//! 5. Concurrent runs and cancellation

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use cognita::testing::{MockAI, ScriptedTransform, VecSource};
use cognita::transforms::{ExtractTriples, MboxSplit, Narrate, TypeFind};
use cognita::triples::vocab;
use cognita::{
    Caps, CollectSink, ContentUnit, ElementError, Emit, Field, FileSource, IdentityDeriver,
    MailboxNarrator, MessageNarrator, Pipeline, PollingSource, Term, TripleExtractor,
    TypeDetector, UnitError,
};
use tokio_util::sync::CancellationToken;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
const OPAQUE: &[u8] = b"\x00\x13\x37\xfe\xed\xfa\xce\x00\x01\x02\x03\x04";

const ARCHIVE: &str = "From alice@example.com Mon Jan  1 10:00:00 2024
Message-ID: <first@example.com>
From: Alice <alice@example.com>
To: bob@example.com
Date: Mon, 1 Jan 2024 10:00:00 +0000
Subject: Lunch

Shall we meet at noon?

From bob@example.com Mon Jan  1 11:00:00 2024
Message-ID: <second@example.com>
From: bob@example.com
To: Alice <alice@example.com>
Date: Mon, 1 Jan 2024 11:00:00 +0000
Subject: Re: Lunch

Noon works.
From the desk of Bob: see you there.

From carol@example.com Mon Jan  1 12:00:00 2024
From: carol@example.com
Subject: No id here

Hello both.
";

fn named(name: &'static str) -> ContentUnit {
    ContentUnit::new(name)
}

fn names(units: &[ContentUnit]) -> Vec<String> {
    units
        .iter()
        .map(|u| String::from_utf8_lossy(u.payload().prefix()).into_owned())
        .collect()
}

#[tokio::test]
async fn test_fan_out_is_depth_first() {
    let fan_b = ScriptedTransform::new("fan_b", |unit| {
        if unit.payload().prefix() == b"B" {
            Ok(Emit::many(vec![named("B1"), named("B2")]))
        } else {
            Ok(Emit::One(unit))
        }
    });
    // Downstream stage sees each fanned unit before the next source unit
    let tag = ScriptedTransform::new("tag", |mut unit| {
        unit.annotate("tag", "seen");
        Ok(Emit::One(unit))
    });

    let sink = CollectSink::new();
    let handle = sink.handle();
    let report = Pipeline::builder()
        .source(VecSource::new(vec![named("A"), named("B"), named("C")]))
        .transform(fan_b)
        .transform(tag)
        .sink(sink)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let units = handle.units();
    assert_eq!(names(&units), vec!["A", "B1", "B2", "C"]);
    assert!(units.iter().all(|u| u.annotations().len() == 1));
    assert_eq!(report.units_read, 3);
    assert_eq!(report.delivered, 4);
}

#[tokio::test]
async fn test_failing_unit_is_isolated() {
    let fail_b = ScriptedTransform::new("fail_b", |unit| {
        if unit.payload().prefix() == b"B" {
            Err(ElementError::recoverable(UnitError::Rejected("B is broken".into())))
        } else {
            Ok(Emit::One(unit))
        }
    });

    let sink = CollectSink::new();
    let handle = sink.handle();
    let report = Pipeline::builder()
        .source(VecSource::new(vec![named("A"), named("B"), named("C")]))
        .transform(fail_b)
        .sink(sink)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(names(&handle.units()), vec!["A", "C"]);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.sequence, 1);
    assert_eq!(failure.stage, "fail_b");
    assert!(matches!(failure.error, UnitError::Rejected(_)));
    assert!(handle.finished());
}

#[tokio::test]
async fn test_png_never_reaches_classifier() {
    let ai = Arc::new(MockAI::new());
    let deriver = IdentityDeriver::new("ns");

    let sink = CollectSink::new();
    let handle = sink.handle();
    Pipeline::builder()
        .source(VecSource::new(vec![ContentUnit::new(PNG)]))
        .transform(TypeFind::new(TypeDetector::with_ai(ai.clone()), deriver))
        .sink(sink)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let unit = &handle.units()[0];
    assert_eq!(unit.caps().text(Field::MediaType), Some("image/png"));
    assert_eq!(unit.caps().text(Field::TypeSource), Some("signature"));
    assert_eq!(ai.classify_calls(), 0);
}

#[tokio::test]
async fn test_unknown_type_without_fallback() {
    let ai = Arc::new(MockAI::new());
    let detector = TypeDetector::with_ai(ai.clone()).with_fallback(false);

    let sink = CollectSink::new();
    let handle = sink.handle();
    let report = Pipeline::builder()
        .source(VecSource::new(vec![ContentUnit::new(OPAQUE)]))
        .transform(TypeFind::new(detector, IdentityDeriver::new("ns")))
        .sink(sink)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let unit = &handle.units()[0];
    assert!(unit.caps().get(Field::MediaType).unwrap().is_unknown());
    assert_eq!(unit.caps().label(), "unknown");
    assert!(unit.identity().unwrap().iri().starts_with("urn:ns:content:"));
    assert!(ai.calls().is_empty());
    assert!(report.is_clean());
}

fn mailbox_pipeline(path: &std::path::Path, sink: CollectSink) -> Pipeline {
    let deriver = IdentityDeriver::new("ns");
    Pipeline::builder()
        .source(FileSource::new([path], 64))
        .transform(TypeFind::new(TypeDetector::new(), deriver.clone()))
        .transform(MboxSplit::new(deriver.clone()))
        .transform(
            Narrate::new()
                .with(MailboxNarrator::new())
                .with(MessageNarrator::new()),
        )
        .transform(ExtractTriples::new(TripleExtractor::new(deriver)))
        .sink(sink)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_mailbox_end_to_end() {
    let mut file = tempfile::Builder::new().suffix(".mbox").tempfile().unwrap();
    file.write_all(ARCHIVE.as_bytes()).unwrap();

    let sink = CollectSink::new();
    let handle = sink.handle();
    let report = mailbox_pipeline(file.path(), sink).run().await.unwrap();
    assert!(report.is_clean());

    let units = handle.units();
    assert_eq!(units.len(), 4);

    let archive = &units[0];
    assert_eq!(archive.caps().text(Field::Format), Some("mbox"));
    assert!(archive
        .caps()
        .text(Field::Narration)
        .unwrap()
        .contains("containing 3 messages."));
    let archive_iri = archive.identity().unwrap().iri().to_string();

    let messages = &units[1..];
    let identities: Vec<&str> = messages
        .iter()
        .map(|u| u.identity().unwrap().iri())
        .collect();
    assert_eq!(identities[0], "urn:ns:mail:first@example.com");
    assert_eq!(identities[1], "urn:ns:mail:second@example.com");
    assert!(identities[2].starts_with("urn:ns:content:"));
    assert_ne!(identities[2], archive_iri);

    assert_eq!(messages[0].caps().text(Field::MessageId), Some("<first@example.com>"));
    assert_eq!(messages[2].caps().text(Field::MessageId), None);
    // The "From the desk" body line did not split the second message
    assert_eq!(messages[1].caps().text(Field::Subject), Some("Re: Lunch"));

    for message in messages {
        let subject = message.identity().unwrap().iri();
        assert!(message.caps().triples().any(|t| t.subject == subject
            && t.predicate == vocab::DCTERMS_IS_PART_OF
            && t.object == Term::iri(archive_iri.clone())));
        assert!(message
            .caps()
            .triples()
            .any(|t| t.subject == subject && t.predicate == vocab::DCTERMS_DESCRIPTION));
        assert!(message
            .caps()
            .triples()
            .all(|t| !t.predicate.ends_with("messageCount")));
    }
    assert!(archive.caps().triples().any(|t| t.subject == archive_iri
        && t.predicate == "urn:ns:vocab:messageCount"
        && t.object == Term::typed("3", vocab::XSD_INTEGER)));

    assert!(messages[0].caps().triples().any(|t| {
        t.subject == "urn:ns:mail:first@example.com"
            && t.predicate == vocab::SCHEMA_SENDER
            && t.object == Term::iri("urn:ns:person:alice@example.com")
    }));
}

#[tokio::test]
async fn test_description_subject_is_known_identity() {
    let unit = ContentUnit::new("x").with_caps(
        Caps::new()
            .with(Field::Identity, "urn:ns:content:abc123")
            .with(Field::Narration, "A short description."),
    );

    let sink = CollectSink::new();
    let handle = sink.handle();
    Pipeline::builder()
        .source(VecSource::new(vec![unit]))
        .transform(ExtractTriples::new(TripleExtractor::new(IdentityDeriver::new("ns"))))
        .sink(sink)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let units = handle.units();
    let descriptions: Vec<_> = units[0]
        .caps()
        .triples()
        .filter(|t| t.predicate == vocab::DCTERMS_DESCRIPTION)
        .collect();
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].subject, "urn:ns:content:abc123");
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let mut file = tempfile::Builder::new().suffix(".mbox").tempfile().unwrap();
    file.write_all(ARCHIVE.as_bytes()).unwrap();
    let mut other = tempfile::NamedTempFile::new().unwrap();
    other.write_all(PNG).unwrap();

    let build = |sink: CollectSink| {
        let deriver = IdentityDeriver::new("ns");
        Pipeline::builder()
            .source(FileSource::new([file.path(), other.path(), file.path()], 64))
            .transform(TypeFind::new(TypeDetector::new(), deriver.clone()))
            .transform(MboxSplit::new(deriver))
            .sink(sink)
            .build()
            .unwrap()
    };

    let sequential = CollectSink::new();
    let sequential_units = sequential.handle();
    build(sequential).run().await.unwrap();

    let concurrent = CollectSink::new();
    let concurrent_units = concurrent.handle();
    build(concurrent).run_concurrent(3).await.unwrap();

    let iris = |units: Vec<ContentUnit>| -> Vec<String> {
        units
            .iter()
            .map(|u| u.identity().unwrap().iri().to_string())
            .collect()
    };
    let expected = iris(sequential_units.units());
    assert_eq!(expected.len(), 9);
    assert_eq!(iris(concurrent_units.units()), expected);
}

#[tokio::test]
async fn test_cancel_unbounded_polling() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"reading").unwrap();

    let token = CancellationToken::new();
    let sink = CollectSink::new();
    let handle = sink.handle();
    let pipeline = Pipeline::builder()
        .source(PollingSource::new(file.path(), Duration::from_millis(10)))
        .sink(sink)
        .build()
        .unwrap();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(55)).await;
        canceller.cancel();
    });

    let report = pipeline.run_until_cancelled(token).await.unwrap();
    assert!(report.cancelled);
    assert!(report.units_read >= 1);
    assert_eq!(handle.len() as u64, report.units_read);
    assert!(handle.finished());
}
