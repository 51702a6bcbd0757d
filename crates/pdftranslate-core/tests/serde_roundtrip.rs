//! Serde serialization/deserialization round-trip tests.
//!
//! These tests verify that the public data types can be serialized to JSON
//! and deserialized back, producing equal values.

#![cfg(feature = "serde")]

use pdftranslate_core::*;

/// Helper: serialize to JSON string, deserialize back, assert equality.
fn roundtrip<T>(value: &T)
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let json = serde_json::to_string(value).expect("serialize failed");
    let restored: T = serde_json::from_str(&json).expect("deserialize failed");
    assert_eq!(*value, restored, "round-trip mismatch for JSON: {json}");
}

fn sample_span() -> Span {
    Span {
        text: "Hello".to_string(),
        bbox: BBox::new(72.0, 100.0, 110.0, 112.0),
        font_name: "Helvetica-Bold".to_string(),
        font_size: 12.0,
        color: Rgb::from_packed(0x336699),
        flags: StyleFlags::new(true, false),
        origin: Point::new(72.0, 109.0),
    }
}

#[test]
fn test_serde_geometry() {
    roundtrip(&Point::new(3.5, 2.25));
    roundtrip(&Ctm::new(2.0, 0.0, 0.0, 3.0, 10.0, 20.0));
    roundtrip(&BBox::new(10.0, 20.0, 300.0, 400.0));
}

#[test]
fn test_serde_char() {
    let ch = Char {
        text: "A".to_string(),
        bbox: BBox::new(10.0, 20.0, 20.0, 32.0),
        fontname: "Helvetica".to_string(),
        size: 12.0,
        color: Rgb::BLACK,
        origin: Point::new(10.0, 29.0),
        flags: StyleFlags::default(),
    };
    roundtrip(&ch);
}

#[test]
fn test_serde_segment() {
    let span = sample_span();
    let segment = Segment {
        index: 3,
        block: 1,
        line: 0,
        bbox: span.bbox,
        text: span.text.clone(),
        spans: vec![span],
    };
    roundtrip(&segment);
}

#[test]
fn test_serde_line_and_block() {
    let line = Line::from_spans(vec![sample_span()]).expect("non-empty");
    let block = Block {
        bbox: line.bbox,
        lines: vec![line],
    };
    roundtrip(&block);
}

#[test]
fn test_serde_enums_and_options() {
    for style in FontStyle::ALL {
        roundtrip(&style);
    }
    roundtrip(&Charset::Latin1);
    roundtrip(&FitOptions::default());
    roundtrip(&SampleOptions::default());
}
