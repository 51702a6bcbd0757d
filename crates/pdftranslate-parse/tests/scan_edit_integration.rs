//! Scan → edit → save → rescan on lopdf-built documents.

use lopdf::{Object, Stream, dictionary};
use pdftranslate_core::{BBox, FontStyle, Point, Rgb};
use pdftranslate_parse::{FillRule, FontSpec, PdfDocument, Redaction};

fn build_pdf(content: &[u8]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(1),
            "Height" => Object::Integer(1),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        vec![0],
    ));
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "Contents" => Object::Reference(content_id),
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            "XObject" => dictionary! { "Im1" => Object::Reference(image_id) },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn union(boxes: impl Iterator<Item = BBox>) -> BBox {
    boxes.reduce(|a, b| a.union(&b)).unwrap()
}

#[test]
fn removing_a_word_keeps_its_neighbours_in_place() {
    let bytes = build_pdf(b"BT /F1 12 Tf 50 700 Td (Keep Drop Stay) Tj ET");
    let mut doc = PdfDocument::open(&bytes).unwrap();
    assert_eq!(doc.page_box(0).unwrap(), [0.0, 0.0, 612.0, 792.0]);

    let scan = doc.scan_page(0).unwrap();
    let before: Vec<(String, f64)> = scan
        .glyphs
        .iter()
        .map(|g| (g.ch.text.clone(), g.ch.bbox.x0))
        .collect();
    assert_eq!(before.len(), 14);
    let rect = union(scan.glyphs[5..9].iter().map(|g| g.ch.bbox));

    let mut editor = doc.editor(0, &scan).unwrap();
    let removed = editor.redact(&[Redaction { rect, fill: None }]);
    assert_eq!(removed, 4);
    assert!(editor.commit().unwrap());

    let saved = doc.save().unwrap();
    let rescan = PdfDocument::open(&saved).unwrap().scan_page(0).unwrap();
    let after: Vec<(String, f64)> = rescan
        .glyphs
        .iter()
        .map(|g| (g.ch.text.clone(), g.ch.bbox.x0))
        .collect();
    let expected: Vec<(String, f64)> = before[..5]
        .iter()
        .chain(&before[9..])
        .cloned()
        .collect();
    assert_eq!(after.len(), expected.len());
    for ((text, x), (want_text, want_x)) in after.iter().zip(&expected) {
        assert_eq!(text, want_text);
        assert!((x - want_x).abs() < 0.01, "{text} moved from {want_x} to {x}");
    }
}

#[test]
fn fills_and_images_are_reported_in_page_space() {
    let bytes = build_pdf(
        b"0.2 0.4 0.6 rg 10 10 100 50 re f \
          0 0 1 rg 0 0 m 20 0 l 20 20 l h f* \
          q 50 0 0 50 200 200 cm /Im1 Do Q",
    );
    let doc = PdfDocument::open(&bytes).unwrap();
    let scan = doc.scan_page(0).unwrap();

    assert_eq!(scan.fills.len(), 2);
    let band = &scan.fills[0];
    assert_eq!(band.rule, FillRule::NonZero);
    assert!(band.color.approx_eq(&Rgb::new(0.2, 0.4, 0.6), 1e-6));
    let bbox = band.bbox().unwrap();
    assert!((bbox.x0 - 10.0).abs() < 1e-6 && (bbox.x1 - 110.0).abs() < 1e-6);
    assert!((bbox.top - 732.0).abs() < 1e-6 && (bbox.bottom - 782.0).abs() < 1e-6);
    assert_eq!(scan.fills[1].rule, FillRule::EvenOdd);

    assert_eq!(scan.images.len(), 1);
    let image = scan.images[0];
    assert!((image.x0 - 200.0).abs() < 1e-6 && (image.x1 - 250.0).abs() < 1e-6);
    assert!((image.top - 542.0).abs() < 1e-6 && (image.bottom - 592.0).abs() < 1e-6);
}

#[test]
fn replacement_text_is_read_back_at_its_origin() {
    let bytes = build_pdf(b"BT /F1 12 Tf 72 600 Td (Goodbye) Tj ET");
    let mut doc = PdfDocument::open(&bytes).unwrap();
    let scan = doc.scan_page(0).unwrap();
    let rect = union(scan.glyphs.iter().map(|g| g.ch.bbox));
    let baseline = scan.glyphs[0].ch.origin;

    let mut editor = doc.editor(0, &scan).unwrap();
    editor.redact(&[Redaction {
        rect: rect.expand(0.3),
        fill: Some(Rgb::WHITE),
    }]);
    editor
        .add_font("TRFON_helvetica_bold", &FontSpec::Helvetica(FontStyle::Bold))
        .unwrap();
    editor.draw_text(
        "TRFON_helvetica_bold",
        10.0,
        Rgb::BLACK,
        Point::new(baseline.x, baseline.y),
        b"Hoscakal",
    );
    assert!(editor.commit().unwrap());

    let saved = doc.save().unwrap();
    let rescan = PdfDocument::open(&saved).unwrap().scan_page(0).unwrap();
    let text: String = rescan.glyphs.iter().map(|g| g.ch.text.as_str()).collect();
    assert_eq!(text, "Hoscakal");
    let first = &rescan.glyphs[0].ch;
    assert!((first.origin.x - baseline.x).abs() < 0.01);
    assert!((first.origin.y - baseline.y).abs() < 0.01);
    assert!((first.size - 10.0).abs() < 1e-6);
    assert!(first.flags.is_bold());
    // the white overpaint is the only fill on the page
    assert_eq!(rescan.fills.len(), 1);
    assert!(rescan.fills[0].color.approx_eq(&Rgb::WHITE, 1e-6));
}
