//! Shared fixtures: compiled PDFs built in memory with lopdf.
//!
//! Every line is its own BT/ET block so the embedded text layer comes back
//! one line per block. Text is ASCII because the fixture font is Helvetica
//! with WinAnsiEncoding.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

pub fn page_content(lines: &[&str]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
        operations.push(Operation::new(
            "Td",
            vec![56.into(), Object::Integer(780 - 16 * i as i64)],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }.encode().unwrap()
}

/// One PDF page per entry, pages inheriting MediaBox and Resources.
pub fn compiled_document(pages: &[&[&str]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_compiled_pdf(path: &Path, pages: &[&[&str]]) {
    let mut doc = compiled_document(pages);
    doc.save(path).unwrap();
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

pub fn text_of(path: &Path) -> String {
    let doc = Document::load(path).unwrap();
    let pages: Vec<u32> = doc.get_pages().into_keys().collect();
    doc.extract_text(&pages).unwrap()
}

/// Six pages, three documents: OFICIO (2), RELATORIO (3 incl. a
/// continuation page), PARECER (1).
pub const COMPILED: &[&[&str]] = &[
    &[
        "OFICIO N 45/2020/SEI/ANATEL",
        "Processo no 53500.053021/2018-91",
        "Interessado: Telefonia Brasil",
    ],
    &[
        "Segue em anexo o relatorio solicitado",
        "Prestadora CNPJ no 40.432.544/0001-47",
        "Atenciosamente",
    ],
    &[
        "RELATORIO DE FISCALIZACAO no 12/2020",
        "Processo no 53500.053021/2018-91",
        "Interessado: Telefonia Brasil",
    ],
    &["1 - Dos fatos apurados", "texto corrido da fiscalizacao"],
    &[
        "Relatorio de Fiscalizacao no 12/2020 (continuacao)",
        "conclusao da equipe",
    ],
    &["PARECER no 7/2020", "Processo no 53500.053021/2018-91"],
];
