use crate::error::{SieveError, SieveResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A4 portrait, for pages whose source geometry is unknown.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

const PLACEHOLDER_FONT_SIZE: i64 = 16;

/// A rendered page, RGB8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    /// Page size in points at the render resolution.
    pub fn size_in_points(&self) -> (f32, f32) {
        let scale = 72.0 / self.dpi.max(1) as f32;
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

/// Look up a page attribute, walking `/Parent` links for inheritable keys.
/// A top-level reference is resolved; nested ones are left alone.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // guards against cyclic Parent links
    for _ in 0..64 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value).cloned().unwrap_or_else(|| value.clone()));
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Follow a reference chain to its target; non-references resolve to themselves.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..32 {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn is_page(object: &Object) -> bool {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|kind| kind.as_name().ok())
        .is_some_and(|name| name == b"Page")
}

fn is_annotation(dict: &Dictionary) -> bool {
    let typed = dict
        .get(b"Type")
        .and_then(|kind| kind.as_name())
        .is_ok_and(|name| name == b"Annot");
    typed || dict.has(b"Subtype")
}

fn rect(values: [f32; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real(*v)).collect())
}

/// Deep copy of objects from one document into another.
///
/// Page objects other than the one being copied are cut (replaced by null)
/// when reached through links, so a copied page never drags its neighbours.
struct Importer<'a> {
    source: &'a Document,
    /// source id -> target id
    map: BTreeMap<ObjectId, ObjectId>,
    inserted: Vec<ObjectId>,
}

impl<'a> Importer<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            map: BTreeMap::new(),
            inserted: Vec::new(),
        }
    }

    fn import_object(&mut self, target: &mut Document, object: &Object) -> SieveResult<Object> {
        Ok(match object {
            Object::Reference(id) => {
                if let Some(mapped) = self.map.get(id) {
                    return Ok(Object::Reference(*mapped));
                }
                let source = self.source;
                let referenced = source.get_object(*id)?;
                if is_page(referenced) {
                    Object::Null
                } else {
                    Object::Reference(self.import_reference(target, *id, referenced)?)
                }
            }
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(target, item))
                    .collect::<SieveResult<Vec<_>>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dict(target, dict)?),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dict(target, &stream.dict)?;
                Object::Stream(copy)
            }
            other => other.clone(),
        })
    }

    /// `/Parent` and annotation `/P` back-links point into the source page tree
    /// and are dropped. `/P` elsewhere is ordinary data and is kept.
    fn import_dict(&mut self, target: &mut Document, dict: &Dictionary) -> SieveResult<Dictionary> {
        let annotation = is_annotation(dict);
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" || (annotation && key.as_slice() == b"P") {
                continue;
            }
            out.set(key.clone(), self.import_object(target, value)?);
        }
        Ok(out)
    }

    fn import_reference(
        &mut self,
        target: &mut Document,
        id: ObjectId,
        object: &Object,
    ) -> SieveResult<ObjectId> {
        let new_id = target.new_object_id();
        self.map.insert(id, new_id);
        self.inserted.push(new_id);
        let copied = self.import_object(target, object)?;
        target.objects.insert(new_id, copied);
        Ok(new_id)
    }
}

/// One output PDF, assembled page by page and written once.
pub struct PdfArtifact {
    doc: Document,
    pages_id: ObjectId,
    font_id: Option<ObjectId>,
    kids: Vec<ObjectId>,
}

impl Default for PdfArtifact {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfArtifact {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            font_id: None,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy `page_id` and everything it references out of `source`.
    /// Inherited attributes are materialized on the copied page. On failure
    /// every object inserted for this page is removed again.
    pub fn add_copied_page(&mut self, source: &Document, page_id: ObjectId) -> SieveResult<()> {
        let mut importer = Importer::new(source);
        match self.import_page(&mut importer, page_id) {
            Ok(new_id) => {
                self.kids.push(new_id);
                Ok(())
            }
            Err(e) => {
                for id in importer.inserted {
                    self.doc.objects.remove(&id);
                }
                Err(e)
            }
        }
    }

    fn import_page(&mut self, importer: &mut Importer<'_>, page_id: ObjectId) -> SieveResult<ObjectId> {
        let source = importer.source;
        let page = source.get_object(page_id)?.as_dict()?;

        // links back to this page resolve to the copy
        let new_id = self.doc.new_object_id();
        importer.map.insert(page_id, new_id);
        importer.inserted.push(new_id);

        let mut dict = importer.import_dict(&mut self.doc, page)?;

        for key in INHERITABLE {
            if dict.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page_id, key) {
                let value = importer.import_object(&mut self.doc, &value)?;
                dict.set(key.to_vec(), value);
            }
        }
        if !dict.has(b"MediaBox") {
            dict.set("MediaBox", rect(DEFAULT_MEDIA_BOX));
        }
        dict.set("Type", "Page");
        dict.set("Parent", self.pages_id);

        self.doc.objects.insert(new_id, Object::Dictionary(dict));
        Ok(new_id)
    }

    /// Add a page showing `image` at full size.
    pub fn add_image_page(&mut self, page: usize, image: &RasterImage) -> SieveResult<()> {
        let expected = image.width as usize * image.height as usize * 3;
        if image.width == 0 || image.height == 0 || image.rgb.len() != expected {
            return Err(SieveError::RasterizeFailure {
                page,
                reason: format!(
                    "image {}x{} carries {} bytes, expected {expected}",
                    image.width,
                    image.height,
                    image.rgb.len()
                ),
            });
        }

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.rgb.clone(),
        );
        // uncompressed is still valid
        let _ = stream.compress();
        let image_id = self.doc.add_object(stream);

        let (width, height) = image.size_in_points();
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => rect([0.0, 0.0, width, height]),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id);
        Ok(())
    }

    /// Add a page that only says `[ERRO AO INSERIR PAG <page>]`.
    pub fn add_placeholder_page(&mut self, page: usize, media_box: Option<[f32; 4]>) -> SieveResult<()> {
        let media_box = media_box.unwrap_or(DEFAULT_MEDIA_BOX);
        let font_id = self.placeholder_font();
        let text = placeholder_text(page);

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(PLACEHOLDER_FONT_SIZE)],
                ),
                Operation::new(
                    "Td",
                    vec![
                        Object::Real(media_box[0] + 50.0),
                        Object::Real(media_box[3] - 100.0),
                    ],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.into_bytes(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => rect(media_box),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id);
        Ok(())
    }

    fn placeholder_font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    /// Close the page tree and write the file. An artifact without pages is
    /// never written.
    pub fn save(mut self, path: &Path) -> SieveResult<()> {
        if self.kids.is_empty() {
            return Err(SieveError::ArtifactEmpty {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            });
        }

        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc.save(path)?;
        Ok(())
    }
}

pub fn placeholder_text(page: usize) -> String {
    format!("[ERRO AO INSERIR PAG {page}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two pages sharing MediaBox and Resources through the page tree.
    fn source_document() -> (Document, Vec<ObjectId>) {
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

        let mut page_ids = Vec::new();
        for text in ["OFICIO N 1", "segunda pagina"] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
                "Resources" => resources_id,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_ids)
    }

    #[test]
    fn test_copied_page_resolves_inherited_attributes() {
        let (source, pages) = source_document();
        let mut artifact = PdfArtifact::new();
        artifact.add_copied_page(&source, pages[1]).unwrap();
        assert_eq!(artifact.page_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.pdf");
        artifact.save(&path).unwrap();

        let written = Document::load(&path).unwrap();
        let written_pages = written.get_pages();
        assert_eq!(written_pages.len(), 1);
        let page_id = written_pages[&1];
        let page = written.get_object(page_id).unwrap().as_dict().unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(written.extract_text(&[1]).unwrap().contains("segunda pagina"));
    }

    #[test]
    fn test_only_annotations_lose_their_page_link() {
        let (source, pages) = source_document();
        let mut target = Document::with_version("1.5");
        let mut importer = Importer::new(&source);

        let plain = dictionary! { "P" => Object::Integer(3), "N" => "x" };
        let copied = importer.import_dict(&mut target, &plain).unwrap();
        assert_eq!(copied.get(b"P").unwrap().as_i64().unwrap(), 3);

        let annotation = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Text",
            "P" => pages[0],
            "Contents" => Object::string_literal("nota"),
        };
        let copied = importer.import_dict(&mut target, &annotation).unwrap();
        assert!(!copied.has(b"P"));
        assert!(copied.has(b"Contents"));

        let widget = dictionary! { "Subtype" => "Widget", "P" => pages[0], "Parent" => pages[1] };
        let copied = importer.import_dict(&mut target, &widget).unwrap();
        assert!(!copied.has(b"P"));
        assert!(!copied.has(b"Parent"));
    }

    #[test]
    fn test_placeholder_page_text() {
        let mut artifact = PdfArtifact::new();
        artifact.add_placeholder_page(3, None).unwrap();
        artifact.add_placeholder_page(4, Some([0.0, 0.0, 612.0, 792.0])).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placeholder.pdf");
        artifact.save(&path).unwrap();

        let written = Document::load(&path).unwrap();
        assert_eq!(written.get_pages().len(), 2);
        assert!(written.extract_text(&[1]).unwrap().contains("ERRO AO INSERIR PAG 3"));
    }

    #[test]
    fn test_image_page() {
        let image = RasterImage {
            width: 4,
            height: 2,
            dpi: 144,
            rgb: vec![200; 4 * 2 * 3],
        };
        assert_eq!(image.size_in_points(), (2.0, 1.0));

        let mut artifact = PdfArtifact::new();
        artifact.add_image_page(1, &image).unwrap();
        assert_eq!(artifact.page_count(), 1);

        let bad = RasterImage { rgb: vec![0; 5], ..image };
        assert!(matches!(
            artifact.add_image_page(2, &bad),
            Err(SieveError::RasterizeFailure { page: 2, .. })
        ));
        assert_eq!(artifact.page_count(), 1);
    }

    #[test]
    fn test_empty_artifact_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01_VAZIO.pdf");
        let err = PdfArtifact::new().save(&path).unwrap_err();
        assert!(matches!(err, SieveError::ArtifactEmpty { ref name } if name == "01_VAZIO.pdf"));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_copy_leaves_artifact_untouched() {
        let (source, _) = source_document();
        let mut artifact = PdfArtifact::new();
        let before = artifact.doc.objects.len();
        assert!(artifact.add_copied_page(&source, (9999, 0)).is_err());
        assert_eq!(artifact.page_count(), 0);
        assert_eq!(artifact.doc.objects.len(), before);
    }
}
