//! PDF Document wrapper
//!
//! Draw calls are buffered per page and written out in `to_bytes`: fonts are
//! embedded once every character is known, resources are merged into each
//! page and the overlay content is appended after the page's own content.

use crate::font::{Font, FontBook};
use crate::image::{
    any_image_to_jpg, fit_dimensions, generate_image_operators, ImageXObject,
};
use crate::object::{self, deflate_stream};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::watermark::{ImagePlacement, TextRun};
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Gray level as used by the `g` operator
    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Convert a CMYK color (the `k` operator) to RGB
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Red color
    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }

    /// Blue color
    pub fn blue() -> Self {
        Self::rgb(0.0, 0.0, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// PDF Document wrapper providing overlay drawing operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Fonts available to text runs
    fonts: FontBook,
    /// Embedded fonts (font key -> PDF object ID)
    embedded_fonts: HashMap<String, ObjectId>,
    /// Page font resources (page number -> font -> resource name)
    page_font_resources: HashMap<usize, HashMap<Font, String>>,
    /// Embedded images (JPEG hash -> object ID, pixel width, pixel height)
    embedded_images: HashMap<u64, (ObjectId, u32, u32)>,
    /// Page image resources (page number -> object ID -> resource name)
    page_image_resources: HashMap<usize, HashMap<ObjectId, String>>,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn from_document(inner: Document) -> Self {
        Self {
            inner,
            fonts: FontBook::new(),
            embedded_fonts: HashMap::new(),
            page_font_resources: HashMap::new(),
            embedded_images: HashMap::new(),
            page_image_resources: HashMap::new(),
            page_content_buffer: BTreeMap::new(),
        }
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    /// Use `fonts` for text runs that name a registered font
    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    /// Object ID of a page (1-indexed)
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Draw a text run on a page
    ///
    /// Span coordinates are baseline positions in PDF user space.
    pub fn insert_text(&mut self, page: usize, run: &TextRun) -> Result<()> {
        self.page_id(page)?;

        let spans: Vec<_> = run.spans.iter().filter(|s| !s.text.is_empty()).collect();
        if spans.is_empty() {
            return Ok(());
        }

        let font = self.fonts.resolve(&run.font);
        if let Font::Embedded(name) = &font {
            let font_data = self
                .fonts
                .get_mut(name)
                .ok_or_else(|| PdfError::FontNotFound(name.clone()))?;
            for span in &spans {
                font_data.add_chars(&span.text);
            }
        }

        let resource_name = self.get_or_create_font_ref(&font, page)?;
        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size: run.font_size,
            color: run.color,
        };

        let mut operators = Vec::new();
        for span in spans {
            let encoded = match &font {
                Font::Standard(standard) => standard.encode_text_literal(&span.text),
                Font::Embedded(name) => self
                    .fonts
                    .get(name)
                    .map(|f| f.encode_text_hex(&span.text))
                    .ok_or_else(|| PdfError::FontNotFound(name.clone()))?,
            };
            operators.extend(generate_text_operators(&encoded, span.x, span.y, &ctx));
        }

        trace!(page, font = %run.font, "buffered text run");
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Draw an image into its placement box
    ///
    /// The image is converted to JPEG, scaled to fit the box keeping its
    /// aspect ratio and centered in it.
    pub fn insert_image(&mut self, page: usize, image: &ImagePlacement) -> Result<()> {
        self.page_id(page)?;

        let jpeg = any_image_to_jpg(&image.data)?;
        let (resource_name, orig_width, orig_height) = self.get_or_create_image_ref(&jpeg, page)?;

        let (actual_width, actual_height) =
            fit_dimensions(orig_width, orig_height, image.width, image.height);
        let x = image.x + (image.width - actual_width) / 2.0;
        let y = image.y + (image.height - actual_height) / 2.0;

        let operators =
            generate_image_operators(&resource_name, x, y, actual_width, actual_height);
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.embed_fonts()?;
        self.finalize_page_resources()?;
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Embed every font referenced by a buffered text run
    fn embed_fonts(&mut self) -> Result<()> {
        let mut used: Vec<Font> = self
            .page_font_resources
            .values()
            .flat_map(|fonts| fonts.keys().cloned())
            .collect();
        used.sort_by_key(Font::key);
        used.dedup();

        for font in used {
            if self.embedded_fonts.contains_key(&font.key()) {
                continue;
            }
            let font_id = match &font {
                Font::Standard(standard) => self.inner.add_object(standard.to_pdf_dict()),
                Font::Embedded(name) => self.embed_font_object(name)?,
            };
            self.embedded_fonts.insert(font.key(), font_id);
        }

        Ok(())
    }

    /// Embed a TrueType font as Type0 with its descendant objects
    fn embed_font_object(&mut self, font_name: &str) -> Result<ObjectId> {
        let font_data = self
            .fonts
            .get(font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;

        let font_objects = font_data.to_pdf_objects()?;

        let font_file_id = self.inner.add_object(font_objects.font_file_stream);

        let mut font_descriptor = font_objects.font_descriptor;
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = self.inner.add_object(font_descriptor);

        let mut cid_font = font_objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let mut type0_font = font_objects.type0_font;
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );

        let tounicode_id = self.inner.add_object(font_objects.tounicode_stream);
        type0_font.set("ToUnicode", Object::Reference(tounicode_id));

        debug!(font = font_name, "embedded TrueType font");
        Ok(self.inner.add_object(type0_font))
    }

    /// Get or create a font resource name for a page
    ///
    /// Names are chosen so they never shadow a resource the page already has.
    fn get_or_create_font_ref(&mut self, font: &Font, page: usize) -> Result<String> {
        if let Some(name) = self
            .page_font_resources
            .get(&page)
            .and_then(|fonts| fonts.get(font))
        {
            return Ok(name.clone());
        }

        let mut taken = self.existing_resource_names(page, b"Font")?;
        if let Some(fonts) = self.page_font_resources.get(&page) {
            taken.extend(fonts.values().cloned());
        }
        let resource_name = fresh_name("FF", &taken);

        self.page_font_resources
            .entry(page)
            .or_default()
            .insert(font.clone(), resource_name.clone());
        Ok(resource_name)
    }

    /// Get or create an image resource for a page
    ///
    /// Returns the resource name and pixel dimensions. Images are
    /// deduplicated by a hash of their JPEG bytes.
    fn get_or_create_image_ref(&mut self, jpeg: &[u8], page: usize) -> Result<(String, u32, u32)> {
        let mut hasher = DefaultHasher::new();
        jpeg.hash(&mut hasher);
        let data_hash = hasher.finish();

        let (object_id, width, height) = match self.embedded_images.get(&data_hash) {
            Some(entry) => *entry,
            None => {
                let xobject = ImageXObject::from_jpeg(jpeg)?;
                let object_id = self.inner.add_object(xobject.to_pdf_stream());
                let entry = (object_id, xobject.width, xobject.height);
                self.embedded_images.insert(data_hash, entry);
                entry
            }
        };

        if let Some(name) = self
            .page_image_resources
            .get(&page)
            .and_then(|images| images.get(&object_id))
        {
            return Ok((name.clone(), width, height));
        }

        let mut taken = self.existing_resource_names(page, b"XObject")?;
        if let Some(images) = self.page_image_resources.get(&page) {
            taken.extend(images.values().cloned());
        }
        let resource_name = fresh_name("FIm", &taken);

        self.page_image_resources
            .entry(page)
            .or_default()
            .insert(object_id, resource_name.clone());
        Ok((resource_name, width, height))
    }

    /// Resource names already present in a page's `category` dictionary
    fn existing_resource_names(&self, page: usize, category: &[u8]) -> Result<HashSet<String>> {
        let resources = self.page_resources(self.page_id(page)?);
        let names = resources
            .get(category)
            .ok()
            .and_then(|obj| object::resolve_dict(&self.inner, obj))
            .map(|dict| {
                dict.iter()
                    .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    /// Effective Resources dictionary of a page (inherited or referenced)
    fn page_resources(&self, page_id: ObjectId) -> Dictionary {
        self.inner
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| object::get_inherited(&self.inner, page, b"Resources"))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_default()
    }

    /// Merge the fonts and images used on each page into its Resources
    fn finalize_page_resources(&mut self) -> Result<()> {
        let mut pages: Vec<usize> = self
            .page_font_resources
            .keys()
            .chain(self.page_image_resources.keys())
            .copied()
            .collect();
        pages.sort_unstable();
        pages.dedup();

        for page in pages {
            let mut fonts = Vec::new();
            for (font, resource_name) in self.page_font_resources.get(&page).into_iter().flatten() {
                let font_id = self
                    .embedded_fonts
                    .get(&font.key())
                    .ok_or_else(|| PdfError::FontNotFound(font.key()))?;
                fonts.push((resource_name.clone(), *font_id));
            }
            let images: Vec<(String, ObjectId)> = self
                .page_image_resources
                .get(&page)
                .into_iter()
                .flatten()
                .map(|(id, name)| (name.clone(), *id))
                .collect();

            self.add_page_resources(page, b"Font", &fonts)?;
            self.add_page_resources(page, b"XObject", &images)?;
        }

        Ok(())
    }

    /// Add references to a page's Resources `category` dictionary
    ///
    /// The merged Resources are written back as a direct dictionary on the
    /// page so shared or inherited dictionaries stay untouched.
    fn add_page_resources(
        &mut self,
        page: usize,
        category: &[u8],
        entries: &[(String, ObjectId)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let page_id = self.page_id(page)?;
        let mut resources = self.page_resources(page_id);

        let mut category_dict = resources
            .get(category)
            .ok()
            .and_then(|obj| object::resolve_dict(&self.inner, obj))
            .cloned()
            .unwrap_or_default();
        for (name, id) in entries {
            category_dict.set(name.as_bytes(), Object::Reference(*id));
        }
        resources.set(category, Object::Dictionary(category_dict));

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.page_content_buffer);

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append overlay content after a page's existing content
    ///
    /// The existing streams are kept as they are and wrapped in `q`/`Q`, so
    /// the overlay starts from the default graphics state no matter what the
    /// page content leaves on the stack.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let existing: Vec<Object> = {
            let page_dict = self.inner.get_dictionary(page_id)?;
            match page_dict.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.inner.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Stream(stream)) => vec![Object::Stream(stream.clone())],
                _ => Vec::new(),
            }
        };

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let save_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(save_id));
        }
        for item in existing {
            match item {
                Object::Stream(stream) => {
                    contents.push(Object::Reference(self.inner.add_object(stream)))
                }
                other => contents.push(other),
            }
        }

        let mut overlay = b"\nQ\n".to_vec();
        if contents.is_empty() {
            overlay.clear();
        }
        overlay.extend_from_slice(content);
        let overlay_id = self.inner.add_object(deflate_stream(Dictionary::new(), &overlay)?);
        contents.push(Object::Reference(overlay_id));

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(contents));

        debug!(page, bytes = content.len(), "appended overlay content");
        Ok(())
    }
}

/// First `prefix{n}` not present in `taken`
fn fresh_name(prefix: &str, taken: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::TextRun;
    use lopdf::dictionary;

    /// One-page document whose content draws a rectangle and leaves the
    /// graphics state modified
    fn create_test_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"1 0 0 rg 0 0 10 10 re f".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "FF1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn page_content(bytes: &[u8]) -> String {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn test_color_conversions() {
        assert_eq!(Color::gray(0.5), Color::rgb(0.5, 0.5, 0.5));
        assert_eq!(Color::from_cmyk(0.0, 0.0, 0.0, 1.0), Color::black());
        assert_eq!(Color::from_cmyk(0.0, 1.0, 1.0, 0.0), Color::red());
    }

    #[test]
    fn test_color_deserializes_from_components() {
        let color: Color = serde_json::from_str(r#"{"r": 0, "g": 0, "b": 1}"#).unwrap();
        assert_eq!(color, Color::blue());
    }

    #[test]
    fn test_fresh_name_skips_taken() {
        let taken: HashSet<String> = ["FF1".to_string(), "FF2".to_string()].into();
        assert_eq!(fresh_name("FF", &taken), "FF3");
        assert_eq!(fresh_name("FIm", &taken), "FIm1");
    }

    #[test]
    fn test_invalid_page_rejected() {
        let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
        let run = TextRun::single("Helv", 12.0, Color::black(), "x", 0.0, 0.0);
        let result = doc.insert_text(2, &run);
        assert!(matches!(result, Err(PdfError::InvalidPage(2, 1))));
    }

    #[test]
    fn test_text_overlay_isolated_from_page_state() {
        let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
        let run = TextRun::single("Helv", 12.0, Color::black(), "Hello", 72.0, 700.0);
        doc.insert_text(1, &run).unwrap();
        let bytes = doc.to_bytes().unwrap();

        let content = page_content(&bytes);
        let original = content.find("0 0 10 10 re f").unwrap();
        let restore = content.find("\nQ\n").unwrap();
        let text = content.find("(Hello) Tj").unwrap();
        assert!(content.starts_with("q\n"));
        assert!(original < restore && restore < text);
        // FF1 is already used by the page, so the overlay font takes FF2
        assert!(content.contains("/FF2 12 Tf"));
    }

    #[test]
    fn test_text_overlay_registers_standard_font() {
        let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
        doc.insert_text(1, &TextRun::single("Cour", 9.0, Color::black(), "A", 1.0, 1.0))
            .unwrap();
        let bytes = doc.to_bytes().unwrap();

        let out = Document::load_mem(&bytes).unwrap();
        let page = out.get_dictionary(out.get_pages()[&1]).unwrap();
        let fonts = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"FF1"));
        let font_id = fonts.get(b"FF2").unwrap().as_reference().unwrap();
        let font = out.get_dictionary(font_id).unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Courier");
    }

    #[test]
    fn test_empty_spans_leave_page_untouched() {
        let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
        doc.insert_text(1, &TextRun::single("Helv", 12.0, Color::black(), "", 0.0, 0.0))
            .unwrap();
        let bytes = doc.to_bytes().unwrap();

        assert_eq!(page_content(&bytes), "1 0 0 rg 0 0 10 10 re f");
    }
}
