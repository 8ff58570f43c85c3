//! Pascal VOC XML format implementation.
//!
//! Writes one `Annotations/{stem}.xml` per image. Box corners use the
//! exclusive convention `xmax = x + width`, `ymax = y + height`. VOC has no
//! polygons, so they go through the polygon policy.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::format::error::ExportError;
use crate::format::formats::{RectEntry, rect_entries};
use crate::format::traits::{
    AnnotationFormat, ExportContext, ExportResult, ExportUnit, write_bytes,
};

/// Directory holding the per-image XML files.
pub const VOC_DIR: &str = "Annotations";

/// Pascal VOC XML format.
pub struct PascalVocFormat;

impl AnnotationFormat for PascalVocFormat {
    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn write_image(
        &mut self,
        ctx: &ExportContext<'_>,
        unit: &ExportUnit<'_>,
        result: &mut ExportResult,
    ) -> Result<usize, ExportError> {
        let rects = rect_entries(ctx, unit, self.display_name(), result);
        let objects = rects
            .iter()
            .map(|rect| Ok((ctx.class(rect.class_id)?.name.as_str(), *rect)))
            .collect::<Result<Vec<_>, ExportError>>()?;

        let xml = build_xml(unit, &objects)?;
        let path = ctx.root.join(VOC_DIR).join(format!("{}.xml", unit.stem));
        result.written.push(write_bytes(ctx.sink, path, &xml)?);
        Ok(objects.len())
    }
}

/// Build the XML document for one image.
fn build_xml(unit: &ExportUnit<'_>, objects: &[(&str, RectEntry)]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(|e| ExportError::Xml(e.into()))?;

    start(&mut writer, "annotation")?;
    write_text_element(&mut writer, "folder", "images")?;
    write_text_element(&mut writer, "filename", &unit.file_name)?;
    write_text_element(&mut writer, "path", &format!("images/{}", unit.file_name))?;

    start(&mut writer, "source")?;
    write_text_element(&mut writer, "database", "regionmark")?;
    end(&mut writer, "source")?;

    start(&mut writer, "size")?;
    write_text_element(&mut writer, "width", &unit.store.width().to_string())?;
    write_text_element(&mut writer, "height", &unit.store.height().to_string())?;
    write_text_element(&mut writer, "depth", "3")?;
    end(&mut writer, "size")?;

    write_text_element(&mut writer, "segmented", "0")?;

    for (name, rect) in objects {
        start(&mut writer, "object")?;
        write_text_element(&mut writer, "name", name)?;
        write_text_element(&mut writer, "pose", "Unspecified")?;
        write_text_element(&mut writer, "truncated", "0")?;
        write_text_element(&mut writer, "difficult", "0")?;

        start(&mut writer, "bndbox")?;
        write_text_element(&mut writer, "xmin", &rect.x.to_string())?;
        write_text_element(&mut writer, "ymin", &rect.y.to_string())?;
        write_text_element(&mut writer, "xmax", &(rect.x + rect.width).to_string())?;
        write_text_element(&mut writer, "ymax", &(rect.y + rect.height).to_string())?;
        end(&mut writer, "bndbox")?;

        end(&mut writer, "object")?;
    }

    end(&mut writer, "annotation")?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| ExportError::Xml(e.into()))
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| ExportError::Xml(e.into()))
}

/// Write `<name>value</name>`.
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), ExportError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(|e| ExportError::Xml(e.into()))?;
    end(writer, name)
}
