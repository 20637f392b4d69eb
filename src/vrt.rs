//! Raw raster virtual mappings.
//!
//! A [`VirtualRasterDescriptor`] describes how the pixels of a headerless
//! binary file are laid out, so a raster library can read them without a
//! native format driver. It renders to GDAL VRT XML using one
//! `VRTRawRasterBand` per band.

use crate::error::Result;
use crate::models::{ByteOrder, DataType, Interleave};
use quick_xml::escape::escape;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Byte offsets locating one band inside the raw file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawBandLayout {
    /// 1-based band number
    pub band: usize,
    /// Offset of the band's first pixel
    pub image_offset: u64,
    /// Distance between horizontally adjacent pixels
    pub pixel_offset: u64,
    /// Distance between vertically adjacent pixels
    pub line_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualRasterDescriptor {
    pub source: PathBuf,
    pub nbands: usize,
    pub cols: usize,
    pub rows: usize,
    pub datatype: DataType,
    pub nodata: f64,
    pub header_offset: u64,
    pub byte_order: ByteOrder,
    pub interleave: Interleave,
    /// Whether `source` is resolved relative to the VRT file's location
    pub relative_to_vrt: bool,
}

impl VirtualRasterDescriptor {
    /// Descriptor for a raw file with no header bytes and unspecified byte order
    pub fn raw(
        source: impl Into<PathBuf>,
        interleave: Interleave,
        nbands: usize,
        cols: usize,
        rows: usize,
        datatype: DataType,
        nodata: f64,
    ) -> Self {
        Self {
            source: source.into(),
            nbands,
            cols,
            rows,
            datatype,
            nodata,
            header_offset: 0,
            byte_order: ByteOrder::Unspecified,
            interleave,
            relative_to_vrt: false,
        }
    }

    pub fn with_header_offset(mut self, header_offset: u64) -> Self {
        self.header_offset = header_offset;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_relative_to_vrt(mut self, relative: bool) -> Self {
        self.relative_to_vrt = relative;
        self
    }

    /// Layout of a 1-based band
    pub fn band_layout(&self, band: usize) -> RawBandLayout {
        let index = band.saturating_sub(1) as u64;
        let size = self.datatype.size_bytes() as u64;
        let cols = self.cols as u64;
        let rows = self.rows as u64;
        let nbands = self.nbands as u64;

        let (image_offset, pixel_offset, line_offset) = match self.interleave {
            Interleave::Bsq => (index * size * cols * rows, size, size * cols),
            Interleave::Bip => (index * size, size * nbands, size * cols * nbands),
            Interleave::Bil => (index * size * cols, size, size * cols * nbands),
        };

        RawBandLayout {
            band,
            image_offset: self.header_offset + image_offset,
            pixel_offset,
            line_offset,
        }
    }

    pub fn band_layouts(&self) -> Vec<RawBandLayout> {
        (1..=self.nbands).map(|band| self.band_layout(band)).collect()
    }

    /// Render as GDAL VRT XML
    pub fn to_vrt_xml(&self) -> String {
        let source = self.source.to_string_lossy();
        let source = escape(&*source);
        let relative = if self.relative_to_vrt { 1 } else { 0 };

        let mut xml = format!(
            "<VRTDataset rasterXSize=\"{}\" rasterYSize=\"{}\">\n",
            self.cols, self.rows
        );
        for layout in self.band_layouts() {
            xml.push_str(&format!(
                "  <VRTRasterBand dataType=\"{}\" band=\"{}\" subClass=\"VRTRawRasterBand\">\n",
                self.datatype, layout.band
            ));
            xml.push_str(&format!("    <NoDataValue>{}</NoDataValue>\n", nodata_text(self.nodata)));
            xml.push_str(&format!(
                "    <SourceFilename relativetoVRT=\"{}\">{}</SourceFilename>\n",
                relative, source
            ));
            xml.push_str(&format!("    <ImageOffset>{}</ImageOffset>\n", layout.image_offset));
            xml.push_str(&format!("    <PixelOffset>{}</PixelOffset>\n", layout.pixel_offset));
            xml.push_str(&format!("    <LineOffset>{}</LineOffset>\n", layout.line_offset));
            if let Some(order) = self.byte_order.vrt_name() {
                xml.push_str(&format!("    <ByteOrder>{}</ByteOrder>\n", order));
            }
            xml.push_str("  </VRTRasterBand>\n");
        }
        xml.push_str("</VRTDataset>\n");
        xml
    }

    /// Write the VRT XML to a file
    pub fn write_vrt(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_vrt_xml())?;
        Ok(())
    }
}

/// Very large magnitudes are written in exponent form
fn nodata_text(value: f64) -> String {
    if value.is_finite() && value.abs() >= 1e16 {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(interleave: Interleave) -> VirtualRasterDescriptor {
        VirtualRasterDescriptor::raw("/data/scene.dat", interleave, 3, 100, 50, DataType::Int16, -32768.0)
    }

    #[test]
    fn test_bsq_layout() {
        let vrt = descriptor(Interleave::Bsq);
        assert_eq!(
            vrt.band_layout(1),
            RawBandLayout { band: 1, image_offset: 0, pixel_offset: 2, line_offset: 200 }
        );
        assert_eq!(vrt.band_layout(3).image_offset, 2 * 2 * 100 * 50);
    }

    #[test]
    fn test_bip_layout() {
        let vrt = descriptor(Interleave::Bip);
        assert_eq!(
            vrt.band_layout(2),
            RawBandLayout { band: 2, image_offset: 2, pixel_offset: 6, line_offset: 600 }
        );
    }

    #[test]
    fn test_bil_layout() {
        let vrt = descriptor(Interleave::Bil);
        assert_eq!(
            vrt.band_layout(3),
            RawBandLayout { band: 3, image_offset: 400, pixel_offset: 2, line_offset: 600 }
        );
    }

    #[test]
    fn test_header_offset_shifts_every_band() {
        let vrt = descriptor(Interleave::Bil).with_header_offset(512);
        let offsets: Vec<u64> = vrt.band_layouts().iter().map(|l| l.image_offset).collect();
        assert_eq!(offsets, vec![512, 712, 912]);
    }

    #[test]
    fn test_vrt_xml() {
        let vrt = descriptor(Interleave::Bsq).with_byte_order(ByteOrder::BigEndian);
        let xml = vrt.to_vrt_xml();

        assert!(xml.starts_with("<VRTDataset rasterXSize=\"100\" rasterYSize=\"50\">"));
        assert_eq!(xml.matches("subClass=\"VRTRawRasterBand\"").count(), 3);
        assert!(xml.contains("dataType=\"Int16\" band=\"2\""));
        assert!(xml.contains("<NoDataValue>-32768</NoDataValue>"));
        assert!(xml.contains("<SourceFilename relativetoVRT=\"0\">/data/scene.dat</SourceFilename>"));
        assert!(xml.contains("<ImageOffset>10000</ImageOffset>"));
        assert!(xml.contains("<ByteOrder>MSB</ByteOrder>"));
    }

    #[test]
    fn test_vrt_xml_float_minimum_nodata() {
        let vrt = VirtualRasterDescriptor::raw(
            "/data/scene",
            Interleave::Bsq,
            1,
            2,
            2,
            DataType::Float64,
            f64::MIN,
        );
        assert!(
            vrt.to_vrt_xml()
                .contains("<NoDataValue>-1.7976931348623157e308</NoDataValue>")
        );
    }

    #[test]
    fn test_vrt_xml_omits_unspecified_byte_order_and_escapes_path() {
        let vrt = VirtualRasterDescriptor::raw(
            "/data/a&b<1>.dat",
            Interleave::Bip,
            1,
            2,
            2,
            DataType::Byte,
            0.0,
        );
        let xml = vrt.to_vrt_xml();
        assert!(!xml.contains("<ByteOrder>"));
        assert!(xml.contains("/data/a&amp;b&lt;1&gt;.dat"));
    }
}
