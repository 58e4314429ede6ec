//! Structural checks over a GRIB2 byte stream, and the per-field metadata needed to
//! name a field and place it on a grid.
//!
//! [`validate`] walks section headers only, with every length checked against the
//! stream, so that a corrupt or hostile file is rejected before the `grib` parser
//! sees it. [`FieldRecord::from_submessage`] then reads field metadata from the
//! submessages `grib` yields.

use crate::dataset::grib2::lambert::LambertConformal;
use grib::{GridDefinitionTemplateValues, SubMessage};
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"GRIB";
const END_MARKER: &[u8; 4] = b"7777";
const INDICATOR_LEN: u64 = 16;
const SECTION_HEADER_LEN: u64 = 5;
const MISSING_SURFACE: u8 = 255;

// Section payloads handed out by `grib` start after the 5-byte section header.
const PAYLOAD_START_OCTET: usize = 6;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("I/O error while scanning GRIB2 sections")]
    Io(#[from] io::Error),

    #[error("expected GRIB indicator at offset {0}")]
    BadMagic(u64),

    #[error("unsupported GRIB edition {edition} at offset {offset}")]
    Edition { offset: u64, edition: u8 },

    #[error("section {section} at offset {offset} is truncated")]
    Truncated { section: u8, offset: u64 },

    #[error("unknown section number {section} at offset {offset}")]
    UnknownSection { section: u8, offset: u64 },

    #[error("data section at offset {0} has no preceding grid, product, representation or bitmap section")]
    MissingDefinition(u64),

    #[error("section {section} of field {field} is too short ({len} bytes)")]
    ShortSection { section: u8, field: usize, len: usize },

    #[error("grid definition of field {field} is unreadable: {message}")]
    Grid { field: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub kind: u8,
    pub scale_factor: i8,
    pub scaled_value: i32,
}

impl FixedSurface {
    pub const MISSING: FixedSurface = FixedSurface {
        kind: MISSING_SURFACE,
        scale_factor: 0,
        scaled_value: 0,
    };

    pub fn is_missing(&self) -> bool {
        self.kind == MISSING_SURFACE
    }

    pub fn value(&self) -> f64 {
        if self.is_missing() {
            return 0.0;
        }
        self.scaled_value as f64 / 10f64.powi(self.scale_factor as i32)
    }
}

impl From<grib::FixedSurface> for FixedSurface {
    fn from(surface: grib::FixedSurface) -> Self {
        Self {
            kind: surface.surface_type,
            scale_factor: surface.scale_factor,
            scaled_value: surface.scaled_value,
        }
    }
}

/// Statistical processing of a product definition template 4.8 field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistic {
    /// Code table 4.10 (0 average, 1 accumulation, 2 maximum, 3 minimum).
    pub process: u8,
    /// Code table 4.4 unit of `length`.
    pub time_unit: u8,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfo {
    pub template: u16,
    pub category: u8,
    pub number: u8,
    pub first_surface: FixedSurface,
    pub second_surface: FixedSurface,
    pub statistic: Option<Statistic>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridInfo {
    Lambert(LambertConformal),
    Unsupported(u16),
}

/// One decodable field (GRIB2 submessage) in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub discipline: u8,
    pub grid: GridInfo,
    pub num_points: u32,
    pub product: ProductInfo,
}

impl FieldRecord {
    /// Reads the metadata of the `field`-th submessage.
    pub fn from_submessage<R>(
        field: usize,
        submessage: &SubMessage<'_, R>,
    ) -> Result<Self, InventoryError> {
        let grid_def = submessage.grid_def();
        Ok(Self {
            discipline: submessage.indicator().discipline,
            grid: grid_info(field, grid_def)?,
            num_points: grid_def.num_points(),
            product: product_info(field, submessage.prod_def())?,
        })
    }
}

/// Checks the section structure of every message in the stream and returns the
/// number of fields (data sections) it holds. Nothing larger than a section header
/// is read into memory.
pub fn validate<R: Read + Seek>(reader: &mut R) -> Result<usize, InventoryError> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    let mut offset = reader.seek(SeekFrom::Start(0))?;
    let mut fields = 0;

    while offset < stream_len {
        let truncated_indicator = InventoryError::Truncated { section: 0, offset };
        let mut indicator = [0u8; INDICATOR_LEN as usize];
        if read_fully(reader, &mut indicator)? < indicator.len() {
            return Err(truncated_indicator);
        }
        if &indicator[..4] != MAGIC {
            return Err(InventoryError::BadMagic(offset));
        }
        if indicator[7] != 2 {
            return Err(InventoryError::Edition {
                offset,
                edition: indicator[7],
            });
        }
        let mut length = [0u8; 8];
        length.copy_from_slice(&indicator[8..16]);
        let total_length = u64::from_be_bytes(length);
        let message_end = offset
            .checked_add(total_length)
            .filter(|end| total_length >= INDICATOR_LEN + 4 && *end <= stream_len)
            .ok_or(truncated_indicator)?;
        let marker_at = message_end - END_MARKER.len() as u64;

        fields += validate_sections(reader, offset + INDICATOR_LEN, marker_at)?;

        reader.seek(SeekFrom::Start(marker_at))?;
        let mut marker = [0u8; 4];
        if read_fully(reader, &mut marker)? < marker.len() || &marker != END_MARKER {
            return Err(InventoryError::Truncated {
                section: 8,
                offset: marker_at,
            });
        }
        offset = message_end;
    }

    Ok(fields)
}

/// Walks sections 1 to 7 between the indicator and the end marker of one message.
fn validate_sections<R: Read + Seek>(
    reader: &mut R,
    mut position: u64,
    marker_at: u64,
) -> Result<usize, InventoryError> {
    let mut seen = [false; 8];
    let mut fields = 0;

    while position < marker_at {
        let truncated = |section| InventoryError::Truncated {
            section,
            offset: position,
        };
        if marker_at - position < SECTION_HEADER_LEN {
            return Err(truncated(8));
        }
        reader.seek(SeekFrom::Start(position))?;
        let mut head = [0u8; SECTION_HEADER_LEN as usize];
        if read_fully(reader, &mut head)? < head.len() {
            return Err(truncated(8));
        }
        let length = u64::from(u32::from_be_bytes([head[0], head[1], head[2], head[3]]));
        let number = head[4];
        let minimum = minimum_section_len(number).ok_or(InventoryError::UnknownSection {
            section: number,
            offset: position,
        })?;
        if length < minimum || length > marker_at - position {
            return Err(truncated(number));
        }

        if number == 7 {
            if !(3..=6).all(|n| seen[n]) {
                return Err(InventoryError::MissingDefinition(position));
            }
            fields += 1;
        }
        seen[number as usize] = true;
        position += length;
    }

    Ok(fields)
}

/// Smallest section length the `grib` parser and decoder accept, by section number.
fn minimum_section_len(number: u8) -> Option<u64> {
    let len = match number {
        1 => 21,
        2 => 5,
        3 => 14,
        4 => 9,
        5 => 11,
        6 => 6,
        7 => 5,
        _ => return None,
    };
    Some(len)
}

fn grid_info(field: usize, grid_def: &grib::GridDefinition) -> Result<GridInfo, InventoryError> {
    let template = grid_def.grid_tmpl_num();
    if template != 30 {
        return Ok(GridInfo::Unsupported(template));
    }
    // Template 3.30 runs to octet 73.
    let len = grid_def.iter().len();
    if len + PAYLOAD_START_OCTET <= 73 {
        return Err(InventoryError::ShortSection {
            section: 3,
            field,
            len: len + PAYLOAD_START_OCTET - 1,
        });
    }

    let values = GridDefinitionTemplateValues::try_from(grid_def).map_err(|e| {
        InventoryError::Grid {
            field,
            message: e.to_string(),
        }
    })?;
    let GridDefinitionTemplateValues::Template30(def) = values else {
        return Ok(GridInfo::Unsupported(template));
    };
    let earth = &def.earth_shape;
    Ok(GridInfo::Lambert(LambertConformal {
        earth_radius: earth_radius(
            earth.shape_of_the_earth,
            earth.scale_factor_of_radius_of_spherical_earth,
            earth.scaled_value_of_radius_of_spherical_earth,
        ),
        nx: def.ni as usize,
        ny: def.nj as usize,
        la1: micro_degrees(def.first_point_lat),
        lo1: micro_degrees(def.first_point_lon),
        lad: micro_degrees(def.lad),
        lov: micro_degrees(def.lov),
        dx: def.dx as f64 / 1000.0,
        dy: def.dy as f64 / 1000.0,
        scanning_mode: def.scanning_mode.0,
        latin1: micro_degrees(def.latin1),
        latin2: micro_degrees(def.latin2),
    }))
}

fn product_info(
    field: usize,
    prod_def: &grib::ProdDefinition,
) -> Result<ProductInfo, InventoryError> {
    let payload: Vec<u8> = prod_def.iter().copied().collect();
    let o = Octets {
        payload: &payload,
        section: 4,
        field,
    };
    let template = prod_def.prod_tmpl_num();

    // Templates 4.0 to 4.15 share the layout up to the second fixed surface (octet 34).
    let (first_surface, second_surface) = if template <= 15 {
        o.require(34)?;
        prod_def
            .fixed_surfaces()
            .map(|(first, second)| (first.into(), second.into()))
            .unwrap_or((FixedSurface::MISSING, FixedSurface::MISSING))
    } else {
        (FixedSurface::MISSING, FixedSurface::MISSING)
    };
    let statistic = if template == 8 {
        Some(Statistic {
            process: o.u8(47)?,
            time_unit: o.u8(49)?,
            length: o.u32(50)?,
        })
    } else {
        None
    };

    Ok(ProductInfo {
        template,
        category: prod_def.parameter_category().map_or_else(|| o.u8(10), Ok)?,
        number: prod_def.parameter_number().map_or_else(|| o.u8(11), Ok)?,
        first_surface,
        second_surface,
        statistic,
    })
}

fn earth_radius(shape: u8, scale: u8, scaled_value: u32) -> f64 {
    match shape {
        0 => 6_367_470.0,
        1 if scaled_value > 0 => scaled_value as f64 / 10f64.powi(scale as i32),
        8 => 6_371_200.0,
        _ => 6_371_229.0,
    }
}

fn micro_degrees(value: impl Into<f64>) -> f64 {
    value.into() * 1e-6
}

/// Reads until `buf` is full or the stream ends; returns the number of bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// A section payload addressed by 1-based octet numbers, as in the WMO tables.
struct Octets<'a> {
    payload: &'a [u8],
    section: u8,
    field: usize,
}

impl Octets<'_> {
    fn short(&self) -> InventoryError {
        InventoryError::ShortSection {
            section: self.section,
            field: self.field,
            len: self.payload.len() + PAYLOAD_START_OCTET - 1,
        }
    }

    /// Fails unless the section reaches `last_octet`.
    fn require(&self, last_octet: usize) -> Result<(), InventoryError> {
        self.slice(last_octet, 1).map(|_| ())
    }

    fn slice(&self, octet: usize, width: usize) -> Result<&[u8], InventoryError> {
        octet
            .checked_sub(PAYLOAD_START_OCTET)
            .and_then(|start| self.payload.get(start..start + width))
            .ok_or_else(|| self.short())
    }

    fn u8(&self, octet: usize) -> Result<u8, InventoryError> {
        Ok(self.slice(octet, 1)?[0])
    }

    fn u32(&self, octet: usize) -> Result<u32, InventoryError> {
        let b = self.slice(octet, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    fn put_u16(buf: &mut [u8], octet: usize, value: u16) {
        buf[octet - 1..octet + 1].copy_from_slice(&value.to_be_bytes());
    }

    fn put_u32(buf: &mut [u8], octet: usize, value: u32) {
        buf[octet - 1..octet + 3].copy_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn section(number: u8, len: usize, fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        put_u32(&mut buf, 1, len as u32);
        buf[4] = number;
        fill(&mut buf);
        buf
    }

    pub(crate) struct Field {
        pub template: u16,
        pub category: u8,
        pub number: u8,
        pub first: (u8, u32),
        pub second: Option<(u8, u32)>,
        pub statistic: Option<(u8, u8, u32)>,
        /// One byte per grid point, simple-packed with 8 bits and no scaling.
        pub data: Vec<u8>,
    }

    impl Field {
        pub(crate) fn filled(mut self, data: &[u8]) -> Self {
            self.data = data.to_vec();
            self
        }
    }

    pub(crate) fn lambert_section(nx: u32, ny: u32, la1: u32) -> Vec<u8> {
        section(3, 81, |b| {
            put_u32(b, 7, nx * ny);
            put_u16(b, 13, 30);
            b[14] = 6;
            put_u32(b, 31, nx);
            put_u32(b, 35, ny);
            put_u32(b, 39, la1);
            put_u32(b, 43, 237_280_472);
            b[46] = 8;
            put_u32(b, 48, 38_500_000);
            put_u32(b, 52, 262_500_000);
            put_u32(b, 56, 3_000_000);
            put_u32(b, 60, 3_000_000);
            b[64] = 0x40;
            put_u32(b, 66, 38_500_000);
            put_u32(b, 70, 38_500_000);
        })
    }

    fn product_section(field: &Field) -> Vec<u8> {
        let len = if field.template == 8 { 58 } else { 34 };
        section(4, len, |b| {
            put_u16(b, 8, field.template);
            b[9] = field.category;
            b[10] = field.number;
            b[22] = field.first.0;
            put_u32(b, 25, field.first.1);
            match field.second {
                Some((kind, value)) => {
                    b[28] = kind;
                    put_u32(b, 31, value);
                }
                None => {
                    b[28] = MISSING_SURFACE;
                    put_u32(b, 31, u32::MAX);
                }
            }
            if let Some((process, unit, length)) = field.statistic {
                b[41] = 1;
                b[46] = process;
                b[48] = unit;
                put_u32(b, 50, length);
            }
        })
    }

    /// Data representation template 5.0 with reference 0 and no binary or decimal
    /// scaling, so each packed byte decodes to its own value.
    fn representation_section(data: &[u8]) -> Vec<u8> {
        section(5, 21, |b| {
            put_u32(b, 6, data.len() as u32);
            put_u16(b, 10, 0);
            b[19] = if data.is_empty() { 0 } else { 8 };
        })
    }

    fn data_section(data: &[u8]) -> Vec<u8> {
        let mut buf = section(7, 5 + data.len(), |_| {});
        buf[5..].copy_from_slice(data);
        buf
    }

    pub(crate) fn wrap(discipline: u8, body: Vec<u8>) -> Vec<u8> {
        let total = body.len() + END_MARKER.len() + 16;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[0, 0, discipline, 2]);
        out.extend_from_slice(&(total as u64).to_be_bytes());
        out.extend(body);
        out.extend_from_slice(END_MARKER);
        out
    }

    /// One GRIB2 message with a submessage per field.
    pub(crate) fn message(discipline: u8, grid: &[u8], fields: &[Field]) -> Vec<u8> {
        let mut body = section(1, 21, |_| {});
        body.extend_from_slice(grid);
        for field in fields {
            body.extend(product_section(field));
            body.extend(representation_section(&field.data));
            body.extend(section(6, 6, |b| b[5] = 255));
            body.extend(data_section(&field.data));
        }
        wrap(discipline, body)
    }

    pub(crate) fn mxuphl(bottom: u32, top: u32) -> Field {
        Field {
            template: 8,
            category: 7,
            number: 199,
            first: (103, bottom),
            second: Some((103, top)),
            statistic: Some((2, 1, 1)),
            data: Vec::new(),
        }
    }

    pub(crate) fn ugrd(height: u32) -> Field {
        Field {
            template: 0,
            category: 2,
            number: 2,
            first: (103, height),
            second: None,
            statistic: None,
            data: Vec::new(),
        }
    }

    fn records(bytes: Vec<u8>) -> Result<Vec<FieldRecord>, InventoryError> {
        let mut cursor = Cursor::new(bytes);
        validate(&mut cursor)?;
        cursor.seek(SeekFrom::Start(0))?;
        let grib2 = grib::from_reader(cursor).unwrap();
        grib2
            .iter()
            .enumerate()
            .map(|(index, (_, submessage))| FieldRecord::from_submessage(index, &submessage))
            .collect()
    }

    #[test]
    fn test_reads_grid_and_product_definitions() {
        let bytes = message(0, &lambert_section(1799, 1059, 21_138_123), &[mxuphl(2000, 5000)]);
        let records = records(bytes).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.discipline, 0);
        assert_eq!(record.num_points, 1799 * 1059);

        let GridInfo::Lambert(grid) = &record.grid else {
            panic!("expected a Lambert grid, got {:?}", record.grid);
        };
        assert_eq!((grid.nx, grid.ny), (1799, 1059));
        assert!((grid.la1 - 21.138123).abs() < 1e-9);
        assert!((grid.lo1 - 237.280472).abs() < 1e-9);
        assert!((grid.lov - 262.5).abs() < 1e-9);
        assert_eq!(grid.dx, 3000.0);
        assert_eq!(grid.scanning_mode, 0x40);
        assert_eq!(grid.earth_radius, 6_371_229.0);

        let product = &record.product;
        assert_eq!((product.template, product.category, product.number), (8, 7, 199));
        assert_eq!(product.first_surface.kind, 103);
        assert_eq!(product.first_surface.value(), 2000.0);
        assert_eq!(product.second_surface.value(), 5000.0);
        assert_eq!(
            product.statistic,
            Some(Statistic {
                process: 2,
                time_unit: 1,
                length: 1
            })
        );
    }

    #[test]
    fn test_lists_every_message_and_submessage() {
        let grid = lambert_section(3, 2, 21_138_123);
        let mut bytes = message(0, &grid, &[ugrd(10), ugrd(80)]);
        bytes.extend(message(0, &grid, &[mxuphl(0, 3000)]));

        assert_eq!(validate(&mut Cursor::new(bytes.clone())).unwrap(), 3);
        let records = records(bytes).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].product.first_surface.value(), 80.0);
        assert!(records[1].product.second_surface.is_missing());
        assert_eq!(records[2].product.template, 8);
    }

    #[test]
    fn test_signed_values_are_sign_magnitude() {
        let bytes = message(0, &lambert_section(2, 2, 0x8000_0000 | 1_500_000), &[ugrd(10)]);
        let records = records(bytes).unwrap();
        let GridInfo::Lambert(grid) = &records[0].grid else {
            panic!("expected a Lambert grid");
        };
        assert!((grid.la1 + 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_garbage_and_truncation() {
        let err = validate(&mut Cursor::new(b"NOTGRIB-at-all-16".to_vec())).unwrap_err();
        assert!(matches!(err, InventoryError::BadMagic(0)));

        let mut bytes = message(0, &lambert_section(2, 2, 21_138_123), &[ugrd(10)]);
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(
            validate(&mut Cursor::new(bytes)),
            Err(InventoryError::Truncated { section: 0, offset: 0 })
        ));
    }

    #[test]
    fn test_empty_stream_has_no_fields() {
        assert_eq!(validate(&mut Cursor::new(Vec::new())).unwrap(), 0);
    }

    #[test]
    fn test_oversized_message_length_after_empty_message() {
        let mut bytes = wrap(0, Vec::new());
        assert_eq!(bytes.len(), 20);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[0, 0, 0, 2]);
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());

        let err = validate(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, InventoryError::Truncated { section: 0, offset: 20 }));
    }

    #[test]
    fn test_section_length_past_message_end() {
        let mut body = section(1, 21, |_| {});
        body.extend(section(3, 14, |b| put_u32(b, 1, u32::MAX)));
        let err = validate(&mut Cursor::new(wrap(0, body))).unwrap_err();
        assert!(matches!(err, InventoryError::Truncated { section: 3, offset: 37 }));
    }

    #[test]
    fn test_section_shorter_than_its_header_is_rejected() {
        let mut body = section(1, 21, |_| {});
        body.extend(section(6, 6, |b| put_u32(b, 1, 2)));
        let err = validate(&mut Cursor::new(wrap(0, body))).unwrap_err();
        assert!(matches!(err, InventoryError::Truncated { section: 6, .. }));
    }

    #[test]
    fn test_unknown_section_number() {
        let mut body = section(1, 21, |_| {});
        body.extend(section(9, 8, |_| {}));
        let err = validate(&mut Cursor::new(wrap(0, body))).unwrap_err();
        assert!(matches!(err, InventoryError::UnknownSection { section: 9, offset: 37 }));
    }

    #[test]
    fn test_data_section_needs_definitions() {
        let mut body = section(1, 21, |_| {});
        body.extend(lambert_section(2, 2, 0));
        body.extend(data_section(&[1, 2, 3, 4]));
        let err = validate(&mut Cursor::new(wrap(0, body))).unwrap_err();
        assert!(matches!(err, InventoryError::MissingDefinition(118)));
    }

    #[test]
    fn test_missing_end_marker() {
        let mut bytes = message(0, &lambert_section(2, 2, 0), &[ugrd(10)]);
        let len = bytes.len();
        bytes[len - 1] = b'8';
        let err = validate(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, InventoryError::Truncated { section: 8, .. }));
    }

    #[test]
    fn test_short_product_section_is_an_error() {
        let mut body = section(1, 21, |_| {});
        body.extend(lambert_section(2, 2, 0));
        body.extend(section(4, 20, |b| {
            b[9] = 2;
            b[10] = 2;
        }));
        body.extend(representation_section(&[]));
        body.extend(section(6, 6, |b| b[5] = 255));
        body.extend(data_section(&[]));

        let err = records(wrap(0, body)).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::ShortSection {
                section: 4,
                field: 0,
                len: 20
            }
        ));
    }
}
