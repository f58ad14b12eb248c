use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};

pub const EVENT_PARAM_COUNT: usize = 8;

/// Upper bound on either layout dimension; anything larger is a corrupt header.
pub const MAX_LAYOUT_DIMENSION: i32 = 4096;

pub const FLAG_NO_PARAMS: u8 = 0x01;
pub const FLAG_GENERATOR: u8 = 0x02;
pub const FLAG_FROM_MAP: u8 = 0x04;
pub const FLAG_MULTIPLAYER_ONLY: u8 = 0x80;

pub const GENERATOR_FLAG_INITIALLY_CHARGED: u8 = 0x01;

/// One cell of the event layout stream, exactly as stored on the wire.
/// Unknown event kinds survive decode untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventCell {
    pub kind: u16,
    pub flags: u8,
    pub generator_flags: u8,
    pub generator_delay: u8,
    pub params: [u16; EVENT_PARAM_COUNT],
}

impl RawEventCell {
    pub fn is_generator(&self) -> bool {
        self.flags & FLAG_GENERATOR != 0
    }

    pub fn carries_params(&self) -> bool {
        self.flags & FLAG_NO_PARAMS == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLayout {
    pub width: i32,
    pub height: i32,
    /// Row-major, `width * height` entries.
    pub cells: Vec<RawEventCell>,
}

impl EventLayout {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        let cell_count = validated_cell_count(width, height)?;
        Ok(EventLayout {
            width,
            height,
            cells: vec![RawEventCell::default(); cell_count],
        })
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&RawEventCell> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(x as usize + y as usize * self.width as usize)
    }

    pub fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut RawEventCell> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get_mut(x as usize + y as usize * self.width as usize)
    }
}

fn validated_cell_count(width: i32, height: i32) -> Result<usize> {
    ensure!(
        width > 0 && height > 0,
        "layout reports non-positive dimensions {width}x{height}"
    );
    ensure!(
        width <= MAX_LAYOUT_DIMENSION && height <= MAX_LAYOUT_DIMENSION,
        "layout dimensions {width}x{height} exceed the {MAX_LAYOUT_DIMENSION} cap"
    );
    (width as usize)
        .checked_mul(height as usize)
        .context("layout cell count overflow")
}

pub fn read_event_layout<R: Read>(mut reader: R) -> Result<EventLayout> {
    let width = reader
        .read_i32::<LittleEndian>()
        .context("reading layout width")?;
    let height = reader
        .read_i32::<LittleEndian>()
        .context("reading layout height")?;
    let cell_count = validated_cell_count(width, height)?;

    let mut cells = Vec::with_capacity(cell_count);
    for index in 0..cell_count {
        let cell = read_cell(&mut reader)
            .with_context(|| format!("reading event cell {index} of {cell_count}"))?;
        cells.push(cell);
    }

    Ok(EventLayout {
        width,
        height,
        cells,
    })
}

fn read_cell<R: Read>(reader: &mut R) -> Result<RawEventCell> {
    let kind = reader
        .read_u16::<LittleEndian>()
        .context("reading event kind")?;
    let flags = reader.read_u8().context("reading flag byte")?;

    let (generator_flags, generator_delay) = if flags & FLAG_GENERATOR != 0 {
        (
            reader.read_u8().context("reading generator flags")?,
            reader.read_u8().context("reading generator delay")?,
        )
    } else {
        (0, 0)
    };

    let mut params = [0u16; EVENT_PARAM_COUNT];
    if flags & FLAG_NO_PARAMS == 0 {
        for (slot, value) in params.iter_mut().enumerate() {
            *value = reader
                .read_u16::<LittleEndian>()
                .with_context(|| format!("reading event parameter {slot}"))?;
        }
    }

    Ok(RawEventCell {
        kind,
        flags,
        generator_flags,
        generator_delay,
        params,
    })
}

pub fn read_compressed_event_layout<R: Read>(reader: R) -> Result<EventLayout> {
    read_event_layout(DeflateDecoder::new(reader))
}

pub fn open_event_layout<P: AsRef<Path>>(path: P) -> Result<EventLayout> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening event layout at {}", path.display()))?;
    read_compressed_event_layout(BufReader::new(file))
        .with_context(|| format!("decoding event layout {}", path.display()))
}

pub fn write_event_layout<W: Write>(layout: &EventLayout, mut writer: W) -> Result<()> {
    let cell_count = validated_cell_count(layout.width, layout.height)?;
    ensure!(
        layout.cells.len() == cell_count,
        "layout holds {} cells but dimensions {}x{} require {cell_count}",
        layout.cells.len(),
        layout.width,
        layout.height
    );

    writer
        .write_i32::<LittleEndian>(layout.width)
        .context("writing layout width")?;
    writer
        .write_i32::<LittleEndian>(layout.height)
        .context("writing layout height")?;
    for (index, cell) in layout.cells.iter().enumerate() {
        write_cell(cell, &mut writer).with_context(|| format!("writing event cell {index}"))?;
    }
    Ok(())
}

fn write_cell<W: Write>(cell: &RawEventCell, writer: &mut W) -> Result<()> {
    if !cell.is_generator() {
        ensure!(
            cell.generator_flags == 0 && cell.generator_delay == 0,
            "generator bytes set on a non-generator cell"
        );
    }
    if !cell.carries_params() {
        ensure!(
            cell.params == [0; EVENT_PARAM_COUNT],
            "cell flagged NO_PARAMS carries non-zero parameters"
        );
    }

    writer.write_u16::<LittleEndian>(cell.kind)?;
    writer.write_u8(cell.flags)?;
    if cell.is_generator() {
        writer.write_u8(cell.generator_flags)?;
        writer.write_u8(cell.generator_delay)?;
    }
    if cell.carries_params() {
        for value in cell.params {
            writer.write_u16::<LittleEndian>(value)?;
        }
    }
    Ok(())
}

pub fn write_compressed_event_layout<W: Write>(layout: &EventLayout, writer: W) -> Result<()> {
    let mut encoder = DeflateEncoder::new(writer, Compression::default());
    write_event_layout(layout, &mut encoder)?;
    encoder.finish().context("finishing deflate stream")?;
    Ok(())
}

pub fn encode_event_layout(layout: &EventLayout) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_event_layout(layout, &mut bytes)?;
    Ok(bytes)
}
