//! Binary PBM (P4) output. The canvas already stores rows in P4 order,
//! so encoding is a header followed by the raw bits.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use turtle_machine::Canvas;

pub fn encode(canvas: &Canvas<'_>) -> Vec<u8> {
    let mut out = format!("P4\n{} {}\n", canvas.width(), canvas.height()).into_bytes();
    out.extend_from_slice(canvas.as_bytes());
    out
}

pub fn write_file(path: &Path, canvas: &Canvas<'_>) -> Result<()> {
    fs::write(path, encode(canvas)).with_context(|| format!("Write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_machine::CanvasSize;

    #[test]
    fn encodes_header_and_rows() {
        let mut buffer = [0u8; 4];
        let size = CanvasSize::new(10, 2).unwrap();
        let mut canvas = Canvas::new(size, &mut buffer).unwrap();
        canvas.plot(0, 0);
        canvas.plot(8, 1);

        let bytes = encode(&canvas);
        let (header, raster) = bytes.split_at(8);
        assert_eq!(header, b"P4\n10 2\n");
        assert_eq!(raster, [0x80, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn blank_canvas_is_all_zero() {
        let mut buffer = vec![0xffu8; Canvas::required_bytes(CanvasSize::default())];
        let canvas = Canvas::new(CanvasSize::default(), &mut buffer).unwrap();
        let bytes = encode(&canvas);
        let header = b"P4\n512 512\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 512 * 64);
        assert!(bytes[header.len()..].iter().all(|byte| *byte == 0));
    }
}
