use super::*;

/// One bit per pixel, row major, most significant bit first. Rows are
/// padded to whole bytes, the same layout as a binary PBM raster.
#[derive(Debug)]
pub struct Canvas<'a> {
    size: CanvasSize,
    stride: usize,
    bits: &'a mut [u8],
}

impl<'a> Canvas<'a> {
    /// Bytes per row.
    pub fn stride(width: u16) -> usize {
        usize::from(width).div_ceil(8)
    }

    /// Buffer length a canvas of `size` needs.
    pub fn required_bytes(size: CanvasSize) -> usize {
        Self::stride(size.width).saturating_mul(usize::from(size.height))
    }

    /// Takes the front of `buffer` as the pixel store and clears it.
    pub fn new(size: CanvasSize, buffer: &'a mut [u8]) -> Result<Self, MachineError> {
        let required = Self::required_bytes(size);
        let actual = buffer.len();
        let bits = buffer
            .get_mut(..required)
            .ok_or(MachineError::CanvasBufferTooSmall { required, actual })?;
        bits.fill(0);
        Ok(Self {
            size,
            stride: Self::stride(size.width),
            bits,
        })
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn width(&self) -> u16 {
        self.size.width
    }

    pub fn height(&self) -> u16 {
        self.size.height
    }

    /// Sets the pixel at `(x, y)`. Off canvas points are dropped and
    /// report `false`.
    pub fn plot(&mut self, x: i64, y: i64) -> bool {
        let Some((index, mask)) = self.locate(x, y) else {
            return false;
        };
        match self.bits.get_mut(index) {
            Some(byte) => {
                *byte |= mask;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, x: i64, y: i64) -> bool {
        self.locate(x, y)
            .and_then(|(index, mask)| self.bits.get(index).map(|byte| byte & mask != 0))
            .unwrap_or(false)
    }

    pub fn count_set(&self) -> usize {
        self.bits
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .fold(0, usize::saturating_add)
    }

    pub fn row(&self, y: u16) -> Option<&[u8]> {
        let start = usize::from(y).checked_mul(self.stride)?;
        let end = start.checked_add(self.stride)?;
        self.bits.get(start..end)
    }

    /// Packed pixel rows.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits
    }

    /// Coordinates of every set pixel, row by row.
    pub fn set_pixels(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (0..self.size.height).flat_map(move |y| {
            (0..self.size.width)
                .filter(move |x| self.get(i64::from(*x), i64::from(y)))
                .map(move |x| (x, y))
        })
    }

    fn locate(&self, x: i64, y: i64) -> Option<(usize, u8)> {
        let x = u16::try_from(x).ok().filter(|x| *x < self.size.width)?;
        let y = u16::try_from(y).ok().filter(|y| *y < self.size.height)?;
        let column = usize::from(x);
        let index = usize::from(y)
            .checked_mul(self.stride)?
            .checked_add(column / 8)?;
        let mask = 0x80u8.checked_shr(u32::try_from(column % 8).ok()?)?;
        Some((index, mask))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows_pad_to_whole_bytes() {
        assert_eq!(Canvas::stride(8), 1);
        assert_eq!(Canvas::stride(9), 2);
        assert_eq!(Canvas::stride(512), 64);
        let size = CanvasSize { width: 10, height: 3 };
        assert_eq!(Canvas::required_bytes(size), 6);
    }

    #[test]
    fn plots_msb_first() -> Result<(), MachineError> {
        let mut buffer = [0xffu8; 8];
        let size = CanvasSize::new(10, 2)?;
        let mut canvas = Canvas::new(size, &mut buffer)?;
        assert_eq!(canvas.count_set(), 0);

        assert!(canvas.plot(0, 0));
        assert!(canvas.plot(9, 1));
        assert_eq!(canvas.as_bytes(), &[0x80, 0x00, 0x00, 0x40]);
        assert!(canvas.get(0, 0));
        assert!(canvas.get(9, 1));
        assert!(!canvas.get(1, 0));
        assert_eq!(canvas.count_set(), 2);
        Ok(())
    }

    #[test]
    fn clear_leaves_tail_untouched() -> Result<(), MachineError> {
        let mut buffer = [0xffu8; 8];
        let size = CanvasSize::new(8, 2)?;
        let canvas = Canvas::new(size, &mut buffer)?;
        assert_eq!(canvas.as_bytes().len(), 2);
        assert_eq!(buffer, [0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        Ok(())
    }

    #[test]
    fn off_canvas_points_are_dropped() -> Result<(), MachineError> {
        let mut buffer = [0u8; 4];
        let size = CanvasSize::new(16, 2)?;
        let mut canvas = Canvas::new(size, &mut buffer)?;
        assert!(!canvas.plot(-1, 0));
        assert!(!canvas.plot(16, 0));
        assert!(!canvas.plot(0, 2));
        assert!(!canvas.plot(i64::MIN, i64::MAX));
        assert_eq!(canvas.count_set(), 0);
        Ok(())
    }

    #[test]
    fn rejects_short_buffer() -> Result<(), MachineError> {
        let mut buffer = [0u8; 3];
        let size = CanvasSize::new(16, 2)?;
        let err = Canvas::new(size, &mut buffer).unwrap_err();
        assert_eq!(
            err,
            MachineError::CanvasBufferTooSmall {
                required: 4,
                actual: 3
            }
        );
        Ok(())
    }

    #[test]
    fn lists_set_pixels_in_raster_order() -> Result<(), MachineError> {
        let mut buffer = [0u8; 4];
        let size = CanvasSize::new(4, 4)?;
        let mut canvas = Canvas::new(size, &mut buffer)?;
        canvas.plot(3, 2);
        canvas.plot(1, 0);
        canvas.plot(0, 2);
        let mut pixels = canvas.set_pixels();
        assert_eq!(pixels.next(), Some((1, 0)));
        assert_eq!(pixels.next(), Some((0, 2)));
        assert_eq!(pixels.next(), Some((3, 2)));
        assert_eq!(pixels.next(), None);
        assert_eq!(canvas.row(2), Some(&[0b1001_0000u8][..]));
        assert_eq!(canvas.row(4), None);
        Ok(())
    }
}
